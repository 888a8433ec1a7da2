use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

pub const UNKNOWN_ORDER: &str = "unknown";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("webhook payload must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Order webhook body validated at the boundary: always a JSON object, with
/// the correlation fields lifted out once.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderWebhook {
    order_id: Option<String>,
    order_number: Option<String>,
    body: Map<String, Value>,
}

impl OrderWebhook {
    pub fn from_value(value: Value) -> Result<Self, PayloadError> {
        match value {
            Value::Object(body) => Ok(Self::from_body(body)),
            other => Err(PayloadError::NotAnObject(kind_of(&other))),
        }
    }

    pub fn from_body(body: Map<String, Value>) -> Self {
        let order_id = body.get("order_id").and_then(correlation_field);
        let order_number = body.get("order_number").and_then(correlation_field);
        Self {
            order_id,
            order_number,
            body,
        }
    }

    pub fn order_id(&self) -> &str {
        self.order_id.as_deref().unwrap_or(UNKNOWN_ORDER)
    }

    pub fn order_number(&self) -> &str {
        self.order_number.as_deref().unwrap_or(UNKNOWN_ORDER)
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.body.clone())
    }
}

impl Serialize for OrderWebhook {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.body.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for OrderWebhook {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

fn correlation_field(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_non_objects() {
        for value in [json!(null), json!("A1"), json!(42), json!([1, 2]), json!(true)] {
            assert!(OrderWebhook::from_value(value).is_err());
        }
        assert_eq!(
            OrderWebhook::from_value(json!([])),
            Err(PayloadError::NotAnObject("array"))
        );
    }

    #[test]
    fn lifts_correlation_fields() {
        let payload = OrderWebhook::from_value(json!({
            "order_id": "A1",
            "order_number": "ORD-7",
            "total": 12.5,
        }))
        .expect("object payload");
        assert_eq!(payload.order_id(), "A1");
        assert_eq!(payload.order_number(), "ORD-7");
        assert_eq!(payload.body().len(), 3);
    }

    #[test]
    fn numeric_order_id_is_stringified() {
        let payload = OrderWebhook::from_value(json!({ "order_id": 991 })).expect("object");
        assert_eq!(payload.order_id(), "991");
    }

    #[test]
    fn missing_correlation_is_unknown() {
        let payload = OrderWebhook::from_value(json!({ "order_id": "" })).expect("object");
        assert_eq!(payload.order_id(), UNKNOWN_ORDER);
        assert_eq!(payload.order_number(), UNKNOWN_ORDER);
    }

    #[test]
    fn serializes_as_original_body() {
        let raw = json!({ "order_id": "B2", "items": [{ "qty": 1 }] });
        let payload = OrderWebhook::from_value(raw.clone()).expect("object");
        assert_eq!(serde_json::to_value(&payload).expect("serialize"), raw);
        let back: OrderWebhook = serde_json::from_value(raw).expect("deserialize");
        assert_eq!(back, payload);
    }
}
