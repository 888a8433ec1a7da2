use serde::{Deserialize, Serialize};
use specta::Type;

/// Archived webhook that exhausted every delivery attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Type)]
#[serde(rename_all = "camelCase")]
pub struct PermanentFailure {
    pub timestamp: String,
    pub order_id: String,
    pub order_number: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct ListFailuresResponse {
    pub failures: Vec<PermanentFailure>,
}
