use serde::{Deserialize, Serialize};
use specta::Type;

#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct CustomerDetails {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct ShippingAddress {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apartment: Option<String>,
    pub postal_code: String,
    pub region: String,
    pub province: String,
    pub city: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct OrderItem {
    pub product_id: i64,
    pub title: String,
    pub quantity: u32,
    pub price: f64,
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct OrderDetails {
    pub items: Vec<OrderItem>,
    pub subtotal: f64,
    pub shipping_cost: f64,
    pub total: f64,
    pub shipping_method: String,
    pub payment_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
}

/// Order document the storefront posts once the order row exists.
#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct OrderWebhookPayload {
    pub order_id: String,
    pub order_number: String,
    pub customer_details: CustomerDetails,
    pub shipping_address: ShippingAddress,
    #[serde(default)]
    pub billing_address: Option<ShippingAddress>,
    pub order_details: OrderDetails,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub timestamp: String,
}
