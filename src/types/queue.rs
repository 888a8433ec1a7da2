use serde::{Deserialize, Serialize};
use specta::Type;

#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct QueueWebhookResponse {
    pub accepted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct OnlineSignalResponse {
    pub triggered: bool,
}
