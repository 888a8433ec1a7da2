use serde::{Deserialize, Serialize};
use specta::Type;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct QueueItemView {
    pub id: Uuid,
    pub order_id: String,
    pub order_number: String,
    pub state: QueueItemState,
    pub attempts: u32,
    pub enqueued_at: String,
    pub last_attempt_at: Option<String>,
    /// None until the first attempt has been made.
    pub next_eligible_at: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueueItemState {
    PendingFirstAttempt,
    PendingRetry,
}

#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct QueueSnapshotResponse {
    pub items: Vec<QueueItemView>,
    pub capacity: u32,
    pub max_attempts: u32,
}
