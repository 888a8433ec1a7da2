use crate::queue::{QueueConfig, QueueHandle};
use crate::storage::KvStore;

#[derive(Clone)]
pub struct AppState {
    pub store: KvStore,
    pub queue: QueueHandle,
    pub config: QueueConfig,
    pub admin_api_token: Option<String>,
}
