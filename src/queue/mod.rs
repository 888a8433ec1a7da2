mod backoff;
mod clock;
mod config;
mod manager;
mod processor;
mod sender;
mod shutdown;

pub use backoff::{BackoffTable, DEFAULT_RETRY_INTERVALS_SECS};
pub use clock::{Clock, ManualClock, SystemClock, format_utc};
pub use config::{DEFAULT_WEBHOOK_URL, QueueConfig};
pub use manager::{QueueDeps, QueueHandle, QueueManager, QueueStopped};
pub use processor::{CycleReport, DeliveryQueue, EnqueueOutcome, QueueItem};
pub use sender::{BeaconTransport, DeliveryError, HttpBeacon, HttpSender, WebhookSender};
pub use shutdown::{FlushReport, flush_pending};
