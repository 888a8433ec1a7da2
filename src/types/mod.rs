pub mod api_error;
pub mod failed_webhook;
pub mod order;
pub mod permanent_failure;
pub mod queue;
pub mod queue_item;

#[allow(unused_imports)]
pub use api_error::{ApiErrorCode, ApiErrorResponse};
#[allow(unused_imports)]
pub use failed_webhook::{
    FailedWebhookRecord, RecordFailedWebhookRequest, RecordFailedWebhookResponse,
};
#[allow(unused_imports)]
pub use order::{
    CustomerDetails, OrderDetails, OrderItem, OrderStatus, OrderWebhookPayload, ShippingAddress,
};
#[allow(unused_imports)]
pub use permanent_failure::{ListFailuresResponse, PermanentFailure};
#[allow(unused_imports)]
pub use queue::{OnlineSignalResponse, QueueWebhookResponse};
#[allow(unused_imports)]
pub use queue_item::{QueueItemState, QueueItemView, QueueSnapshotResponse};
