use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use serde_json::Value;

use crate::{
    error::ApiError,
    extractors::ValidJson,
    payload::OrderWebhook,
    state::AppState,
    storage::record_failed_webhook,
    types::{QueueWebhookResponse, RecordFailedWebhookRequest, RecordFailedWebhookResponse},
};

/// Entry point for the checkout flow. Whatever happens to the webhook later,
/// the order itself has already succeeded, so this only reports whether the
/// queue took the payload.
pub async fn queue_webhook_handler(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<Value>,
) -> (StatusCode, Json<QueueWebhookResponse>) {
    state.queue.queue_webhook(payload);
    (
        StatusCode::ACCEPTED,
        Json(QueueWebhookResponse {
            accepted: state.queue.is_running(),
        }),
    )
}

pub async fn record_failed_webhook_handler(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RecordFailedWebhookRequest>,
) -> Result<(StatusCode, Json<RecordFailedWebhookResponse>), ApiError> {
    let payload = OrderWebhook::from_value(req.order_data)
        .map_err(|err| ApiError::validation(format!("orderData: {err}")))?;
    let error = req
        .error
        .as_deref()
        .map(str::trim)
        .filter(|error| !error.is_empty());

    let stored = record_failed_webhook(
        &state.store,
        &payload,
        error,
        Utc::now(),
        state.config.capacity,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(RecordFailedWebhookResponse {
            stored: stored as u32,
        }),
    ))
}
