use axum::{Json, extract::State};

use crate::{
    error::ApiError,
    state::AppState,
    storage::list_permanent_failures,
    types::{ListFailuresResponse, OnlineSignalResponse, QueueSnapshotResponse},
};

pub async fn queue_snapshot_handler(
    State(state): State<AppState>,
) -> Result<Json<QueueSnapshotResponse>, ApiError> {
    let items = state.queue.snapshot().await?;
    Ok(Json(QueueSnapshotResponse {
        items,
        capacity: state.config.capacity as u32,
        max_attempts: state.config.max_attempts,
    }))
}

pub async fn list_failures_handler(
    State(state): State<AppState>,
) -> Result<Json<ListFailuresResponse>, ApiError> {
    let failures = list_permanent_failures(&state.store).await?;
    Ok(Json(ListFailuresResponse { failures }))
}

pub async fn online_handler(State(state): State<AppState>) -> Json<OnlineSignalResponse> {
    Json(OnlineSignalResponse {
        triggered: state.queue.notify_online(),
    })
}
