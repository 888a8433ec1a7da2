use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::{
    auth::admin_auth,
    handlers::{
        admin::{list_failures_handler, online_handler, queue_snapshot_handler},
        orders::{queue_webhook_handler, record_failed_webhook_handler},
    },
    state::AppState,
};

pub fn router(state: AppState) -> Router {
    let internal = Router::new()
        .route("/internal/webhooks/queue", get(queue_snapshot_handler))
        .route("/internal/webhooks/failures", get(list_failures_handler))
        .route("/internal/webhooks/online", post(online_handler))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth));

    Router::new()
        .route("/webhooks/orders", post(queue_webhook_handler))
        .route("/webhooks/orders/failed", post(record_failed_webhook_handler))
        .merge(internal)
        .with_state(state)
}
