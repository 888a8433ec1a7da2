use chrono::{DateTime, Utc};
use tracing::error;

use crate::payload::OrderWebhook;
use crate::queue::format_utc;
use crate::storage::{KvStore, StoreError};
use crate::types::PermanentFailure;

pub const PERMANENT_FAILURES_KEY: &str = "permanent_webhook_failures";

/// Appends to the archive, evicting the oldest entries beyond `limit`.
pub async fn archive_permanent_failure(
    store: &KvStore,
    payload: &OrderWebhook,
    now: DateTime<Utc>,
    limit: usize,
) -> Result<PermanentFailure, StoreError> {
    let store = store.lock().await;
    let mut failures = match store.get(PERMANENT_FAILURES_KEY).await? {
        Some(raw) => parse_archive(&raw),
        None => Vec::new(),
    };

    let entry = PermanentFailure {
        timestamp: format_utc(now),
        order_id: payload.order_id().to_string(),
        order_number: payload.order_number().to_string(),
        data: payload.to_value(),
    };
    failures.push(entry.clone());

    let limit = limit.max(1);
    if failures.len() > limit {
        let excess = failures.len() - limit;
        failures.drain(..excess);
    }

    store
        .set(PERMANENT_FAILURES_KEY, &serde_json::to_string(&failures)?)
        .await?;

    Ok(entry)
}

/// Oldest first.
pub async fn list_permanent_failures(store: &KvStore) -> Result<Vec<PermanentFailure>, StoreError> {
    Ok(store
        .get(PERMANENT_FAILURES_KEY)
        .await?
        .map(|raw| parse_archive(&raw))
        .unwrap_or_default())
}

fn parse_archive(raw: &str) -> Vec<PermanentFailure> {
    serde_json::from_str::<Vec<PermanentFailure>>(raw).unwrap_or_else(|err| {
        error!(key = PERMANENT_FAILURES_KEY, %err, "permanent failure archive is unreadable, starting a new one");
        Vec::new()
    })
}
