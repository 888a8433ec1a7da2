use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::payload::OrderWebhook;
use crate::queue::format_utc;
use crate::storage::{KvStore, StoreError};
use crate::types::FailedWebhookRecord;

pub const FAILED_WEBHOOKS_KEY: &str = "failed_webhooks";

/// Reads and clears the payloads left behind by earlier runs.
///
/// Unreadable contents are logged and discarded; the key is cleared either
/// way so a bad value is never loaded twice.
pub async fn take_failed_webhooks(store: &KvStore) -> Result<Vec<Value>, StoreError> {
    let store = store.lock().await;
    let Some(raw) = store.get(FAILED_WEBHOOKS_KEY).await? else {
        return Ok(Vec::new());
    };

    let payloads = match parse_records(&raw) {
        Ok(records) => payloads_of(records),
        Err(reason) => {
            error!(key = FAILED_WEBHOOKS_KEY, %reason, "failed to parse stored webhooks, discarding");
            Vec::new()
        }
    };

    store.remove(FAILED_WEBHOOKS_KEY).await?;

    if !payloads.is_empty() {
        info!(count = payloads.len(), "loaded failed webhooks from storage");
    }
    Ok(payloads)
}

/// Same read as [`take_failed_webhooks`] without clearing anything.
pub async fn peek_failed_webhooks(store: &KvStore) -> Result<Vec<Value>, StoreError> {
    let Some(raw) = store.get(FAILED_WEBHOOKS_KEY).await? else {
        return Ok(Vec::new());
    };
    Ok(parse_records(&raw).map(payloads_of).unwrap_or_default())
}

/// Appends a payload whose direct send failed, keeping at most `limit`
/// records. Returns the number of records now stored.
pub async fn record_failed_webhook(
    store: &KvStore,
    payload: &OrderWebhook,
    failure: Option<&str>,
    now: DateTime<Utc>,
    limit: usize,
) -> Result<usize, StoreError> {
    let store = store.lock().await;
    let mut records = match store.get(FAILED_WEBHOOKS_KEY).await? {
        Some(raw) => parse_records(&raw).unwrap_or_else(|reason| {
            warn!(%reason, "replacing unreadable failed webhook list");
            Vec::new()
        }),
        None => Vec::new(),
    };

    records.push(FailedWebhookRecord {
        order_data: Some(payload.to_value()),
        data: None,
        timestamp: Some(format_utc(now)),
        error: failure.map(str::to_string),
    });
    if records.len() > limit {
        let excess = records.len() - limit;
        records.drain(..excess);
    }

    store
        .set(FAILED_WEBHOOKS_KEY, &serde_json::to_string(&records)?)
        .await?;

    info!(
        order_id = payload.order_id(),
        stored = records.len(),
        "recorded failed webhook for later delivery"
    );
    Ok(records.len())
}

fn parse_records(raw: &str) -> Result<Vec<FailedWebhookRecord>, String> {
    let value: Value = serde_json::from_str(raw).map_err(|err| err.to_string())?;
    let Value::Array(entries) = value else {
        return Err("stored value is not an array".to_string());
    };

    // Entries that are not records are skipped rather than failing the batch.
    Ok(entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<FailedWebhookRecord>(entry).ok())
        .collect())
}

fn payloads_of(records: Vec<FailedWebhookRecord>) -> Vec<Value> {
    records
        .into_iter()
        .filter_map(|record| record.order_data.or(record.data))
        .collect()
}
