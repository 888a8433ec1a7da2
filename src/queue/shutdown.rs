use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::payload::OrderWebhook;
use crate::queue::{BeaconTransport, DeliveryQueue};
use crate::storage::{KvStore, peek_failed_webhooks};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub accepted: usize,
    pub refused: usize,
}

/// Best-effort send of everything still undelivered: the live queue plus
/// the payloads parked in storage by the order submission path. Nothing is
/// removed and no attempt is counted; outcomes cannot be confirmed.
pub async fn flush_pending(
    queue: &DeliveryQueue,
    store: &KvStore,
    beacon: &dyn BeaconTransport,
    timeout: Duration,
) -> FlushReport {
    let deadline = Instant::now() + timeout;
    let mut report = FlushReport::default();

    for item in queue.items() {
        tally(&mut report, beacon.send_beacon(&item.payload));
    }

    match tokio::time::timeout_at(deadline, peek_failed_webhooks(store)).await {
        Ok(Ok(stored)) => {
            for value in stored {
                match OrderWebhook::from_value(value) {
                    Ok(payload) => tally(&mut report, beacon.send_beacon(&payload)),
                    Err(err) => warn!(%err, "invalid data provided to webhook beacon"),
                }
            }
        }
        Ok(Err(err)) => debug!(%err, "could not read stored webhooks during shutdown"),
        Err(_) => debug!("timed out reading stored webhooks during shutdown"),
    }

    beacon
        .settle(deadline.saturating_duration_since(Instant::now()))
        .await;

    info!(
        accepted = report.accepted,
        refused = report.refused,
        "flushed pending webhooks on shutdown"
    );
    report
}

fn tally(report: &mut FlushReport, accepted: bool) {
    if accepted {
        report.accepted += 1;
    } else {
        report.refused += 1;
    }
}
