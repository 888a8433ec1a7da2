use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::payload::OrderWebhook;
use crate::queue::{Clock, QueueConfig, WebhookSender, format_utc};
use crate::storage::{KvStore, archive_permanent_failure};
use crate::types::{QueueItemState, QueueItemView};

#[derive(Debug, Clone)]
pub struct QueueItem {
    pub id: Uuid,
    pub payload: OrderWebhook,
    pub attempts: u32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub enqueued_at: DateTime<Utc>,
}

impl QueueItem {
    pub fn state(&self) -> QueueItemState {
        if self.attempts == 0 {
            QueueItemState::PendingFirstAttempt
        } else {
            QueueItemState::PendingRetry
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// `trigger_now` is set when the new item is alone in the queue.
    Queued { trigger_now: bool },
    Rejected,
    Dropped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub attempted: usize,
    pub delivered: usize,
    pub retrying: usize,
    pub archived: usize,
    pub remaining: usize,
}

/// The live queue. Owned by exactly one task; every mutation goes through
/// [`DeliveryQueue::enqueue`] or [`DeliveryQueue::process_cycle`].
#[derive(Debug)]
pub struct DeliveryQueue {
    config: QueueConfig,
    items: VecDeque<QueueItem>,
}

impl DeliveryQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            items: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &QueueItem> {
        self.items.iter()
    }

    pub fn enqueue(&mut self, value: Value, now: DateTime<Utc>) -> EnqueueOutcome {
        let payload = match OrderWebhook::from_value(value) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(%err, "attempted to queue invalid webhook data");
                return EnqueueOutcome::Rejected;
            }
        };
        self.enqueue_payload(payload, now)
    }

    pub fn enqueue_payload(&mut self, payload: OrderWebhook, now: DateTime<Utc>) -> EnqueueOutcome {
        if self.items.len() >= self.config.capacity {
            error!(
                order_id = payload.order_id(),
                capacity = self.config.capacity,
                "webhook queue full, dropping webhook"
            );
            return EnqueueOutcome::Dropped;
        }

        info!(order_id = payload.order_id(), "webhook queued");
        self.items.push_back(QueueItem {
            id: Uuid::new_v4(),
            payload,
            attempts: 0,
            last_attempt_at: None,
            enqueued_at: now,
        });

        EnqueueOutcome::Queued {
            trigger_now: self.items.len() == 1,
        }
    }

    /// Ids of the items due for an attempt, in insertion order.
    pub fn eligible(&self, now: DateTime<Utc>) -> Vec<Uuid> {
        self.items
            .iter()
            .filter(|item| {
                self.config
                    .backoff
                    .is_eligible(item.attempts, item.last_attempt_at, now)
            })
            .map(|item| item.id)
            .collect()
    }

    /// Runs one pass over the eligible items. Attempts are sequential so at
    /// most one request is outstanding; no failure escapes the cycle.
    pub async fn process_cycle(
        &mut self,
        sender: &dyn WebhookSender,
        store: &KvStore,
        clock: &dyn Clock,
    ) -> CycleReport {
        let mut report = CycleReport::default();
        if self.items.is_empty() {
            return report;
        }

        info!(queued = self.items.len(), "processing webhook queue");

        for id in self.eligible(clock.now()) {
            let Some(index) = self.items.iter().position(|item| item.id == id) else {
                continue;
            };
            let (attempts, payload) = {
                let item = &mut self.items[index];
                item.attempts += 1;
                item.last_attempt_at = Some(clock.now());
                (item.attempts, item.payload.clone())
            };
            report.attempted += 1;

            match sender.deliver(&payload).await {
                Ok(()) => {
                    self.remove(id);
                    report.delivered += 1;
                    info!(order_id = payload.order_id(), attempts, "webhook sent successfully");
                }
                Err(err) if attempts >= self.config.max_attempts => {
                    self.remove(id);
                    report.archived += 1;
                    error!(
                        order_id = payload.order_id(),
                        attempts,
                        %err,
                        "failed to send webhook after max attempts"
                    );
                    if let Err(store_err) = archive_permanent_failure(
                        store,
                        &payload,
                        clock.now(),
                        self.config.archive_limit,
                    )
                    .await
                    {
                        error!(
                            order_id = payload.order_id(),
                            %store_err,
                            "failed to store permanent webhook failure"
                        );
                    }
                }
                Err(err) => {
                    report.retrying += 1;
                    warn!(
                        order_id = payload.order_id(),
                        attempts,
                        max_attempts = self.config.max_attempts,
                        %err,
                        "webhook attempt failed, will retry later"
                    );
                }
            }
        }

        report.remaining = self.items.len();
        report
    }

    pub fn snapshot(&self) -> Vec<QueueItemView> {
        self.items
            .iter()
            .map(|item| QueueItemView {
                id: item.id,
                order_id: item.payload.order_id().to_string(),
                order_number: item.payload.order_number().to_string(),
                state: item.state(),
                attempts: item.attempts,
                enqueued_at: format_utc(item.enqueued_at),
                last_attempt_at: item.last_attempt_at.map(format_utc),
                next_eligible_at: self
                    .config
                    .backoff
                    .next_eligible_at(item.attempts, item.last_attempt_at)
                    .map(format_utc),
            })
            .collect()
    }

    fn remove(&mut self, id: Uuid) {
        if let Some(index) = self.items.iter().position(|item| item.id == id) {
            self.items.remove(index);
        }
    }
}
