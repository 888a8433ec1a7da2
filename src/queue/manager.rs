use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::queue::{
    BeaconTransport, Clock, CycleReport, DeliveryQueue, EnqueueOutcome, FlushReport, QueueConfig,
    WebhookSender, flush_pending,
};
use crate::storage::{KvStore, take_failed_webhooks};
use crate::types::{OrderWebhookPayload, QueueItemView};

/// Collaborators injected into the manager.
#[derive(Clone)]
pub struct QueueDeps {
    pub store: KvStore,
    pub sender: Arc<dyn WebhookSender>,
    pub beacon: Arc<dyn BeaconTransport>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, thiserror::Error)]
#[error("webhook queue is not running")]
pub struct QueueStopped;

enum Command {
    Enqueue(Value),
    ProcessNow,
    Snapshot(oneshot::Sender<Vec<QueueItemView>>),
    Shutdown(oneshot::Sender<FlushReport>),
}

/// Owns the live queue on a single task. Timers and signals all funnel into
/// that task, so a cycle always runs to completion before anything else
/// touches the queue.
pub struct QueueManager {
    queue: DeliveryQueue,
    deps: QueueDeps,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl QueueManager {
    /// Spawns the manager onto the current tokio runtime.
    pub fn start(config: QueueConfig, deps: QueueDeps) -> QueueHandle {
        let (tx, commands) = mpsc::unbounded_channel();
        let manager = Self {
            queue: DeliveryQueue::new(config),
            deps,
            commands,
        };
        tokio::spawn(manager.run());
        QueueHandle { tx }
    }

    async fn run(mut self) {
        self.rehydrate().await;

        let tick_interval = self
            .queue
            .config()
            .tick_interval
            .max(Duration::from_millis(1));
        let mut tick = tokio::time::interval_at(Instant::now() + tick_interval, tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let followup = tokio::time::sleep(self.queue.config().followup_delay);
        tokio::pin!(followup);

        // Startup pass, before any command is looked at.
        self.cycle().await;
        let mut followup_armed = !self.queue.is_empty();

        loop {
            let run_cycle = tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Enqueue(value)) => {
                        let outcome = self.queue.enqueue(value, self.deps.clock.now());
                        matches!(outcome, EnqueueOutcome::Queued { trigger_now: true })
                    }
                    Some(Command::ProcessNow) => true,
                    Some(Command::Snapshot(reply)) => {
                        let _ = reply.send(self.queue.snapshot());
                        false
                    }
                    Some(Command::Shutdown(reply)) => {
                        let report = self.flush().await;
                        let _ = reply.send(report);
                        break;
                    }
                    None => {
                        self.flush().await;
                        break;
                    }
                },
                _ = tick.tick() => true,
                () = &mut followup, if followup_armed => true,
            };

            if !run_cycle {
                continue;
            }

            self.cycle().await;
            followup_armed = !self.queue.is_empty();
            if followup_armed {
                followup
                    .as_mut()
                    .reset(Instant::now() + self.queue.config().followup_delay);
            }
        }

        info!("webhook queue stopped");
    }

    async fn cycle(&mut self) -> CycleReport {
        let deps = &self.deps;
        let report = self
            .queue
            .process_cycle(deps.sender.as_ref(), &deps.store, deps.clock.as_ref())
            .await;
        if report.attempted > 0 {
            debug!(
                attempted = report.attempted,
                delivered = report.delivered,
                archived = report.archived,
                remaining = report.remaining,
                "webhook cycle finished"
            );
        }
        report
    }

    async fn rehydrate(&mut self) {
        let payloads = match take_failed_webhooks(&self.deps.store).await {
            Ok(payloads) => payloads,
            Err(err) => {
                error!(%err, "error loading failed webhooks");
                return;
            }
        };

        for value in payloads {
            self.queue.enqueue(value, self.deps.clock.now());
        }
    }

    async fn flush(&self) -> FlushReport {
        flush_pending(
            &self.queue,
            &self.deps.store,
            self.deps.beacon.as_ref(),
            self.queue.config().shutdown_flush_timeout,
        )
        .await
    }
}

#[derive(Clone)]
pub struct QueueHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl QueueHandle {
    /// Hands a payload to the queue. Never fails; problems are logged.
    pub fn queue_webhook(&self, payload: Value) {
        if self.tx.send(Command::Enqueue(payload)).is_err() {
            warn!("webhook queue is not running, dropping webhook");
        }
    }

    pub fn queue_order(&self, order: &OrderWebhookPayload) {
        match serde_json::to_value(order) {
            Ok(value) => self.queue_webhook(value),
            Err(err) => error!(order_id = %order.order_id, %err, "failed to encode order webhook"),
        }
    }

    /// Connectivity came back: run a pass now instead of waiting on timers.
    pub fn notify_online(&self) -> bool {
        info!("network connection restored, processing webhook queue");
        self.tx.send(Command::ProcessNow).is_ok()
    }

    pub async fn snapshot(&self) -> Result<Vec<QueueItemView>, QueueStopped> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Snapshot(reply))
            .map_err(|_| QueueStopped)?;
        rx.await.map_err(|_| QueueStopped)
    }

    /// Stops the manager after a best-effort flush of everything pending.
    pub async fn shutdown(&self) -> Result<FlushReport, QueueStopped> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Shutdown(reply))
            .map_err(|_| QueueStopped)?;
        rx.await.map_err(|_| QueueStopped)
    }

    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }
}
