#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic, dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use order_webhooks::{
    payload::OrderWebhook,
    queue::{BeaconTransport, DeliveryError, WebhookSender},
    storage::{KvStore, migrate},
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tempfile::NamedTempFile;

pub struct TestDb {
    pub store: KvStore,
    _db_file: NamedTempFile,
}

pub async fn setup_db() -> TestDb {
    setup_db_with_connections(1).await
}

/// Pool with several connections, for tests that write from many tasks.
pub async fn setup_db_with_connections(max_connections: u32) -> TestDb {
    let db_file = NamedTempFile::new().expect("create temp sqlite file");
    let options = SqliteConnectOptions::new()
        .filename(db_file.path())
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .expect("connect sqlite file");
    migrate(&pool).await.expect("run migrations");

    TestDb {
        store: KvStore::new(pool),
        _db_file: db_file,
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
        .single()
        .expect("valid start time")
}

/// Sender that replays a script of outcomes, then falls back to a default.
pub struct ScriptedSender {
    script: Mutex<VecDeque<Result<(), DeliveryError>>>,
    succeed_by_default: bool,
    calls: Mutex<Vec<String>>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedSender {
    pub fn always_ok() -> Self {
        Self::new(true)
    }

    pub fn always_failing() -> Self {
        Self::new(false)
    }

    fn new(succeed_by_default: bool) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            succeed_by_default,
            calls: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_script(self, outcomes: Vec<Result<(), DeliveryError>>) -> Self {
        *self.script.lock().unwrap() = outcomes.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebhookSender for ScriptedSender {
    async fn deliver(&self, payload: &OrderWebhook) -> Result<(), DeliveryError> {
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap()
            .push(payload.order_id().to_string());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let scripted = self.script.lock().unwrap().pop_front();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match scripted {
            Some(outcome) => outcome,
            None if self.succeed_by_default => Ok(()),
            None => Err(DeliveryError::Rejected(503)),
        }
    }
}

#[derive(Default)]
pub struct RecordingBeacon {
    sent: Mutex<Vec<String>>,
    settled: AtomicUsize,
}

impl RecordingBeacon {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn settle_calls(&self) -> usize {
        self.settled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BeaconTransport for RecordingBeacon {
    fn send_beacon(&self, payload: &OrderWebhook) -> bool {
        self.sent
            .lock()
            .unwrap()
            .push(payload.order_id().to_string());
        true
    }

    async fn settle(&self, _timeout: Duration) {
        self.settled.fetch_add(1, Ordering::SeqCst);
    }
}
