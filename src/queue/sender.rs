use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::payload::OrderWebhook;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("endpoint responded with status {0}")]
    Rejected(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::Rejected(status.as_u16());
        }
        Self::Transport(err.to_string())
    }
}

/// Performs one delivery attempt. `Ok` only for a 2xx answer.
#[async_trait]
pub trait WebhookSender: Send + Sync {
    async fn deliver(&self, payload: &OrderWebhook) -> Result<(), DeliveryError>;
}

/// Fire-and-forget transport used while shutting down.
#[async_trait]
pub trait BeaconTransport: Send + Sync {
    /// Hands the payload over for transmission without waiting on it.
    /// Returns whether the transport accepted it.
    fn send_beacon(&self, payload: &OrderWebhook) -> bool;

    /// Waits up to `timeout` for accepted beacons to go out.
    async fn settle(&self, _timeout: Duration) {}
}

#[derive(Debug, Clone)]
pub struct HttpSender {
    client: reqwest::Client,
    url: String,
}

impl HttpSender {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| DeliveryError::Unexpected(err.to_string()))?;
        Ok(Self::with_client(client, url))
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl WebhookSender for HttpSender {
    async fn deliver(&self, payload: &OrderWebhook) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        debug!(order_id = payload.order_id(), status = status.as_u16(), "webhook response");
        if status.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Rejected(status.as_u16()))
        }
    }
}

/// Beacon over plain HTTP: each accepted payload becomes a detached POST
/// whose outcome is never inspected. Finished sends are reaped whenever a
/// new one is accepted, so the set only holds requests still on the wire.
pub struct HttpBeacon {
    client: reqwest::Client,
    url: String,
    in_flight: Mutex<JoinSet<()>>,
}

impl HttpBeacon {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            in_flight: Mutex::new(JoinSet::new()),
        }
    }

    /// Sends accepted and not yet finished.
    pub fn pending(&self) -> usize {
        match self.in_flight.lock() {
            Ok(mut in_flight) => {
                while in_flight.try_join_next().is_some() {}
                in_flight.len()
            }
            Err(_) => 0,
        }
    }
}

#[async_trait]
impl BeaconTransport for HttpBeacon {
    fn send_beacon(&self, payload: &OrderWebhook) -> bool {
        let body = match serde_json::to_vec(payload) {
            Ok(body) => body,
            Err(err) => {
                warn!(order_id = payload.order_id(), %err, "failed to encode webhook beacon");
                return false;
            }
        };

        let Ok(mut in_flight) = self.in_flight.lock() else {
            return false;
        };
        while in_flight.try_join_next().is_some() {}

        let request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        in_flight.spawn(async move {
            let _ = request.send().await;
        });

        info!(order_id = payload.order_id(), "webhook beacon accepted");
        true
    }

    async fn settle(&self, timeout: Duration) {
        let mut pending = match self.in_flight.lock() {
            Ok(mut in_flight) => std::mem::take(&mut *in_flight),
            Err(_) => return,
        };

        let drained = tokio::time::timeout(timeout, async {
            while pending.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(remaining = pending.len(), "beacon flush timed out");
            pending.abort_all();
        }
    }
}
