use std::time::Duration;

use tracing::warn;

use crate::queue::backoff::BackoffTable;

pub const DEFAULT_WEBHOOK_URL: &str = "https://hook.us1.make.com/rm4xebwtje2ff68tjd56jf9ar7bwcgzu";

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub webhook_url: String,
    pub capacity: usize,
    pub max_attempts: u32,
    pub backoff: BackoffTable,
    /// Delay before the follow-up cycle when a cycle leaves items behind.
    pub followup_delay: Duration,
    pub tick_interval: Duration,
    pub archive_limit: usize,
    pub request_timeout: Duration,
    pub shutdown_flush_timeout: Duration,
}

impl QueueConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("WEBHOOK_URL")
            && !value.trim().is_empty()
        {
            config.webhook_url = value.trim().to_string();
        }
        if let Ok(value) = std::env::var("WEBHOOK_QUEUE_CAPACITY")
            && let Ok(parsed) = value.parse::<usize>()
        {
            config.capacity = parsed.max(1);
        }
        if let Ok(value) = std::env::var("WEBHOOK_MAX_ATTEMPTS")
            && let Ok(parsed) = value.parse::<u32>()
        {
            config.max_attempts = parsed.max(1);
        }
        if let Ok(value) = std::env::var("WEBHOOK_RETRY_INTERVALS_SECS") {
            match parse_intervals(&value) {
                Some(table) => config.backoff = table,
                None => warn!(
                    value = %value,
                    "WEBHOOK_RETRY_INTERVALS_SECS must be a non-empty ascending list, using default"
                ),
            }
        }
        if let Ok(value) = std::env::var("WEBHOOK_FOLLOWUP_DELAY_MS")
            && let Ok(parsed) = value.parse::<u64>()
        {
            config.followup_delay = Duration::from_millis(parsed);
        }
        if let Ok(value) = std::env::var("WEBHOOK_TICK_INTERVAL_MS")
            && let Ok(parsed) = value.parse::<u64>()
        {
            config.tick_interval = Duration::from_millis(parsed.max(1));
        }
        if let Ok(value) = std::env::var("WEBHOOK_ARCHIVE_LIMIT")
            && let Ok(parsed) = value.parse::<usize>()
        {
            config.archive_limit = parsed.max(1);
        }
        if let Ok(value) = std::env::var("WEBHOOK_REQUEST_TIMEOUT_MS")
            && let Ok(parsed) = value.parse::<u64>()
        {
            config.request_timeout = Duration::from_millis(parsed.max(1));
        }
        if let Ok(value) = std::env::var("WEBHOOK_SHUTDOWN_FLUSH_MS")
            && let Ok(parsed) = value.parse::<u64>()
        {
            config.shutdown_flush_timeout = Duration::from_millis(parsed);
        }

        config
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            webhook_url: DEFAULT_WEBHOOK_URL.to_string(),
            capacity: 100,
            max_attempts: 5,
            backoff: BackoffTable::default(),
            followup_delay: Duration::from_secs(30),
            tick_interval: Duration::from_secs(60),
            archive_limit: 20,
            request_timeout: Duration::from_secs(10),
            shutdown_flush_timeout: Duration::from_secs(5),
        }
    }
}

fn parse_intervals(raw: &str) -> Option<BackoffTable> {
    let secs = raw
        .split(',')
        .map(|part| part.trim().parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;
    BackoffTable::new(secs.into_iter().map(Duration::from_secs).collect())
}
