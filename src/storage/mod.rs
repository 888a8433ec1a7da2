mod failed_webhooks;
mod failure_archive;
mod kv;

pub use failed_webhooks::{
    FAILED_WEBHOOKS_KEY, peek_failed_webhooks, record_failed_webhook, take_failed_webhooks,
};
pub use failure_archive::{
    PERMANENT_FAILURES_KEY, archive_permanent_failure, list_permanent_failures,
};
pub use kv::{KvStore, KvWriteGuard, connect, migrate};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("failed to encode stored value: {0}")]
    Encode(#[from] serde_json::Error),
}
