use std::{str::FromStr, sync::Arc};

use chrono::Utc;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tokio::sync::{Mutex, MutexGuard};

use crate::queue::format_utc;
use crate::storage::StoreError;

/// String key-value store with the semantics of browser-local storage:
/// values are opaque text, the caller owns the encoding.
///
/// Writes go through one in-process lock. Callers that read a value, edit it
/// and write it back hold a [`KvWriteGuard`] for the whole sequence, so two
/// concurrent edits of the same key cannot drop each other's changes. The
/// store assumes it is the only process writing to the database.
#[derive(Debug, Clone)]
pub struct KvStore {
    pool: SqlitePool,
    writes: Arc<Mutex<()>>,
}

impl KvStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            writes: Arc::new(Mutex::new(())),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Waits for exclusive write access. Plain `set`/`remove` calls made
    /// meanwhile queue up behind the guard.
    pub async fn lock(&self) -> KvWriteGuard<'_> {
        KvWriteGuard {
            store: self,
            _guard: self.writes.lock().await,
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.read(key).await
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.lock().await.set(key, value).await
    }

    pub async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.lock().await.remove(key).await
    }

    async fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value: Option<String> = sqlx::query_scalar(
            r#"
            SELECT value
            FROM kv_store
            WHERE key = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value)
    }
}

/// Exclusive write access to a [`KvStore`], released on drop.
pub struct KvWriteGuard<'a> {
    store: &'a KvStore,
    _guard: MutexGuard<'a, ()>,
}

impl KvWriteGuard<'_> {
    pub async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.store.read(key).await
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(format_utc(Utc::now()))
        .execute(&self.store.pool)
        .await?;

        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.store.pool)
            .await?;

        Ok(())
    }
}

pub async fn connect(database_url: &str) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
