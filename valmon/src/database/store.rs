//! Namespaced key/value store.
//!
//! The monitoring core only relies on point reads and writes with an optional
//! time-to-live; entries whose TTL elapsed are invisible to readers and are
//! physically removed by [`StoreMaintenance`](super::StoreMaintenance).

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::Result;
use crate::database::time::{expiry_ms, now_ms};

/// Key spaces used by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Identities of observations that were already alerted on.
    Alerts,
    /// Latest monitor execution summary.
    Monitors,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Alerts => "alerts",
            Namespace::Monitors => "monitors",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key/value store contract.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Get the live value stored under `key`, if any.
    async fn get(&self, namespace: Namespace, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key` without expiry, replacing any previous value.
    async fn set(&self, namespace: Namespace, key: &[u8], value: &[u8]) -> Result<()>;

    /// Store `value` under `key`; it becomes invisible once `ttl` elapsed.
    async fn set_with_ttl(
        &self,
        namespace: Namespace,
        key: &[u8],
        value: &[u8],
        ttl: Duration,
    ) -> Result<()>;

    /// Whether a live value exists under `key`.
    async fn has(&self, namespace: Namespace, key: &[u8]) -> Result<bool>;

    /// Delete expired entries. Returns the number of rows removed.
    async fn purge_expired(&self) -> Result<u64>;
}

/// SQLx implementation of KvStore.
#[derive(Clone)]
pub struct SqlxKvStore {
    pool: SqlitePool,
}

impl SqlxKvStore {
    /// Create a new SqlxKvStore with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn upsert(
        &self,
        namespace: Namespace,
        key: &[u8],
        value: &[u8],
        expires_at: Option<i64>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_entries (namespace, key, value, expires_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (namespace, key) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(namespace.as_str())
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for SqlxKvStore {
    async fn get(&self, namespace: Namespace, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let row: Option<(Vec<u8>,)> = sqlx::query_as(
            r#"
            SELECT value FROM kv_entries
            WHERE namespace = ?
              AND key = ?
              AND (expires_at IS NULL OR expires_at > ?)
            "#,
        )
        .bind(namespace.as_str())
        .bind(key)
        .bind(now_ms())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.0))
    }

    async fn set(&self, namespace: Namespace, key: &[u8], value: &[u8]) -> Result<()> {
        self.upsert(namespace, key, value, None).await
    }

    async fn set_with_ttl(
        &self,
        namespace: Namespace,
        key: &[u8],
        value: &[u8],
        ttl: Duration,
    ) -> Result<()> {
        self.upsert(namespace, key, value, Some(expiry_ms(ttl)))
            .await
    }

    async fn has(&self, namespace: Namespace, key: &[u8]) -> Result<bool> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM kv_entries
            WHERE namespace = ?
              AND key = ?
              AND (expires_at IS NULL OR expires_at > ?)
            "#,
        )
        .bind(namespace.as_str())
        .bind(key)
        .bind(now_ms())
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn purge_expired(&self) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM kv_entries WHERE expires_at IS NOT NULL AND expires_at <= ?")
                .bind(now_ms())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}
