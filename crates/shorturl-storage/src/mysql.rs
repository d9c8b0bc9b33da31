use async_trait::async_trait;
use shorturl_core::backend::{Insertion, PersistedRow, RelationalBackend};
use shorturl_core::error::{Result, StorageError};
use shorturl_core::{PutStatus, Record, ShortCode};
use sha2::{Digest, Sha256};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::{MySqlPool, Row};
use std::time::Duration;
use tracing::{debug, trace};

const SCHEMA: &str = include_str!("../ddl/mysql/short_urls.sql");
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(3);

/// MySQL implementation of the relational backend contract.
///
/// Rows are unique by the SHA-256 of `original_url`, so URLs of any length
/// are deduplicated. A duplicate insert is answered with the code of the row
/// that already holds the URL. Deletion only flips the
/// `deleted` column; rows are never removed.
#[derive(Debug, Clone)]
pub struct MySqlBackend {
    pool: MySqlPool,
}

impl MySqlBackend {
    /// Creates a backend from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a backend by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Creates a backend whose connections are opened on first use.
    ///
    /// Startup succeeds even when the database is down; each call then fails
    /// on its own after a short acquire timeout.
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_lazy(database_url)
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    async fn fetch_code(&self, url_hash: &[u8]) -> Result<ShortCode> {
        let row = sqlx::query(
            r#"
            SELECT short_code
            FROM short_urls
            WHERE original_url_hash = ?
            LIMIT 1
            "#,
        )
        .bind(url_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
        Ok(ShortCode::new_unchecked(code))
    }
}

fn url_hash(original_url: &str) -> Vec<u8> {
    Sha256::digest(original_url.as_bytes()).to_vec()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Configuration(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl RelationalBackend for MySqlBackend {
    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        debug!("ensured short_urls table");
        Ok(())
    }

    async fn insert_or_fetch(&self, record: &Record) -> Result<Insertion> {
        let payload = serde_json::to_string(record)?;
        let hash = url_hash(&record.value);

        let result = sqlx::query(
            r#"
            INSERT INTO short_urls (payload, original_url, original_url_hash, short_code, deleted)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(payload)
        .bind(&record.value)
        .bind(hash.as_slice())
        .bind(record.key.as_str())
        .bind(record.deleted)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                trace!(code = %record.key, "inserted short url row");
                Ok(Insertion {
                    status: PutStatus::Created,
                    key: record.key.clone(),
                })
            }
            Err(err) if is_unique_violation(&err) => {
                let key = self.fetch_code(&hash).await?;
                trace!(code = %key, "url already shortened");
                Ok(Insertion {
                    status: PutStatus::AlreadyExists,
                    key,
                })
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn mark_deleted(&self, key: &ShortCode) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE short_urls
            SET deleted = TRUE
            WHERE short_code = ?
            "#,
        )
        .bind(key.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn read_all(&self) -> Result<Vec<PersistedRow>> {
        let rows = sqlx::query(
            r#"
            SELECT payload, deleted
            FROM short_urls
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(PersistedRow {
                    payload: row.try_get("payload").map_err(map_sqlx_error)?,
                    deleted: row.try_get("deleted").map_err(map_sqlx_error)?,
                })
            })
            .collect()
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}
