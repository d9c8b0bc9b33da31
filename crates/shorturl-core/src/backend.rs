use crate::error::Result;
use crate::record::Record;
use crate::shortcode::ShortCode;
use crate::status::PutStatus;
use async_trait::async_trait;

/// Append-only record log replayed in full at startup.
#[async_trait]
pub trait DurableLog: Send + Sync + 'static {
    /// Appends one record. Records are never rewritten.
    async fn append(&self, record: &Record) -> Result<()>;

    /// Reads every complete record in append order.
    async fn replay_all(&self) -> Result<Vec<Record>>;
}

/// Answer of [`RelationalBackend::insert_or_fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    pub status: PutStatus,
    /// The code stored for the URL: the requested one when created, the
    /// pre-existing one otherwise.
    pub key: ShortCode,
}

/// One row returned by [`RelationalBackend::read_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedRow {
    /// Serialized [`Record`] as written at insert time.
    pub payload: String,
    /// Current soft-delete flag of the row; authoritative over the payload's.
    pub deleted: bool,
}

/// Narrow contract the store needs from a relational database.
///
/// Rows are unique by original URL regardless of owner. Every method returns
/// an error on connectivity trouble; callers degrade instead of failing.
#[async_trait]
pub trait RelationalBackend: Send + Sync + 'static {
    /// Creates the record table if it does not exist yet.
    async fn ensure_schema(&self) -> Result<()>;

    /// Inserts `record`, or returns the code of the row already holding its URL.
    async fn insert_or_fetch(&self, record: &Record) -> Result<Insertion>;

    /// Sets the soft-delete flag of the row stored under `key`.
    /// Returns `true` if a row was updated.
    async fn mark_deleted(&self, key: &ShortCode) -> Result<bool>;

    /// Reads every row for startup replay, in insertion order.
    async fn read_all(&self) -> Result<Vec<PersistedRow>>;

    /// Checks that the database answers.
    async fn ping(&self) -> Result<()>;
}
