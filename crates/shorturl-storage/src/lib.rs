//! Durable backends for the shorturl store.
//!
//! - [`FileLog`]: newline-delimited JSON append-only log.
//! - [`MySqlBackend`]: relational backend over a sqlx MySQL pool.
//! - [`InMemoryRelational`]: process-local relational backend with the same
//!   uniqueness rules, for tests and database-less deployments.

pub mod file_log;
pub mod memory;
pub mod mysql;

pub use file_log::FileLog;
pub use memory::InMemoryRelational;
pub use mysql::MySqlBackend;
pub use shorturl_core::backend::{DurableLog, Insertion, PersistedRow, RelationalBackend};
pub use shorturl_core::StorageError;
