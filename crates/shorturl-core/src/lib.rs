//! Core types and traits for the shorturl storage subsystem.
//!
//! This crate holds the record model shared by every backend, the status
//! types handed to transport layers, the identifier allocator, and the two
//! persistence contracts the URL store is written against.

pub mod allocator;
pub mod backend;
pub mod error;
pub mod record;
pub mod shortcode;
pub mod status;

pub use allocator::IdAllocator;
pub use backend::{DurableLog, Insertion, PersistedRow, RelationalBackend};
pub use error::{StorageError, StoreError};
pub use record::{BatchItem, BatchResult, Record, UserUrl};
pub use shortcode::ShortCode;
pub use status::{BatchDeleteStatus, PutStatus, Resolution};
