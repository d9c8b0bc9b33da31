//! In-memory URL store with soft deletes and durable replay.
//!
//! [`UrlStore`] keeps `(owner, short code) -> record` behind one
//! reader/writer lock, writes changes through to an optional
//! [`FileLog`](shorturl_storage::FileLog) and relational backend, and rebuilds
//! itself from them on startup.
//!
//! # Example
//!
//! ```rust
//! use shorturl_store::{Resolution, SingleUserStore, UrlStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SingleUserStore::new(UrlStore::in_memory().await);
//!
//! let (_, code) = store.put("https://example.com/a/long/path").await?;
//! assert_eq!(
//!     store.get(code.as_str()).await,
//!     Resolution::Active("https://example.com/a/long/path".to_string())
//! );
//!
//! store.delete(code.as_str()).await?.wait().await;
//! assert!(store.get(code.as_str()).await.is_deleted());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod deleter;
mod index;
pub mod single_user;
pub mod store;

pub use config::{ConfigError, ResolvedConfig, StoreConfig};
pub use deleter::{DeleteOutcome, DeleteTicket};
pub use shorturl_core::{
    BatchDeleteStatus, BatchItem, BatchResult, PutStatus, Resolution, ShortCode, StoreError,
    UserUrl,
};
pub use single_user::{SingleUserStore, DEFAULT_OWNER};
pub use store::{Backends, StoreSettings, StoreStats, UrlStore};
