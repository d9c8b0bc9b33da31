//! Store configuration.
//!
//! Values come from command-line flags, then environment variables, then an
//! optional JSON config file. The first source that sets a value wins; empty
//! strings count as unset.

use crate::store::{
    Backends, StoreSettings, UrlStore, DEFAULT_DELETE_QUEUE_CAPACITY, DEFAULT_DELETE_WORKERS,
};
use clap::Args;
use serde::Deserialize;
use shorturl_core::StorageError;
use shorturl_storage::{FileLog, MySqlBackend};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub const CONFIG_ENV: &str = "SHORTURL_CONFIG";
pub const FILE_STORAGE_PATH_ENV: &str = "SHORTURL_FILE_STORAGE_PATH";
pub const DATABASE_DSN_ENV: &str = "SHORTURL_DATABASE_DSN";
pub const BASE_URL_ENV: &str = "SHORTURL_BASE_URL";
pub const DELETE_WORKERS_ENV: &str = "SHORTURL_DELETE_WORKERS";
pub const DELETE_QUEUE_CAPACITY_ENV: &str = "SHORTURL_DELETE_QUEUE_CAPACITY";

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid database dsn: {0}")]
    Database(#[from] StorageError),
}

#[derive(Debug, Clone, Args)]
pub struct StoreConfig {
    /// JSON config file; flags and environment override its values.
    #[arg(long, short = 'c', env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    /// Record log path. No log is kept when unset.
    #[arg(long, short = 'f', env = FILE_STORAGE_PATH_ENV)]
    pub file_storage_path: Option<PathBuf>,

    /// MySQL DSN. No relational backend is used when unset.
    #[arg(long, short = 'd', env = DATABASE_DSN_ENV)]
    pub database_dsn: Option<String>,

    /// Prefix for short URLs in listings.
    #[arg(long, short = 'b', env = BASE_URL_ENV)]
    pub base_url: Option<String>,

    #[arg(long, env = DELETE_WORKERS_ENV, default_value_t = DEFAULT_DELETE_WORKERS)]
    pub delete_workers: usize,

    #[arg(
        long,
        env = DELETE_QUEUE_CAPACITY_ENV,
        default_value_t = DEFAULT_DELETE_QUEUE_CAPACITY
    )]
    pub delete_queue_capacity: usize,
}

/// Shape of the JSON config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub base_url: Option<String>,
    pub file_storage_path: Option<PathBuf>,
    pub database_dsn: Option<String>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Configuration with every source merged.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub base_url: String,
    pub file_storage_path: Option<PathBuf>,
    pub database_dsn: Option<String>,
    pub settings: StoreSettings,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

fn non_empty_path(value: Option<PathBuf>) -> Option<PathBuf> {
    value.filter(|value| !value.as_os_str().is_empty())
}

impl StoreConfig {
    /// Merges flags and environment with the config file, if any.
    pub fn resolve(self) -> Result<ResolvedConfig, ConfigError> {
        let file = match non_empty_path(self.config) {
            Some(path) => {
                info!(path = %path.display(), "loading config file");
                ConfigFile::load(&path)?
            }
            None => ConfigFile::default(),
        };

        Ok(ResolvedConfig {
            base_url: non_empty(self.base_url)
                .or_else(|| non_empty(file.base_url))
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            file_storage_path: non_empty_path(self.file_storage_path)
                .or_else(|| non_empty_path(file.file_storage_path)),
            database_dsn: non_empty(self.database_dsn).or_else(|| non_empty(file.database_dsn)),
            settings: StoreSettings::builder()
                .delete_workers(self.delete_workers)
                .delete_queue_capacity(self.delete_queue_capacity)
                .build(),
        })
    }
}

impl ResolvedConfig {
    /// Builds the configured backends and opens a store over them.
    ///
    /// An unreachable database or unopenable log file does not fail startup;
    /// only a malformed DSN does.
    pub async fn open_store(&self) -> Result<UrlStore, ConfigError> {
        let mut backends = Backends::default();

        if let Some(path) = &self.file_storage_path {
            let log = match FileLog::open(path).await {
                Ok(log) => log,
                Err(error) => {
                    warn!(
                        path = %path.display(),
                        error = %error,
                        "cannot open record log; will retry on append"
                    );
                    FileLog::lazy(path)
                }
            };
            backends.log = Some(Arc::new(log));
        }

        if let Some(dsn) = &self.database_dsn {
            backends.relational = Some(Arc::new(MySqlBackend::connect_lazy(dsn)?));
        }

        info!(
            log = self.file_storage_path.is_some(),
            relational = self.database_dsn.is_some(),
            "opening url store"
        );
        Ok(UrlStore::open(backends, self.settings).await)
    }
}
