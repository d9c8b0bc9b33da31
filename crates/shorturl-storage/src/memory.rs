use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use shorturl_core::backend::{Insertion, PersistedRow, RelationalBackend};
use shorturl_core::error::{Result, StorageError};
use shorturl_core::{PutStatus, Record, ShortCode};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Debug, Clone)]
struct Row {
    id: u64,
    payload: String,
    code: ShortCode,
    deleted: bool,
}

/// Process-local relational backend using DashMap.
///
/// Mirrors the MySQL table: rows are unique by original URL, addressed by
/// short code for deletion, and read back in insertion order. The outage
/// switch makes every call fail with [`StorageError::Unavailable`], which is
/// how store degradation is exercised without a database.
#[derive(Debug, Default)]
pub struct InMemoryRelational {
    rows: DashMap<String, Row>,
    codes: DashMap<ShortCode, String>,
    next_id: AtomicU64,
    offline: AtomicBool,
}

impl InMemoryRelational {
    /// Creates an empty, reachable backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates the database going away (`true`) or coming back (`false`).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(
                "in-memory relational backend is offline".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RelationalBackend for InMemoryRelational {
    async fn ensure_schema(&self) -> Result<()> {
        self.check_online()
    }

    async fn insert_or_fetch(&self, record: &Record) -> Result<Insertion> {
        self.check_online()?;
        let payload = serde_json::to_string(record)?;

        match self.rows.entry(record.value.clone()) {
            Entry::Occupied(existing) => Ok(Insertion {
                status: PutStatus::AlreadyExists,
                key: existing.get().code.clone(),
            }),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                slot.insert(Row {
                    id,
                    payload,
                    code: record.key.clone(),
                    deleted: record.deleted,
                });
                self.codes.insert(record.key.clone(), record.value.clone());
                Ok(Insertion {
                    status: PutStatus::Created,
                    key: record.key.clone(),
                })
            }
        }
    }

    async fn mark_deleted(&self, key: &ShortCode) -> Result<bool> {
        self.check_online()?;

        // Copy the URL out before touching `rows`; inserts lock rows then codes.
        let Some(url) = self.codes.get(key).map(|url| url.value().clone()) else {
            return Ok(false);
        };

        match self.rows.get_mut(&url) {
            Some(mut row) => {
                row.deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn read_all(&self) -> Result<Vec<PersistedRow>> {
        self.check_online()?;

        let mut rows: Vec<Row> = self.rows.iter().map(|row| row.value().clone()).collect();
        rows.sort_by_key(|row| row.id);

        Ok(rows
            .into_iter()
            .map(|row| PersistedRow {
                payload: row.payload,
                deleted: row.deleted,
            })
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        self.check_online()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(sequence: u64, url: &str) -> Record {
        Record {
            owner: "default".to_string(),
            key: ShortCode::from_sequence(sequence),
            sequence,
            value: url.to_string(),
            owner_token: "tok".to_string(),
            deleted: false,
        }
    }

    #[tokio::test]
    async fn insert_then_duplicate_returns_existing_code() {
        let backend = InMemoryRelational::new();

        let first = backend
            .insert_or_fetch(&record(1, "http://a.test"))
            .await
            .unwrap();
        assert_eq!(first.status, PutStatus::Created);
        assert_eq!(first.key.as_str(), "1");

        let second = backend
            .insert_or_fetch(&record(7, "http://a.test"))
            .await
            .unwrap();
        assert_eq!(second.status, PutStatus::AlreadyExists);
        assert_eq!(second.key.as_str(), "1");
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn mark_deleted_flags_row() {
        let backend = InMemoryRelational::new();
        backend
            .insert_or_fetch(&record(1, "http://a.test"))
            .await
            .unwrap();

        assert!(backend.mark_deleted(&ShortCode::from_sequence(1)).await.unwrap());
        assert!(!backend.mark_deleted(&ShortCode::from_sequence(2)).await.unwrap());

        let rows = backend.read_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].deleted);
        assert!(!Record::from_json(&rows[0].payload).unwrap().deleted);
    }

    #[tokio::test]
    async fn read_all_keeps_insertion_order() {
        let backend = InMemoryRelational::new();
        for (seq, url) in [(1, "http://c.test"), (2, "http://a.test"), (3, "http://b.test")] {
            backend.insert_or_fetch(&record(seq, url)).await.unwrap();
        }

        let sequences: Vec<u64> = backend
            .read_all()
            .await
            .unwrap()
            .iter()
            .map(|row| Record::from_json(&row.payload).unwrap().sequence)
            .collect();
        assert_eq!(sequences, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn offline_backend_fails_every_call() {
        let backend = InMemoryRelational::new();
        backend.set_offline(true);

        assert!(matches!(
            backend.ping().await,
            Err(StorageError::Unavailable(_))
        ));
        assert!(backend
            .insert_or_fetch(&record(1, "http://a.test"))
            .await
            .is_err());
        assert!(backend.read_all().await.is_err());

        backend.set_offline(false);
        assert!(backend.ping().await.is_ok());
        assert!(backend.is_empty());
    }
}
