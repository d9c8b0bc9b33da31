use crate::deleter::{DeleteOutcome, DeletePool, DeleteTicket};
use crate::index::Index;
use serde::Serialize;
use shorturl_core::backend::{DurableLog, Insertion, RelationalBackend};
use shorturl_core::{
    BatchDeleteStatus, BatchItem, BatchResult, IdAllocator, PutStatus, Record, Resolution,
    ShortCode, StoreError, UserUrl,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, trace, warn};
use typed_builder::TypedBuilder;

pub const DEFAULT_DELETE_WORKERS: usize = 4;
pub const DEFAULT_DELETE_QUEUE_CAPACITY: usize = 1024;

/// Tuning knobs for a [`UrlStore`].
#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct StoreSettings {
    /// Number of tasks applying queued deletes.
    #[builder(default = DEFAULT_DELETE_WORKERS)]
    pub delete_workers: usize,
    /// Deletes that may wait in the queue before callers are held back.
    #[builder(default = DEFAULT_DELETE_QUEUE_CAPACITY)]
    pub delete_queue_capacity: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// The durable backends a store replays from and writes through to.
///
/// Both are optional; with neither the store is memory-only.
#[derive(Clone, Default, TypedBuilder)]
pub struct Backends {
    #[builder(default, setter(strip_option))]
    pub log: Option<Arc<dyn DurableLog>>,
    #[builder(default, setter(strip_option))]
    pub relational: Option<Arc<dyn RelationalBackend>>,
}

/// Counters for the internal stats endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Records in the index, deleted ones included.
    pub urls: usize,
    /// Distinct owner tokens across all records.
    pub users: usize,
}

/// State shared between the store handle and the delete workers.
pub(crate) struct Shared {
    index: RwLock<Index>,
    allocator: IdAllocator,
    log: Option<Arc<dyn DurableLog>>,
    relational: Option<Arc<dyn RelationalBackend>>,
}

/// Concurrency-safe URL store with soft deletes and durable replay.
///
/// All mutations go through one writer lock and are written through to the
/// configured backends while it is held, so the record log is a valid
/// linearization of every change. Backend failures are logged and the
/// in-memory change stands.
pub struct UrlStore {
    shared: Arc<Shared>,
    deletes: DeletePool,
}

impl UrlStore {
    /// Rebuilds the index from `backends` and starts the delete workers.
    ///
    /// The relational backend is replayed first, then the record log is laid
    /// over it. A backend that cannot be read contributes no records; it
    /// never prevents the store from starting.
    pub async fn open(backends: Backends, settings: StoreSettings) -> Self {
        let Backends { log, relational } = backends;
        let mut index = Index::default();

        if let Some(db) = &relational {
            replay_relational(db.as_ref(), &mut index).await;
        }
        if let Some(log) = &log {
            replay_log(log.as_ref(), &mut index).await;
        }

        let allocator = IdAllocator::new();
        allocator.advance_to(index.max_sequence());
        info!(
            records = index.len(),
            high_water = allocator.high_water(),
            "url store ready"
        );

        let shared = Arc::new(Shared {
            index: RwLock::new(index),
            allocator,
            log,
            relational,
        });
        let deletes = DeletePool::spawn(
            Arc::clone(&shared),
            settings.delete_workers,
            settings.delete_queue_capacity,
        );

        Self { shared, deletes }
    }

    /// A store with no durable backends.
    pub async fn in_memory() -> Self {
        Self::open(Backends::default(), StoreSettings::default()).await
    }

    /// Shortens `url` within `owner`'s namespace.
    ///
    /// Returns [`PutStatus::AlreadyExists`] with the existing code when the
    /// relational backend already holds the URL, and
    /// [`StoreError::SequencesExhausted`] once `u64::MAX` has been issued.
    pub async fn put_for_owner(
        &self,
        owner: &str,
        token: &str,
        url: &str,
    ) -> Result<(PutStatus, ShortCode), StoreError> {
        validate_url(url)?;
        self.shared.put(owner, token, url).await
    }

    /// Resolves `key` within `owner`'s namespace. Never touches a backend.
    pub async fn get_for_owner(&self, owner: &str, key: &str) -> Resolution {
        let index = self.shared.index.read().await;
        match index.get(owner, key) {
            Some(entry) if entry.deleted => Resolution::Deleted(entry.value.clone()),
            Some(entry) => Resolution::Active(entry.value.clone()),
            None => Resolution::NotFound,
        }
    }

    /// Queues a soft delete of `key` and returns once it is accepted.
    ///
    /// The flag flip and its persistence happen on a worker. Only records
    /// whose owner token equals `token` are deleted.
    pub async fn delete_for_owner(
        &self,
        owner: &str,
        token: &str,
        key: &str,
    ) -> Result<DeleteTicket, StoreError> {
        let key = ShortCode::new(key)?;
        self.deletes.enqueue(owner, token, key).await
    }

    /// Lists the URLs `token` shortened within `owner`'s namespace.
    pub async fn list_for_owner(&self, owner: &str, token: &str, base_url: &str) -> Vec<UserUrl> {
        self.shared.index.read().await.list(owner, token, base_url)
    }

    /// Shortens every item of a batch.
    ///
    /// The whole batch is rejected before any write if one URL is empty. The
    /// aggregate status is a conflict if any item already existed.
    pub async fn put_batch_for_owner(
        &self,
        owner: &str,
        token: &str,
        base_url: &str,
        items: Vec<BatchItem>,
    ) -> Result<(PutStatus, Vec<BatchResult>), StoreError> {
        for item in &items {
            validate_url(&item.original_url)?;
        }

        let mut status = PutStatus::Created;
        let mut results = Vec::with_capacity(items.len());
        for item in items {
            let (item_status, key) = self.shared.put(owner, token, &item.original_url).await?;
            status = status.merge(item_status);
            results.push(BatchResult {
                correlation_id: item.correlation_id,
                short_url: key.to_url(base_url),
            });
        }

        Ok((status, results))
    }

    /// Queues a soft delete for every key of a batch.
    ///
    /// Any empty key rejects the batch before anything is queued.
    pub async fn delete_batch_for_owner(
        &self,
        owner: &str,
        token: &str,
        keys: &[String],
    ) -> Result<(BatchDeleteStatus, Vec<DeleteTicket>), StoreError> {
        let keys = keys
            .iter()
            .map(|key| ShortCode::new(key.as_str()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut status = BatchDeleteStatus::Accepted;
        let mut tickets = Vec::with_capacity(keys.len());
        for key in keys {
            match self.deletes.enqueue(owner, token, key).await {
                Ok(ticket) => tickets.push(ticket),
                Err(error) => {
                    warn!(owner, error = %error, "could not queue delete");
                    status = BatchDeleteStatus::Failed;
                }
            }
        }

        Ok((status, tickets))
    }

    pub async fn stats(&self) -> StoreStats {
        let index = self.shared.index.read().await;
        StoreStats {
            urls: index.len(),
            users: index.distinct_tokens(),
        }
    }

    /// Checks the relational backend, if one is configured.
    pub async fn ping(&self) -> Result<(), StoreError> {
        match &self.shared.relational {
            Some(db) => Ok(db.ping().await?),
            None => Ok(()),
        }
    }

    /// Stops accepting deletes and waits for queued ones to be applied.
    ///
    /// Dropping the store instead lets the workers drain in the background.
    pub async fn shutdown(self) {
        self.deletes.shutdown().await;
        debug!("url store shut down");
    }
}

impl Shared {
    async fn put(
        &self,
        owner: &str,
        token: &str,
        url: &str,
    ) -> Result<(PutStatus, ShortCode), StoreError> {
        let mut index = self.index.write().await;

        let Some(sequence) = self.allocator.next() else {
            warn!(owner, "no sequence numbers left; refusing to shorten");
            return Err(StoreError::SequencesExhausted);
        };
        let candidate = Record {
            owner: owner.to_string(),
            key: ShortCode::from_sequence(sequence),
            sequence,
            value: url.to_string(),
            owner_token: token.to_string(),
            deleted: false,
        };

        let created = Insertion {
            status: PutStatus::Created,
            key: candidate.key.clone(),
        };
        let insertion = match &self.relational {
            Some(db) => match db.insert_or_fetch(&candidate).await {
                Ok(insertion) => insertion,
                Err(error) => {
                    warn!(
                        owner,
                        code = %candidate.key,
                        error = %error,
                        "relational insert failed; keeping record in memory"
                    );
                    created
                }
            },
            None => created,
        };

        match insertion.status {
            PutStatus::Created => {
                index.insert(&candidate);
                self.append(&candidate).await;
                debug!(owner, code = %candidate.key, sequence, "shortened url");
            }
            PutStatus::AlreadyExists => {
                if !index.contains(owner, insertion.key.as_str()) {
                    index.insert(&Record {
                        key: insertion.key.clone(),
                        ..candidate
                    });
                }
                debug!(owner, code = %insertion.key, "url already shortened");
            }
        }

        Ok((insertion.status, insertion.key))
    }

    pub(crate) async fn apply_delete(
        &self,
        owner: &str,
        token: &str,
        key: &ShortCode,
    ) -> DeleteOutcome {
        let mut index = self.index.write().await;

        let Some(entry) = index.get_mut(owner, key.as_str()) else {
            debug!(owner, code = %key, "delete for unknown code ignored");
            return DeleteOutcome::NotFound;
        };
        if entry.owner_token != token {
            debug!(owner, code = %key, "delete from foreign token ignored");
            return DeleteOutcome::TokenMismatch;
        }
        if entry.deleted {
            trace!(owner, code = %key, "code already deleted");
            return DeleteOutcome::AlreadyDeleted;
        }

        entry.deleted = true;
        let record = entry.to_record(owner, key);

        if let Some(db) = &self.relational {
            match db.mark_deleted(key).await {
                Ok(true) => {}
                Ok(false) => debug!(code = %key, "relational backend has no row for deleted code"),
                Err(error) => warn!(
                    owner,
                    code = %key,
                    error = %error,
                    "relational delete failed; delete applied in memory"
                ),
            }
        }
        self.append(&record).await;

        debug!(owner, code = %key, "deleted url");
        DeleteOutcome::Deleted
    }

    async fn append(&self, record: &Record) {
        let Some(log) = &self.log else {
            return;
        };
        if let Err(error) = log.append(record).await {
            warn!(
                owner = %record.owner,
                code = %record.key,
                error = %error,
                "record log append failed"
            );
        }
    }
}

fn validate_url(url: &str) -> Result<(), StoreError> {
    if url.is_empty() {
        return Err(StoreError::InvalidUrl("url must not be empty".to_string()));
    }
    Ok(())
}

async fn replay_relational(db: &dyn RelationalBackend, index: &mut Index) {
    if let Err(error) = db.ensure_schema().await {
        warn!(error = %error, "could not ensure relational schema");
    }

    let rows = match db.read_all().await {
        Ok(rows) => rows,
        Err(error) => {
            warn!(error = %error, "relational replay failed; continuing without its records");
            return;
        }
    };

    let mut replayed = 0usize;
    for row in rows {
        match Record::from_json(&row.payload) {
            Ok(mut record) => {
                record.deleted = row.deleted;
                index.merge(&record);
                replayed += 1;
            }
            Err(error) => warn!(error = %error, "skipping undecodable relational row"),
        }
    }
    info!(records = replayed, "replayed relational backend");
}

async fn replay_log(log: &dyn DurableLog, index: &mut Index) {
    match log.replay_all().await {
        Ok(records) => {
            for record in &records {
                index.merge(record);
            }
            info!(records = records.len(), "replayed record log");
        }
        Err(error) => {
            warn!(error = %error, "record log replay failed; continuing without its records")
        }
    }
}
