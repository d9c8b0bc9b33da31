//! Background deletion.
//!
//! Deletes are queued on a bounded channel and applied by a fixed pool of
//! workers. Callers wait for queue admission only; each accepted request
//! hands back a [`DeleteTicket`] that resolves once a worker has applied it.

use crate::store::Shared;
use shorturl_core::{ShortCode, StoreError};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// What a worker did with a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The record was flagged as deleted.
    Deleted,
    /// The record was already deleted; nothing changed.
    AlreadyDeleted,
    /// No record exists for the owner and code.
    NotFound,
    /// The record belongs to a different owner token.
    TokenMismatch,
}

/// Completion handle for one queued delete.
///
/// Dropping the ticket does not cancel the delete.
#[derive(Debug)]
pub struct DeleteTicket {
    key: ShortCode,
    reply: oneshot::Receiver<DeleteOutcome>,
}

impl DeleteTicket {
    /// The short code this ticket tracks.
    pub fn key(&self) -> &ShortCode {
        &self.key
    }

    /// Waits until a worker has applied the delete.
    ///
    /// Returns `None` if the worker pool went away before reaching it.
    pub async fn wait(self) -> Option<DeleteOutcome> {
        self.reply.await.ok()
    }
}

struct DeleteJob {
    owner: String,
    token: String,
    key: ShortCode,
    reply: oneshot::Sender<DeleteOutcome>,
}

pub(crate) struct DeletePool {
    sender: mpsc::Sender<DeleteJob>,
    workers: Vec<JoinHandle<()>>,
}

impl DeletePool {
    /// Spawns `workers` tasks draining a queue of `capacity` jobs.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(shared: Arc<Shared>, workers: usize, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..workers.max(1))
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    Arc::clone(&shared),
                    Arc::clone(&receiver),
                ))
            })
            .collect::<Vec<_>>();
        debug!(workers = workers.len(), capacity, "started delete workers");

        Self { sender, workers }
    }

    pub async fn enqueue(
        &self,
        owner: &str,
        token: &str,
        key: ShortCode,
    ) -> Result<DeleteTicket, StoreError> {
        let (reply, receiver) = oneshot::channel();
        let job = DeleteJob {
            owner: owner.to_string(),
            token: token.to_string(),
            key: key.clone(),
            reply,
        };

        self.sender
            .send(job)
            .await
            .map_err(|_| StoreError::QueueClosed)?;
        trace!(owner, code = %key, "queued delete");

        Ok(DeleteTicket {
            key,
            reply: receiver,
        })
    }

    /// Closes the queue and waits for the workers to drain it.
    pub async fn shutdown(self) {
        let Self { sender, workers } = self;
        drop(sender);
        for worker in workers {
            let _ = worker.await;
        }
    }
}

async fn run_worker(
    id: usize,
    shared: Arc<Shared>,
    jobs: Arc<Mutex<mpsc::Receiver<DeleteJob>>>,
) {
    loop {
        let job = {
            let mut jobs = jobs.lock().await;
            jobs.recv().await
        };
        let Some(job) = job else {
            break;
        };

        let outcome = shared.apply_delete(&job.owner, &job.token, &job.key).await;
        // The caller may have dropped its ticket.
        let _ = job.reply.send(outcome);
    }

    debug!(worker = id, "delete worker stopped");
}
