//! Persistence module.
//!
//! Provides durable storage for:
//! - Retained messages
//! - Sessions (connect parameters, subscriptions, retained pointer)
//!
//! Uses a trait-based design allowing different backends:
//! - `FjallBackend` (default) - Local LSM-tree storage
//!
//! The persistent providers never wait on storage: they hand operations to
//! the `PersistenceManager`, whose background task batches and commits them.

mod backend;
mod error;
mod fjall;
mod models;

pub use backend::{PersistenceOp, StorageBackend};
pub use error::{PersistenceError, Result};
pub use fjall::FjallBackend;
pub use models::{
    LoadedData, StoredConnect, StoredPublish, StoredRetainedMessage, StoredSession,
    StoredSubscription,
};

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Shortest flush period the writer will tick at
const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(1);

/// Queued operations the writer may lag behind by before writes are dropped
const CHANNEL_CAPACITY: usize = 10_000;

/// Persistence manager that handles background writes
pub struct PersistenceManager {
    backend: Arc<dyn StorageBackend>,
    tx: mpsc::Sender<PersistenceOp>,
    shutdown_tx: mpsc::Sender<()>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl PersistenceManager {
    /// Create a new persistence manager with the given backend
    ///
    /// This spawns a background task that batches and commits writes, so it
    /// must be called from within a tokio runtime. A zero `flush_interval`
    /// or `max_batch_size` is raised to the smallest usable value.
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        flush_interval: Duration,
        max_batch_size: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let writer = tokio::spawn(Self::writer_loop(
            backend.clone(),
            rx,
            shutdown_rx,
            flush_interval.max(MIN_FLUSH_INTERVAL),
            max_batch_size.max(1),
        ));

        Self {
            backend,
            tx,
            shutdown_tx,
            writer: Mutex::new(Some(writer)),
        }
    }

    /// Fire-and-forget write operation (non-blocking for hot path)
    ///
    /// If the channel is full, the operation is dropped (backpressure).
    pub fn write(&self, op: PersistenceOp) {
        match self.tx.try_send(op) {
            Ok(()) => {}
            Err(TrySendError::Full(op)) => {
                warn!("Persistence channel full, dropping write for {}", op.key());
            }
            Err(TrySendError::Closed(op)) => {
                warn!("Persistence writer stopped, dropping write for {}", op.key());
            }
        }
    }

    /// Load all data at startup
    pub async fn load_all(&self) -> Result<LoadedData> {
        self.backend.load_all().await
    }

    /// Gracefully shutdown the persistence manager
    ///
    /// This flushes all pending writes and closes the backend. Fails if the
    /// writer task died before it could drain the queue.
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down persistence manager");

        let _ = self.shutdown_tx.send(()).await;

        let writer = self.writer.lock().take();
        let stopped = match writer {
            Some(writer) => writer.await.err(),
            None => None,
        };

        self.backend.flush().await?;
        self.backend.close().await?;

        if let Some(e) = stopped {
            error!("Persistence writer task failed: {}", e);
            return Err(PersistenceError::WriterStopped(e.to_string()));
        }

        info!("Persistence manager shutdown complete");
        Ok(())
    }

    async fn commit(backend: &dyn StorageBackend, batch: &mut Vec<PersistenceOp>, why: &str) {
        if batch.is_empty() {
            return;
        }
        let count = batch.len();
        match backend.batch_write(std::mem::take(batch)).await {
            Ok(()) => debug!("Flushed {} operations ({})", count, why),
            Err(e) => error!("Failed to write batch of {} ({}): {}", count, why, e),
        }
    }

    /// Background writer loop that batches and commits writes
    async fn writer_loop(
        backend: Arc<dyn StorageBackend>,
        mut rx: mpsc::Receiver<PersistenceOp>,
        mut shutdown_rx: mpsc::Receiver<()>,
        flush_interval: Duration,
        max_batch_size: usize,
    ) {
        let mut batch = Vec::with_capacity(max_batch_size);
        let mut interval = tokio::time::interval(flush_interval);

        loop {
            tokio::select! {
                op = rx.recv() => {
                    match op {
                        Some(op) => {
                            batch.push(op);
                            if batch.len() >= max_batch_size {
                                Self::commit(backend.as_ref(), &mut batch, "max batch").await;
                            }
                        }
                        None => {
                            // Channel closed, flush remaining and exit
                            Self::commit(backend.as_ref(), &mut batch, "channel closed").await;
                            break;
                        }
                    }
                }

                _ = interval.tick() => {
                    Self::commit(backend.as_ref(), &mut batch, "interval").await;
                }

                _ = shutdown_rx.recv() => {
                    info!("Persistence writer received shutdown signal");
                    // Drain whatever was queued before the signal
                    while let Ok(op) = rx.try_recv() {
                        batch.push(op);
                    }
                    Self::commit(backend.as_ref(), &mut batch, "shutdown").await;
                    break;
                }
            }
        }

        info!("Persistence writer loop exited");
    }
}
