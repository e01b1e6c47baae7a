//! Storage backend seam
//!
//! The providers never touch storage directly. Everything they change is
//! expressed as a `PersistenceOp`, queued on the manager and committed in
//! batches; storage is read back in full only once, at startup.

use async_trait::async_trait;

use super::error::Result;
use super::models::{LoadedData, StoredRetainedMessage, StoredSession};

/// One queued change to durable state
#[derive(Debug, Clone)]
pub enum PersistenceOp {
    /// Retained message stored or replaced at `topic`
    SetRetained {
        topic: String,
        message: StoredRetainedMessage,
    },
    /// Retained message cleared by an empty-payload retain
    DeleteRetained { topic: String },
    /// Session snapshot written by `save`
    SetSession {
        client_id: String,
        session: StoredSession,
    },
    /// Session dropped by `del`
    DeleteSession { client_id: String },
}

impl PersistenceOp {
    /// Topic or client identifier the op applies to
    pub fn key(&self) -> &str {
        match self {
            PersistenceOp::SetRetained { topic, .. } | PersistenceOp::DeleteRetained { topic } => {
                topic
            }
            PersistenceOp::SetSession { client_id, .. }
            | PersistenceOp::DeleteSession { client_id } => client_id,
        }
    }
}

/// Durable store behind the persistent providers
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Apply `ops` in order as one atomic commit
    async fn batch_write(&self, ops: Vec<PersistenceOp>) -> Result<()>;

    /// Every stored retained message, keyed by topic
    async fn list_retained(&self) -> Result<Vec<(String, StoredRetainedMessage)>>;

    /// Every stored session, keyed by client identifier
    async fn list_sessions(&self) -> Result<Vec<(String, StoredSession)>>;

    /// Make committed batches durable
    async fn flush(&self) -> Result<()>;

    /// Flush and release the store
    async fn close(&self) -> Result<()>;

    /// Startup read of everything the providers are seeded from
    async fn load_all(&self) -> Result<LoadedData> {
        Ok(LoadedData {
            retained: self.list_retained().await?,
            sessions: self.list_sessions().await?,
        })
    }
}
