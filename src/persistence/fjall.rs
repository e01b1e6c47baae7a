//! fjall storage backend
//!
//! Two partitions in one keyspace: `retained` keyed by topic and `sessions`
//! keyed by client identifier. Values are bincode-encoded models.

use std::path::Path;

use async_trait::async_trait;
use bincode::config::standard;
use fjall::{Batch, Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};

use super::backend::{PersistenceOp, StorageBackend};
use super::error::{PersistenceError, Result};
use super::models::{StoredRetainedMessage, StoredSession};

const RETAINED: &str = "retained";
const SESSIONS: &str = "sessions";

pub struct FjallBackend {
    keyspace: Keyspace,
    retained: PartitionHandle,
    sessions: PartitionHandle,
}

impl FjallBackend {
    /// Open (or create) the keyspace at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let keyspace = Config::new(path).open()?;
        let retained = keyspace.open_partition(RETAINED, PartitionCreateOptions::default())?;
        let sessions = keyspace.open_partition(SESSIONS, PartitionCreateOptions::default())?;

        Ok(Self {
            keyspace,
            retained,
            sessions,
        })
    }

    fn stage(&self, batch: &mut Batch, op: PersistenceOp) -> Result<()> {
        match op {
            PersistenceOp::SetRetained { topic, message } => {
                batch.insert(&self.retained, topic, bincode::encode_to_vec(&message, standard())?);
            }
            PersistenceOp::DeleteRetained { topic } => batch.remove(&self.retained, topic),
            PersistenceOp::SetSession { client_id, session } => {
                batch.insert(
                    &self.sessions,
                    client_id,
                    bincode::encode_to_vec(&session, standard())?,
                );
            }
            PersistenceOp::DeleteSession { client_id } => batch.remove(&self.sessions, client_id),
        }
        Ok(())
    }

    /// Decode every entry of one partition
    fn scan<T: bincode::Decode<()>>(
        partition: &PartitionHandle,
        name: &'static str,
    ) -> Result<Vec<(String, T)>> {
        partition
            .iter()
            .map(|item| {
                let (key, value) = item?;
                let key = String::from_utf8_lossy(&key).into_owned();
                match bincode::decode_from_slice(&value, standard()) {
                    Ok((decoded, _)) => Ok((key, decoded)),
                    Err(source) => Err(PersistenceError::Decode {
                        partition: name,
                        key,
                        source,
                    }),
                }
            })
            .collect()
    }
}

#[async_trait]
impl StorageBackend for FjallBackend {
    async fn batch_write(&self, ops: Vec<PersistenceOp>) -> Result<()> {
        let mut batch = self.keyspace.batch();
        for op in ops {
            self.stage(&mut batch, op)?;
        }
        batch.commit()?;
        Ok(())
    }

    async fn list_retained(&self) -> Result<Vec<(String, StoredRetainedMessage)>> {
        Self::scan(&self.retained, RETAINED)
    }

    async fn list_sessions(&self) -> Result<Vec<(String, StoredSession)>> {
        Self::scan(&self.sessions, SESSIONS)
    }

    async fn flush(&self) -> Result<()> {
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        // Partitions are released on drop
        self.flush().await
    }
}
