//! Fjall-backed sessions provider
//!
//! Live sessions are held exactly like [`MemSessions`]. `save` queues a
//! snapshot for the persistence writer and `del` queues its removal, so
//! neither ever waits on disk.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use super::{MemSessions, SessionsProvider};
use crate::persistence::{PersistenceManager, PersistenceOp, StoredSession};
use crate::session::{Session, SessionError, SessionSnapshot};

/// Sessions provider that persists session snapshots
pub struct PersistentSessions {
    inner: MemSessions,
    store: Arc<PersistenceManager>,
    /// Held across `save`/`del` and their queued write so a stale snapshot
    /// can never be queued after the delete that superseded it
    journal: Mutex<()>,
}

impl PersistentSessions {
    /// Build the provider, restoring `sessions` as loaded from storage
    pub fn new(store: Arc<PersistenceManager>, sessions: Vec<(String, StoredSession)>) -> Self {
        let inner = MemSessions::new();

        let restored = sessions.len();
        for (_, stored) in sessions {
            inner.insert(Arc::new(Session::restore(SessionSnapshot::from(stored))));
        }
        if restored > 0 {
            info!("Restored {} sessions", restored);
        }

        Self {
            inner,
            store,
            journal: Mutex::new(()),
        }
    }
}

impl SessionsProvider for PersistentSessions {
    fn new_session(&self, id: &str) -> Result<Arc<Session>, SessionError> {
        self.inner.new_session(id)
    }

    fn get(&self, id: &str) -> Result<Arc<Session>, SessionError> {
        self.inner.get(id)
    }

    fn del(&self, id: &str) {
        let _journal = self.journal.lock();
        self.inner.del(id);
        self.store.write(PersistenceOp::DeleteSession {
            client_id: id.to_string(),
        });
    }

    fn save(&self, id: &str) -> Result<(), SessionError> {
        let _journal = self.journal.lock();
        let session = self.inner.get(id)?;
        let snapshot = session.snapshot()?;

        self.store.write(PersistenceOp::SetSession {
            client_id: id.to_string(),
            session: StoredSession::from(&snapshot),
        });
        debug!("Queued session {} for persistence", id);
        Ok(())
    }

    fn count(&self) -> usize {
        self.inner.count()
    }

    fn close(&self) -> Result<(), SessionError> {
        self.inner.close()
    }
}
