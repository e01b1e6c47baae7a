//! In-memory sessions provider

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use super::SessionsProvider;
use crate::session::{Session, SessionError};

/// Sessions table keyed by client identifier; lost on restart
#[derive(Default)]
pub struct MemSessions {
    sessions: DashMap<String, Arc<Session>>,
}

impl MemSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put an already-built session into the table, replacing any live one
    pub fn insert(&self, session: Arc<Session>) {
        self.sessions.insert(session.id().to_string(), session);
    }
}

impl SessionsProvider for MemSessions {
    fn new_session(&self, id: &str) -> Result<Arc<Session>, SessionError> {
        let session = Arc::new(Session::new(id));
        if self
            .sessions
            .insert(id.to_string(), session.clone())
            .is_some()
        {
            debug!("Replaced live session for {}", id);
        }
        Ok(session)
    }

    fn get(&self, id: &str) -> Result<Arc<Session>, SessionError> {
        self.sessions
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    fn del(&self, id: &str) {
        self.sessions.remove(id);
    }

    fn save(&self, _id: &str) -> Result<(), SessionError> {
        Ok(())
    }

    fn count(&self) -> usize {
        self.sessions.len()
    }

    fn close(&self) -> Result<(), SessionError> {
        self.sessions.clear();
        Ok(())
    }
}
