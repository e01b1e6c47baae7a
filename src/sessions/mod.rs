//! Sessions providers
//!
//! A sessions provider owns the table of live sessions keyed by client
//! identifier. The connection layer reaches it through a [`SessionsManager`]
//! built from the provider registered under the configured name.

mod mem;
mod persistent;

pub use mem::MemSessions;
pub use persistent::PersistentSessions;

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::warn;

use crate::registry::{ProviderError, Providers};
use crate::session::{Session, SessionError};

/// Random bytes in a generated client identifier
const CLIENT_ID_BYTES: usize = 15;

/// Sessions provider contract
pub trait SessionsProvider: Send + Sync {
    /// Allocate an uninitialized session for `id`, replacing any live one
    fn new_session(&self, id: &str) -> Result<Arc<Session>, SessionError>;

    fn get(&self, id: &str) -> Result<Arc<Session>, SessionError>;

    /// Drop the session for `id`; absent ids are ignored
    fn del(&self, id: &str);

    /// Hand the current state of `id` to durable storage, if the provider has any
    fn save(&self, id: &str) -> Result<(), SessionError>;

    /// Number of live sessions
    fn count(&self) -> usize;

    fn close(&self) -> Result<(), SessionError>;
}

/// Facade over the provider selected by name
#[derive(Clone)]
pub struct SessionsManager {
    name: String,
    provider: Arc<dyn SessionsProvider>,
}

impl SessionsManager {
    pub fn new(providers: &Providers, name: &str) -> Result<Self, ProviderError> {
        let provider = providers.sessions.get(name)?;
        Ok(Self {
            name: name.to_string(),
            provider,
        })
    }

    pub fn provider_name(&self) -> &str {
        &self.name
    }

    /// Create a session, generating a client identifier when `id` is empty
    pub fn new_session(&self, id: &str) -> Result<Arc<Session>, SessionError> {
        if id.is_empty() {
            let generated = generate_client_id();
            return self.provider.new_session(&generated);
        }
        self.provider.new_session(id)
    }

    pub fn get(&self, id: &str) -> Result<Arc<Session>, SessionError> {
        self.provider.get(id)
    }

    pub fn del(&self, id: &str) {
        self.provider.del(id)
    }

    pub fn save(&self, id: &str) -> Result<(), SessionError> {
        self.provider.save(id)
    }

    pub fn count(&self) -> usize {
        self.provider.count()
    }

    pub fn close(&self) -> Result<(), SessionError> {
        self.provider.close()
    }
}

/// 15 OS-random bytes, URL-safe base64 encoded.
///
/// Returns an empty string if the OS RNG is unavailable.
pub fn generate_client_id() -> String {
    let mut bytes = [0u8; CLIENT_ID_BYTES];
    if let Err(e) = OsRng.try_fill_bytes(&mut bytes) {
        warn!("Failed to generate client identifier: {}", e);
        return String::new();
    }
    URL_SAFE.encode(bytes)
}
