//! Provider registries
//!
//! Topics and sessions backends are selected by name. The registry object is
//! filled once while the process starts and then handed by reference to
//! whatever builds a `TopicsManager` or `SessionsManager`.
//!
//! Registering the same name twice is a wiring bug and panics.

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use tracing::debug;

use crate::protocol::QosPolicy;
use crate::sessions::{MemSessions, SessionsProvider};
use crate::topics::{MemTopics, TopicsProvider};

/// Name of the built-in in-memory providers
pub const MEM: &str = "mem";

/// Name of the fjall-backed providers
pub const FJALL: &str = "fjall";

/// Provider lookup error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// No provider registered under this name
    Unknown { kind: &'static str, name: String },
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Unknown { kind, name } => {
                write!(f, "{}: unknown provider {:?}", kind, name)
            }
        }
    }
}

impl std::error::Error for ProviderError {}

/// Name to provider map for one kind of provider
pub struct Registry<P: ?Sized> {
    kind: &'static str,
    providers: AHashMap<String, Arc<P>>,
}

impl<P: ?Sized> Registry<P> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            providers: AHashMap::new(),
        }
    }

    /// Make `provider` available under `name`.
    ///
    /// # Panics
    ///
    /// If `name` is already registered.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<P>) {
        let name = name.into();
        if self.providers.contains_key(&name) {
            panic!("{}: register called twice for provider {}", self.kind, name);
        }
        debug!("{}: registered provider {}", self.kind, name);
        self.providers.insert(name, provider);
    }

    pub fn unregister(&mut self, name: &str) -> Option<Arc<P>> {
        self.providers.remove(name)
    }

    /// Look up the provider registered under `name`
    pub fn get(&self, name: &str) -> Result<Arc<P>, ProviderError> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| ProviderError::Unknown {
                kind: self.kind,
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// The topics and sessions registries a process wires its broker from
pub struct Providers {
    pub topics: Registry<dyn TopicsProvider>,
    pub sessions: Registry<dyn SessionsProvider>,
}

impl Providers {
    /// Empty registries
    pub fn new() -> Self {
        Self {
            topics: Registry::new("topics"),
            sessions: Registry::new("sessions"),
        }
    }

    /// Registries holding the in-memory providers under `"mem"`
    pub fn with_builtin(policy: QosPolicy) -> Self {
        let mut providers = Self::new();
        providers
            .topics
            .register(MEM, Arc::new(MemTopics::with_policy(policy)));
        providers
            .sessions
            .register(MEM, Arc::new(MemSessions::new()));
        providers
    }
}

impl Default for Providers {
    fn default() -> Self {
        Self::with_builtin(QosPolicy::default())
    }
}
