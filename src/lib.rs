//! mqcore - the matching core of an MQTT broker
//!
//! Topic parsing, the subscription and retained-message tries, per-client
//! session state and the named provider registries a broker selects its
//! topics and sessions backends from. Connection handling and packet
//! encoding live in the layer that drives this crate.

pub mod config;
pub mod persistence;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod sessions;
pub mod topic;
pub mod topics;

pub use config::Config;
pub use persistence::{FjallBackend, PersistenceManager, StorageBackend};
pub use protocol::{ConnectParams, Publish, QoS, QosPolicy};
pub use registry::{ProviderError, Providers, Registry};
pub use session::{Session, SessionError};
pub use sessions::{SessionsManager, SessionsProvider};
pub use topic::{RetainedTrie, SubscriberId, SubscriptionTrie, TopicError};
pub use topics::{TopicsManager, TopicsProvider};
