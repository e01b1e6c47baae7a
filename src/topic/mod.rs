//! Topic matching
//!
//! Implements the level parser and the two tries the broker keeps:
//! - `SubscriptionTrie` maps subscription filters to subscribers and is
//!   queried with literal publish topics
//! - `RetainedTrie` maps literal topics to their retained message and is
//!   queried with (possibly wildcarded) subscription filters

mod error;
mod level;
mod retained;
mod trie;

pub use error::TopicError;
pub use level::{
    next_level, validate, LEADING_EMPTY_LEVEL, MULTI_WILDCARD, SEPARATOR, SINGLE_WILDCARD,
};
pub use retained::RetainedTrie;
pub use trie::SubscriptionTrie;

use std::fmt;
use std::sync::Arc;

/// Identity of a subscriber stored in the subscription trie
///
/// Handles compare by value, so the connection layer must hand in the same
/// identifier for the same subscriber every time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubscriberId {
    /// Keyed by client identifier
    Client(Arc<str>),
    /// Keyed by a connection counter owned by the connection layer
    Connection(u64),
}

impl From<&str> for SubscriberId {
    fn from(client_id: &str) -> Self {
        SubscriberId::Client(client_id.into())
    }
}

impl From<Arc<str>> for SubscriberId {
    fn from(client_id: Arc<str>) -> Self {
        SubscriberId::Client(client_id)
    }
}

impl From<u64> for SubscriberId {
    fn from(conn: u64) -> Self {
        SubscriberId::Connection(conn)
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriberId::Client(id) => write!(f, "client:{}", id),
            SubscriberId::Connection(n) => write!(f, "conn:{}", n),
        }
    }
}
