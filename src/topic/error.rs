//! Topic and trie error types.

use std::fmt;

/// Errors returned by the topic parser and the topic tries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicError {
    /// `#` shares its level with other characters
    MultiWildcardNotAlone,
    /// `#` is followed by another level
    MultiWildcardNotLast,
    /// `+` shares its level with other characters
    SingleWildcardNotAlone,
    /// QoS outside 0, 1 and 2
    InvalidQos(u8),
    /// A level of the topic has no node in the trie
    NoTopic,
    /// The topic exists but the subscriber is not registered on it
    NoSubscriber,
}

impl TopicError {
    /// True for malformed wildcard placement
    pub fn is_placement(&self) -> bool {
        matches!(
            self,
            Self::MultiWildcardNotAlone | Self::MultiWildcardNotLast | Self::SingleWildcardNotAlone
        )
    }
}

impl fmt::Display for TopicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultiWildcardNotAlone => write!(f, "multi-level wildcard must occupy entire level"),
            Self::MultiWildcardNotLast => write!(f, "multi-level wildcard must be at the last level"),
            Self::SingleWildcardNotAlone => {
                write!(f, "single-level wildcard must occupy entire level")
            }
            Self::InvalidQos(qos) => write!(f, "invalid QoS {}", qos),
            Self::NoTopic => write!(f, "no topic found"),
            Self::NoSubscriber => write!(f, "no topic found for subscriber"),
        }
    }
}

impl std::error::Error for TopicError {}
