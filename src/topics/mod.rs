//! Topics providers
//!
//! A topics provider owns one subscription trie and one retained trie and
//! exposes the operations the connection layer drives on SUBSCRIBE,
//! UNSUBSCRIBE and PUBLISH. Providers are selected by name through
//! [`Providers`](crate::registry::Providers) and used through a
//! [`TopicsManager`].

mod mem;
mod persistent;

pub use mem::MemTopics;
pub use persistent::PersistentTopics;

use std::sync::Arc;

use crate::protocol::{Publish, QoS};
use crate::registry::{ProviderError, Providers};
use crate::topic::{SubscriberId, TopicError};

/// Read-only counters for observability
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopicsStats {
    /// (filter, subscriber) entries
    pub subscriptions: usize,
    /// Retained messages
    pub retained: usize,
}

/// Topics provider contract
pub trait TopicsProvider: Send + Sync {
    /// Subscribe `sub` to `filter` at `qos`, returning the granted QoS
    fn subscribe(&self, filter: &str, qos: u8, sub: SubscriberId) -> Result<QoS, TopicError>;

    /// Remove `sub` from `filter`; `None` removes every subscriber of that filter
    fn unsubscribe(&self, filter: &str, sub: Option<&SubscriberId>) -> Result<(), TopicError>;

    /// Fill `subs`/`qoss` with the subscribers of a publish to `topic` at `qos`.
    ///
    /// Both buffers are cleared first and hold only this match afterwards.
    fn subscribers(
        &self,
        topic: &str,
        qos: u8,
        subs: &mut Vec<SubscriberId>,
        qoss: &mut Vec<QoS>,
    ) -> Result<(), TopicError>;

    /// Store `msg` as the retained message of its topic; an empty payload
    /// deletes it instead
    fn retain(&self, msg: Publish) -> Result<(), TopicError>;

    /// Fill `msgs` with the retained messages matching `filter`
    fn retained(&self, filter: &str, msgs: &mut Vec<Publish>) -> Result<(), TopicError>;

    fn stats(&self) -> TopicsStats;

    /// Drop all subscriptions and retained messages
    fn close(&self) -> Result<(), TopicError>;
}

/// Facade over the provider selected by name
#[derive(Clone)]
pub struct TopicsManager {
    name: String,
    provider: Arc<dyn TopicsProvider>,
}

impl TopicsManager {
    pub fn new(providers: &Providers, name: &str) -> Result<Self, ProviderError> {
        let provider = providers.topics.get(name)?;
        Ok(Self {
            name: name.to_string(),
            provider,
        })
    }

    /// Name the provider was selected by
    pub fn provider_name(&self) -> &str {
        &self.name
    }

    pub fn subscribe(&self, filter: &str, qos: u8, sub: SubscriberId) -> Result<QoS, TopicError> {
        self.provider.subscribe(filter, qos, sub)
    }

    pub fn unsubscribe(&self, filter: &str, sub: Option<&SubscriberId>) -> Result<(), TopicError> {
        self.provider.unsubscribe(filter, sub)
    }

    pub fn subscribers(
        &self,
        topic: &str,
        qos: u8,
        subs: &mut Vec<SubscriberId>,
        qoss: &mut Vec<QoS>,
    ) -> Result<(), TopicError> {
        self.provider.subscribers(topic, qos, subs, qoss)
    }

    pub fn retain(&self, msg: Publish) -> Result<(), TopicError> {
        self.provider.retain(msg)
    }

    pub fn retained(&self, filter: &str, msgs: &mut Vec<Publish>) -> Result<(), TopicError> {
        self.provider.retained(filter, msgs)
    }

    pub fn stats(&self) -> TopicsStats {
        self.provider.stats()
    }

    pub fn close(&self) -> Result<(), TopicError> {
        self.provider.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::QosPolicy;
    use crate::registry::MEM;

    #[test]
    fn test_manager_forwards_to_provider() {
        let providers = Providers::with_builtin(QosPolicy::Publisher);
        let topics = TopicsManager::new(&providers, MEM).unwrap();
        assert_eq!(topics.provider_name(), MEM);

        topics.subscribe("a/+", 1, "c1".into()).unwrap();
        let mut subs = Vec::new();
        let mut qoss = Vec::new();
        topics.subscribers("a/b", 2, &mut subs, &mut qoss).unwrap();
        assert_eq!(subs, vec![SubscriberId::from("c1")]);
        assert_eq!(qoss, vec![QoS::ExactlyOnce]);

        // Managers built from the same registry share the provider
        let other = TopicsManager::new(&providers, MEM).unwrap();
        assert_eq!(other.stats().subscriptions, 1);
    }

    #[test]
    fn test_manager_unknown_provider() {
        let providers = Providers::new();
        assert!(TopicsManager::new(&providers, MEM).is_err());
    }
}
