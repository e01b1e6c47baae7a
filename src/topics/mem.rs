//! In-memory topics provider
//!
//! Subscriptions and retained messages live in two tries, each behind its
//! own lock so subscribe traffic and retain traffic never wait on each other.
//! Nothing survives a restart.

use parking_lot::RwLock;
use tracing::debug;

use super::{TopicsProvider, TopicsStats};
use crate::protocol::{Publish, QoS, QosPolicy};
use crate::topic::{RetainedTrie, SubscriberId, SubscriptionTrie, TopicError};

fn parse_qos(qos: u8) -> Result<QoS, TopicError> {
    QoS::from_u8(qos).ok_or(TopicError::InvalidQos(qos))
}

/// Topics provider keeping everything in memory
pub struct MemTopics {
    policy: QosPolicy,
    subscriptions: RwLock<SubscriptionTrie<SubscriberId>>,
    retained: RwLock<RetainedTrie>,
}

impl MemTopics {
    pub fn new() -> Self {
        Self::with_policy(QosPolicy::default())
    }

    pub fn with_policy(policy: QosPolicy) -> Self {
        Self {
            policy,
            subscriptions: RwLock::new(SubscriptionTrie::new()),
            retained: RwLock::new(RetainedTrie::new()),
        }
    }

    pub fn policy(&self) -> QosPolicy {
        self.policy
    }
}

impl Default for MemTopics {
    fn default() -> Self {
        Self::new()
    }
}

impl TopicsProvider for MemTopics {
    fn subscribe(&self, filter: &str, qos: u8, sub: SubscriberId) -> Result<QoS, TopicError> {
        let qos = parse_qos(qos)?;

        self.subscriptions.write().insert(filter, qos, sub)?;
        debug!("subscribed to {} at {:?}", filter, qos);
        Ok(qos)
    }

    fn unsubscribe(&self, filter: &str, sub: Option<&SubscriberId>) -> Result<(), TopicError> {
        self.subscriptions.write().remove(filter, sub)
    }

    fn subscribers(
        &self,
        topic: &str,
        qos: u8,
        subs: &mut Vec<SubscriberId>,
        qoss: &mut Vec<QoS>,
    ) -> Result<(), TopicError> {
        subs.clear();
        qoss.clear();
        let qos = parse_qos(qos)?;

        let policy = self.policy;
        let result = self.subscriptions.read().matches(topic, |sub, granted| {
            subs.push(sub.clone());
            qoss.push(policy.delivered(qos, granted));
        });

        if result.is_err() {
            subs.clear();
            qoss.clear();
        }
        result
    }

    fn retain(&self, msg: Publish) -> Result<(), TopicError> {
        // A zero-length payload deletes the retained message
        if msg.payload.is_empty() {
            let removed = self.retained.write().remove_exact(&msg.topic)?;
            if removed.is_none() {
                debug!("no retained message to delete at {}", msg.topic);
            }
            return Ok(());
        }

        let topic = msg.topic.clone();
        self.retained.write().upsert(&topic, msg)?;
        Ok(())
    }

    fn retained(&self, filter: &str, msgs: &mut Vec<Publish>) -> Result<(), TopicError> {
        self.retained.read().matches(filter, msgs)
    }

    fn stats(&self) -> TopicsStats {
        TopicsStats {
            subscriptions: self.subscriptions.read().subscription_count(),
            retained: self.retained.read().len(),
        }
    }

    fn close(&self) -> Result<(), TopicError> {
        self.subscriptions.write().clear();
        self.retained.write().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(topics: &MemTopics, topic: &str, qos: u8) -> Vec<(SubscriberId, QoS)> {
        let mut subs = Vec::new();
        let mut qoss = Vec::new();
        topics.subscribers(topic, qos, &mut subs, &mut qoss).unwrap();
        subs.into_iter().zip(qoss).collect()
    }

    #[test]
    fn test_subscribe_and_match() {
        let topics = MemTopics::new();
        let granted = topics.subscribe("a/b", 1, "c1".into()).unwrap();
        assert_eq!(granted, QoS::AtLeastOnce);

        assert_eq!(
            matched(&topics, "a/b", 1),
            vec![(SubscriberId::from("c1"), QoS::AtLeastOnce)]
        );
    }

    #[test]
    fn test_subscribe_invalid_qos() {
        let topics = MemTopics::new();
        assert_eq!(
            topics.subscribe("a/b", 3, "c1".into()),
            Err(TopicError::InvalidQos(3))
        );
        assert_eq!(topics.stats().subscriptions, 0);
    }

    #[test]
    fn test_subscribers_invalid_qos() {
        let topics = MemTopics::new();
        let mut subs = vec![SubscriberId::from("stale")];
        let mut qoss = vec![QoS::AtMostOnce];
        assert_eq!(
            topics.subscribers("a", 7, &mut subs, &mut qoss),
            Err(TopicError::InvalidQos(7))
        );
        assert!(subs.is_empty());
        assert!(qoss.is_empty());
    }

    #[test]
    fn test_subscribers_resets_buffers() {
        let topics = MemTopics::new();
        topics.subscribe("a", 0, "c1".into()).unwrap();

        let mut subs = vec![SubscriberId::from("stale")];
        let mut qoss = vec![QoS::ExactlyOnce];
        topics.subscribers("a", 0, &mut subs, &mut qoss).unwrap();
        assert_eq!(subs, vec![SubscriberId::from("c1")]);
        assert_eq!(qoss, vec![QoS::AtMostOnce]);

        topics.subscribers("b", 0, &mut subs, &mut qoss).unwrap();
        assert!(subs.is_empty());
        assert!(qoss.is_empty());
    }

    #[test]
    fn test_publisher_qos_policy() {
        let topics = MemTopics::with_policy(QosPolicy::Publisher);
        topics.subscribe("a", 0, "c1".into()).unwrap();
        assert_eq!(
            matched(&topics, "a", 2),
            vec![(SubscriberId::from("c1"), QoS::ExactlyOnce)]
        );
    }

    #[test]
    fn test_downgrade_qos_policy() {
        let topics = MemTopics::with_policy(QosPolicy::Downgrade);
        topics.subscribe("a", 0, "c1".into()).unwrap();
        topics.subscribe("a", 2, "c2".into()).unwrap();

        let mut got = matched(&topics, "a", 1);
        got.sort_by(|a, b| a.0.to_string().cmp(&b.0.to_string()));
        assert_eq!(
            got,
            vec![
                (SubscriberId::from("c1"), QoS::AtMostOnce),
                (SubscriberId::from("c2"), QoS::AtLeastOnce),
            ]
        );
    }

    #[test]
    fn test_unsubscribe() {
        let topics = MemTopics::new();
        let c1 = SubscriberId::from("c1");
        topics.subscribe("a/+", 0, c1.clone()).unwrap();

        topics.unsubscribe("a/+", Some(&c1)).unwrap();
        assert!(matched(&topics, "a/b", 0).is_empty());
        assert_eq!(topics.unsubscribe("a/+", Some(&c1)), Err(TopicError::NoTopic));
    }

    #[test]
    fn test_retain_and_delete() {
        let topics = MemTopics::new();
        topics
            .retain(Publish::retained("x/y", "v", QoS::AtLeastOnce))
            .unwrap();

        let mut msgs = Vec::new();
        topics.retained("x/y", &mut msgs).unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(&msgs[0].payload[..], b"v");

        topics
            .retain(Publish::retained("x/y", "", QoS::AtLeastOnce))
            .unwrap();
        topics.retained("x/y", &mut msgs).unwrap();
        assert!(msgs.is_empty());
        assert_eq!(topics.stats().retained, 0);
    }

    #[test]
    fn test_delete_missing_retained_is_ok() {
        let topics = MemTopics::new();
        assert!(topics
            .retain(Publish::retained("nothing/here", "", QoS::AtMostOnce))
            .is_ok());
    }

    #[test]
    fn test_close_drops_everything() {
        let topics = MemTopics::new();
        topics.subscribe("a", 0, "c1".into()).unwrap();
        topics
            .retain(Publish::retained("a", "v", QoS::AtMostOnce))
            .unwrap();

        topics.close().unwrap();
        assert_eq!(topics.stats(), TopicsStats::default());
    }
}
