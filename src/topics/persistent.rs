//! Fjall-backed topics provider
//!
//! Subscriptions stay in memory. Retained messages are mirrored to storage
//! through the persistence manager's background writer and seeded back into
//! the trie at startup.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use super::{MemTopics, TopicsProvider, TopicsStats};
use crate::persistence::{PersistenceManager, PersistenceOp, StoredRetainedMessage};
use crate::protocol::{Publish, QoS, QosPolicy};
use crate::topic::{SubscriberId, TopicError};

/// Topics provider that persists retained messages
pub struct PersistentTopics {
    inner: MemTopics,
    store: Arc<PersistenceManager>,
    /// Held across a retained change and its queued write so the queue
    /// sees changes in the order the trie applied them
    journal: Mutex<()>,
}

impl PersistentTopics {
    /// Build the provider, restoring `retained` as loaded from storage
    pub fn new(
        policy: QosPolicy,
        store: Arc<PersistenceManager>,
        retained: Vec<(String, StoredRetainedMessage)>,
    ) -> Self {
        let inner = MemTopics::with_policy(policy);

        let mut restored = 0;
        for (topic, stored) in retained {
            if let Err(e) = inner.retain(Publish::from(stored)) {
                warn!("Skipping stored retained message for {}: {}", topic, e);
                continue;
            }
            restored += 1;
        }
        if restored > 0 {
            info!("Restored {} retained messages", restored);
        }

        Self {
            inner,
            store,
            journal: Mutex::new(()),
        }
    }
}

impl TopicsProvider for PersistentTopics {
    fn subscribe(&self, filter: &str, qos: u8, sub: SubscriberId) -> Result<QoS, TopicError> {
        self.inner.subscribe(filter, qos, sub)
    }

    fn unsubscribe(&self, filter: &str, sub: Option<&SubscriberId>) -> Result<(), TopicError> {
        self.inner.unsubscribe(filter, sub)
    }

    fn subscribers(
        &self,
        topic: &str,
        qos: u8,
        subs: &mut Vec<SubscriberId>,
        qoss: &mut Vec<QoS>,
    ) -> Result<(), TopicError> {
        self.inner.subscribers(topic, qos, subs, qoss)
    }

    fn retain(&self, msg: Publish) -> Result<(), TopicError> {
        let op = if msg.payload.is_empty() {
            PersistenceOp::DeleteRetained {
                topic: msg.topic.to_string(),
            }
        } else {
            PersistenceOp::SetRetained {
                topic: msg.topic.to_string(),
                message: StoredRetainedMessage::from(&msg),
            }
        };

        // Only a change the trie accepted reaches storage
        let _journal = self.journal.lock();
        self.inner.retain(msg)?;
        self.store.write(op);
        Ok(())
    }

    fn retained(&self, filter: &str, msgs: &mut Vec<Publish>) -> Result<(), TopicError> {
        self.inner.retained(filter, msgs)
    }

    fn stats(&self) -> TopicsStats {
        self.inner.stats()
    }

    fn close(&self) -> Result<(), TopicError> {
        self.inner.close()
    }
}
