//! Subscription trie
//!
//! A prefix tree keyed by topic level. Each node holds the subscribers whose
//! filter ends at that node together with the QoS they were granted.
//! Wildcards are ordinary keys (`+`, `#`) and only get their meaning while
//! matching a publish topic.
//!
//! Empty nodes are pruned on the way back up from every removal.

use ahash::AHashMap;
use compact_str::CompactString;
use smallvec::SmallVec;

use super::error::TopicError;
use super::level::{next_level, validate, MULTI_WILDCARD, SINGLE_WILDCARD};
use crate::protocol::QoS;

/// Node in the subscription trie
#[derive(Debug)]
struct SubNode<S> {
    /// Subscribers whose filter ends here, in insertion order.
    /// Most filters have one or two subscribers, so keep them inline.
    subs: SmallVec<[(S, QoS); 2]>,
    /// Children indexed by topic level
    children: AHashMap<CompactString, SubNode<S>>,
}

impl<S> SubNode<S> {
    fn new() -> Self {
        Self {
            subs: SmallVec::new(),
            children: AHashMap::with_capacity(4),
        }
    }

    fn is_empty(&self) -> bool {
        self.subs.is_empty() && self.children.is_empty()
    }

    fn emit<F>(&self, callback: &mut F)
    where
        F: FnMut(&S, QoS),
    {
        for (sub, qos) in &self.subs {
            callback(sub, *qos);
        }
    }

    fn count(&self) -> usize {
        self.subs.len() + self.children.values().map(SubNode::count).sum::<usize>()
    }
}

impl<S> Default for SubNode<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscription trie over subscriber handles of type `S`
///
/// Handles are compared by value; the same handle inserted twice at the same
/// filter keeps one entry with the latest QoS.
#[derive(Debug)]
pub struct SubscriptionTrie<S> {
    root: SubNode<S>,
}

impl<S: PartialEq + Clone> SubscriptionTrie<S> {
    pub fn new() -> Self {
        Self {
            root: SubNode::new(),
        }
    }

    /// Insert `sub` at `filter`, or update its QoS if it is already there
    pub fn insert(&mut self, filter: &str, qos: QoS, sub: S) -> Result<(), TopicError> {
        // Reject before creating any node
        validate(filter)?;
        Self::insert_recursive(&mut self.root, filter, qos, sub)
    }

    fn insert_recursive(
        node: &mut SubNode<S>,
        filter: &str,
        qos: QoS,
        sub: S,
    ) -> Result<(), TopicError> {
        if filter.is_empty() {
            match node.subs.iter_mut().find(|(s, _)| *s == sub) {
                Some(entry) => entry.1 = qos,
                None => node.subs.push((sub, qos)),
            }
            return Ok(());
        }

        let (level, rest) = next_level(filter)?;
        let child = node.children.entry(CompactString::new(level)).or_default();
        Self::insert_recursive(child, rest, qos, sub)
    }

    /// Remove `sub` from `filter`; `None` clears every subscriber at that node
    pub fn remove(&mut self, filter: &str, sub: Option<&S>) -> Result<(), TopicError> {
        Self::remove_recursive(&mut self.root, filter, sub)
    }

    fn remove_recursive(
        node: &mut SubNode<S>,
        filter: &str,
        sub: Option<&S>,
    ) -> Result<(), TopicError> {
        if filter.is_empty() {
            let Some(sub) = sub else {
                node.subs.clear();
                return Ok(());
            };
            let pos = node
                .subs
                .iter()
                .position(|(s, _)| s == sub)
                .ok_or(TopicError::NoSubscriber)?;
            node.subs.remove(pos);
            return Ok(());
        }

        let (level, rest) = next_level(filter)?;
        let child = node.children.get_mut(level).ok_or(TopicError::NoTopic)?;
        Self::remove_recursive(child, rest, sub)?;

        if child.is_empty() {
            node.children.remove(level);
        }
        Ok(())
    }

    /// Call `callback` with every subscriber whose filter matches the publish
    /// `topic`, along with its granted QoS.
    ///
    /// A subscriber registered under several matching filters is reported
    /// once per filter.
    pub fn matches<F>(&self, topic: &str, mut callback: F) -> Result<(), TopicError>
    where
        F: FnMut(&S, QoS),
    {
        Self::matches_recursive(&self.root, topic, &mut callback)
    }

    fn matches_recursive<F>(node: &SubNode<S>, topic: &str, callback: &mut F) -> Result<(), TopicError>
    where
        F: FnMut(&S, QoS),
    {
        let multi = node.children.get(MULTI_WILDCARD);

        if topic.is_empty() {
            // At end of topic - exact subscribers, plus `#` which also matches its parent
            node.emit(callback);
            if let Some(n) = multi {
                n.emit(callback);
            }
            return Ok(());
        }

        let (level, rest) = next_level(topic)?;

        // `#` absorbs everything below this node
        if let Some(n) = multi {
            n.emit(callback);
        }

        if let Some(n) = node.children.get(SINGLE_WILDCARD) {
            Self::matches_recursive(n, rest, callback)?;
        }

        if level != SINGLE_WILDCARD && level != MULTI_WILDCARD {
            if let Some(n) = node.children.get(level) {
                Self::matches_recursive(n, rest, callback)?;
            }
        }

        Ok(())
    }

    /// Number of (filter, subscriber) entries
    pub fn subscription_count(&self) -> usize {
        self.root.count()
    }

    /// True when no subscriber and no node is left
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Drop every node
    pub fn clear(&mut self) {
        self.root = SubNode::new();
    }
}

impl<S: PartialEq + Clone> Default for SubscriptionTrie<S> {
    fn default() -> Self {
        Self::new()
    }
}
