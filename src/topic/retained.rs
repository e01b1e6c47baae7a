//! Retained message trie
//!
//! Stores at most one message per concrete topic. Lookups run the other
//! way round from the subscription trie: stored topics are literal and the
//! query is a subscription filter that may carry wildcards.

use ahash::AHashMap;
use compact_str::CompactString;

use super::error::TopicError;
use super::level::{next_level, validate, MULTI_WILDCARD, SINGLE_WILDCARD};
use crate::protocol::Publish;

#[derive(Debug, Default)]
struct RetainedNode {
    message: Option<Publish>,
    children: AHashMap<CompactString, RetainedNode>,
}

impl RetainedNode {
    fn is_empty(&self) -> bool {
        self.message.is_none() && self.children.is_empty()
    }

    fn collect_all(&self, out: &mut Vec<Publish>) {
        if let Some(ref msg) = self.message {
            out.push(msg.clone());
        }
        for child in self.children.values() {
            child.collect_all(out);
        }
    }
}

/// Retained messages keyed by topic
#[derive(Debug, Default)]
pub struct RetainedTrie {
    root: RetainedNode,
    len: usize,
}

impl RetainedTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `message` at `topic`, returning the message it replaced
    pub fn upsert(&mut self, topic: &str, message: Publish) -> Result<Option<Publish>, TopicError> {
        validate(topic)?;

        let mut node = &mut self.root;
        let mut rest = topic;
        while !rest.is_empty() {
            let (level, next) = next_level(rest)?;
            node = node.children.entry(CompactString::new(level)).or_default();
            rest = next;
        }

        let previous = node.message.replace(message);
        if previous.is_none() {
            self.len += 1;
        }
        Ok(previous)
    }

    /// Remove the message stored at exactly `topic`
    pub fn remove_exact(&mut self, topic: &str) -> Result<Option<Publish>, TopicError> {
        let removed = Self::remove_recursive(&mut self.root, topic)?;
        if removed.is_some() {
            self.len -= 1;
        }
        Ok(removed)
    }

    fn remove_recursive(node: &mut RetainedNode, topic: &str) -> Result<Option<Publish>, TopicError> {
        if topic.is_empty() {
            return Ok(node.message.take());
        }

        let (level, rest) = next_level(topic)?;
        let Some(child) = node.children.get_mut(level) else {
            return Ok(None);
        };
        let removed = Self::remove_recursive(child, rest)?;

        if child.is_empty() {
            node.children.remove(level);
        }
        Ok(removed)
    }

    /// Collect into `out` every retained message whose topic matches `filter`.
    ///
    /// `out` is cleared first.
    pub fn matches(&self, filter: &str, out: &mut Vec<Publish>) -> Result<(), TopicError> {
        out.clear();
        validate(filter)?;
        Self::matches_recursive(&self.root, filter, out)
    }

    fn matches_recursive(
        node: &RetainedNode,
        filter: &str,
        out: &mut Vec<Publish>,
    ) -> Result<(), TopicError> {
        if filter.is_empty() {
            if let Some(ref msg) = node.message {
                out.push(msg.clone());
            }
            return Ok(());
        }

        let (level, rest) = next_level(filter)?;

        match level {
            MULTI_WILDCARD => node.collect_all(out),
            SINGLE_WILDCARD => {
                for child in node.children.values() {
                    Self::matches_recursive(child, rest, out)?;
                }
            }
            _ => {
                if let Some(child) = node.children.get(level) {
                    Self::matches_recursive(child, rest, out)?;
                }
            }
        }

        Ok(())
    }

    /// Number of retained messages
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when no node is left below the root
    pub fn is_pruned(&self) -> bool {
        self.root.children.is_empty()
    }

    pub fn clear(&mut self) {
        self.root = RetainedNode::default();
        self.len = 0;
    }
}
