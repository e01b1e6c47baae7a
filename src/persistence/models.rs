//! Serializable data models for persistence.
//!
//! These are storage-friendly versions of runtime types that can be
//! serialized with bincode.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use bincode::{Decode, Encode};
use bytes::Bytes;

use crate::protocol::{ConnectParams, Publish, QoS};
use crate::session::SessionSnapshot;

/// Stored retained message
#[derive(Debug, Clone, Encode, Decode)]
pub struct StoredRetainedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: u8,
    /// Unix timestamp in seconds when the message was stored
    pub timestamp_secs: u64,
}

/// Stored publish record (a session's retained pointer)
#[derive(Debug, Clone, Encode, Decode)]
pub struct StoredPublish {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: u8,
    pub retain: bool,
}

/// Stored CONNECT parameters
#[derive(Debug, Clone, Encode, Decode)]
pub struct StoredConnect {
    pub client_id: String,
    pub clean_session: bool,
    pub keep_alive: u16,
    pub username: Option<String>,
    pub will_flag: bool,
    pub will_qos: u8,
    pub will_retain: bool,
    pub will_topic: String,
    pub will_payload: Vec<u8>,
}

/// Stored subscription
#[derive(Debug, Clone, Encode, Decode)]
pub struct StoredSubscription {
    pub filter: String,
    pub qos: u8,
}

/// Stored session
#[derive(Debug, Clone, Encode, Decode)]
pub struct StoredSession {
    pub client_id: String,
    pub connect: StoredConnect,
    pub subscriptions: Vec<StoredSubscription>,
    pub retained: Option<StoredPublish>,
    /// Unix timestamp when the session was saved
    pub saved_at_secs: u64,
}

/// Everything loaded at startup
#[derive(Debug, Default)]
pub struct LoadedData {
    pub retained: Vec<(String, StoredRetainedMessage)>,
    pub sessions: Vec<(String, StoredSession)>,
}

// ============================================================================
// Conversion implementations
// ============================================================================

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl From<&Publish> for StoredRetainedMessage {
    fn from(publish: &Publish) -> Self {
        Self {
            topic: publish.topic.to_string(),
            payload: publish.payload.to_vec(),
            qos: publish.qos as u8,
            timestamp_secs: now_unix_secs(),
        }
    }
}

impl From<StoredRetainedMessage> for Publish {
    fn from(stored: StoredRetainedMessage) -> Self {
        Self {
            topic: Arc::from(stored.topic),
            payload: Bytes::from(stored.payload),
            qos: QoS::from_u8(stored.qos).unwrap_or_default(),
            retain: true,
        }
    }
}

impl From<&Publish> for StoredPublish {
    fn from(publish: &Publish) -> Self {
        Self {
            topic: publish.topic.to_string(),
            payload: publish.payload.to_vec(),
            qos: publish.qos as u8,
            retain: publish.retain,
        }
    }
}

impl From<StoredPublish> for Publish {
    fn from(stored: StoredPublish) -> Self {
        Self {
            topic: Arc::from(stored.topic),
            payload: Bytes::from(stored.payload),
            qos: QoS::from_u8(stored.qos).unwrap_or_default(),
            retain: stored.retain,
        }
    }
}

impl From<&ConnectParams> for StoredConnect {
    fn from(connect: &ConnectParams) -> Self {
        Self {
            client_id: connect.client_id.clone(),
            clean_session: connect.clean_session,
            keep_alive: connect.keep_alive,
            username: connect.username.clone(),
            will_flag: connect.will_flag,
            will_qos: connect.will_qos as u8,
            will_retain: connect.will_retain,
            will_topic: connect.will_topic.clone(),
            will_payload: connect.will_payload.to_vec(),
        }
    }
}

impl From<StoredConnect> for ConnectParams {
    fn from(stored: StoredConnect) -> Self {
        Self {
            client_id: stored.client_id,
            clean_session: stored.clean_session,
            keep_alive: stored.keep_alive,
            username: stored.username,
            will_flag: stored.will_flag,
            will_qos: QoS::from_u8(stored.will_qos).unwrap_or_default(),
            will_retain: stored.will_retain,
            will_topic: stored.will_topic,
            will_payload: Bytes::from(stored.will_payload),
        }
    }
}

impl From<&SessionSnapshot> for StoredSession {
    fn from(snapshot: &SessionSnapshot) -> Self {
        Self {
            client_id: snapshot.id.clone(),
            connect: StoredConnect::from(&snapshot.connect),
            subscriptions: snapshot
                .topics
                .iter()
                .map(|(filter, qos)| StoredSubscription {
                    filter: filter.clone(),
                    qos: *qos as u8,
                })
                .collect(),
            retained: snapshot.retained.as_ref().map(StoredPublish::from),
            saved_at_secs: now_unix_secs(),
        }
    }
}

impl From<StoredSession> for SessionSnapshot {
    fn from(stored: StoredSession) -> Self {
        Self {
            id: stored.client_id,
            connect: ConnectParams::from(stored.connect),
            topics: stored
                .subscriptions
                .into_iter()
                .map(|s| (s.filter, QoS::from_u8(s.qos).unwrap_or_default()))
                .collect(),
            retained: stored.retained.map(Publish::from),
        }
    }
}
