//! Already-parsed packet parameters handed in by the connection layer

use std::sync::Arc;

use bytes::Bytes;

use super::QoS;

/// PUBLISH parameters
///
/// The topic field uses `Arc<str>` for efficient fan-out: handing a retained
/// message to many new subscribers clones the topic in O(1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publish {
    /// Quality of service
    pub qos: QoS,
    /// Retain flag
    pub retain: bool,
    /// Topic name
    pub topic: Arc<str>,
    /// Payload
    pub payload: Bytes,
}

impl Publish {
    pub fn new(topic: impl Into<Arc<str>>, payload: impl Into<Bytes>, qos: QoS) -> Self {
        Self {
            qos,
            retain: false,
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Same as `new` with the retain flag set
    pub fn retained(topic: impl Into<Arc<str>>, payload: impl Into<Bytes>, qos: QoS) -> Self {
        Self {
            retain: true,
            ..Self::new(topic, payload, qos)
        }
    }
}

impl Default for Publish {
    fn default() -> Self {
        Self {
            qos: QoS::AtMostOnce,
            retain: false,
            topic: Arc::from(""),
            payload: Bytes::new(),
        }
    }
}

/// CONNECT parameters a session keeps between (re)connects
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectParams {
    /// Client identifier
    pub client_id: String,
    /// Clean session flag
    pub clean_session: bool,
    /// Keep alive in seconds
    pub keep_alive: u16,
    /// Username, if any
    pub username: Option<String>,
    /// Will flag
    pub will_flag: bool,
    /// Will QoS
    pub will_qos: QoS,
    /// Will retain flag
    pub will_retain: bool,
    /// Will topic
    pub will_topic: String,
    /// Will payload
    pub will_payload: Bytes,
}

impl ConnectParams {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            clean_session: true,
            ..Default::default()
        }
    }

    /// Attach a will message and raise the will flag
    pub fn with_will(
        mut self,
        topic: impl Into<String>,
        payload: impl Into<Bytes>,
        qos: QoS,
        retain: bool,
    ) -> Self {
        self.will_flag = true;
        self.will_topic = topic.into();
        self.will_payload = payload.into();
        self.will_qos = qos;
        self.will_retain = retain;
        self
    }

    /// The will as a publish record, when the will flag is set
    pub fn will_publish(&self) -> Option<Publish> {
        if !self.will_flag {
            return None;
        }
        Some(Publish {
            qos: self.will_qos,
            retain: self.will_retain,
            topic: Arc::from(self.will_topic.as_str()),
            payload: self.will_payload.clone(),
        })
    }
}
