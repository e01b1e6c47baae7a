//! Protocol-level value types shared by the tries and sessions
//!
//! Only the parameters the matching core consumes live here; packet
//! encoding and decoding belong to the connection layer.

mod packet;

pub use packet::{ConnectParams, Publish};

use serde::Deserialize;

/// Quality of Service levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum QoS {
    /// At most once delivery
    #[default]
    AtMostOnce = 0,
    /// At least once delivery
    AtLeastOnce = 1,
    /// Exactly once delivery
    ExactlyOnce = 2,
}

impl QoS {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(QoS::AtMostOnce),
            1 => Some(QoS::AtLeastOnce),
            2 => Some(QoS::ExactlyOnce),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns the minimum of two QoS levels (for subscription matching)
    pub fn min(self, other: Self) -> Self {
        if (self as u8) < (other as u8) {
            self
        } else {
            other
        }
    }
}

/// Which QoS a matched subscriber is handed on publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QosPolicy {
    /// Every matched subscriber gets the publisher's QoS, whatever it was granted
    #[default]
    Publisher,
    /// Every matched subscriber gets min(publisher QoS, granted QoS)
    Downgrade,
}

impl QosPolicy {
    /// QoS delivered to a subscriber granted `granted` for a publish at `published`
    #[inline]
    pub fn delivered(self, published: QoS, granted: QoS) -> QoS {
        match self {
            QosPolicy::Publisher => published,
            QosPolicy::Downgrade => published.min(granted),
        }
    }
}
