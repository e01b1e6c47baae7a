//! MQTT Session Management
//!
//! A session is the server-side record of one client: its CONNECT
//! parameters, the will captured from them, the last retained publish and
//! the filters it is subscribed to. The subscriptions here mirror what the
//! connection layer put into the shared topics trie.
//!
//! A session starts empty and becomes usable once `init` has run. Every
//! field sits behind one mutex, so readers never see half an update.

mod error;

pub use error::SessionError;

use ahash::AHashMap;
use parking_lot::Mutex;

use crate::protocol::{ConnectParams, Publish, QoS};

#[derive(Debug, Default)]
struct Inner {
    connect: Option<ConnectParams>,
    /// Will to publish if the connection closes unexpectedly
    will: Option<Publish>,
    /// Last retained publish
    retained: Option<Publish>,
    /// Subscribed filters and their granted QoS
    topics: AHashMap<String, QoS>,
    initialized: bool,
}

impl Inner {
    fn ensure_initialized(&self) -> Result<(), SessionError> {
        if self.initialized {
            Ok(())
        } else {
            Err(SessionError::NotInitialized)
        }
    }
}

/// Consistent copy of an initialized session, used for persistence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub id: String,
    pub connect: ConnectParams,
    pub topics: Vec<(String, QoS)>,
    pub retained: Option<Publish>,
}

/// Client session
#[derive(Debug)]
pub struct Session {
    id: String,
    inner: Mutex<Inner>,
}

impl Session {
    /// Uninitialized session shell for `id`
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Rebuild an initialized session from a snapshot
    pub fn restore(snapshot: SessionSnapshot) -> Self {
        let will = snapshot.connect.will_publish();
        Self {
            id: snapshot.id,
            inner: Mutex::new(Inner {
                connect: Some(snapshot.connect),
                will,
                retained: snapshot.retained,
                topics: snapshot.topics.into_iter().collect(),
                initialized: true,
            }),
        }
    }

    /// Populate the session from the first CONNECT.
    ///
    /// Fails if the session was already initialized.
    pub fn init(&self, connect: ConnectParams) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();

        if inner.initialized {
            return Err(SessionError::AlreadyInitialized);
        }

        inner.will = connect.will_publish();
        inner.connect = Some(connect);
        inner.topics = AHashMap::with_capacity(1);
        inner.initialized = true;

        Ok(())
    }

    /// Replace the CONNECT parameters on reconnect, keeping subscriptions
    /// and the retained pointer
    pub fn update(&self, connect: ConnectParams) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        inner.ensure_initialized()?;
        inner.connect = Some(connect);
        Ok(())
    }

    pub fn retain_message(&self, msg: Publish) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        inner.ensure_initialized()?;
        inner.retained = Some(msg);
        Ok(())
    }

    pub fn add_topic(&self, topic: &str, qos: QoS) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        inner.ensure_initialized()?;
        inner.topics.insert(topic.to_string(), qos);
        Ok(())
    }

    pub fn remove_topic(&self, topic: &str) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        inner.ensure_initialized()?;
        inner.topics.remove(topic);
        Ok(())
    }

    /// Subscribed filters and their QoS, as parallel vectors
    pub fn topics(&self) -> Result<(Vec<String>, Vec<QoS>), SessionError> {
        let inner = self.inner.lock();
        inner.ensure_initialized()?;
        Ok(inner
            .topics
            .iter()
            .map(|(topic, qos)| (topic.clone(), *qos))
            .unzip())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.lock().initialized
    }

    /// Will captured at `init`
    pub fn will(&self) -> Option<Publish> {
        self.inner.lock().will.clone()
    }

    pub fn retained(&self) -> Option<Publish> {
        self.inner.lock().retained.clone()
    }

    pub fn connect_params(&self) -> Option<ConnectParams> {
        self.inner.lock().connect.clone()
    }

    pub fn will_flag(&self) -> bool {
        self.inner
            .lock()
            .connect
            .as_ref()
            .is_some_and(|c| c.will_flag)
    }

    /// Clear or raise the will flag, e.g. after a clean DISCONNECT
    pub fn set_will_flag(&self, v: bool) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        inner.ensure_initialized()?;
        if let Some(connect) = inner.connect.as_mut() {
            connect.will_flag = v;
        }
        Ok(())
    }

    pub fn clean_session(&self) -> bool {
        self.inner
            .lock()
            .connect
            .as_ref()
            .is_some_and(|c| c.clean_session)
    }

    /// Copy every field under one lock
    pub fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let inner = self.inner.lock();
        inner.ensure_initialized()?;
        Ok(SessionSnapshot {
            id: self.id.clone(),
            connect: inner.connect.clone().unwrap_or_default(),
            topics: inner
                .topics
                .iter()
                .map(|(topic, qos)| (topic.clone(), *qos))
                .collect(),
            retained: inner.retained.clone(),
        })
    }
}
