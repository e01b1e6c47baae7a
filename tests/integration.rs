//! Integration Tests for mqcore
//!
//! These tests drive the providers the way a connection handler does: through
//! the registries and managers only, following the CONNECT, SUBSCRIBE,
//! PUBLISH and DISCONNECT flows.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pretty_assertions::assert_eq;

use mqcore::persistence::{FjallBackend, PersistenceManager, StorageBackend};
use mqcore::registry::{Providers, FJALL, MEM};
use mqcore::sessions::{PersistentSessions, SessionsManager};
use mqcore::topics::{PersistentTopics, TopicsManager};
use mqcore::{ConnectParams, Publish, QoS, QosPolicy, SubscriberId, TopicError};

fn managers(policy: QosPolicy) -> (TopicsManager, SessionsManager) {
    let providers = Providers::with_builtin(policy);
    let topics = TopicsManager::new(&providers, MEM).unwrap();
    let sessions = SessionsManager::new(&providers, MEM).unwrap();
    (topics, sessions)
}

fn fan_out(topics: &TopicsManager, topic: &str, qos: u8) -> Vec<(String, QoS)> {
    let mut subs = Vec::new();
    let mut qoss = Vec::new();
    topics.subscribers(topic, qos, &mut subs, &mut qoss).unwrap();
    let mut out: Vec<(String, QoS)> = subs
        .iter()
        .map(ToString::to_string)
        .zip(qoss)
        .collect();
    out.sort();
    out
}

/// What a connection handler does on SUBSCRIBE
fn subscribe(
    topics: &TopicsManager,
    sessions: &SessionsManager,
    client_id: &str,
    filter: &str,
    qos: u8,
) -> Vec<Publish> {
    let granted = topics
        .subscribe(filter, qos, SubscriberId::from(client_id))
        .unwrap();
    sessions
        .get(client_id)
        .unwrap()
        .add_topic(filter, granted)
        .unwrap();

    let mut retained = Vec::new();
    topics.retained(filter, &mut retained).unwrap();
    retained
}

/// What a connection handler does on PUBLISH
fn publish(topics: &TopicsManager, msg: Publish) -> Vec<(String, QoS)> {
    let matched = fan_out(topics, &msg.topic, msg.qos.as_u8());
    if msg.retain {
        topics.retain(msg).unwrap();
    }
    matched
}

// ============================================================================
// Connection flows
// ============================================================================

#[test]
fn test_connect_subscribe_publish() {
    let (topics, sessions) = managers(QosPolicy::Publisher);

    let session = sessions.new_session("sensor-1").unwrap();
    session.init(ConnectParams::new("sensor-1")).unwrap();
    let session = sessions.new_session("dash").unwrap();
    session.init(ConnectParams::new("dash")).unwrap();

    assert!(subscribe(&topics, &sessions, "dash", "home/+/temp", 1).is_empty());
    subscribe(&topics, &sessions, "sensor-1", "cmd/sensor-1/#", 2);

    assert_eq!(
        publish(&topics, Publish::new("home/kitchen/temp", "21.5", QoS::AtMostOnce)),
        vec![("client:dash".to_string(), QoS::AtMostOnce)]
    );
    assert_eq!(
        publish(&topics, Publish::new("cmd/sensor-1/reset", "", QoS::ExactlyOnce)),
        vec![("client:sensor-1".to_string(), QoS::ExactlyOnce)]
    );
    assert!(publish(&topics, Publish::new("home/kitchen/hum", "40", QoS::AtMostOnce)).is_empty());
}

#[test]
fn test_retained_delivered_on_subscribe() {
    let (topics, sessions) = managers(QosPolicy::Publisher);
    sessions
        .new_session("late")
        .unwrap()
        .init(ConnectParams::new("late"))
        .unwrap();

    publish(&topics, Publish::retained("status/a", "up", QoS::AtLeastOnce));
    publish(&topics, Publish::retained("status/b", "down", QoS::AtMostOnce));
    publish(&topics, Publish::retained("status/b", "up", QoS::AtMostOnce));

    let mut retained: Vec<(String, String)> = subscribe(&topics, &sessions, "late", "status/#", 1)
        .into_iter()
        .map(|m| {
            (
                m.topic.to_string(),
                String::from_utf8(m.payload.to_vec()).unwrap(),
            )
        })
        .collect();
    retained.sort();
    assert_eq!(
        retained,
        vec![
            ("status/a".to_string(), "up".to_string()),
            ("status/b".to_string(), "up".to_string()),
        ]
    );

    // Empty payload clears the retained message
    publish(&topics, Publish::retained("status/a", "", QoS::AtMostOnce));
    let mut msgs = Vec::new();
    topics.retained("status/a", &mut msgs).unwrap();
    assert!(msgs.is_empty());
    assert_eq!(topics.stats().retained, 1);
}

#[test]
fn test_reconnect_keeps_subscriptions() {
    let (topics, sessions) = managers(QosPolicy::Publisher);

    let mut connect = ConnectParams::new("c1");
    connect.clean_session = false;
    sessions.new_session("c1").unwrap().init(connect.clone()).unwrap();
    subscribe(&topics, &sessions, "c1", "a/b", 1);

    // Second CONNECT on the same session
    let session = sessions.get("c1").unwrap();
    assert_eq!(
        session.init(connect.clone()),
        Err(mqcore::SessionError::AlreadyInitialized)
    );
    connect.keep_alive = 120;
    session.update(connect).unwrap();

    let (filters, qoss) = session.topics().unwrap();
    assert_eq!(filters, vec!["a/b".to_string()]);
    assert_eq!(qoss, vec![QoS::AtLeastOnce]);
    assert!(!session.clean_session());
}

#[test]
fn test_disconnect_cleans_up() {
    let (topics, sessions) = managers(QosPolicy::Publisher);

    let session = sessions.new_session("c1").unwrap();
    session
        .init(ConnectParams::new("c1").with_will("clients/c1", "lost", QoS::AtLeastOnce, true))
        .unwrap();
    subscribe(&topics, &sessions, "c1", "a/+", 0);
    subscribe(&topics, &sessions, "c1", "b/#", 1);

    // Unexpected close: the handler publishes the will
    let will = session.will().unwrap();
    assert!(session.will_flag());
    publish(&topics, will);
    let mut msgs = Vec::new();
    topics.retained("clients/c1", &mut msgs).unwrap();
    assert_eq!(msgs.len(), 1);

    // Then unsubscribes everything the session recorded
    let sub = SubscriberId::from("c1");
    let (filters, _) = session.topics().unwrap();
    for filter in &filters {
        topics.unsubscribe(filter, Some(&sub)).unwrap();
        session.remove_topic(filter).unwrap();
    }
    sessions.del("c1");

    assert_eq!(topics.stats().subscriptions, 0);
    assert_eq!(sessions.count(), 0);
    assert!(fan_out(&topics, "a/x", 0).is_empty());
    assert_eq!(
        topics.unsubscribe("a/+", Some(&sub)),
        Err(TopicError::NoTopic)
    );
}

#[test]
fn test_generated_client_id() {
    let (_, sessions) = managers(QosPolicy::Publisher);
    let a = sessions.new_session("").unwrap();
    let b = sessions.new_session("").unwrap();
    assert_eq!(a.id().len(), 20);
    assert_ne!(a.id(), b.id());
    assert_eq!(sessions.count(), 2);
}

#[test]
fn test_downgrade_policy_through_manager() {
    let (topics, _) = managers(QosPolicy::Downgrade);
    topics.subscribe("t", 0, "low".into()).unwrap();
    topics.subscribe("t", 2, "high".into()).unwrap();

    assert_eq!(
        fan_out(&topics, "t", 1),
        vec![
            ("client:high".to_string(), QoS::AtLeastOnce),
            ("client:low".to_string(), QoS::AtMostOnce),
        ]
    );
}

#[test]
fn test_malformed_filters_rejected() {
    let (topics, _) = managers(QosPolicy::Publisher);
    assert_eq!(
        topics.subscribe("a/#/b", 0, "c1".into()),
        Err(TopicError::MultiWildcardNotLast)
    );
    assert_eq!(
        topics.subscribe("a/b#", 0, "c1".into()),
        Err(TopicError::MultiWildcardNotAlone)
    );
    assert_eq!(
        topics.subscribe("a+/b", 0, "c1".into()),
        Err(TopicError::SingleWildcardNotAlone)
    );
    assert_eq!(topics.stats().subscriptions, 0);
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_concurrent_subscribe_and_match() {
    const WRITERS: usize = 8;
    const READERS: usize = 4;
    const PER_WRITER: usize = 50;

    let filter = |w: usize, i: usize| match i % 3 {
        0 => format!("w{}/t{}", w, i),
        1 => format!("w{}/+", w),
        _ => format!("w{}/#", w),
    };

    let (topics, _) = managers(QosPolicy::Publisher);

    thread::scope(|s| {
        for w in 0..WRITERS {
            let topics = topics.clone();
            s.spawn(move || {
                for i in 0..PER_WRITER {
                    let client = format!("c{}-{}", w, i);
                    topics
                        .subscribe(&filter(w, i), (i % 3) as u8, SubscriberId::from(client.as_str()))
                        .unwrap();
                }
            });
        }
        for r in 0..READERS {
            let topics = topics.clone();
            s.spawn(move || {
                let mut subs = Vec::new();
                let mut qoss = Vec::new();
                for i in 0..PER_WRITER * 2 {
                    let topic = format!("w{}/t{}", (r + i) % WRITERS, i % PER_WRITER);
                    topics.subscribers(&topic, 1, &mut subs, &mut qoss).unwrap();
                    assert_eq!(subs.len(), qoss.len());
                }
            });
        }
    });

    // Same subscriptions applied on one thread
    let (sequential, _) = managers(QosPolicy::Publisher);
    for w in 0..WRITERS {
        for i in 0..PER_WRITER {
            let client = format!("c{}-{}", w, i);
            sequential
                .subscribe(&filter(w, i), (i % 3) as u8, SubscriberId::from(client.as_str()))
                .unwrap();
        }
    }

    assert_eq!(topics.stats(), sequential.stats());
    for w in 0..WRITERS {
        for i in 0..PER_WRITER {
            let topic = format!("w{}/t{}", w, i);
            let concurrent: BTreeSet<_> = fan_out(&topics, &topic, 2).into_iter().collect();
            let expected: BTreeSet<_> = fan_out(&sequential, &topic, 2).into_iter().collect();
            assert_eq!(concurrent, expected);
        }
    }
}

#[test]
fn test_concurrent_sessions() {
    let (_, sessions) = managers(QosPolicy::Publisher);

    thread::scope(|s| {
        for t in 0..8 {
            let sessions = sessions.clone();
            s.spawn(move || {
                for i in 0..25 {
                    let id = format!("c{}-{}", t, i);
                    let session = sessions.new_session(&id).unwrap();
                    session.init(ConnectParams::new(id.as_str())).unwrap();
                    session.add_topic("x/y", QoS::AtLeastOnce).unwrap();
                }
            });
        }
    });

    assert_eq!(sessions.count(), 200);
    let session = sessions.get("c7-24").unwrap();
    assert_eq!(session.topics().unwrap().0, vec!["x/y".to_string()]);
}

// ============================================================================
// Persistence
// ============================================================================

#[tokio::test]
async fn test_fjall_providers_restore_state() {
    let temp_dir = tempfile::tempdir().unwrap();
    let backend: Arc<dyn StorageBackend> =
        Arc::new(FjallBackend::open(temp_dir.path()).unwrap());

    let wire = |store: Arc<PersistenceManager>, data: mqcore::persistence::LoadedData| {
        let mut providers = Providers::with_builtin(QosPolicy::Publisher);
        providers.topics.register(
            FJALL,
            Arc::new(PersistentTopics::new(
                QosPolicy::Publisher,
                store.clone(),
                data.retained,
            )),
        );
        providers
            .sessions
            .register(FJALL, Arc::new(PersistentSessions::new(store, data.sessions)));
        (
            TopicsManager::new(&providers, FJALL).unwrap(),
            SessionsManager::new(&providers, FJALL).unwrap(),
        )
    };

    let store = Arc::new(PersistenceManager::new(
        backend.clone(),
        Duration::from_millis(10),
        100,
    ));
    let (topics, sessions) = wire(store.clone(), store.load_all().await.unwrap());

    let session = sessions.new_session("c1").unwrap();
    let mut connect = ConnectParams::new("c1");
    connect.clean_session = false;
    session.init(connect).unwrap();
    subscribe(&topics, &sessions, "c1", "a/#", 1);
    sessions.save("c1").unwrap();
    publish(&topics, Publish::retained("a/b", "v", QoS::AtLeastOnce));
    store.shutdown().await.unwrap();

    let store = Arc::new(PersistenceManager::new(
        backend,
        Duration::from_millis(10),
        100,
    ));
    let (topics, sessions) = wire(store.clone(), store.load_all().await.unwrap());

    let session = sessions.get("c1").unwrap();
    assert!(session.is_initialized());
    assert!(!session.clean_session());
    assert_eq!(session.topics().unwrap().0, vec!["a/#".to_string()]);

    // Subscriptions come back only when the client reconnects
    assert_eq!(topics.stats().subscriptions, 0);
    let mut msgs = Vec::new();
    topics.retained("a/+", &mut msgs).unwrap();
    assert_eq!(msgs.len(), 1);
    assert_eq!(&msgs[0].payload[..], b"v");

    store.shutdown().await.unwrap();
}
