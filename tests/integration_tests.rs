//! Integration tests for the connection lifecycle and broadcast relay

use std::sync::{Arc, Barrier};
use std::thread;

use parking_lot::Mutex;
use tokio::sync::mpsc::error::TryRecvError;

use push_echo::listener::CONNECTED_USERS;
use push_echo::{
    BroadcastRegistry, Config, Connection, ConnectionHandler, ConnectionId, ConnectionState,
    DisconnectCause, PushMessage, ResourceListener, Subscription, Transport,
};

/// Records disconnect causes so tests can check classification
#[derive(Default)]
struct CauseRecorder {
    causes: Mutex<Vec<(ConnectionId, DisconnectCause)>>,
}

impl ResourceListener for CauseRecorder {
    fn on_disconnect(&self, connection: &Arc<Connection>, cause: DisconnectCause) {
        self.causes.lock().push((connection.id().clone(), cause));
    }
}

fn setup() -> (ConnectionHandler, Arc<CauseRecorder>) {
    let config = Config::default();
    let mut handler = ConnectionHandler::with_defaults(&config, Arc::new(BroadcastRegistry::new()));
    let recorder = Arc::new(CauseRecorder::default());
    handler.register_listener(recorder.clone());
    (handler, recorder)
}

fn drain(sub: &mut Subscription) -> Vec<PushMessage> {
    let mut messages = Vec::new();
    loop {
        match sub.receiver.try_recv() {
            Ok(msg) => messages.push(msg),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
        }
    }
    messages
}

fn bodies(messages: &[PushMessage]) -> Vec<&str> {
    messages.iter().map(|m| m.body.as_str()).collect()
}

fn notice(id: &ConnectionId) -> String {
    format!("Browser UUID: {} connected.", id)
}

#[test]
fn test_echo_scenario() {
    let (handler, recorder) = setup();
    let presence = || handler.registry().lookup(CONNECTED_USERS).unwrap();

    // A connects
    let mut a = handler.open(None, Transport::Sse).unwrap();
    let a_id = a.connection.id().clone();
    assert_eq!(presence().member_ids(), vec![a_id.clone()]);
    assert_eq!(bodies(&drain(&mut a)), vec![notice(&a_id)]);

    // B connects; both see B's notice
    let mut b = handler.open(None, Transport::WebSocket).unwrap();
    let b_id = b.connection.id().clone();
    assert_eq!(presence().len(), 2);
    assert!(presence().contains(&b_id));
    assert_eq!(bodies(&drain(&mut a)), vec![notice(&b_id)]);
    assert_eq!(bodies(&drain(&mut b)), vec![notice(&b_id)]);

    // A posts; the relay group gets it
    let report = handler
        .message(Some(&a_id), "hello".to_string(), Transport::Http)
        .unwrap();
    assert_eq!(report.group, Config::default().relay_group);
    assert_eq!(report.attempted, 2);
    assert_eq!(report.delivered, 2);
    assert_eq!(bodies(&drain(&mut a)), vec!["hello"]);
    assert_eq!(bodies(&drain(&mut b)), vec!["hello"]);

    // B drops without a close
    handler.disconnect(&b.connection, b.generation, DisconnectCause::Cancelled);
    assert_eq!(presence().member_ids(), vec![a_id.clone()]);
    assert_eq!(
        *recorder.causes.lock(),
        vec![(b_id.clone(), DisconnectCause::Cancelled)]
    );

    // Later broadcasts no longer target B
    let report = handler
        .message(Some(&a_id), "again".to_string(), Transport::Http)
        .unwrap();
    assert_eq!(report.attempted, 1);
    assert!(report.failed.is_empty());
}

#[test]
fn test_disconnect_removes_from_every_group() {
    let (handler, _) = setup();
    let sub = handler.open(None, Transport::Sse).unwrap();
    let id = sub.connection.id().clone();

    handler
        .registry()
        .lookup_or_create("extra")
        .unwrap()
        .add(Arc::clone(&sub.connection));

    handler.disconnect(&sub.connection, sub.generation, DisconnectCause::Cancelled);

    assert_eq!(handler.connection_count(), 0);
    for name in handler.registry().group_names() {
        let group = handler.registry().lookup(&name).unwrap();
        assert!(!group.contains(&id), "still in {}", name);
    }
}

#[test]
fn test_client_close_is_classified_graceful() {
    let (handler, recorder) = setup();
    let sub = handler.open(None, Transport::Sse).unwrap();
    let id = sub.connection.id().clone();

    handler.close(&id).unwrap();

    assert_eq!(
        sub.connection.state(),
        ConnectionState::Closed(DisconnectCause::ClosedByClient)
    );
    let causes = recorder.causes.lock();
    assert_eq!(causes.len(), 1);
    assert!(causes[0].1.is_graceful());

    // A second disconnect of the same connection is ignored
    drop(causes);
    handler.disconnect(&sub.connection, sub.generation, DisconnectCause::Cancelled);
    assert_eq!(recorder.causes.lock().len(), 1);
}

#[test]
fn test_one_failed_delivery_does_not_affect_others() {
    let config = Config {
        queue_capacity: 2,
        ..Config::default()
    };
    let handler = ConnectionHandler::with_defaults(&config, Arc::new(BroadcastRegistry::new()));

    // Drain join notices as they arrive so no queue fills up early
    let mut subs: Vec<Subscription> = Vec::new();
    for _ in 0..3 {
        subs.push(handler.open(None, Transport::Sse).unwrap());
        for sub in subs.iter_mut() {
            drain(sub);
        }
    }

    // Fill the first connection's queue without draining it
    let first = subs[0].connection.id().clone();
    handler.message(None, "one".to_string(), Transport::Http).unwrap();
    handler.message(None, "two".to_string(), Transport::Http).unwrap();
    for sub in subs.iter_mut().skip(1) {
        drain(sub);
    }

    let report = handler
        .message(None, "three".to_string(), Transport::Http)
        .unwrap();
    assert_eq!(report.attempted, 3);
    assert_eq!(report.delivered, 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].connection, first);

    for sub in subs.iter_mut().skip(1) {
        assert_eq!(bodies(&drain(sub)), vec!["three"]);
    }
}

#[test]
fn test_resumed_session_keeps_membership() {
    let (handler, recorder) = setup();
    let mut first = handler.open(None, Transport::Sse).unwrap();
    let id = first.connection.id().clone();
    drain(&mut first);

    let mut second = handler.open(Some(id.clone()), Transport::Sse).unwrap();
    assert!(drain(&mut second).is_empty(), "resume must not re-announce");

    // Old channel going away leaves the session intact
    handler.disconnect(&first.connection, first.generation, DisconnectCause::Cancelled);
    assert!(recorder.causes.lock().is_empty());

    handler.message(None, "still here".to_string(), Transport::Http).unwrap();
    assert_eq!(bodies(&drain(&mut second)), vec!["still here"]);
}

#[test]
fn test_reopen_after_close_is_a_new_session() {
    let (handler, _) = setup();
    let mut observer = handler.open(None, Transport::Sse).unwrap();
    drain(&mut observer);

    let first = handler.open(None, Transport::Sse).unwrap();
    let id = first.connection.id().clone();
    handler.close(&id).unwrap();
    drain(&mut observer);

    let second = handler.open(Some(id.clone()), Transport::Sse).unwrap();
    assert!(!Arc::ptr_eq(&first.connection, &second.connection));
    assert_eq!(bodies(&drain(&mut observer)), vec![notice(&id)]);
}

#[test]
fn test_concurrent_connects_all_receive_broadcast() {
    let (handler, _) = setup();
    let handler = Arc::new(handler);

    let threads: Vec<_> = (0..8)
        .map(|_| {
            let handler = Arc::clone(&handler);
            thread::spawn(move || handler.open(None, Transport::Sse).unwrap())
        })
        .collect();
    let mut subs: Vec<Subscription> = threads.into_iter().map(|t| t.join().unwrap()).collect();

    assert_eq!(handler.connection_count(), 8);
    assert_eq!(
        handler.registry().lookup(CONNECTED_USERS).unwrap().len(),
        8
    );

    let report = handler
        .message(None, "ping".to_string(), Transport::Http)
        .unwrap();
    assert_eq!(report.delivered, 8);

    for sub in subs.iter_mut() {
        let messages = drain(sub);
        assert_eq!(messages.last().map(|m| m.body.as_str()), Some("ping"));
    }
}

#[test]
fn test_concurrent_open_with_same_id_shares_one_session() {
    for _ in 0..100 {
        let (handler, recorder) = setup();
        let handler = Arc::new(handler);
        let barrier = Arc::new(Barrier::new(2));
        let id = ConnectionId::parse("client-x").unwrap();

        let threads: Vec<_> = (0..2)
            .map(|_| {
                let handler = Arc::clone(&handler);
                let barrier = Arc::clone(&barrier);
                let id = id.clone();
                thread::spawn(move || {
                    barrier.wait();
                    handler.open(Some(id), Transport::Sse).unwrap()
                })
            })
            .collect();
        let mut subs: Vec<Subscription> = threads.into_iter().map(|t| t.join().unwrap()).collect();

        // Both channels attached to the one live session
        assert!(Arc::ptr_eq(&subs[0].connection, &subs[1].connection));
        let live = Arc::clone(&subs[0].connection);
        assert!(!live.is_closed());
        assert_eq!(handler.connection_count(), 1);
        assert!(recorder.causes.lock().is_empty());

        // Presence holds the live session and it was announced exactly once
        let presence = handler.registry().lookup(CONNECTED_USERS).unwrap();
        assert_eq!(presence.member_ids(), vec![id.clone()]);
        let announced: usize = subs
            .iter_mut()
            .map(|sub| drain(sub).iter().filter(|m| m.body == notice(&id)).count())
            .sum();
        assert_eq!(announced, 1);

        let report = presence.broadcast("roll call");
        assert_eq!(report.delivered, 1);
        assert!(report.failed.is_empty());
    }
}

