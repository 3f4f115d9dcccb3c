//! Integration tests for signal dispatch across threads and tasks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use userware_signals::Signal;

#[derive(Debug, Clone)]
struct AccountEvent {
    actor: String,
    target: String,
}

// ═════════════════════════════════════════════════════════════════════
// 1. Payload delivery
// ═════════════════════════════════════════════════════════════════════

#[test]
fn test_receiver_sees_payload() {
    let signal: Signal<AccountEvent> = Signal::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();

    signal.connect(
        "audit",
        Arc::new(move |event: &AccountEvent| {
            seen_clone
                .lock()
                .unwrap()
                .push(format!("{} -> {}", event.actor, event.target));
        }),
    );

    signal.send(&AccountEvent {
        actor: "staff".into(),
        target: "bob".into(),
    });
    assert_eq!(*seen.lock().unwrap(), vec!["staff -> bob"]);
}

// ═════════════════════════════════════════════════════════════════════
// 2. Concurrent senders
// ═════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_concurrent_sends_from_tasks() {
    let signal = Arc::new(Signal::<AccountEvent>::new());
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    signal.connect(
        "counter",
        Arc::new(move |_: &AccountEvent| {
            c.fetch_add(1, Ordering::SeqCst);
        }),
    );

    let mut handles = Vec::new();
    for i in 0..16 {
        let signal = Arc::clone(&signal);
        handles.push(tokio::spawn(async move {
            signal.send(&AccountEvent {
                actor: format!("staff{i}"),
                target: "bob".into(),
            })
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), 1);
    }
    assert_eq!(count.load(Ordering::SeqCst), 16);
}

// ═════════════════════════════════════════════════════════════════════
// 3. Disconnect stops delivery
// ═════════════════════════════════════════════════════════════════════

#[test]
fn test_disconnect_stops_delivery() {
    let signal: Signal<AccountEvent> = Signal::new();
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    signal.connect(
        "counter",
        Arc::new(move |_: &AccountEvent| {
            c.fetch_add(1, Ordering::SeqCst);
        }),
    );

    let event = AccountEvent {
        actor: "a".into(),
        target: "b".into(),
    };
    signal.send(&event);
    signal.disconnect("counter");
    signal.send(&event);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}
