//! End-to-end delivery through the channel using the key event payload.

use std::sync::Arc;

use parking_lot::Mutex;
use prev_event::events::{KeyCode, KeyEvent};
use prev_event::{EventChannel, EventError};

type Log = Arc<Mutex<Vec<KeyEvent>>>;

fn recorder(channel: &EventChannel) -> (Log, prev_event::Subscription<KeyEvent>) {
    let log: Log = Arc::default();
    let sink = log.clone();
    let sub = channel.subscribe(move |e: &KeyEvent| sink.lock().push(*e));
    (log, sub)
}

#[test]
fn broadcast_then_queued_dispatch() {
    let channel = EventChannel::new();

    let (h1, _) = recorder(&channel);
    channel.broadcast(&KeyEvent::press(KeyCode::KeyA));
    // Synchronous: already delivered when broadcast returns.
    assert_eq!(*h1.lock(), vec![KeyEvent::press(KeyCode::KeyA)]);

    let (h2, _) = recorder(&channel);
    channel.post_queued(KeyEvent::release(KeyCode::KeyA));
    channel.post_queued(KeyEvent::press(KeyCode::KeyB));
    assert_eq!(h1.lock().len(), 1);
    assert!(h2.lock().is_empty());

    assert_eq!(channel.dispatch_all(), 2);

    let expected = vec![
        KeyEvent::release(KeyCode::KeyA),
        KeyEvent::press(KeyCode::KeyB),
    ];
    assert_eq!(h1.lock()[1..], expected[..]);
    assert_eq!(*h2.lock(), expected);
}

#[test]
fn unsubscribed_handler_is_not_invoked() {
    let channel = EventChannel::new();
    let (h1, sub) = recorder(&channel);

    channel.unsubscribe(sub).unwrap();
    channel.broadcast(&KeyEvent::press(KeyCode::KeyA));
    assert!(h1.lock().is_empty());

    let err = channel.unsubscribe(sub).unwrap_err();
    assert!(matches!(err, EventError::UnknownSubscription(_)));
}

#[test]
fn handler_can_unsubscribe_itself_mid_broadcast() {
    let channel = EventChannel::new();
    let slot: Arc<Mutex<Option<prev_event::Subscription<KeyEvent>>>> = Arc::default();
    let calls = Arc::new(Mutex::new(0));

    let sub = channel.subscribe({
        let channel = channel.clone();
        let slot = slot.clone();
        let calls = calls.clone();
        move |_: &KeyEvent| {
            *calls.lock() += 1;
            if let Some(me) = slot.lock().take() {
                channel.unsubscribe(me).unwrap();
            }
        }
    });
    *slot.lock() = Some(sub);

    channel.broadcast(&KeyEvent::press(KeyCode::KeyA));
    channel.broadcast(&KeyEvent::press(KeyCode::KeyA));
    assert_eq!(*calls.lock(), 1);
    assert_eq!(channel.handler_count::<KeyEvent>(), 0);
}
