//! Keyboard state driven by [`KeyEvent`] and [`TextEvent`].

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;
use prev_event::events::{
    KeyAction, KeyCode, KeyEvent, Modifiers, TextEvent, WindowFocusChangeEvent,
};
use prev_event::{EventChannel, SubscriptionGuard};

use crate::button_state::ButtonState;
use crate::listeners::{ListenerId, Listeners};

#[derive(Default)]
struct KeyboardShared {
    state: Mutex<KeyboardState>,
    key_listeners: Listeners<KeyEvent>,
    text_listeners: Listeners<TextEvent>,
}

#[derive(Default)]
struct KeyboardState {
    keys: HashMap<KeyCode, ButtonState>,
    modifiers: Modifiers,
}

impl KeyboardShared {
    fn on_key(&self, event: &KeyEvent) {
        {
            let mut state = self.state.lock();
            state.modifiers = event.modifiers;
            let key = state.keys.entry(event.key).or_default();
            match event.action {
                KeyAction::Press => key.press(),
                KeyAction::Release => key.release(),
            }
        }
        self.key_listeners.notify(event);
    }

    fn clear(&self) {
        let mut state = self.state.lock();
        state.keys.clear();
        state.modifiers = Modifiers::empty();
    }
}

/// Tracks pressed keys and forwards key and text events to listeners.
///
/// Subscribes to the channel on construction and unsubscribes on drop.
/// Held keys are forgotten when the window loses focus, since their release
/// will never be reported.
pub struct KeyboardInput {
    shared: Arc<KeyboardShared>,
    _key_subscription: SubscriptionGuard<KeyEvent>,
    _text_subscription: SubscriptionGuard<TextEvent>,
    _focus_subscription: SubscriptionGuard<WindowFocusChangeEvent>,
}

impl KeyboardInput {
    pub fn new(channel: &EventChannel) -> Self {
        let shared = Arc::new(KeyboardShared::default());

        let on_key = shared.clone();
        let key_subscription = channel.subscribe_guarded(move |e: &KeyEvent| on_key.on_key(e));
        let on_text = shared.clone();
        let text_subscription =
            channel.subscribe_guarded(move |e: &TextEvent| on_text.text_listeners.notify(e));
        let on_focus = shared.clone();
        let focus_subscription = channel.subscribe_guarded(move |e: &WindowFocusChangeEvent| {
            if !e.has_focus {
                on_focus.clear();
            }
        });

        Self {
            shared,
            _key_subscription: key_subscription,
            _text_subscription: text_subscription,
            _focus_subscription: focus_subscription,
        }
    }

    #[must_use]
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.shared
            .state
            .lock()
            .keys
            .get(&key)
            .is_some_and(|s| s.is_pressed())
    }

    /// Returns `true` if `key` went down since the last [`KeyboardInput::end_frame`].
    #[must_use]
    pub fn is_key_just_pressed(&self, key: KeyCode) -> bool {
        self.shared
            .state
            .lock()
            .keys
            .get(&key)
            .is_some_and(|s| s.is_just_pressed())
    }

    #[must_use]
    pub fn is_key_just_released(&self, key: KeyCode) -> bool {
        self.shared
            .state
            .lock()
            .keys
            .get(&key)
            .is_some_and(|s| s.is_just_released())
    }

    /// Keys currently held, in no particular order.
    #[must_use]
    pub fn pressed_keys(&self) -> Vec<KeyCode> {
        self.shared
            .state
            .lock()
            .keys
            .iter()
            .filter(|(_, s)| s.is_pressed())
            .map(|(k, _)| *k)
            .collect()
    }

    /// Modifiers carried by the most recent key event.
    #[must_use]
    pub fn modifiers(&self) -> Modifiers {
        self.shared.state.lock().modifiers
    }

    pub fn add_key_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&KeyEvent) + Send + Sync + 'static,
    {
        self.shared.key_listeners.add(listener)
    }

    pub fn remove_key_listener(&self, id: ListenerId) -> bool {
        self.shared.key_listeners.remove(id)
    }

    #[must_use]
    pub fn is_key_listener_registered(&self, id: ListenerId) -> bool {
        self.shared.key_listeners.contains(id)
    }

    pub fn add_text_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&TextEvent) + Send + Sync + 'static,
    {
        self.shared.text_listeners.add(listener)
    }

    pub fn remove_text_listener(&self, id: ListenerId) -> bool {
        self.shared.text_listeners.remove(id)
    }

    #[must_use]
    pub fn is_text_listener_registered(&self, id: ListenerId) -> bool {
        self.shared.text_listeners.contains(id)
    }

    /// Settle just-pressed / just-released states. Call once per frame.
    pub fn end_frame(&self) {
        for state in self.shared.state.lock().keys.values_mut() {
            state.end_frame();
        }
    }

    /// Forget every key.
    pub fn clear(&self) {
        self.shared.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_pressed_keys_from_channel() {
        let channel = EventChannel::new();
        let keyboard = KeyboardInput::new(&channel);

        channel.broadcast(&KeyEvent::press(KeyCode::KeyW));
        assert!(keyboard.is_key_pressed(KeyCode::KeyW));
        assert!(keyboard.is_key_just_pressed(KeyCode::KeyW));
        assert_eq!(keyboard.pressed_keys(), vec![KeyCode::KeyW]);

        keyboard.end_frame();
        assert!(keyboard.is_key_pressed(KeyCode::KeyW));
        assert!(!keyboard.is_key_just_pressed(KeyCode::KeyW));

        channel.broadcast(&KeyEvent::release(KeyCode::KeyW));
        assert!(!keyboard.is_key_pressed(KeyCode::KeyW));
        assert!(keyboard.is_key_just_released(KeyCode::KeyW));
        assert!(keyboard.pressed_keys().is_empty());
    }

    #[test]
    fn queued_key_events_apply_on_dispatch() {
        let channel = EventChannel::new();
        let keyboard = KeyboardInput::new(&channel);

        channel.post_queued(KeyEvent::press(KeyCode::Space));
        assert!(!keyboard.is_key_pressed(KeyCode::Space));
        channel.dispatch_all();
        assert!(keyboard.is_key_pressed(KeyCode::Space));
    }

    #[test]
    fn listeners_receive_events() {
        let channel = EventChannel::new();
        let keyboard = KeyboardInput::new(&channel);

        let keys = Arc::new(Mutex::new(Vec::new()));
        let sink = keys.clone();
        let id = keyboard.add_key_listener(move |e| sink.lock().push(e.key));

        let text = Arc::new(Mutex::new(String::new()));
        let sink = text.clone();
        keyboard.add_text_listener(move |e| sink.lock().push_str(&e.text));

        channel.broadcast(&KeyEvent {
            action: KeyAction::Press,
            key: KeyCode::KeyA,
            modifiers: Modifiers::SHIFT,
        });
        channel.broadcast(&TextEvent {
            text: "A".to_string(),
        });
        assert_eq!(*keys.lock(), vec![KeyCode::KeyA]);
        assert_eq!(*text.lock(), "A");
        assert_eq!(keyboard.modifiers(), Modifiers::SHIFT);

        assert!(keyboard.remove_key_listener(id));
        assert!(!keyboard.is_key_listener_registered(id));
        channel.broadcast(&KeyEvent::release(KeyCode::KeyA));
        assert_eq!(keys.lock().len(), 1);
    }

    #[test]
    fn focus_loss_releases_keys() {
        let channel = EventChannel::new();
        let keyboard = KeyboardInput::new(&channel);

        channel.broadcast(&KeyEvent::press(KeyCode::ShiftLeft));
        channel.broadcast(&WindowFocusChangeEvent { has_focus: true });
        assert!(keyboard.is_key_pressed(KeyCode::ShiftLeft));

        channel.broadcast(&WindowFocusChangeEvent { has_focus: false });
        assert!(keyboard.pressed_keys().is_empty());
        assert_eq!(keyboard.modifiers(), Modifiers::empty());
    }

    #[test]
    fn dropping_unsubscribes() {
        let channel = EventChannel::new();
        let keyboard = KeyboardInput::new(&channel);
        assert_eq!(channel.handler_count::<KeyEvent>(), 1);
        drop(keyboard);
        assert_eq!(channel.handler_count::<KeyEvent>(), 0);
        assert_eq!(channel.handler_count::<TextEvent>(), 0);
        assert_eq!(channel.handler_count::<WindowFocusChangeEvent>(), 0);
    }
}
