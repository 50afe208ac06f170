//! Mouse state driven by [`MouseEvent`] and [`MouseScrollEvent`].

use std::sync::Arc;

use glam::Vec2;
use parking_lot::Mutex;
use prev_event::events::{
    MouseAction, MouseButton, MouseCursorVisibilityRequest, MouseEvent, MouseLockRequest,
    MouseScrollEvent,
};
use prev_event::{EventChannel, SubscriptionGuard};

use crate::button_state::ButtonState;
use crate::listeners::{ListenerId, Listeners};

const BUTTON_COUNT: usize = 5;

const fn button_index(button: MouseButton) -> usize {
    match button {
        MouseButton::Left => 0,
        MouseButton::Middle => 1,
        MouseButton::Right => 2,
        MouseButton::Back => 3,
        MouseButton::Forward => 4,
    }
}

const ALL_BUTTONS: [MouseButton; BUTTON_COUNT] = [
    MouseButton::Left,
    MouseButton::Middle,
    MouseButton::Right,
    MouseButton::Back,
    MouseButton::Forward,
];

struct MouseState {
    position: Vec2,
    delta: Vec2,
    scroll: i32,
    buttons: [ButtonState; BUTTON_COUNT],
    locked: bool,
    cursor_visible: bool,
}

impl Default for MouseState {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            delta: Vec2::ZERO,
            scroll: 0,
            buttons: [ButtonState::Released; BUTTON_COUNT],
            locked: false,
            cursor_visible: true,
        }
    }
}

#[derive(Default)]
struct MouseShared {
    state: Mutex<MouseState>,
    action_listeners: Listeners<MouseEvent>,
    scroll_listeners: Listeners<MouseScrollEvent>,
}

impl MouseShared {
    fn on_action(&self, event: &MouseEvent) {
        {
            let mut state = self.state.lock();
            let last = state.position;
            state.delta += event.position - last;
            state.position = event.position;
            if let Some(button) = event.button {
                let button = &mut state.buttons[button_index(button)];
                match event.action {
                    MouseAction::Press => button.press(),
                    MouseAction::Release => button.release(),
                    MouseAction::Move => {}
                }
            }
        }
        self.action_listeners.notify(event);
    }

    fn on_scroll(&self, event: &MouseScrollEvent) {
        self.state.lock().scroll += event.delta;
        self.scroll_listeners.notify(event);
    }
}

/// Tracks cursor position and buttons, and owns the lock / visibility state
/// the window applies.
pub struct MouseInput {
    channel: EventChannel,
    shared: Arc<MouseShared>,
    _action_subscription: SubscriptionGuard<MouseEvent>,
    _scroll_subscription: SubscriptionGuard<MouseScrollEvent>,
}

impl MouseInput {
    pub fn new(channel: &EventChannel) -> Self {
        let shared = Arc::new(MouseShared::default());

        let on_action = shared.clone();
        let action_subscription =
            channel.subscribe_guarded(move |e: &MouseEvent| on_action.on_action(e));
        let on_scroll = shared.clone();
        let scroll_subscription =
            channel.subscribe_guarded(move |e: &MouseScrollEvent| on_scroll.on_scroll(e));

        Self {
            channel: channel.clone(),
            shared,
            _action_subscription: action_subscription,
            _scroll_subscription: scroll_subscription,
        }
    }

    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.shared.state.lock().position
    }

    /// Movement accumulated since the last [`MouseInput::end_frame`].
    #[must_use]
    pub fn delta(&self) -> Vec2 {
        self.shared.state.lock().delta
    }

    /// Wheel lines accumulated since the last [`MouseInput::end_frame`].
    #[must_use]
    pub fn scroll(&self) -> i32 {
        self.shared.state.lock().scroll
    }

    #[must_use]
    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.shared.state.lock().buttons[button_index(button)].is_pressed()
    }

    #[must_use]
    pub fn is_button_just_pressed(&self, button: MouseButton) -> bool {
        self.shared.state.lock().buttons[button_index(button)].is_just_pressed()
    }

    #[must_use]
    pub fn pressed_buttons(&self) -> Vec<MouseButton> {
        let state = self.shared.state.lock();
        ALL_BUTTONS
            .into_iter()
            .filter(|b| state.buttons[button_index(*b)].is_pressed())
            .collect()
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.shared.state.lock().locked
    }

    /// Record the lock state and ask the window to apply it.
    pub fn set_locked(&self, locked: bool) {
        self.shared.state.lock().locked = locked;
        tracing::debug!("Mouse lock requested: {locked}");
        self.channel.broadcast(&MouseLockRequest { lock: locked });
    }

    #[must_use]
    pub fn is_cursor_visible(&self) -> bool {
        self.shared.state.lock().cursor_visible
    }

    /// Record cursor visibility and ask the window to apply it.
    pub fn set_cursor_visible(&self, visible: bool) {
        self.shared.state.lock().cursor_visible = visible;
        self.channel
            .broadcast(&MouseCursorVisibilityRequest { visible });
    }

    pub fn add_action_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&MouseEvent) + Send + Sync + 'static,
    {
        self.shared.action_listeners.add(listener)
    }

    pub fn remove_action_listener(&self, id: ListenerId) -> bool {
        self.shared.action_listeners.remove(id)
    }

    #[must_use]
    pub fn is_action_listener_registered(&self, id: ListenerId) -> bool {
        self.shared.action_listeners.contains(id)
    }

    pub fn add_scroll_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&MouseScrollEvent) + Send + Sync + 'static,
    {
        self.shared.scroll_listeners.add(listener)
    }

    pub fn remove_scroll_listener(&self, id: ListenerId) -> bool {
        self.shared.scroll_listeners.remove(id)
    }

    #[must_use]
    pub fn is_scroll_listener_registered(&self, id: ListenerId) -> bool {
        self.shared.scroll_listeners.contains(id)
    }

    /// Settle button transitions and reset the per-frame deltas.
    pub fn end_frame(&self) {
        let mut state = self.shared.state.lock();
        for button in &mut state.buttons {
            button.end_frame();
        }
        state.delta = Vec2::ZERO;
        state.scroll = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(action: MouseAction, button: Option<MouseButton>, x: f32, y: f32) -> MouseEvent {
        MouseEvent {
            action,
            button,
            position: Vec2::new(x, y),
            extent: Vec2::new(800.0, 600.0),
        }
    }

    #[test]
    fn position_and_buttons() {
        let channel = EventChannel::new();
        let mouse = MouseInput::new(&channel);

        channel.broadcast(&event(MouseAction::Move, None, 100.0, 200.0));
        channel.broadcast(&event(MouseAction::Move, None, 150.0, 220.0));
        assert_eq!(mouse.position(), Vec2::new(150.0, 220.0));
        assert_eq!(mouse.delta(), Vec2::new(150.0, 220.0));

        mouse.end_frame();
        assert_eq!(mouse.delta(), Vec2::ZERO);

        channel.broadcast(&event(MouseAction::Press, Some(MouseButton::Right), 160.0, 220.0));
        assert!(mouse.is_button_pressed(MouseButton::Right));
        assert!(mouse.is_button_just_pressed(MouseButton::Right));
        assert_eq!(mouse.pressed_buttons(), vec![MouseButton::Right]);
        assert_eq!(mouse.delta(), Vec2::new(10.0, 0.0));

        channel.broadcast(&event(MouseAction::Release, Some(MouseButton::Right), 160.0, 220.0));
        assert!(!mouse.is_button_pressed(MouseButton::Right));
        assert!(mouse.pressed_buttons().is_empty());
    }

    #[test]
    fn scroll_accumulates_per_frame() {
        let channel = EventChannel::new();
        let mouse = MouseInput::new(&channel);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        mouse.add_scroll_listener(move |e| sink.lock().push(e.delta));

        for delta in [1, 2, -1] {
            channel.broadcast(&MouseScrollEvent {
                delta,
                position: Vec2::ZERO,
            });
        }
        assert_eq!(mouse.scroll(), 2);
        assert_eq!(*seen.lock(), vec![1, 2, -1]);

        mouse.end_frame();
        assert_eq!(mouse.scroll(), 0);
    }

    #[test]
    fn lock_and_visibility_are_requested_from_window() {
        let channel = EventChannel::new();
        let mouse = MouseInput::new(&channel);

        let requests = Arc::new(Mutex::new(Vec::new()));
        let sink = requests.clone();
        let _lock = channel.subscribe_guarded(move |r: &MouseLockRequest| sink.lock().push(r.lock));
        let visibility = Arc::new(Mutex::new(Vec::new()));
        let sink = visibility.clone();
        let _visible = channel
            .subscribe_guarded(move |r: &MouseCursorVisibilityRequest| sink.lock().push(r.visible));

        assert!(!mouse.is_locked());
        assert!(mouse.is_cursor_visible());

        mouse.set_locked(true);
        mouse.set_cursor_visible(false);
        assert!(mouse.is_locked());
        assert!(!mouse.is_cursor_visible());
        assert_eq!(*requests.lock(), vec![true]);
        assert_eq!(*visibility.lock(), vec![false]);
    }

    #[test]
    fn action_listener_registration() {
        let channel = EventChannel::new();
        let mouse = MouseInput::new(&channel);

        let count = Arc::new(Mutex::new(0));
        let sink = count.clone();
        let id = mouse.add_action_listener(move |_| *sink.lock() += 1);
        assert!(mouse.is_action_listener_registered(id));

        channel.broadcast(&event(MouseAction::Move, None, 1.0, 1.0));
        assert!(mouse.remove_action_listener(id));
        channel.broadcast(&event(MouseAction::Move, None, 2.0, 2.0));
        assert_eq!(*count.lock(), 1);
    }
}
