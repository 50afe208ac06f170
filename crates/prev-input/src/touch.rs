//! Touch pointer tracking.

use std::sync::Arc;

use glam::Vec2;
use hashbrown::HashMap;
use parking_lot::Mutex;
use prev_event::events::{TouchAction, TouchEvent};
use prev_event::{EventChannel, SubscriptionGuard};

use crate::listeners::{ListenerId, Listeners};

#[derive(Default)]
struct TouchShared {
    pointers: Mutex<HashMap<u8, Vec2>>,
    listeners: Listeners<TouchEvent>,
}

impl TouchShared {
    fn on_touch(&self, event: &TouchEvent) {
        {
            let mut pointers = self.pointers.lock();
            match event.action {
                TouchAction::Down | TouchAction::Move => {
                    pointers.insert(event.pointer_id, event.position);
                }
                TouchAction::Up => {
                    pointers.remove(&event.pointer_id);
                }
            }
        }
        self.listeners.notify(event);
    }
}

/// Tracks the pointers currently touching the surface.
pub struct TouchInput {
    shared: Arc<TouchShared>,
    _subscription: SubscriptionGuard<TouchEvent>,
}

impl TouchInput {
    pub fn new(channel: &EventChannel) -> Self {
        let shared = Arc::new(TouchShared::default());
        let on_touch = shared.clone();
        let subscription = channel.subscribe_guarded(move |e: &TouchEvent| on_touch.on_touch(e));
        Self {
            shared,
            _subscription: subscription,
        }
    }

    #[must_use]
    pub fn is_pointer_down(&self, pointer_id: u8) -> bool {
        self.shared.pointers.lock().contains_key(&pointer_id)
    }

    /// Last known position of a pointer that is down.
    #[must_use]
    pub fn pointer_position(&self, pointer_id: u8) -> Option<Vec2> {
        self.shared.pointers.lock().get(&pointer_id).copied()
    }

    /// Active pointers sorted by id.
    #[must_use]
    pub fn pointers(&self) -> Vec<(u8, Vec2)> {
        let mut pointers: Vec<_> = self
            .shared
            .pointers
            .lock()
            .iter()
            .map(|(id, pos)| (*id, *pos))
            .collect();
        pointers.sort_unstable_by_key(|(id, _)| *id);
        pointers
    }

    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&TouchEvent) + Send + Sync + 'static,
    {
        self.shared.listeners.add(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.shared.listeners.remove(id)
    }

    #[must_use]
    pub fn is_listener_registered(&self, id: ListenerId) -> bool {
        self.shared.listeners.contains(id)
    }
}
