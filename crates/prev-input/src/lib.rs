//! Input state tracking for the PreV engine.
//!
//! Each component subscribes to the [`EventChannel`] for its payload types,
//! keeps the current state (pressed keys, cursor position, touch pointers)
//! and forwards the events to its own listeners.
//!
//! ```ignore
//! let inputs = Inputs::new(&channel);
//!
//! // Once per frame, after the channel was dispatched:
//! if inputs.keyboard().is_key_just_pressed(KeyCode::Escape) {
//!     let mouse = inputs.mouse();
//!     mouse.set_locked(!mouse.is_locked());
//! }
//! inputs.end_frame();
//! ```

mod button_state;
mod keyboard;
mod listeners;
mod mouse;
mod touch;

use prev_event::EventChannel;

pub use button_state::ButtonState;
pub use keyboard::KeyboardInput;
pub use listeners::{ListenerId, Listeners};
pub use mouse::MouseInput;
pub use prev_event::events::{KeyCode, MouseButton};
pub use touch::TouchInput;

/// Keyboard, mouse and touch trackers bound to one channel.
pub struct Inputs {
    keyboard: KeyboardInput,
    mouse: MouseInput,
    touch: TouchInput,
}

impl Inputs {
    pub fn new(channel: &EventChannel) -> Self {
        Self {
            keyboard: KeyboardInput::new(channel),
            mouse: MouseInput::new(channel),
            touch: TouchInput::new(channel),
        }
    }

    pub const fn keyboard(&self) -> &KeyboardInput {
        &self.keyboard
    }

    pub const fn mouse(&self) -> &MouseInput {
        &self.mouse
    }

    pub const fn touch(&self) -> &TouchInput {
        &self.touch
    }

    /// Settle per-frame transitions on every tracker.
    pub fn end_frame(&self) {
        self.keyboard.end_frame();
        self.mouse.end_frame();
    }
}
