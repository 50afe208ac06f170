//! Event payloads exchanged between the window, input and engine layers.
//!
//! Every payload is plain data. Producers post them through an
//! [`EventChannel`](crate::EventChannel) and consumers subscribe by type.

use bitflags::bitflags;
use glam::Vec2;
use prev_core::{Position, Size};
use winit::keyboard::ModifiersState;

pub use winit::keyboard::KeyCode;

// Window lifecycle

/// The platform window was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCreatedEvent {
    pub size: Size,
}

/// The platform window is about to be destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowDestroyedEvent;

/// Window properties changed (scale factor, theme, occlusion).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowChangeEvent;

/// The drawable area changed size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowResizeEvent {
    pub width: u32,
    pub height: u32,
}

/// The window moved on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowMovedEvent {
    pub position: Position,
}

/// The window gained or lost keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowFocusChangeEvent {
    pub has_focus: bool,
}

/// The swapchain surface was rebuilt with a new extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceChangedEvent {
    pub width: u32,
    pub height: u32,
}

// Keyboard

bitflags! {
    /// Modifier key flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0000_0001;
        const CTRL  = 0b0000_0010;
        const ALT   = 0b0000_0100;
        const SUPER = 0b0000_1000;
    }
}

impl From<ModifiersState> for Modifiers {
    fn from(state: ModifiersState) -> Self {
        let mut modifiers = Self::empty();
        if state.shift_key() {
            modifiers |= Self::SHIFT;
        }
        if state.control_key() {
            modifiers |= Self::CTRL;
        }
        if state.alt_key() {
            modifiers |= Self::ALT;
        }
        if state.super_key() {
            modifiers |= Self::SUPER;
        }
        modifiers
    }
}

/// Key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    Press,
    Release,
}

/// A physical key was pressed or released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub action: KeyAction,
    pub key: KeyCode,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    #[must_use]
    pub const fn press(key: KeyCode) -> Self {
        Self {
            action: KeyAction::Press,
            key,
            modifiers: Modifiers::empty(),
        }
    }

    #[must_use]
    pub const fn release(key: KeyCode) -> Self {
        Self {
            action: KeyAction::Release,
            key,
            modifiers: Modifiers::empty(),
        }
    }
}

/// Committed text input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEvent {
    pub text: String,
}

// Mouse

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    Back,
    Forward,
}

/// Mouse transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseAction {
    Press,
    Release,
    Move,
}

/// A mouse button changed state or the cursor moved.
///
/// `button` is `None` for plain movement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseEvent {
    pub action: MouseAction,
    pub button: Option<MouseButton>,
    /// Cursor position in window coordinates.
    pub position: Vec2,
    /// Window extent at the time of the event.
    pub extent: Vec2,
}

/// Mouse wheel movement in whole lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseScrollEvent {
    pub delta: i32,
    pub position: Vec2,
}

/// Ask the window to capture (or release) the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseLockRequest {
    pub lock: bool,
}

/// Ask the window to show or hide the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseCursorVisibilityRequest {
    pub visible: bool,
}

// Touch

/// Touch transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchAction {
    Down,
    Up,
    Move,
}

/// A touch pointer changed state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchEvent {
    pub action: TouchAction,
    pub pointer_id: u8,
    pub position: Vec2,
    pub extent: Vec2,
}
