//! Native winit values to engine event values.

use prev_event::events::{KeyAction, KeyCode, MouseAction, MouseButton, TouchAction};
use winit::event::{ElementState, MouseButton as NativeMouseButton, MouseScrollDelta, TouchPhase};
use winit::keyboard::PhysicalKey;

/// Pixel scroll distance counted as one wheel line.
pub const PIXELS_PER_SCROLL_LINE: f64 = 100.0;

pub(crate) const fn key_action(state: ElementState) -> KeyAction {
    match state {
        ElementState::Pressed => KeyAction::Press,
        ElementState::Released => KeyAction::Release,
    }
}

pub(crate) const fn key_code(key: PhysicalKey) -> Option<KeyCode> {
    match key {
        PhysicalKey::Code(code) => Some(code),
        PhysicalKey::Unidentified(_) => None,
    }
}

pub(crate) const fn mouse_action(state: ElementState) -> MouseAction {
    match state {
        ElementState::Pressed => MouseAction::Press,
        ElementState::Released => MouseAction::Release,
    }
}

pub(crate) const fn mouse_button(button: NativeMouseButton) -> Option<MouseButton> {
    match button {
        NativeMouseButton::Left => Some(MouseButton::Left),
        NativeMouseButton::Middle => Some(MouseButton::Middle),
        NativeMouseButton::Right => Some(MouseButton::Right),
        NativeMouseButton::Back => Some(MouseButton::Back),
        NativeMouseButton::Forward => Some(MouseButton::Forward),
        NativeMouseButton::Other(_) => None,
    }
}

/// Whole wheel lines, positive away from the user.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn scroll_lines(delta: MouseScrollDelta) -> i32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y.round() as i32,
        MouseScrollDelta::PixelDelta(pos) => (pos.y / PIXELS_PER_SCROLL_LINE).round() as i32,
    }
}

pub(crate) const fn touch_action(phase: TouchPhase) -> TouchAction {
    match phase {
        TouchPhase::Started => TouchAction::Down,
        TouchPhase::Moved => TouchAction::Move,
        TouchPhase::Ended | TouchPhase::Cancelled => TouchAction::Up,
    }
}

/// Pointer ids wrap into the `u8` range of [`prev_event::events::TouchEvent`].
#[allow(clippy::cast_possible_truncation)]
pub(crate) const fn touch_pointer_id(id: u64) -> u8 {
    (id & 0xFF) as u8
}

#[cfg(test)]
mod tests {
    use winit::dpi::PhysicalPosition;
    use winit::keyboard::NativeKeyCode;

    use super::*;

    #[test]
    fn keys() {
        assert_eq!(key_code(PhysicalKey::Code(KeyCode::KeyQ)), Some(KeyCode::KeyQ));
        assert_eq!(key_code(PhysicalKey::Unidentified(NativeKeyCode::Unidentified)), None);
        assert_eq!(key_action(ElementState::Pressed), KeyAction::Press);
        assert_eq!(key_action(ElementState::Released), KeyAction::Release);
    }

    #[test]
    fn mouse_buttons() {
        assert_eq!(mouse_button(NativeMouseButton::Middle), Some(MouseButton::Middle));
        assert_eq!(mouse_button(NativeMouseButton::Other(7)), None);
        assert_eq!(mouse_action(ElementState::Released), MouseAction::Release);
    }

    #[test]
    fn scroll_is_measured_in_lines() {
        assert_eq!(scroll_lines(MouseScrollDelta::LineDelta(0.0, 2.0)), 2);
        assert_eq!(scroll_lines(MouseScrollDelta::LineDelta(3.0, -1.0)), -1);
        let pixels = MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, 250.0));
        assert_eq!(scroll_lines(pixels), 3);
    }

    #[test]
    fn touch_phases() {
        assert_eq!(touch_action(TouchPhase::Started), TouchAction::Down);
        assert_eq!(touch_action(TouchPhase::Moved), TouchAction::Move);
        assert_eq!(touch_action(TouchPhase::Cancelled), TouchAction::Up);
        assert_eq!(touch_pointer_id(3), 3);
        assert_eq!(touch_pointer_id(0x1_02), 2);
    }
}
