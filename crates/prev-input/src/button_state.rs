//! Per-frame press/release tracking shared by keys and mouse buttons.

/// State of a key or mouse button.
///
/// ```text
/// Released ─press()─> JustPressed ─end_frame()─> Pressed
///     ^                                             │
///     │                                          release()
///     │                                             v
///     └────────────end_frame()───────────── JustReleased
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonState {
    /// Pressed since the last `end_frame`.
    JustPressed,
    /// Held down.
    Pressed,
    /// Released since the last `end_frame`.
    JustReleased,
    #[default]
    Released,
}

impl ButtonState {
    /// Returns `true` while held, including the frame it went down.
    #[inline]
    #[must_use]
    pub const fn is_pressed(self) -> bool {
        matches!(self, Self::JustPressed | Self::Pressed)
    }

    #[inline]
    #[must_use]
    pub const fn is_just_pressed(self) -> bool {
        matches!(self, Self::JustPressed)
    }

    #[inline]
    #[must_use]
    pub const fn is_just_released(self) -> bool {
        matches!(self, Self::JustReleased)
    }

    #[inline]
    pub fn press(&mut self) {
        if !self.is_pressed() {
            *self = Self::JustPressed;
        }
    }

    #[inline]
    pub fn release(&mut self) {
        if self.is_pressed() {
            *self = Self::JustReleased;
        }
    }

    /// Settle the transitional states.
    #[inline]
    pub fn end_frame(&mut self) {
        match *self {
            Self::JustPressed => *self = Self::Pressed,
            Self::JustReleased => *self = Self::Released,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_cycle() {
        let mut state = ButtonState::default();
        assert!(!state.is_pressed());

        state.press();
        assert!(state.is_just_pressed());
        state.end_frame();
        assert_eq!(state, ButtonState::Pressed);

        state.release();
        assert!(state.is_just_released());
        assert!(!state.is_pressed());
        state.end_frame();
        assert_eq!(state, ButtonState::Released);
    }

    #[test]
    fn repeated_press_keeps_held_state() {
        let mut state = ButtonState::Pressed;
        state.press();
        assert_eq!(state, ButtonState::Pressed);

        let mut state = ButtonState::Released;
        state.release();
        assert_eq!(state, ButtonState::Released);
    }
}
