//! Platform layer of the PreV engine.
//!
//! [`Window`] is the capability set the engine needs from a native window.
//! [`WinitWindow`] implements it with winit, pumping the platform event loop
//! once per engine iteration and turning native events into typed events on
//! the [`EventChannel`](prev_event::EventChannel).

mod config;
mod error;
mod translate;
mod winit_window;

use prev_core::Size;

pub use config::WindowConfig;
pub use error::{PlatformError, Result};
pub use translate::PIXELS_PER_SCROLL_LINE;
pub use winit_window::WinitWindow;

/// What the engine needs from a window.
///
/// Surface creation goes through the window's raw handles
/// (`raw_window_handle::HasWindowHandle` and `HasDisplayHandle`).
pub trait Window {
    /// Handle pending platform events.
    ///
    /// Returns `false` once the window was closed and the engine should exit.
    fn process_events(&mut self) -> bool;

    /// Drawable size in physical pixels.
    fn size(&self) -> Size;

    fn has_focus(&self) -> bool;

    fn set_title(&mut self, title: &str);

    /// A minimized window has nothing to draw into.
    fn is_minimized(&self) -> bool {
        self.size().is_empty()
    }
}
