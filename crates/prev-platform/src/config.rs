//! Window creation parameters.

use prev_core::{EngineConfig, Position, Size};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::window::{Fullscreen, WindowAttributes};

/// How the native window is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowConfig {
    pub title: String,
    pub size: Size,
    pub position: Position,
    /// Borderless fullscreen on the current monitor.
    pub full_screen: bool,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for WindowConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            title: config.app_name.clone(),
            size: config.window_size,
            position: config.window_position,
            full_screen: config.full_screen,
            resizable: true,
        }
    }
}

impl WindowConfig {
    pub(crate) fn attributes(&self) -> WindowAttributes {
        let attributes = winit::window::Window::default_attributes()
            .with_title(&self.title)
            .with_inner_size(PhysicalSize::new(self.size.width, self.size.height))
            .with_position(PhysicalPosition::new(self.position.x, self.position.y))
            .with_resizable(self.resizable);

        if self.full_screen {
            attributes.with_fullscreen(Some(Fullscreen::Borderless(None)))
        } else {
            attributes
        }
    }
}
