//! Engine and scene configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Window size in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns `true` if either dimension is zero (minimized window).
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Window position in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Scene-level rendering configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Present with vertical sync (FIFO) instead of mailbox.
    pub vsync: bool,
    /// Requested number of swapchain images. Also the minimum ring size for
    /// per-frame uniform and descriptor pools.
    pub frames_in_flight: u32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            vsync: true,
            frames_in_flight: 3,
        }
    }
}

impl SceneConfig {
    /// Enable or disable vsync.
    #[must_use]
    pub const fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    /// Set the number of frames in flight.
    #[must_use]
    pub const fn with_frames_in_flight(mut self, frames: u32) -> Self {
        self.frames_in_flight = frames;
        self
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Enable Vulkan validation layers (default: debug builds only).
    pub validation: bool,
    /// Application name reported to the driver and used as window title.
    pub app_name: String,
    /// Start in borderless fullscreen.
    pub full_screen: bool,
    /// Initial window size.
    pub window_size: Size,
    /// Initial window position.
    pub window_position: Position,
    /// Scene configuration.
    pub scene: SceneConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            validation: cfg!(debug_assertions),
            app_name: "PreV Engine".to_string(),
            full_screen: false,
            window_size: Size::new(1280, 960),
            window_position: Position::new(40, 40),
            scene: SceneConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create a new config with the given application name.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            ..Default::default()
        }
    }

    /// Enable or disable validation layers.
    #[must_use]
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    /// Start fullscreen.
    #[must_use]
    pub fn with_full_screen(mut self, full_screen: bool) -> Self {
        self.full_screen = full_screen;
        self
    }

    /// Set the initial window size.
    #[must_use]
    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_size = Size::new(width, height);
        self
    }

    /// Set the initial window position.
    #[must_use]
    pub fn with_window_position(mut self, x: i32, y: i32) -> Self {
        self.window_position = Position::new(x, y);
        self
    }

    /// Replace the scene configuration.
    #[must_use]
    pub fn with_scene(mut self, scene: SceneConfig) -> Self {
        self.scene = scene;
        self
    }

    /// Check that the configuration describes something we can run.
    pub fn validate(&self) -> Result<()> {
        if self.scene.frames_in_flight == 0 {
            return Err(Error::InvalidConfig(
                "frames_in_flight must be at least 1".to_string(),
            ));
        }
        if !self.full_screen && self.window_size.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "window size {}x{} is empty",
                self.window_size.width, self.window_size.height
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.window_size, Size::new(1280, 960));
        assert_eq!(config.window_position, Position::new(40, 40));
        assert!(config.scene.vsync);
        assert_eq!(config.scene.frames_in_flight, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_chain() {
        let config = EngineConfig::new("demo")
            .with_validation(false)
            .with_window_size(800, 600)
            .with_scene(SceneConfig::default().with_vsync(false).with_frames_in_flight(2));

        assert_eq!(config.app_name, "demo");
        assert!(!config.validation);
        assert_eq!(config.window_size, Size::new(800, 600));
        assert!(!config.scene.vsync);
        assert_eq!(config.scene.frames_in_flight, 2);
    }

    #[test]
    fn zero_frames_rejected() {
        let config =
            EngineConfig::default().with_scene(SceneConfig::default().with_frames_in_flight(0));
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn empty_window_rejected_unless_fullscreen() {
        let config = EngineConfig::default().with_window_size(0, 600);
        assert!(config.validate().is_err());
        assert!(config.with_full_screen(true).validate().is_ok());
    }
}
