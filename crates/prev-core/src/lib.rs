//! Core types for the PreV engine.
//!
//! This crate provides the foundational pieces shared by every other crate:
//! - Engine and scene configuration
//! - Frame clock and FPS reporting
//! - Common error types

pub mod config;
pub mod error;
pub mod time;

pub use config::{EngineConfig, Position, SceneConfig, Size};
pub use error::{Error, Result};
pub use time::{Clock, FpsService};
