//! GPU error types.

use ash::vk;
use thiserror::Error;

/// GPU-related errors.
#[derive(Error, Debug)]
pub enum GpuError {
    /// Vulkan error.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// The Vulkan loader could not be found.
    #[error("Failed to load Vulkan: {0}")]
    Loading(String),

    /// No GPU can present to the surface.
    #[error("No GPU can present to this surface (is DRI3 enabled?)")]
    NoPresentableDevice,

    /// No queue family matches the requested flags (and surface).
    #[error("No queue family supports {0:?}")]
    QueueFamilyNotFound(vk::QueueFlags),

    /// Every queue of the matching family is already requested.
    #[error("Queue family {family} has no queues left ({count} in use)")]
    QueueFamilyExhausted { family: u32, count: u32 },

    /// None of the preferred formats is supported.
    #[error("No supported {0} format among the preferred list")]
    FormatNotSupported(&'static str),

    /// Memory allocation failed.
    #[error("Memory allocation failed: {0}")]
    AllocationFailed(String),

    /// Surface creation failed.
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    /// Swapchain creation failed.
    #[error("Swapchain creation failed: {0}")]
    SwapchainCreation(String),

    /// Invalid state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;
