//! Presentation surfaces.
//!
//! [`SurfaceSupport`] is the narrow query interface the device selection and
//! swapchain code need from a surface. [`Surface`] implements it on top of
//! `VK_KHR_surface`.

use std::sync::Arc;

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::error::{GpuError, Result};
use crate::instance::Instance;

/// Surface queries used for device selection and swapchain setup.
pub trait SurfaceSupport {
    /// Native surface handle.
    fn handle(&self) -> vk::SurfaceKHR;

    /// Can queue family `family` of `gpu` present to this surface?
    fn supports_present(&self, gpu: vk::PhysicalDevice, family: u32) -> bool;

    /// Color formats the surface accepts.
    fn formats(&self, gpu: vk::PhysicalDevice) -> Vec<vk::SurfaceFormatKHR>;

    /// Present modes the surface accepts.
    fn present_modes(&self, gpu: vk::PhysicalDevice) -> Vec<vk::PresentModeKHR>;

    /// Current capabilities (extent, image count limits, transforms).
    fn capabilities(&self, gpu: vk::PhysicalDevice) -> Result<vk::SurfaceCapabilitiesKHR>;
}

/// A window surface.
pub struct Surface {
    raw: vk::SurfaceKHR,
    instance: Arc<Instance>,
}

impl Surface {
    /// Create a surface for a window.
    pub fn from_window<W>(instance: &Arc<Instance>, window: &W) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let display = window
            .display_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get display handle: {e}")))?;
        let window_handle = window
            .window_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get window handle: {e}")))?;

        let raw = unsafe {
            ash_window::create_surface(
                instance.entry(),
                instance.raw(),
                display.as_raw(),
                window_handle.as_raw(),
                None,
            )
        }
        .map_err(|e| GpuError::SurfaceCreation(e.to_string()))?;

        Ok(Self {
            raw,
            instance: instance.clone(),
        })
    }

    pub fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }
}

impl SurfaceSupport for Surface {
    fn handle(&self) -> vk::SurfaceKHR {
        self.raw
    }

    fn supports_present(&self, gpu: vk::PhysicalDevice, family: u32) -> bool {
        unsafe {
            self.instance
                .surface_loader()
                .get_physical_device_surface_support(gpu, family, self.raw)
        }
        .unwrap_or(false)
    }

    fn formats(&self, gpu: vk::PhysicalDevice) -> Vec<vk::SurfaceFormatKHR> {
        unsafe {
            self.instance
                .surface_loader()
                .get_physical_device_surface_formats(gpu, self.raw)
        }
        .unwrap_or_default()
    }

    fn present_modes(&self, gpu: vk::PhysicalDevice) -> Vec<vk::PresentModeKHR> {
        unsafe {
            self.instance
                .surface_loader()
                .get_physical_device_surface_present_modes(gpu, self.raw)
        }
        .unwrap_or_default()
    }

    fn capabilities(&self, gpu: vk::PhysicalDevice) -> Result<vk::SurfaceCapabilitiesKHR> {
        let caps = unsafe {
            self.instance
                .surface_loader()
                .get_physical_device_surface_capabilities(gpu, self.raw)?
        };
        Ok(caps)
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe {
            self.instance.surface_loader().destroy_surface(self.raw, None);
        }
    }
}
