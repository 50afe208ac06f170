//! Fences and semaphores.

use ash::vk;

use crate::error::Result;

/// # Safety
/// The device must be valid.
pub unsafe fn create_semaphore(device: &ash::Device) -> Result<vk::Semaphore> {
    Ok(device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None)?)
}

/// Create a fence, optionally already signaled so the first wait returns
/// immediately.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_fence(device: &ash::Device, signaled: bool) -> Result<vk::Fence> {
    let flags = if signaled {
        vk::FenceCreateFlags::SIGNALED
    } else {
        vk::FenceCreateFlags::empty()
    };
    Ok(device.create_fence(&vk::FenceCreateInfo::default().flags(flags), None)?)
}

/// Block until `fence` is signaled.
///
/// # Safety
/// The device and fence must be valid.
#[cfg_attr(feature = "profiling-tracy", tracing::instrument(level = "trace", skip_all))]
pub unsafe fn wait_for_fence(device: &ash::Device, fence: vk::Fence) -> Result<()> {
    device.wait_for_fences(&[fence], true, u64::MAX)?;
    Ok(())
}

/// # Safety
/// The device and fence must be valid and the fence must not be pending.
pub unsafe fn reset_fence(device: &ash::Device, fence: vk::Fence) -> Result<()> {
    device.reset_fences(&[fence])?;
    Ok(())
}

/// Synchronization objects for one swapchain frame slot.
#[derive(Debug, Clone, Copy)]
pub struct FrameSync {
    /// Signaled by the presentation engine once the acquired image is ready.
    pub image_available: vk::Semaphore,
    /// Signaled by the graphics queue once the frame's commands finished.
    pub render_finished: vk::Semaphore,
    /// Signaled when the slot's command buffer may be reused.
    pub in_flight: vk::Fence,
}

impl FrameSync {
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(device: &ash::Device) -> Result<Self> {
        Ok(Self {
            image_available: create_semaphore(device)?,
            render_finished: create_semaphore(device)?,
            in_flight: create_fence(device, true)?,
        })
    }

    /// # Safety
    /// The device must be valid and the objects must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_semaphore(self.image_available, None);
        device.destroy_semaphore(self.render_finished, None);
        device.destroy_fence(self.in_flight, None);
    }
}
