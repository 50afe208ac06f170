//! Presentable image chain and the per-frame acquire / submit / present cycle.
//!
//! ```text
//! new ──> Created ──acquire_next──> Acquired ──present──> Created
//!            ^                                   │
//!            └──── apply (resize, out of date) <─┘
//! ```
//!
//! Only one image is acquired at a time. Recreation hands the old swapchain
//! to the driver, then waits for the device to go idle before destroying the
//! old per-image resources.

use std::sync::Arc;

use ash::prelude::VkResult;
use ash::vk;
use parking_lot::Mutex;

use crate::command::{self, CommandPool};
use crate::depth::{self, DepthBuffer};
use crate::device::{Device, Queue};
use crate::error::{GpuError, Result};
use crate::memory::GpuAllocator;
use crate::render_pass::RenderPass;
use crate::surface::{Surface, SurfaceSupport};
use crate::sync::{self, FrameSync};

/// Extent requested when the surface cannot report its own.
pub const FALLBACK_EXTENT: vk::Extent2D = vk::Extent2D {
    width: 512,
    height: 512,
};

/// Image count used until [`Swapchain::set_image_count`] says otherwise.
pub const DEFAULT_IMAGE_COUNT: u32 = 3;

/// Resources owned by one swapchain image and its frame slot.
#[derive(Debug, Clone, Copy)]
pub struct SwapchainBuffer {
    pub image: vk::Image,
    pub view: vk::ImageView,
    pub framebuffer: vk::Framebuffer,
    pub command_buffer: vk::CommandBuffer,
    pub sync: FrameSync,
}

/// What the caller records into for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquiredFrame {
    /// Swapchain image that will be presented.
    pub image_index: u32,
    /// Frame slot whose command buffer and sync objects are in use.
    pub frame_index: usize,
    pub command_buffer: vk::CommandBuffer,
    pub framebuffer: vk::Framebuffer,
    pub extent: vk::Extent2D,
}

/// Fixed parameters of a swapchain.
#[derive(Debug, Clone, Copy)]
pub struct SwapchainDesc {
    pub surface: vk::SurfaceKHR,
    pub format: vk::Format,
    pub color_space: vk::ColorSpaceKHR,
    pub present_family: u32,
    pub graphics_family: u32,
}

/// Native operations driven by [`Swapchain`].
pub trait SwapchainBackend {
    fn capabilities(&self) -> Result<vk::SurfaceCapabilitiesKHR>;

    fn present_modes(&self) -> Vec<vk::PresentModeKHR>;

    /// Create a swapchain and return it with its images.
    fn create_swapchain(
        &mut self,
        info: &vk::SwapchainCreateInfoKHR<'_>,
    ) -> Result<(vk::SwapchainKHR, Vec<vk::Image>)>;

    fn destroy_swapchain(&mut self, swapchain: vk::SwapchainKHR);

    fn wait_idle(&self) -> Result<()>;

    /// Resize attachments shared by every framebuffer (depth).
    fn resize_attachments(&mut self, extent: vk::Extent2D) -> Result<()>;

    /// Build the view, framebuffer, command buffer and sync objects for an
    /// image. The fence starts signaled.
    fn create_buffer(
        &mut self,
        image: vk::Image,
        format: vk::Format,
        extent: vk::Extent2D,
    ) -> Result<SwapchainBuffer>;

    fn destroy_buffer(&mut self, buffer: &SwapchainBuffer);

    fn acquire(&mut self, swapchain: vk::SwapchainKHR, signal: vk::Semaphore) -> VkResult<(u32, bool)>;

    /// Wait for a slot's previous submission to finish.
    fn wait_for_slot(&mut self, fence: vk::Fence) -> Result<()>;

    /// Unsignal a slot's fence ahead of its next submission.
    fn reset_slot(&mut self, fence: vk::Fence) -> Result<()>;

    /// Begin recording and the render pass for `frame`.
    fn begin(&mut self, frame: &AcquiredFrame) -> Result<()>;

    /// End the render pass and recording.
    fn end(&mut self, frame: &AcquiredFrame) -> Result<()>;

    fn submit(&mut self, command_buffer: vk::CommandBuffer, sync: &FrameSync) -> Result<()>;

    /// Returns `true` when the swapchain is suboptimal.
    fn present(
        &mut self,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> VkResult<bool>;
}

/// Swapchain state machine over a [`SwapchainBackend`].
pub struct Swapchain<B: SwapchainBackend = VulkanSwapchainBackend> {
    backend: B,
    desc: SwapchainDesc,
    composite_alpha: vk::CompositeAlphaFlagsKHR,
    present_mode: vk::PresentModeKHR,
    min_image_count: u32,
    extent: vk::Extent2D,
    handle: vk::SwapchainKHR,
    buffers: Vec<SwapchainBuffer>,
    frame_index: usize,
    acquired: Option<u32>,
}

impl<B: SwapchainBackend> Swapchain<B> {
    /// Validate the surface and create the swapchain.
    ///
    /// # Panics
    /// If the surface cannot be rendered to as a color attachment, lacks the
    /// identity transform, or supports neither opaque nor inherited alpha.
    pub fn with_backend(backend: B, desc: SwapchainDesc) -> Result<Self> {
        let caps = backend.capabilities()?;
        assert!(
            caps.supported_usage_flags
                .contains(vk::ImageUsageFlags::COLOR_ATTACHMENT),
            "surface does not support color attachment usage"
        );
        assert!(
            caps.supported_transforms
                .contains(vk::SurfaceTransformFlagsKHR::IDENTITY),
            "surface does not support the identity transform"
        );
        let composite_alpha = if caps
            .supported_composite_alpha
            .contains(vk::CompositeAlphaFlagsKHR::INHERIT)
        {
            vk::CompositeAlphaFlagsKHR::INHERIT
        } else if caps
            .supported_composite_alpha
            .contains(vk::CompositeAlphaFlagsKHR::OPAQUE)
        {
            vk::CompositeAlphaFlagsKHR::OPAQUE
        } else {
            panic!("surface supports neither opaque nor inherited composite alpha");
        };

        let mut swapchain = Self {
            backend,
            desc,
            composite_alpha,
            present_mode: vk::PresentModeKHR::FIFO,
            min_image_count: 0,
            extent: vk::Extent2D::default(),
            handle: vk::SwapchainKHR::null(),
            buffers: Vec::new(),
            frame_index: 0,
            acquired: None,
        };
        swapchain.update_extent(FALLBACK_EXTENT.width, FALLBACK_EXTENT.height)?;
        swapchain.set_image_count(DEFAULT_IMAGE_COUNT)?;
        swapchain.apply()?;
        Ok(swapchain)
    }

    pub const fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub const fn handle(&self) -> vk::SwapchainKHR {
        self.handle
    }

    pub const fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub const fn format(&self) -> vk::Format {
        self.desc.format
    }

    pub const fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    /// Number of images actually created.
    pub fn image_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn buffers(&self) -> &[SwapchainBuffer] {
        &self.buffers
    }

    /// Slot used by the current (or next) frame.
    pub const fn frame_in_flight_index(&self) -> usize {
        self.frame_index
    }

    pub const fn is_acquired(&self) -> bool {
        self.acquired.is_some()
    }

    pub const fn sharing_mode(&self) -> vk::SharingMode {
        if self.desc.present_family == self.desc.graphics_family {
            vk::SharingMode::EXCLUSIVE
        } else {
            vk::SharingMode::CONCURRENT
        }
    }

    /// Adopt the surface's current extent, using `width` x `height` (clamped
    /// to the surface limits) when the surface leaves it undefined.
    ///
    /// Returns `true` if the extent changed. The swapchain is rebuilt only if
    /// it already exists.
    pub fn update_extent(&mut self, width: u32, height: u32) -> Result<bool> {
        let caps = self.backend.capabilities()?;
        let current = caps.current_extent;

        let target = if current.width == u32::MAX || current.height == u32::MAX {
            tracing::warn!(
                "Can't determine current window surface extent from surface caps. \
                 Using provided extent instead. ({width} x {height})"
            );
            vk::Extent2D {
                width: width.clamp(caps.min_image_extent.width, caps.max_image_extent.width),
                height: height.clamp(caps.min_image_extent.height, caps.max_image_extent.height),
            }
        } else {
            current
        };

        if target.width == 0 || target.height == 0 || target == self.extent {
            return Ok(false);
        }

        self.extent = target;
        if self.handle != vk::SwapchainKHR::null() {
            self.apply()?;
        }
        Ok(true)
    }

    /// Request `count` images, clamped to what the surface allows.
    ///
    /// Returns whether the request was honoured as is.
    pub fn set_image_count(&mut self, count: u32) -> Result<bool> {
        let caps = self.backend.capabilities()?;
        let mut clamped = count.max(caps.min_image_count);
        if caps.max_image_count > 0 {
            clamped = clamped.min(caps.max_image_count);
        }
        if clamped != count {
            tracing::warn!("Swapchain using {clamped} framebuffers, instead of {count}.");
        }

        self.min_image_count = clamped;
        if self.handle != vk::SwapchainKHR::null() {
            self.apply()?;
        }
        Ok(clamped == count)
    }

    /// Switch to `mode`, or FIFO if the surface does not offer it.
    ///
    /// Returns whether `mode` was accepted.
    pub fn set_present_mode(&mut self, mode: vk::PresentModeKHR) -> Result<bool> {
        let chosen = if self.backend.present_modes().contains(&mode) {
            mode
        } else {
            tracing::warn!("Requested present mode {mode:?} is not supported. Reverting to FIFO.");
            vk::PresentModeKHR::FIFO
        };

        self.present_mode = chosen;
        if self.handle != vk::SwapchainKHR::null() {
            self.apply()?;
        }
        Ok(chosen == mode)
    }

    /// Recreate the swapchain with the current settings.
    ///
    /// # Panics
    /// If an image is acquired.
    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn apply(&mut self) -> Result<()> {
        assert!(
            self.acquired.is_none(),
            "swapchain rebuilt while an image is acquired"
        );

        let families = [self.desc.present_family, self.desc.graphics_family];
        let mut info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.desc.surface)
            .min_image_count(self.min_image_count)
            .image_format(self.desc.format)
            .image_color_space(self.desc.color_space)
            .image_extent(self.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(self.sharing_mode())
            .pre_transform(vk::SurfaceTransformFlagsKHR::IDENTITY)
            .composite_alpha(self.composite_alpha)
            .present_mode(self.present_mode)
            .clipped(true)
            .old_swapchain(self.handle);
        if self.sharing_mode() == vk::SharingMode::CONCURRENT {
            info = info.queue_family_indices(&families);
        }

        let (handle, images) = self.backend.create_swapchain(&info)?;

        let old = std::mem::replace(&mut self.handle, handle);
        if old != vk::SwapchainKHR::null() {
            self.backend.wait_idle()?;
            self.backend.destroy_swapchain(old);
            for buffer in std::mem::take(&mut self.buffers) {
                self.backend.destroy_buffer(&buffer);
            }
        }

        self.backend.resize_attachments(self.extent)?;

        self.buffers.reserve(images.len());
        for image in images {
            let buffer = self.backend.create_buffer(image, self.desc.format, self.extent)?;
            self.buffers.push(buffer);
        }
        self.frame_index = 0;

        if old == vk::SwapchainKHR::null() {
            tracing::info!(
                "Swapchain created ({}x{}, {} images, {:?})",
                self.extent.width,
                self.extent.height,
                self.buffers.len(),
                self.present_mode
            );
        } else {
            tracing::debug!(
                "Swapchain recreated ({}x{}, {} images)",
                self.extent.width,
                self.extent.height,
                self.buffers.len()
            );
        }
        Ok(())
    }

    /// Re-read the surface after it reported the swapchain stale. An out of
    /// date swapchain is rebuilt even if the extent did not change.
    fn refresh(&mut self, out_of_date: bool) -> Result<bool> {
        let extent = self.extent;
        if self.update_extent(extent.width, extent.height)? {
            return Ok(true);
        }
        if out_of_date {
            let current = self.backend.capabilities()?.current_extent;
            if current.width > 0 && current.height > 0 {
                self.apply()?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Acquire the next image.
    ///
    /// Returns `None` when the swapchain was out of date; it has been
    /// refreshed and the caller should skip this frame.
    ///
    /// # Panics
    /// If the previous image has not been presented.
    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn acquire_next(&mut self) -> Result<Option<AcquiredFrame>> {
        assert!(
            self.acquired.is_none(),
            "previous swapchain buffer has not yet been presented"
        );

        // The slot's last submission waits on `image_available`; it must
        // finish before the semaphore is handed to the next acquire.
        let slot = self.buffers[self.frame_index];
        self.backend.wait_for_slot(slot.sync.in_flight)?;

        let image_index = match self.backend.acquire(self.handle, slot.sync.image_available) {
            Ok((index, _suboptimal)) => index,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                tracing::debug!("Swapchain out of date on acquire");
                self.refresh(true)?;
                return Ok(None);
            }
            Err(e) => return Err(GpuError::Vulkan(e)),
        };

        self.backend.reset_slot(slot.sync.in_flight)?;
        self.acquired = Some(image_index);

        Ok(Some(AcquiredFrame {
            image_index,
            frame_index: self.frame_index,
            command_buffer: slot.command_buffer,
            framebuffer: self.buffers[image_index as usize].framebuffer,
            extent: self.extent,
        }))
    }

    fn acquired_index(&self, action: &str) -> u32 {
        match self.acquired {
            Some(index) => index,
            None => panic!("a swapchain buffer must be acquired before {action}"),
        }
    }

    /// Submit the current slot's command buffer.
    ///
    /// # Panics
    /// If no image is acquired.
    pub fn submit(&mut self) -> Result<()> {
        self.acquired_index("submitting");
        let slot = self.buffers[self.frame_index];
        self.backend.submit(slot.command_buffer, &slot.sync)
    }

    /// Present the acquired image and move to the next frame slot.
    ///
    /// Out of date and suboptimal results refresh the swapchain instead of
    /// failing.
    ///
    /// # Panics
    /// If no image is acquired.
    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn present(&mut self) -> Result<()> {
        let image_index = self.acquired_index("presenting");
        let wait = self.buffers[self.frame_index].sync.render_finished;

        let result = self.backend.present(self.handle, image_index, wait);
        self.acquired = None;

        let rebuilt = match result {
            Ok(false) => false,
            Ok(true) => self.refresh(false)?,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => self.refresh(true)?,
            Err(e) => {
                self.frame_index = (self.frame_index + 1) % self.buffers.len();
                return Err(GpuError::Vulkan(e));
            }
        };

        if !rebuilt {
            self.frame_index = (self.frame_index + 1) % self.buffers.len();
        }
        Ok(())
    }

    /// Acquire, then begin recording and the render pass.
    pub fn begin_frame(&mut self) -> Result<Option<AcquiredFrame>> {
        let Some(frame) = self.acquire_next()? else {
            return Ok(None);
        };
        self.backend.begin(&frame)?;
        Ok(Some(frame))
    }

    /// Finish recording `frame`, submit it and present.
    pub fn end_frame(&mut self, frame: &AcquiredFrame) -> Result<()> {
        self.backend.end(frame)?;
        self.submit()?;
        self.present()
    }

    /// Log the current configuration.
    pub fn log(&self) {
        tracing::info!("Swapchain:");
        tracing::info!("  Color   = {:?}", self.desc.format);
        tracing::info!("  Extent  = {} x {}", self.extent.width, self.extent.height);
        tracing::info!("  Buffers = {}", self.buffers.len());
        tracing::info!("  PresentMode:");
        for mode in self.backend.present_modes() {
            let tick = if mode == self.present_mode { "*" } else { " " };
            tracing::info!("    {tick} {mode:?}");
        }
        tracing::info!(
            "  SharingMode: {}",
            if self.sharing_mode() == vk::SharingMode::EXCLUSIVE {
                "Exclusive"
            } else {
                "Shared"
            }
        );
    }
}

impl<B: SwapchainBackend> Drop for Swapchain<B> {
    fn drop(&mut self) {
        if let Err(e) = self.backend.wait_idle() {
            tracing::error!("Failed to wait for idle before destroying the swapchain: {e}");
        }
        for buffer in std::mem::take(&mut self.buffers) {
            self.backend.destroy_buffer(&buffer);
        }
        if self.handle != vk::SwapchainKHR::null() {
            self.backend.destroy_swapchain(self.handle);
            tracing::info!("Swapchain destroyed");
        }
    }
}

impl Swapchain<VulkanSwapchainBackend> {
    /// Create a swapchain presenting `backend`'s surface.
    pub fn new(backend: VulkanSwapchainBackend) -> Result<Self> {
        let desc = SwapchainDesc {
            surface: backend.surface.handle(),
            format: backend.render_pass.color_format(),
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            present_family: backend.present_queue.family(),
            graphics_family: backend.graphics_queue.family(),
        };
        Self::with_backend(backend, desc)
    }
}

/// [`SwapchainBackend`] on `VK_KHR_swapchain`.
///
/// Owns the render pass, the depth buffer and the command pool the frame
/// slots allocate from.
pub struct VulkanSwapchainBackend {
    device: Arc<ash::Device>,
    loader: ash::khr::swapchain::Device,
    gpu: vk::PhysicalDevice,
    surface: Arc<Surface>,
    graphics_queue: Arc<Queue>,
    present_queue: Arc<Queue>,
    allocator: Arc<Mutex<GpuAllocator>>,
    render_pass: RenderPass,
    command_pool: CommandPool,
    depth: Option<DepthBuffer>,
}

impl VulkanSwapchainBackend {
    /// The device must have been realized with `graphics_queue` and
    /// `present_queue` among its queues.
    pub fn new(
        device: &Device,
        surface: Arc<Surface>,
        allocator: Arc<Mutex<GpuAllocator>>,
        render_pass: RenderPass,
        graphics_queue: Arc<Queue>,
        present_queue: Arc<Queue>,
    ) -> Result<Self> {
        let handle = device.handle()?;
        let loader = ash::khr::swapchain::Device::new(device.instance().raw(), &handle);
        let command_pool = unsafe { CommandPool::new(&handle, graphics_queue.family())? };
        Ok(Self {
            device: handle,
            loader,
            gpu: device.gpu().handle(),
            surface,
            graphics_queue,
            present_queue,
            allocator,
            render_pass,
            command_pool,
            depth: None,
        })
    }

    pub const fn render_pass(&self) -> &RenderPass {
        &self.render_pass
    }

    pub fn render_pass_mut(&mut self) -> &mut RenderPass {
        &mut self.render_pass
    }

    pub const fn device(&self) -> &Arc<ash::Device> {
        &self.device
    }

    pub fn graphics_queue(&self) -> &Arc<Queue> {
        &self.graphics_queue
    }
}

impl SwapchainBackend for VulkanSwapchainBackend {
    fn capabilities(&self) -> Result<vk::SurfaceCapabilitiesKHR> {
        self.surface.capabilities(self.gpu)
    }

    fn present_modes(&self) -> Vec<vk::PresentModeKHR> {
        self.surface.present_modes(self.gpu)
    }

    fn create_swapchain(
        &mut self,
        info: &vk::SwapchainCreateInfoKHR<'_>,
    ) -> Result<(vk::SwapchainKHR, Vec<vk::Image>)> {
        let swapchain = unsafe { self.loader.create_swapchain(info, None) }
            .map_err(|e| GpuError::SwapchainCreation(e.to_string()))?;
        let images = unsafe { self.loader.get_swapchain_images(swapchain)? };
        Ok((swapchain, images))
    }

    fn destroy_swapchain(&mut self, swapchain: vk::SwapchainKHR) {
        unsafe { self.loader.destroy_swapchain(swapchain, None) };
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe { self.device.device_wait_idle()? };
        Ok(())
    }

    fn resize_attachments(&mut self, extent: vk::Extent2D) -> Result<()> {
        let mut allocator = self.allocator.lock();
        match self.depth.as_mut() {
            Some(depth) => unsafe { depth.resize(&mut allocator, extent) },
            None => {
                let format = self.render_pass.depth_format();
                self.depth = Some(DepthBuffer::new(&mut allocator, format, extent)?);
                Ok(())
            }
        }
    }

    fn create_buffer(
        &mut self,
        image: vk::Image,
        format: vk::Format,
        extent: vk::Extent2D,
    ) -> Result<SwapchainBuffer> {
        let depth_view = self
            .depth
            .as_ref()
            .map(DepthBuffer::view)
            .ok_or_else(|| GpuError::InvalidState("depth buffer missing".to_string()))?;

        unsafe {
            let view = depth::create_view(&self.device, image, format, vk::ImageAspectFlags::COLOR)?;
            let framebuffer = self
                .render_pass
                .create_framebuffer(&self.device, view, depth_view, extent)?;
            let command_buffer = self.command_pool.allocate_primary(&self.device, 1)?[0];
            let sync = FrameSync::new(&self.device)?;
            Ok(SwapchainBuffer {
                image,
                view,
                framebuffer,
                command_buffer,
                sync,
            })
        }
    }

    fn destroy_buffer(&mut self, buffer: &SwapchainBuffer) {
        unsafe {
            self.device.destroy_framebuffer(buffer.framebuffer, None);
            self.device.destroy_image_view(buffer.view, None);
            self.command_pool.free(&self.device, &[buffer.command_buffer]);
            buffer.sync.destroy(&self.device);
        }
    }

    fn acquire(&mut self, swapchain: vk::SwapchainKHR, signal: vk::Semaphore) -> VkResult<(u32, bool)> {
        unsafe {
            self.loader
                .acquire_next_image(swapchain, u64::MAX, signal, vk::Fence::null())
        }
    }

    fn wait_for_slot(&mut self, fence: vk::Fence) -> Result<()> {
        unsafe { sync::wait_for_fence(&self.device, fence) }
    }

    fn reset_slot(&mut self, fence: vk::Fence) -> Result<()> {
        unsafe { sync::reset_fence(&self.device, fence) }
    }

    fn begin(&mut self, frame: &AcquiredFrame) -> Result<()> {
        unsafe {
            command::begin_one_time(&self.device, frame.command_buffer)?;
            self.render_pass
                .begin(&self.device, frame.command_buffer, frame.framebuffer, frame.extent);
        }
        Ok(())
    }

    fn end(&mut self, frame: &AcquiredFrame) -> Result<()> {
        unsafe {
            self.render_pass.end(&self.device, frame.command_buffer);
            command::end_command_buffer(&self.device, frame.command_buffer)
        }
    }

    fn submit(&mut self, command_buffer: vk::CommandBuffer, sync: &FrameSync) -> Result<()> {
        unsafe {
            command::submit_frame(
                &self.device,
                self.graphics_queue.handle(),
                command_buffer,
                sync.image_available,
                sync.render_finished,
                sync.in_flight,
            )
        }
    }

    fn present(
        &mut self,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> VkResult<bool> {
        let wait_semaphores = [wait];
        let swapchains = [swapchain];
        let image_indices = [image_index];
        let info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);
        unsafe { self.loader.queue_present(self.present_queue.handle(), &info) }
    }
}

impl Drop for VulkanSwapchainBackend {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            if let Some(mut depth) = self.depth.take() {
                if let Err(e) = depth.destroy(&mut self.allocator.lock()) {
                    tracing::error!("Failed to free the depth buffer: {e}");
                }
            }
            self.command_pool.destroy(&self.device);
            self.render_pass.destroy(&self.device);
        }
    }
}
