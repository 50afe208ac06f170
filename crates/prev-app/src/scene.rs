//! The scene: a node graph rendered into the window's swapchain.

use std::sync::Arc;

use ash::vk;
use parking_lot::Mutex;
use prev_core::{SceneConfig, Size};
use prev_event::events::{SurfaceChangedEvent, WindowResizeEvent};
use prev_event::{EventChannel, SubscriptionGuard};
use prev_gpu::physical::{DEFAULT_DEPTH_FORMATS, DEFAULT_SURFACE_FORMATS};
use prev_gpu::{
    Device, GpuAllocator, GpuError, Instance, Queue, RenderPass, Surface, Swapchain,
    VulkanSwapchainBackend,
};
use prev_input::Inputs;

use crate::context::{InitContext, RenderContext, SceneGpu, UpdateContext};
use crate::node::{self, SceneNode};

/// Initial clear color, a neutral grey.
pub const DEFAULT_CLEAR_COLOR: [f32; 4] = [0.5, 0.5, 0.5, 1.0];

/// Owns the render pass, swapchain and allocator for one window, and the
/// root of the node graph drawn into it.
pub struct Scene {
    // Nodes release their GPU resources before the swapchain and allocator go.
    root: Box<dyn SceneNode>,
    swapchain: Swapchain,
    gpu: SceneGpu,
    channel: EventChannel,
    pending_resize: Arc<Mutex<Option<Size>>>,
    _resize_subscription: SubscriptionGuard<WindowResizeEvent>,
    clear_color: [f32; 4],
    frames_in_flight: u32,
}

impl Scene {
    /// Build the frame resources on `device` and initialize `root`.
    ///
    /// `device` must not be realized yet or already own `graphics` and
    /// `present`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        instance: &Arc<Instance>,
        device: &Device,
        surface: Arc<Surface>,
        graphics: Arc<Queue>,
        present: Arc<Queue>,
        channel: &EventChannel,
        config: SceneConfig,
        mut root: Box<dyn SceneNode>,
    ) -> anyhow::Result<Self> {
        let handle = device.handle()?;
        let gpu = device.gpu();

        let color_format = gpu.find_surface_format(&*surface, &DEFAULT_SURFACE_FORMATS);
        if color_format == vk::Format::UNDEFINED {
            return Err(GpuError::FormatNotSupported("surface").into());
        }
        let depth_format = gpu.find_depth_format(instance.raw(), &DEFAULT_DEPTH_FORMATS);
        if depth_format == vk::Format::UNDEFINED {
            return Err(GpuError::FormatNotSupported("depth").into());
        }

        let allocator = unsafe { GpuAllocator::new(instance.raw(), handle.clone(), gpu.handle())? };
        let allocator = Arc::new(Mutex::new(allocator));
        tracing::info!("Allocator created");

        let render_pass = unsafe { RenderPass::new(&handle, color_format, depth_format)? };
        let render_pass_handle = render_pass.handle();
        let backend = VulkanSwapchainBackend::new(
            device,
            surface,
            allocator.clone(),
            render_pass,
            graphics,
            present,
        )?;

        let mut swapchain = Swapchain::new(backend)?;
        swapchain.set_image_count(config.frames_in_flight)?;
        let mode = if config.vsync {
            vk::PresentModeKHR::FIFO
        } else {
            vk::PresentModeKHR::MAILBOX
        };
        swapchain.set_present_mode(mode)?;
        swapchain.log();

        let gpu = SceneGpu {
            device: handle,
            allocator,
            render_pass: render_pass_handle,
            uniform_alignment: gpu.min_uniform_buffer_offset_alignment(),
        };

        let pending_resize = Arc::new(Mutex::new(None));
        let sink = pending_resize.clone();
        let resize_subscription = channel.subscribe_guarded(move |e: &WindowResizeEvent| {
            *sink.lock() = Some(Size::new(e.width, e.height));
        });

        let frames_in_flight = u32::try_from(swapchain.image_count()).unwrap_or(u32::MAX);
        node::init_tree(
            root.as_mut(),
            &mut InitContext::new(channel, frames_in_flight, Some(&gpu)),
        )?;

        Ok(Self {
            root,
            swapchain,
            gpu,
            channel: channel.clone(),
            pending_resize,
            _resize_subscription: resize_subscription,
            clear_color: DEFAULT_CLEAR_COLOR,
            frames_in_flight,
        })
    }

    pub const fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }

    pub const fn gpu(&self) -> &SceneGpu {
        &self.gpu
    }

    pub const fn frames_in_flight(&self) -> u32 {
        self.frames_in_flight
    }

    pub const fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    /// Walk the node graph with this frame's delta time.
    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn update(&mut self, dt: f32, inputs: &Inputs) {
        let mut ctx = UpdateContext {
            dt,
            channel: &self.channel,
            inputs,
            clear_color: &mut self.clear_color,
        };
        node::update_tree(self.root.as_mut(), &mut ctx);
    }

    /// Acquire, record the node graph, submit and present.
    ///
    /// Returns `false` when no image could be acquired this frame (the
    /// surface is out of date or minimized).
    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn render(&mut self) -> anyhow::Result<bool> {
        let before = self.swapchain.extent();
        if let Some(size) = self.pending_resize.lock().take() {
            self.swapchain.update_extent(size.width, size.height)?;
        }

        self.swapchain
            .backend_mut()
            .render_pass_mut()
            .set_clear_color(self.clear_color);

        let rendered = match self.swapchain.begin_frame()? {
            Some(frame) => {
                let mut ctx = RenderContext::new(
                    frame.command_buffer,
                    frame.frame_index,
                    frame.extent,
                    Some(&self.gpu),
                );
                node::render_tree(self.root.as_mut(), &mut ctx)?;
                self.swapchain.end_frame(&frame)?;
                true
            }
            None => false,
        };

        let after = self.swapchain.extent();
        if after != before {
            self.channel.broadcast(&SurfaceChangedEvent {
                width: after.width,
                height: after.height,
            });
        }
        Ok(rendered)
    }

    /// Block until the GPU finished every submitted frame.
    pub fn wait_idle(&self) -> anyhow::Result<()> {
        unsafe { self.gpu.device.device_wait_idle()? };
        Ok(())
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        if let Err(e) = self.wait_idle() {
            tracing::error!("Failed to wait for idle before scene shutdown: {e}");
        }
        node::shutdown_tree(self.root.as_mut());
        tracing::info!("Scene shut down");
    }
}
