//! Contexts handed to scene nodes.

use std::sync::Arc;

use ash::vk;
use parking_lot::Mutex;
use prev_event::EventChannel;
use prev_gpu::GpuAllocator;
use prev_input::Inputs;

/// GPU objects a node needs to create its own resources.
#[derive(Clone)]
pub struct SceneGpu {
    pub device: Arc<ash::Device>,
    pub allocator: Arc<Mutex<GpuAllocator>>,
    pub render_pass: vk::RenderPass,
    /// `minUniformBufferOffsetAlignment` of the selected GPU.
    pub uniform_alignment: u64,
}

/// Passed to [`SceneNode::init`](crate::SceneNode::init).
pub struct InitContext<'a> {
    pub channel: &'a EventChannel,
    /// Swapchain image count; the ring size for per-frame pools.
    pub frames_in_flight: u32,
    gpu: Option<&'a SceneGpu>,
}

impl<'a> InitContext<'a> {
    pub const fn new(
        channel: &'a EventChannel,
        frames_in_flight: u32,
        gpu: Option<&'a SceneGpu>,
    ) -> Self {
        Self {
            channel,
            frames_in_flight,
            gpu,
        }
    }

    /// GPU objects, or an error when the scene runs without a device.
    pub fn gpu(&self) -> anyhow::Result<&'a SceneGpu> {
        self.gpu
            .ok_or_else(|| anyhow::anyhow!("scene has no GPU context"))
    }
}

/// Passed to [`SceneNode::update`](crate::SceneNode::update) once per frame.
pub struct UpdateContext<'a> {
    /// Seconds since the previous frame.
    pub dt: f32,
    pub channel: &'a EventChannel,
    pub inputs: &'a Inputs,
    /// Color the next frame is cleared to.
    pub clear_color: &'a mut [f32; 4],
}

/// Passed to [`SceneNode::render`](crate::SceneNode::render) while the
/// swapchain render pass is open.
pub struct RenderContext<'a> {
    pub command_buffer: vk::CommandBuffer,
    pub frame_in_flight_index: usize,
    pub extent: vk::Extent2D,
    gpu: Option<&'a SceneGpu>,
}

impl<'a> RenderContext<'a> {
    pub const fn new(
        command_buffer: vk::CommandBuffer,
        frame_in_flight_index: usize,
        extent: vk::Extent2D,
        gpu: Option<&'a SceneGpu>,
    ) -> Self {
        Self {
            command_buffer,
            frame_in_flight_index,
            extent,
            gpu,
        }
    }

    pub const fn gpu(&self) -> Option<&'a SceneGpu> {
        self.gpu
    }
}
