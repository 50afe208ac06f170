//! Single-subpass render pass with one presentable color target and depth.

use ash::vk;

use crate::error::Result;

const COLOR_ATTACHMENT: u32 = 0;
const DEPTH_ATTACHMENT: u32 = 1;

/// Render pass drawing into a swapchain image plus a shared depth buffer.
pub struct RenderPass {
    raw: vk::RenderPass,
    color_format: vk::Format,
    depth_format: vk::Format,
    clear_color: [f32; 4],
    clear_depth: f32,
}

impl RenderPass {
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(
        device: &ash::Device,
        color_format: vk::Format,
        depth_format: vk::Format,
    ) -> Result<Self> {
        let attachments = [
            vk::AttachmentDescription::default()
                .format(color_format)
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::STORE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .final_layout(vk::ImageLayout::PRESENT_SRC_KHR),
            vk::AttachmentDescription::default()
                .format(depth_format)
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::DONT_CARE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
        ];

        let color_ref = vk::AttachmentReference::default()
            .attachment(COLOR_ATTACHMENT)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        let depth_ref = vk::AttachmentReference::default()
            .attachment(DEPTH_ATTACHMENT)
            .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

        let subpasses = [vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(std::slice::from_ref(&color_ref))
            .depth_stencil_attachment(&depth_ref)];

        let stages = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
            | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS;
        let dependencies = [vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(stages)
            .dst_stage_mask(stages)
            .dst_access_mask(
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            )];

        let info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);
        let raw = device.create_render_pass(&info, None)?;

        tracing::debug!("Render pass created (color {color_format:?}, depth {depth_format:?})");
        Ok(Self {
            raw,
            color_format,
            depth_format,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            clear_depth: 1.0,
        })
    }

    pub const fn handle(&self) -> vk::RenderPass {
        self.raw
    }

    pub const fn color_format(&self) -> vk::Format {
        self.color_format
    }

    pub const fn depth_format(&self) -> vk::Format {
        self.depth_format
    }

    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    pub fn set_clear_depth(&mut self, depth: f32) {
        self.clear_depth = depth;
    }

    #[must_use]
    pub const fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    /// Clear values in attachment order.
    #[must_use]
    pub fn clear_values(&self) -> [vk::ClearValue; 2] {
        [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: self.clear_color,
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: self.clear_depth,
                    stencil: 0,
                },
            },
        ]
    }

    /// Begin the pass on `cmd` targeting `framebuffer`.
    ///
    /// # Safety
    /// `cmd` must be recording and `framebuffer` must be compatible with
    /// this pass.
    pub unsafe fn begin(
        &self,
        device: &ash::Device,
        cmd: vk::CommandBuffer,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
    ) {
        let clear_values = self.clear_values();
        let info = vk::RenderPassBeginInfo::default()
            .render_pass(self.raw)
            .framebuffer(framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D::default(),
                extent,
            })
            .clear_values(&clear_values);
        device.cmd_begin_render_pass(cmd, &info, vk::SubpassContents::INLINE);
    }

    /// # Safety
    /// `cmd` must be inside this pass.
    pub unsafe fn end(&self, device: &ash::Device, cmd: vk::CommandBuffer) {
        device.cmd_end_render_pass(cmd);
    }

    /// Create a framebuffer from a color view and the shared depth view.
    ///
    /// # Safety
    /// The views must match the pass formats and `extent`.
    pub unsafe fn create_framebuffer(
        &self,
        device: &ash::Device,
        color: vk::ImageView,
        depth: vk::ImageView,
        extent: vk::Extent2D,
    ) -> Result<vk::Framebuffer> {
        let attachments = [color, depth];
        let info = vk::FramebufferCreateInfo::default()
            .render_pass(self.raw)
            .attachments(&attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);
        Ok(device.create_framebuffer(&info, None)?)
    }

    /// # Safety
    /// No framebuffer or pipeline built from this pass may still be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_render_pass(self.raw, None);
    }
}
