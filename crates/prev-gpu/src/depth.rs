//! Depth attachment shared by every swapchain framebuffer.

use ash::vk;

use crate::error::Result;
use crate::memory::{GpuAllocator, GpuImage};

/// Aspect flags for a depth (and possibly stencil) format.
#[must_use]
pub fn depth_aspect(format: vk::Format) -> vk::ImageAspectFlags {
    match format {
        vk::Format::D16_UNORM_S8_UINT
        | vk::Format::D24_UNORM_S8_UINT
        | vk::Format::D32_SFLOAT_S8_UINT => {
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        }
        _ => vk::ImageAspectFlags::DEPTH,
    }
}

/// Create a 2D view over a single-level, single-layer image.
///
/// # Safety
/// The device and image must be valid.
pub unsafe fn create_view(
    device: &ash::Device,
    image: vk::Image,
    format: vk::Format,
    aspect: vk::ImageAspectFlags,
) -> Result<vk::ImageView> {
    let info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .subresource_range(
            vk::ImageSubresourceRange::default()
                .aspect_mask(aspect)
                .level_count(1)
                .layer_count(1),
        );
    Ok(device.create_image_view(&info, None)?)
}

/// Depth image and view.
pub struct DepthBuffer {
    image: GpuImage,
    view: vk::ImageView,
}

impl DepthBuffer {
    pub fn new(allocator: &mut GpuAllocator, format: vk::Format, extent: vk::Extent2D) -> Result<Self> {
        let info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let mut image = allocator.create_image(&info, "depth buffer")?;
        let device = allocator.device().clone();
        let view = match unsafe { create_view(&device, image.image, format, depth_aspect(format)) } {
            Ok(view) => view,
            Err(e) => {
                allocator.free_image(&mut image)?;
                return Err(e);
            }
        };

        tracing::debug!("Depth buffer {}x{} ({format:?})", extent.width, extent.height);
        Ok(Self { image, view })
    }

    pub const fn view(&self) -> vk::ImageView {
        self.view
    }

    pub const fn format(&self) -> vk::Format {
        self.image.format
    }

    #[must_use]
    pub const fn extent(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.image.extent.width,
            height: self.image.extent.height,
        }
    }

    /// Replace the image with one of `extent`.
    ///
    /// # Safety
    /// The current image must no longer be in use by the GPU.
    pub unsafe fn resize(&mut self, allocator: &mut GpuAllocator, extent: vk::Extent2D) -> Result<()> {
        if extent == self.extent() {
            return Ok(());
        }
        let format = self.format();
        self.destroy(allocator)?;
        *self = Self::new(allocator, format, extent)?;
        Ok(())
    }

    /// # Safety
    /// The image must no longer be in use by the GPU.
    pub unsafe fn destroy(&mut self, allocator: &mut GpuAllocator) -> Result<()> {
        if self.view != vk::ImageView::null() {
            allocator.device().destroy_image_view(self.view, None);
            self.view = vk::ImageView::null();
        }
        allocator.free_image(&mut self.image)
    }
}
