//! Physical device enumeration and selection.

use ash::vk;

use crate::capabilities::{FeatureRequest, GpuVendor};
use crate::error::{GpuError, Result};
use crate::instance::Instance;
use crate::picklist::PickList;
use crate::surface::SurfaceSupport;

/// Color formats tried, in order, when none are specified.
pub const DEFAULT_SURFACE_FORMATS: [vk::Format; 2] =
    [vk::Format::B8G8R8A8_UNORM, vk::Format::R8G8B8A8_UNORM];

/// Depth formats tried, in order, when none are specified.
pub const DEFAULT_DEPTH_FORMATS: [vk::Format; 5] = [
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
    vk::Format::D16_UNORM_S8_UINT,
    vk::Format::D16_UNORM,
];

/// First entry of `preferred` present in `available`, or `UNDEFINED`.
#[must_use]
pub fn first_supported_surface_format(
    available: &[vk::SurfaceFormatKHR],
    preferred: &[vk::Format],
) -> vk::Format {
    preferred
        .iter()
        .copied()
        .find(|&wanted| available.iter().any(|f| f.format == wanted))
        .unwrap_or(vk::Format::UNDEFINED)
}

/// First entry of `preferred` usable as an optimally tiled depth attachment,
/// or `UNDEFINED`.
pub fn first_supported_depth_format<F>(preferred: &[vk::Format], mut properties: F) -> vk::Format
where
    F: FnMut(vk::Format) -> vk::FormatProperties,
{
    preferred
        .iter()
        .copied()
        .find(|&format| {
            properties(format)
                .optimal_tiling_features
                .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
        })
        .unwrap_or(vk::Format::UNDEFINED)
}

/// A GPU with its cached properties, features and queue families.
///
/// Enabled features and picked extensions may be changed until the value is
/// handed to [`Device::new`](crate::Device::new), which takes ownership.
#[derive(Debug, Clone)]
pub struct PhysicalDevice {
    handle: vk::PhysicalDevice,
    properties: vk::PhysicalDeviceProperties,
    available_features: vk::PhysicalDeviceFeatures,
    enabled_features: vk::PhysicalDeviceFeatures,
    queue_families: Vec<vk::QueueFamilyProperties>,
    extensions: PickList,
}

impl PhysicalDevice {
    /// Query a GPU and apply the default feature request and extension picks.
    ///
    /// # Safety
    /// The instance and physical device must be valid.
    pub unsafe fn query(instance: &ash::Instance, handle: vk::PhysicalDevice) -> Result<Self> {
        let (properties, features, queue_families) = unsafe {
            (
                instance.get_physical_device_properties(handle),
                instance.get_physical_device_features(handle),
                instance.get_physical_device_queue_family_properties(handle),
            )
        };
        let extensions = unsafe { PickList::device_extensions(instance, handle)? };

        let mut gpu = Self::from_parts(handle, properties, features, queue_families, extensions);
        gpu.extensions.pick(ash::khr::swapchain::NAME);
        #[cfg(target_os = "macos")]
        gpu.extensions.pick(c"VK_KHR_portability_subset");
        Ok(gpu)
    }

    /// Build from already-queried data. Applies the default feature request.
    #[must_use]
    pub fn from_parts(
        handle: vk::PhysicalDevice,
        properties: vk::PhysicalDeviceProperties,
        available_features: vk::PhysicalDeviceFeatures,
        queue_families: Vec<vk::QueueFamilyProperties>,
        extensions: PickList,
    ) -> Self {
        let mut gpu = Self {
            handle,
            properties,
            available_features,
            enabled_features: vk::PhysicalDeviceFeatures::default(),
            queue_families,
            extensions,
        };
        gpu.request_features(&FeatureRequest::default());
        gpu
    }

    /// Enable the requested features the hardware supports.
    pub fn request_features(&mut self, request: &FeatureRequest) {
        let missing = request.enable_available(&self.available_features, &mut self.enabled_features);
        if !missing.is_empty() {
            tracing::debug!("{}: features unavailable: {:?}", self.name(), missing);
        }
    }

    pub const fn handle(&self) -> vk::PhysicalDevice {
        self.handle
    }

    pub const fn properties(&self) -> &vk::PhysicalDeviceProperties {
        &self.properties
    }

    pub const fn available_features(&self) -> &vk::PhysicalDeviceFeatures {
        &self.available_features
    }

    pub const fn enabled_features(&self) -> &vk::PhysicalDeviceFeatures {
        &self.enabled_features
    }

    pub fn enabled_features_mut(&mut self) -> &mut vk::PhysicalDeviceFeatures {
        &mut self.enabled_features
    }

    pub fn queue_families(&self) -> &[vk::QueueFamilyProperties] {
        &self.queue_families
    }

    pub const fn extensions(&self) -> &PickList {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut PickList {
        &mut self.extensions
    }

    #[must_use]
    pub const fn vendor(&self) -> GpuVendor {
        GpuVendor::from_vendor_id(self.properties.vendor_id)
    }

    /// Device name as reported by the driver.
    #[must_use]
    pub fn name(&self) -> String {
        self.properties
            .device_name_as_c_str()
            .map_or_else(|_| "<unnamed>".to_string(), |n| n.to_string_lossy().into_owned())
    }

    /// Required alignment of uniform buffer offsets.
    #[must_use]
    pub const fn min_uniform_buffer_offset_alignment(&self) -> u64 {
        self.properties.limits.min_uniform_buffer_offset_alignment
    }

    /// First queue family whose flags contain `flags`, contain none of
    /// `unwanted`, and (if given) can present to `surface`.
    pub fn find_queue_family(
        &self,
        flags: vk::QueueFlags,
        unwanted: vk::QueueFlags,
        surface: Option<&dyn SurfaceSupport>,
    ) -> Option<u32> {
        self.queue_families
            .iter()
            .enumerate()
            .find(|(index, family)| {
                family.queue_flags.contains(flags)
                    && !family.queue_flags.intersects(unwanted)
                    && surface.map_or(true, |s| {
                        s.supports_present(self.handle, u32::try_from(*index).unwrap_or(u32::MAX))
                    })
            })
            .and_then(|(index, _)| u32::try_from(index).ok())
    }

    /// First preferred color format the surface accepts, or `UNDEFINED`.
    pub fn find_surface_format(
        &self,
        surface: &dyn SurfaceSupport,
        preferred: &[vk::Format],
    ) -> vk::Format {
        first_supported_surface_format(&surface.formats(self.handle), preferred)
    }

    /// First preferred depth format usable as an attachment, or `UNDEFINED`.
    pub fn find_depth_format(&self, instance: &ash::Instance, preferred: &[vk::Format]) -> vk::Format {
        first_supported_depth_format(preferred, |format| unsafe {
            instance.get_physical_device_format_properties(self.handle, format)
        })
    }

    /// Log a one-line summary plus the queue family table.
    pub fn log(&self) {
        tracing::info!(
            "  {:?} {} {}",
            self.properties.device_type,
            self.vendor().name(),
            self.name()
        );
        for (index, family) in self.queue_families.iter().enumerate() {
            tracing::info!(
                "    Queue family {}: count {:2} flags [{:?}]",
                index,
                family.queue_count,
                family.queue_flags
            );
        }
    }
}

/// Every GPU the instance reports.
#[derive(Debug, Clone, Default)]
pub struct PhysicalDevices {
    gpus: Vec<PhysicalDevice>,
}

impl PhysicalDevices {
    /// Enumerate the GPUs of an instance.
    pub fn enumerate(instance: &Instance) -> Result<Self> {
        let handles = unsafe { instance.raw().enumerate_physical_devices()? };
        let gpus = handles
            .into_iter()
            .map(|handle| unsafe { PhysicalDevice::query(instance.raw(), handle) })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { gpus })
    }

    #[must_use]
    pub const fn from_vec(gpus: Vec<PhysicalDevice>) -> Self {
        Self { gpus }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.gpus.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.gpus.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PhysicalDevice> {
        self.gpus.iter()
    }

    /// First GPU with any queue family able to present to `surface`.
    pub fn find_presentable(&self, surface: &dyn SurfaceSupport) -> Option<&PhysicalDevice> {
        let found = self.gpus.iter().find(|gpu| {
            gpu.find_queue_family(vk::QueueFlags::empty(), vk::QueueFlags::empty(), Some(surface))
                .is_some()
        });
        if found.is_none() {
            tracing::warn!("No GPU can present to this surface. Is DRI3 enabled?");
        }
        found
    }

    /// Like [`PhysicalDevices::find_presentable`], but an error when absent.
    pub fn require_presentable(&self, surface: &dyn SurfaceSupport) -> Result<PhysicalDevice> {
        self.find_presentable(surface)
            .cloned()
            .ok_or(GpuError::NoPresentableDevice)
    }

    pub fn log(&self) {
        tracing::info!("Physical devices found: {}", self.gpus.len());
        for gpu in &self.gpus {
            gpu.log();
        }
    }
}

impl<'a> IntoIterator for &'a PhysicalDevices {
    type Item = &'a PhysicalDevice;
    type IntoIter = std::slice::Iter<'a, PhysicalDevice>;

    fn into_iter(self) -> Self::IntoIter {
        self.gpus.iter()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ash::vk::Handle;

    /// Surface that presents from a fixed set of families and formats.
    pub(crate) struct MockSurface {
        pub present_families: Vec<u32>,
        pub formats: Vec<vk::Format>,
        pub capabilities: vk::SurfaceCapabilitiesKHR,
        pub present_modes: Vec<vk::PresentModeKHR>,
    }

    impl Default for MockSurface {
        fn default() -> Self {
            Self {
                present_families: vec![0],
                formats: vec![vk::Format::B8G8R8A8_UNORM],
                capabilities: vk::SurfaceCapabilitiesKHR {
                    min_image_count: 2,
                    max_image_count: 8,
                    current_extent: vk::Extent2D {
                        width: 800,
                        height: 600,
                    },
                    min_image_extent: vk::Extent2D {
                        width: 1,
                        height: 1,
                    },
                    max_image_extent: vk::Extent2D {
                        width: 4096,
                        height: 4096,
                    },
                    supported_usage_flags: vk::ImageUsageFlags::COLOR_ATTACHMENT,
                    supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY,
                    current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                    supported_composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
                    ..Default::default()
                },
                present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
            }
        }
    }

    impl SurfaceSupport for MockSurface {
        fn handle(&self) -> vk::SurfaceKHR {
            vk::SurfaceKHR::from_raw(0x5u64)
        }

        fn supports_present(&self, _gpu: vk::PhysicalDevice, family: u32) -> bool {
            self.present_families.contains(&family)
        }

        fn formats(&self, _gpu: vk::PhysicalDevice) -> Vec<vk::SurfaceFormatKHR> {
            self.formats
                .iter()
                .map(|&format| vk::SurfaceFormatKHR {
                    format,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                })
                .collect()
        }

        fn present_modes(&self, _gpu: vk::PhysicalDevice) -> Vec<vk::PresentModeKHR> {
            self.present_modes.clone()
        }

        fn capabilities(&self, _gpu: vk::PhysicalDevice) -> Result<vk::SurfaceCapabilitiesKHR> {
            Ok(self.capabilities)
        }
    }

    pub(crate) fn family(flags: vk::QueueFlags, count: u32) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: count,
            ..Default::default()
        }
    }

    /// A GPU with a graphics+compute family (2 queues), a compute-only
    /// family (1 queue) and a transfer-only family (1 queue).
    pub(crate) fn mock_gpu() -> PhysicalDevice {
        let features = vk::PhysicalDeviceFeatures {
            sampler_anisotropy: vk::TRUE,
            ..Default::default()
        };
        PhysicalDevice::from_parts(
            vk::PhysicalDevice::from_raw(0x1u64),
            vk::PhysicalDeviceProperties::default(),
            features,
            vec![
                family(
                    vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER,
                    2,
                ),
                family(vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER, 1),
                family(vk::QueueFlags::TRANSFER, 1),
            ],
            PickList::default(),
        )
    }

    #[test]
    fn queue_family_superset_match() {
        let gpu = mock_gpu();
        let none = vk::QueueFlags::empty();
        assert_eq!(gpu.find_queue_family(vk::QueueFlags::GRAPHICS, none, None), Some(0));
        assert_eq!(gpu.find_queue_family(vk::QueueFlags::COMPUTE, none, None), Some(0));
        assert_eq!(
            gpu.find_queue_family(vk::QueueFlags::COMPUTE, vk::QueueFlags::GRAPHICS, None),
            Some(1)
        );
        assert_eq!(
            gpu.find_queue_family(vk::QueueFlags::SPARSE_BINDING, none, None),
            None
        );
    }

    #[test]
    fn queue_family_respects_present_support() {
        let gpu = mock_gpu();
        let surface = MockSurface {
            present_families: vec![2],
            ..Default::default()
        };
        let none = vk::QueueFlags::empty();
        assert_eq!(gpu.find_queue_family(none, none, Some(&surface)), Some(2));
        assert_eq!(
            gpu.find_queue_family(vk::QueueFlags::GRAPHICS, none, Some(&surface)),
            None
        );
    }

    #[test]
    fn surface_format_follows_preference_order() {
        let gpu = mock_gpu();
        let surface = MockSurface {
            formats: vec![vk::Format::R8G8B8A8_UNORM, vk::Format::B8G8R8A8_UNORM],
            ..Default::default()
        };
        assert_eq!(
            gpu.find_surface_format(&surface, &DEFAULT_SURFACE_FORMATS),
            vk::Format::B8G8R8A8_UNORM
        );
    }

    #[test]
    fn surface_format_not_found_is_undefined() {
        let gpu = mock_gpu();
        let surface = MockSurface {
            formats: vec![vk::Format::A2B10G10R10_UNORM_PACK32],
            ..Default::default()
        };
        assert_eq!(
            gpu.find_surface_format(&surface, &DEFAULT_SURFACE_FORMATS),
            vk::Format::UNDEFINED
        );
        assert_eq!(gpu.find_surface_format(&surface, &[]), vk::Format::UNDEFINED);
    }

    #[test]
    fn depth_format_needs_attachment_support() {
        let format = first_supported_depth_format(&DEFAULT_DEPTH_FORMATS, |f| {
            let mut props = vk::FormatProperties::default();
            if f == vk::Format::D24_UNORM_S8_UINT || f == vk::Format::D16_UNORM {
                props.optimal_tiling_features = vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT;
            } else {
                props.linear_tiling_features = vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT;
            }
            props
        });
        assert_eq!(format, vk::Format::D24_UNORM_S8_UINT);

        let none = first_supported_depth_format(&DEFAULT_DEPTH_FORMATS, |_| {
            vk::FormatProperties::default()
        });
        assert_eq!(none, vk::Format::UNDEFINED);
    }

    #[test]
    fn default_features_enabled_when_available() {
        let gpu = mock_gpu();
        assert_eq!(gpu.enabled_features().sampler_anisotropy, vk::TRUE);
        assert_eq!(gpu.enabled_features().geometry_shader, vk::FALSE);
    }

    #[test]
    fn find_presentable_skips_gpus_without_present() {
        let surface = MockSurface {
            present_families: vec![1],
            ..Default::default()
        };
        let single_family = PhysicalDevice::from_parts(
            vk::PhysicalDevice::from_raw(0x2u64),
            vk::PhysicalDeviceProperties::default(),
            vk::PhysicalDeviceFeatures::default(),
            vec![family(vk::QueueFlags::GRAPHICS, 1)],
            PickList::default(),
        );
        let gpus = PhysicalDevices::from_vec(vec![single_family, mock_gpu()]);

        let found = gpus.find_presentable(&surface).unwrap();
        assert_eq!(found.handle(), vk::PhysicalDevice::from_raw(0x1u64));

        let nowhere = MockSurface {
            present_families: vec![],
            ..Default::default()
        };
        assert!(gpus.find_presentable(&nowhere).is_none());
        assert!(matches!(
            gpus.require_presentable(&nowhere),
            Err(GpuError::NoPresentableDevice)
        ));
    }
}
