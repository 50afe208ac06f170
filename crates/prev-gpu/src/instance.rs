//! Vulkan instance creation.

use std::ffi::{CStr, CString};

use ash::vk;

use crate::error::{GpuError, Result};
use crate::picklist::PickList;

/// Instance extensions required to present to a window on this platform.
pub fn required_instance_extensions() -> Vec<&'static CStr> {
    vec![
        ash::khr::surface::NAME,
        #[cfg(target_os = "windows")]
        ash::khr::win32_surface::NAME,
        #[cfg(target_os = "linux")]
        ash::khr::xlib_surface::NAME,
        #[cfg(target_os = "linux")]
        ash::khr::xcb_surface::NAME,
        #[cfg(target_os = "linux")]
        ash::khr::wayland_surface::NAME,
        #[cfg(target_os = "android")]
        ash::khr::android_surface::NAME,
        #[cfg(target_os = "macos")]
        ash::ext::metal_surface::NAME,
        #[cfg(target_os = "macos")]
        ash::khr::portability_enumeration::NAME,
    ]
}

/// Validation layers to enable when validation is requested.
pub fn validation_layers() -> Vec<&'static CStr> {
    vec![c"VK_LAYER_KHRONOS_validation"]
}

/// Loaded Vulkan entry point and instance.
///
/// Destroyed on drop; everything created from it (surfaces, devices) keeps
/// it alive through an `Arc`.
pub struct Instance {
    entry: ash::Entry,
    raw: ash::Instance,
    surface_loader: ash::khr::surface::Instance,
    layers: PickList,
    extensions: PickList,
}

impl Instance {
    /// Load Vulkan and create an instance.
    pub fn new(app_name: &str, enable_validation: bool) -> Result<Self> {
        let entry =
            unsafe { ash::Entry::load() }.map_err(|e| GpuError::Loading(e.to_string()))?;

        let app_name = CString::new(app_name)
            .map_err(|e| GpuError::Other(format!("Invalid application name: {e}")))?;

        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(c"PreV")
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_1);

        let mut layers = PickList::instance_layers(&entry)?;
        if enable_validation {
            layers.pick_many(&validation_layers());
        }

        let mut extensions = PickList::instance_extensions(&entry)?;
        extensions.pick_many(&required_instance_extensions());

        let layer_names = layers.picked_ptrs();
        let extension_names = extensions.picked_ptrs();

        // Required for MoltenVK on macOS
        #[cfg(target_os = "macos")]
        let create_flags = vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
        #[cfg(not(target_os = "macos"))]
        let create_flags = vk::InstanceCreateFlags::empty();

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layer_names)
            .enabled_extension_names(&extension_names)
            .flags(create_flags);

        let raw = unsafe { entry.create_instance(&create_info, None)? };
        let surface_loader = ash::khr::surface::Instance::new(&entry, &raw);

        tracing::info!(
            "Vulkan instance created ({} layers, {} extensions)",
            layers.picked_count(),
            extensions.picked_count()
        );
        layers.log();

        Ok(Self {
            entry,
            raw,
            surface_loader,
            layers,
            extensions,
        })
    }

    pub const fn entry(&self) -> &ash::Entry {
        &self.entry
    }

    pub const fn raw(&self) -> &ash::Instance {
        &self.raw
    }

    pub const fn surface_loader(&self) -> &ash::khr::surface::Instance {
        &self.surface_loader
    }

    /// Returns `true` if a validation layer was actually enabled.
    #[must_use]
    pub fn validation_enabled(&self) -> bool {
        validation_layers()
            .iter()
            .any(|layer| self.layers.is_picked(layer))
    }

    pub const fn layers(&self) -> &PickList {
        &self.layers
    }

    pub const fn extensions(&self) -> &PickList {
        &self.extensions
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe {
            self.raw.destroy_instance(None);
        }
        tracing::info!("Vulkan instance destroyed");
    }
}
