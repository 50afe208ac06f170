//! Pick lists for instance layers and extensions.
//!
//! A pick list holds the names a driver reports as available and the subset
//! the engine has chosen to enable. Picking an unavailable name is not an
//! error: it logs a warning and the feature is simply left off.

use std::ffi::{c_char, CStr, CString};

use ash::vk;

use crate::error::Result;

/// Available names plus the picked subset, in pick order.
#[derive(Debug, Clone, Default)]
pub struct PickList {
    kind: &'static str,
    available: Vec<CString>,
    picked: Vec<usize>,
}

impl PickList {
    /// Create a pick list over the given available names.
    pub fn new<I>(kind: &'static str, available: I) -> Self
    where
        I: IntoIterator<Item = CString>,
    {
        Self {
            kind,
            available: available.into_iter().collect(),
            picked: Vec::new(),
        }
    }

    /// Instance layers reported by the loader.
    pub fn instance_layers(entry: &ash::Entry) -> Result<Self> {
        let props = unsafe { entry.enumerate_instance_layer_properties()? };
        Ok(Self::new(
            "layer",
            props
                .iter()
                .filter_map(|p| p.layer_name_as_c_str().ok().map(CStr::to_owned)),
        ))
    }

    /// Instance extensions reported by the loader.
    pub fn instance_extensions(entry: &ash::Entry) -> Result<Self> {
        let props = unsafe { entry.enumerate_instance_extension_properties(None)? };
        Ok(Self::new("instance extension", extension_names(&props)))
    }

    /// Device extensions reported by a GPU.
    ///
    /// # Safety
    /// The instance and physical device must be valid.
    pub unsafe fn device_extensions(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Self> {
        let props = unsafe { instance.enumerate_device_extension_properties(physical_device)? };
        Ok(Self::new("device extension", extension_names(&props)))
    }

    fn position(&self, name: &CStr) -> Option<usize> {
        self.available.iter().position(|n| n.as_c_str() == name)
    }

    /// Returns `true` if the driver reports `name`.
    #[must_use]
    pub fn is_available(&self, name: &CStr) -> bool {
        self.position(name).is_some()
    }

    /// Returns `true` if `name` has been picked.
    #[must_use]
    pub fn is_picked(&self, name: &CStr) -> bool {
        self.position(name)
            .is_some_and(|i| self.picked.contains(&i))
    }

    /// Pick `name` if available. Returns `false` (with a warning) otherwise.
    pub fn pick(&mut self, name: &CStr) -> bool {
        let Some(index) = self.position(name) else {
            tracing::warn!("{} not found: {}", self.kind, name.to_string_lossy());
            return false;
        };
        if !self.picked.contains(&index) {
            self.picked.push(index);
        }
        true
    }

    /// Pick several names, returning how many were available.
    pub fn pick_many(&mut self, names: &[&CStr]) -> usize {
        names.iter().filter(|name| self.pick(name)).count()
    }

    /// Remove `name` from the picked subset.
    pub fn unpick(&mut self, name: &CStr) -> bool {
        let Some(index) = self.position(name) else {
            return false;
        };
        let before = self.picked.len();
        self.picked.retain(|&i| i != index);
        before != self.picked.len()
    }

    /// Picked names in pick order.
    pub fn picked(&self) -> impl Iterator<Item = &CStr> {
        self.picked.iter().map(|&i| self.available[i].as_c_str())
    }

    /// Number of picked names.
    #[must_use]
    pub fn picked_count(&self) -> usize {
        self.picked.len()
    }

    /// Picked names as raw pointers for Vulkan create-info structs.
    ///
    /// The pointers borrow from `self` and are valid while it is alive and
    /// unmodified.
    #[must_use]
    pub fn picked_ptrs(&self) -> Vec<*const c_char> {
        self.picked().map(CStr::as_ptr).collect()
    }

    /// Log every available name, marking the picked ones.
    pub fn log(&self) {
        tracing::debug!("Available {}s:", self.kind);
        for (i, name) in self.available.iter().enumerate() {
            let mark = if self.picked.contains(&i) { "*" } else { " " };
            tracing::debug!("  {} {}", mark, name.to_string_lossy());
        }
    }
}

fn extension_names(props: &[vk::ExtensionProperties]) -> impl Iterator<Item = CString> + '_ {
    props
        .iter()
        .filter_map(|p| p.extension_name_as_c_str().ok().map(CStr::to_owned))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> PickList {
        PickList::new(
            "extension",
            [c"VK_KHR_swapchain", c"VK_KHR_maintenance1", c"VK_EXT_debug_utils"]
                .into_iter()
                .map(CStr::to_owned),
        )
    }

    #[test]
    fn pick_available() {
        let mut list = list();
        assert!(list.pick(c"VK_KHR_swapchain"));
        assert!(list.is_picked(c"VK_KHR_swapchain"));
        assert!(!list.is_picked(c"VK_KHR_maintenance1"));
        assert_eq!(list.picked_count(), 1);
    }

    #[test]
    fn pick_missing_is_soft_failure() {
        let mut list = list();
        assert!(!list.pick(c"VK_KHR_ray_tracing_pipeline"));
        assert_eq!(list.picked_count(), 0);
        assert!(!list.is_available(c"VK_KHR_ray_tracing_pipeline"));
    }

    #[test]
    fn picking_twice_keeps_one_entry() {
        let mut list = list();
        list.pick(c"VK_EXT_debug_utils");
        list.pick(c"VK_EXT_debug_utils");
        assert_eq!(list.picked_count(), 1);
    }

    #[test]
    fn pick_many_and_order() {
        let mut list = list();
        let found = list.pick_many(&[c"VK_EXT_debug_utils", c"VK_KHR_missing", c"VK_KHR_swapchain"]);
        assert_eq!(found, 2);

        let picked: Vec<_> = list.picked().collect();
        assert_eq!(picked, vec![c"VK_EXT_debug_utils", c"VK_KHR_swapchain"]);
        assert_eq!(list.picked_ptrs().len(), 2);
    }

    #[test]
    fn unpick() {
        let mut list = list();
        list.pick(c"VK_KHR_swapchain");
        assert!(list.unpick(c"VK_KHR_swapchain"));
        assert!(!list.unpick(c"VK_KHR_swapchain"));
        assert_eq!(list.picked_count(), 0);
    }
}
