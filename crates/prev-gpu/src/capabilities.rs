//! GPU vendor identification and optional feature requests.

use ash::vk;

/// GPU vendor identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuVendor {
    Amd,
    Imagination,
    Nvidia,
    Arm,
    Qualcomm,
    Intel,
    Apple,
    Other(u32),
}

impl GpuVendor {
    /// Identify vendor from PCI vendor ID.
    #[must_use]
    pub const fn from_vendor_id(id: u32) -> Self {
        match id {
            0x1002 => Self::Amd,
            0x1010 => Self::Imagination,
            0x10DE => Self::Nvidia,
            0x13B5 => Self::Arm,
            0x5143 => Self::Qualcomm,
            0x8086 => Self::Intel,
            0x106B => Self::Apple,
            other => Self::Other(other),
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Amd => "AMD",
            Self::Imagination => "ImgTec",
            Self::Nvidia => "NVIDIA",
            Self::Arm => "ARM",
            Self::Qualcomm => "Qualcomm",
            Self::Intel => "INTEL",
            Self::Apple => "Apple",
            Self::Other(_) => "Unknown",
        }
    }
}

/// Optional core features the renderer can take advantage of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    SamplerAnisotropy,
    DepthClamp,
    ShaderClipDistance,
    FillModeNonSolid,
    GeometryShader,
    TessellationShader,
    SampleRateShading,
}

impl Feature {
    fn field(self, features: &mut vk::PhysicalDeviceFeatures) -> &mut vk::Bool32 {
        match self {
            Self::SamplerAnisotropy => &mut features.sampler_anisotropy,
            Self::DepthClamp => &mut features.depth_clamp,
            Self::ShaderClipDistance => &mut features.shader_clip_distance,
            Self::FillModeNonSolid => &mut features.fill_mode_non_solid,
            Self::GeometryShader => &mut features.geometry_shader,
            Self::TessellationShader => &mut features.tessellation_shader,
            Self::SampleRateShading => &mut features.sample_rate_shading,
        }
    }

    /// Returns `true` if `features` reports this feature.
    #[must_use]
    pub fn is_set(self, features: &vk::PhysicalDeviceFeatures) -> bool {
        let mut copy = *features;
        *self.field(&mut copy) == vk::TRUE
    }

    /// Turn this feature on in `features`.
    pub fn set(self, features: &mut vk::PhysicalDeviceFeatures) {
        *self.field(features) = vk::TRUE;
    }
}

/// The list of optional features to enable when the hardware has them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureRequest {
    features: Vec<Feature>,
}

impl Default for FeatureRequest {
    /// The features the rendering code expects whenever available.
    fn default() -> Self {
        Self {
            features: vec![
                Feature::SamplerAnisotropy,
                Feature::DepthClamp,
                Feature::ShaderClipDistance,
                Feature::FillModeNonSolid,
                Feature::GeometryShader,
            ],
        }
    }
}

impl FeatureRequest {
    /// A request with nothing in it.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            features: Vec::new(),
        }
    }

    /// Add a feature to the request.
    #[must_use]
    pub fn with(mut self, feature: Feature) -> Self {
        if !self.features.contains(&feature) {
            self.features.push(feature);
        }
        self
    }

    /// Requested features in request order.
    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Enable every requested feature that `available` reports.
    ///
    /// Returns the requested features that were left off.
    pub fn enable_available(
        &self,
        available: &vk::PhysicalDeviceFeatures,
        enabled: &mut vk::PhysicalDeviceFeatures,
    ) -> Vec<Feature> {
        let mut missing = Vec::new();
        for &feature in &self.features {
            if feature.is_set(available) {
                feature.set(enabled);
            } else {
                missing.push(feature);
            }
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_identification() {
        assert_eq!(GpuVendor::from_vendor_id(0x10DE), GpuVendor::Nvidia);
        assert_eq!(GpuVendor::from_vendor_id(0x1002), GpuVendor::Amd);
        assert_eq!(GpuVendor::from_vendor_id(0x8086), GpuVendor::Intel);
        assert_eq!(GpuVendor::from_vendor_id(0x13B5).name(), "ARM");
        assert_eq!(GpuVendor::from_vendor_id(0x5143).name(), "Qualcomm");
        assert_eq!(GpuVendor::from_vendor_id(0x1234), GpuVendor::Other(0x1234));
    }

    #[test]
    fn only_available_features_are_enabled() {
        let available = vk::PhysicalDeviceFeatures {
            sampler_anisotropy: vk::TRUE,
            fill_mode_non_solid: vk::TRUE,
            ..Default::default()
        };
        let mut enabled = vk::PhysicalDeviceFeatures::default();

        let missing = FeatureRequest::default().enable_available(&available, &mut enabled);

        assert_eq!(enabled.sampler_anisotropy, vk::TRUE);
        assert_eq!(enabled.fill_mode_non_solid, vk::TRUE);
        assert_eq!(enabled.geometry_shader, vk::FALSE);
        assert_eq!(
            missing,
            vec![
                Feature::DepthClamp,
                Feature::ShaderClipDistance,
                Feature::GeometryShader
            ]
        );
    }

    #[test]
    fn empty_request_enables_nothing() {
        let available = vk::PhysicalDeviceFeatures {
            geometry_shader: vk::TRUE,
            ..Default::default()
        };
        let mut enabled = vk::PhysicalDeviceFeatures::default();
        assert!(FeatureRequest::none()
            .enable_available(&available, &mut enabled)
            .is_empty());
        assert_eq!(enabled.geometry_shader, vk::FALSE);

        let request = FeatureRequest::none().with(Feature::GeometryShader);
        request.enable_available(&available, &mut enabled);
        assert!(Feature::GeometryShader.is_set(&enabled));
    }
}
