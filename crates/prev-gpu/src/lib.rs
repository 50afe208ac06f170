//! Vulkan layer of the PreV engine.
//!
//! This crate provides:
//! - Instance creation with layer/extension pick lists
//! - Physical device enumeration and presentable GPU selection
//! - A logical device realized lazily once all queues are requested
//! - Swapchain management with per-frame synchronization
//! - Ring-buffered uniform buffers and descriptor sets
//! - Memory allocation via gpu-allocator

pub mod capabilities;
pub mod command;
pub mod depth;
pub mod descriptors;
pub mod device;
pub mod error;
pub mod instance;
pub mod memory;
pub mod physical;
pub mod picklist;
pub mod render_pass;
pub mod ring;
pub mod surface;
pub mod swapchain;
pub mod sync;
pub mod ubo;

pub use capabilities::{Feature, FeatureRequest, GpuVendor};
pub use command::CommandPool;
pub use depth::DepthBuffer;
pub use descriptors::{
    BindingDesc, BindingTable, DescriptorBackend, ShaderBindings, DEFAULT_DESCRIPTOR_POOL_CAPACITY,
};
pub use device::{Device, DeviceBackend, Queue, VulkanDeviceBackend};
pub use error::{GpuError, Result};
pub use instance::Instance;
pub use memory::{GpuAllocator, GpuBuffer, GpuImage};
pub use physical::{PhysicalDevice, PhysicalDevices};
pub use picklist::PickList;
pub use render_pass::RenderPass;
pub use ring::RingCursor;
pub use surface::{Surface, SurfaceSupport};
pub use swapchain::{AcquiredFrame, Swapchain, SwapchainBackend, VulkanSwapchainBackend};
pub use sync::FrameSync;
pub use ubo::{GpuUniformMemory, Ubo, UboPool, UniformMemory};

pub use ash::vk;
