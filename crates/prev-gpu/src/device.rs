//! Logical device with deferred creation.
//!
//! Queues are requested with [`Device::add_queue`] while the device is still
//! unrealized. The native device is created the first time its handle is
//! needed, with every requested queue batched into the one create call, and
//! each [`Queue`] placeholder is then resolved to its native handle.
//!
//! ```text
//! Unrealized ──handle()──> Realized ──destroy()──> Destroyed
//!      │                                              ^
//!      └──────────────────destroy()───────────────────┘
//! ```

use std::sync::{Arc, OnceLock};

use ash::vk;
use parking_lot::Mutex;

use crate::error::{GpuError, Result};
use crate::instance::Instance;
use crate::physical::PhysicalDevice;
use crate::surface::SurfaceSupport;

/// Number of queues to create from one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyRequest {
    pub family: u32,
    pub count: u32,
}

/// Creates and destroys the native device.
pub trait DeviceBackend: Send + Sync {
    /// Native device type.
    type Handle: Send + Sync;

    /// Create the device with the given queues.
    fn create(&self, gpu: &PhysicalDevice, queues: &[QueueFamilyRequest]) -> Result<Self::Handle>;

    /// Look up a created queue.
    fn queue(&self, handle: &Self::Handle, family: u32, index: u32) -> vk::Queue;

    /// Wait for idle and destroy the device.
    fn destroy(&self, handle: &Self::Handle);
}

/// [`DeviceBackend`] backed by `vkCreateDevice`.
pub struct VulkanDeviceBackend {
    instance: Arc<Instance>,
}

impl VulkanDeviceBackend {
    pub const fn new(instance: Arc<Instance>) -> Self {
        Self { instance }
    }

    pub const fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }
}

impl DeviceBackend for VulkanDeviceBackend {
    type Handle = ash::Device;

    fn create(&self, gpu: &PhysicalDevice, queues: &[QueueFamilyRequest]) -> Result<ash::Device> {
        let priorities: Vec<Vec<f32>> = queues
            .iter()
            .map(|q| vec![1.0; q.count as usize])
            .collect();

        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = queues
            .iter()
            .zip(&priorities)
            .map(|(q, priorities)| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(q.family)
                    .queue_priorities(priorities)
            })
            .collect();

        let extension_names = gpu.extensions().picked_ptrs();
        let features = *gpu.enabled_features();

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_names)
            .enabled_features(&features);

        let device = unsafe {
            self.instance
                .raw()
                .create_device(gpu.handle(), &create_info, None)?
        };
        Ok(device)
    }

    fn queue(&self, handle: &ash::Device, family: u32, index: u32) -> vk::Queue {
        unsafe { handle.get_device_queue(family, index) }
    }

    fn destroy(&self, handle: &ash::Device) {
        unsafe {
            let _ = handle.device_wait_idle();
            handle.destroy_device(None);
        }
    }
}

/// A device queue.
///
/// Created as a placeholder by [`Device::add_queue`]; the native handle is
/// filled in when the device is realized.
#[derive(Debug)]
pub struct Queue {
    family: u32,
    index: u32,
    flags: vk::QueueFlags,
    surface: vk::SurfaceKHR,
    handle: OnceLock<vk::Queue>,
}

impl Queue {
    /// Native queue handle.
    ///
    /// # Panics
    /// If the owning device has not been realized yet.
    pub fn handle(&self) -> vk::Queue {
        match self.handle.get() {
            Some(&queue) => queue,
            None => panic!(
                "queue (family {}, index {}) used before its device was realized",
                self.family, self.index
            ),
        }
    }

    /// Native handle, or `None` before realization.
    pub fn try_handle(&self) -> Option<vk::Queue> {
        self.handle.get().copied()
    }

    pub const fn family(&self) -> u32 {
        self.family
    }

    pub const fn index(&self) -> u32 {
        self.index
    }

    pub const fn flags(&self) -> vk::QueueFlags {
        self.flags
    }

    /// Surface this queue was requested to present to (null if none).
    pub const fn surface(&self) -> vk::SurfaceKHR {
        self.surface
    }

    #[must_use]
    pub fn can_present(&self) -> bool {
        self.surface != vk::SurfaceKHR::null()
    }
}

enum DeviceState<H> {
    Unrealized,
    Realized(Arc<H>),
    Destroyed,
}

struct DeviceInner<H> {
    state: DeviceState<H>,
    queues: Vec<Arc<Queue>>,
}

/// Logical device created on first use.
pub struct Device<B: DeviceBackend = VulkanDeviceBackend> {
    gpu: PhysicalDevice,
    backend: B,
    inner: Mutex<DeviceInner<B::Handle>>,
}

impl Device<VulkanDeviceBackend> {
    /// Create an unrealized Vulkan device for `gpu`.
    pub fn new(instance: Arc<Instance>, gpu: PhysicalDevice) -> Self {
        Self::with_backend(gpu, VulkanDeviceBackend::new(instance))
    }

    pub fn instance(&self) -> &Arc<Instance> {
        self.backend.instance()
    }

    /// Wait until the device has finished all submitted work.
    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn wait_idle(&self) -> Result<()> {
        let device = self.handle()?;
        unsafe {
            device.device_wait_idle()?;
        }
        Ok(())
    }
}

impl<B: DeviceBackend> Device<B> {
    /// Create an unrealized device using a custom backend.
    pub fn with_backend(gpu: PhysicalDevice, backend: B) -> Self {
        tracing::info!("Logical device using GPU: {}", gpu.name());
        Self {
            gpu,
            backend,
            inner: Mutex::new(DeviceInner {
                state: DeviceState::Unrealized,
                queues: Vec::new(),
            }),
        }
    }

    pub const fn gpu(&self) -> &PhysicalDevice {
        &self.gpu
    }

    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Request a queue with at least `flags`, optionally able to present to
    /// `surface`.
    ///
    /// # Panics
    /// If the device has already been realized.
    pub fn add_queue(
        &self,
        flags: vk::QueueFlags,
        surface: Option<&dyn SurfaceSupport>,
    ) -> Result<Arc<Queue>> {
        self.add_queue_excluding(flags, vk::QueueFlags::empty(), surface)
    }

    /// Like [`Device::add_queue`], skipping families that have any of
    /// `unwanted`. Useful to ask for a dedicated compute or transfer queue.
    ///
    /// # Panics
    /// If the device has already been realized.
    pub fn add_queue_excluding(
        &self,
        flags: vk::QueueFlags,
        unwanted: vk::QueueFlags,
        surface: Option<&dyn SurfaceSupport>,
    ) -> Result<Arc<Queue>> {
        let mut inner = self.inner.lock();
        assert!(
            matches!(inner.state, DeviceState::Unrealized),
            "add_queue called after the device was realized"
        );

        let Some(family) = self.gpu.find_queue_family(flags, unwanted, surface) else {
            tracing::warn!("Could not find queue family with flags {:?}", flags);
            return Err(GpuError::QueueFamilyNotFound(flags));
        };

        let props = &self.gpu.queue_families()[family as usize];
        let used = u32::try_from(inner.queues.iter().filter(|q| q.family == family).count())
            .unwrap_or(u32::MAX);
        if used >= props.queue_count {
            tracing::warn!("No more queues available from family {}", family);
            return Err(GpuError::QueueFamilyExhausted {
                family,
                count: props.queue_count,
            });
        }

        let queue = Arc::new(Queue {
            family,
            index: used,
            flags: props.queue_flags,
            surface: surface.map_or_else(vk::SurfaceKHR::null, |s| s.handle()),
            handle: OnceLock::new(),
        });
        inner.queues.push(queue.clone());
        Ok(queue)
    }

    /// Native device handle. Realizes the device on first call.
    pub fn handle(&self) -> Result<Arc<B::Handle>> {
        let mut inner = self.inner.lock();
        match &inner.state {
            DeviceState::Realized(handle) => return Ok(handle.clone()),
            DeviceState::Destroyed => {
                return Err(GpuError::InvalidState("device already destroyed".to_string()))
            }
            DeviceState::Unrealized => {}
        }

        let requests = family_requests(&inner.queues);
        let handle = Arc::new(self.backend.create(&self.gpu, &requests)?);

        for queue in &inner.queues {
            let native = self.backend.queue(&handle, queue.family, queue.index);
            let _ = queue.handle.set(native);
        }

        tracing::info!(
            "Logical device created with {} queue(s) from {} famil{}",
            inner.queues.len(),
            requests.len(),
            if requests.len() == 1 { "y" } else { "ies" }
        );

        inner.state = DeviceState::Realized(handle.clone());
        Ok(handle)
    }

    #[must_use]
    pub fn is_realized(&self) -> bool {
        matches!(self.inner.lock().state, DeviceState::Realized(_))
    }

    /// All requested queues in request order.
    pub fn queues(&self) -> Vec<Arc<Queue>> {
        self.inner.lock().queues.clone()
    }

    /// Wait for idle and destroy the native device. Later calls do nothing.
    ///
    /// Every resource created from the device must be destroyed first.
    pub fn destroy(&self) {
        let mut inner = self.inner.lock();
        let state = std::mem::replace(&mut inner.state, DeviceState::Destroyed);
        if let DeviceState::Realized(handle) = state {
            self.backend.destroy(&handle);
            tracing::info!("Logical device destroyed");
        }
    }

    /// Log the requested queues.
    pub fn log(&self) {
        tracing::info!("Logical device queues:");
        for queue in &self.inner.lock().queues {
            tracing::info!(
                "  family {} index {} flags [{:?}]{}",
                queue.family,
                queue.index,
                queue.flags,
                if queue.can_present() { " (can present)" } else { "" }
            );
        }
    }
}

impl<B: DeviceBackend> Drop for Device<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// One request per distinct family, in first-use order.
fn family_requests(queues: &[Arc<Queue>]) -> Vec<QueueFamilyRequest> {
    let mut requests: Vec<QueueFamilyRequest> = Vec::new();
    for queue in queues {
        if let Some(request) = requests.iter_mut().find(|r| r.family == queue.family) {
            request.count = request.count.max(queue.index + 1);
        } else {
            requests.push(QueueFamilyRequest {
                family: queue.family,
                count: queue.index + 1,
            });
        }
    }
    requests
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::physical::tests::{mock_gpu, MockSurface};
    use ash::vk::Handle;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    pub(crate) struct MockDeviceBackend {
        pub created: AtomicUsize,
        pub destroyed: AtomicUsize,
        pub requests: Mutex<Vec<QueueFamilyRequest>>,
    }

    impl DeviceBackend for MockDeviceBackend {
        type Handle = u64;

        fn create(&self, _gpu: &PhysicalDevice, queues: &[QueueFamilyRequest]) -> Result<u64> {
            self.created.fetch_add(1, Ordering::SeqCst);
            *self.requests.lock() = queues.to_vec();
            Ok(0xD3)
        }

        fn queue(&self, _handle: &u64, family: u32, index: u32) -> vk::Queue {
            vk::Queue::from_raw(0x100 + u64::from(family) * 0x10 + u64::from(index))
        }

        fn destroy(&self, _handle: &u64) {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn device() -> Device<MockDeviceBackend> {
        Device::with_backend(mock_gpu(), MockDeviceBackend::default())
    }

    #[test]
    fn queues_never_exceed_family_capacity() {
        let device = device();
        // Family 0 has two queues.
        let a = device.add_queue(vk::QueueFlags::GRAPHICS, None).unwrap();
        let b = device.add_queue(vk::QueueFlags::GRAPHICS, None).unwrap();
        assert_eq!((a.family(), a.index()), (0, 0));
        assert_eq!((b.family(), b.index()), (0, 1));

        let err = device.add_queue(vk::QueueFlags::GRAPHICS, None).unwrap_err();
        assert!(matches!(
            err,
            GpuError::QueueFamilyExhausted { family: 0, count: 2 }
        ));
        assert_eq!(device.queues().len(), 2);
    }

    #[test]
    fn missing_family_is_recoverable() {
        let device = device();
        let err = device
            .add_queue(vk::QueueFlags::SPARSE_BINDING, None)
            .unwrap_err();
        assert!(matches!(err, GpuError::QueueFamilyNotFound(_)));

        // Falling back to a less specific request works.
        assert!(device.add_queue(vk::QueueFlags::TRANSFER, None).is_ok());
    }

    #[test]
    fn dedicated_queue_skips_unwanted_flags() {
        let device = device();
        let compute = device
            .add_queue_excluding(vk::QueueFlags::COMPUTE, vk::QueueFlags::GRAPHICS, None)
            .unwrap();
        assert_eq!(compute.family(), 1);
    }

    #[test]
    fn present_queue_records_surface() {
        let device = device();
        let surface = MockSurface::default();
        let queue = device.add_queue(vk::QueueFlags::GRAPHICS, Some(&surface)).unwrap();
        assert!(queue.can_present());
        assert_eq!(queue.surface(), surface.handle());
    }

    #[test]
    fn realization_batches_families_and_resolves_queues() {
        let device = device();
        let g0 = device.add_queue(vk::QueueFlags::GRAPHICS, None).unwrap();
        let g1 = device.add_queue(vk::QueueFlags::GRAPHICS, None).unwrap();
        let t = device
            .add_queue_excluding(vk::QueueFlags::TRANSFER, vk::QueueFlags::COMPUTE, None)
            .unwrap();
        assert!(g0.try_handle().is_none());

        device.handle().unwrap();

        assert_eq!(
            *device.backend().requests.lock(),
            vec![
                QueueFamilyRequest { family: 0, count: 2 },
                QueueFamilyRequest { family: 2, count: 1 },
            ]
        );
        assert_eq!(g0.handle(), vk::Queue::from_raw(0x100));
        assert_eq!(g1.handle(), vk::Queue::from_raw(0x101));
        assert_eq!(t.handle(), vk::Queue::from_raw(0x120));
    }

    #[test]
    fn realized_once() {
        let device = device();
        for _ in 0..3 {
            device.handle().unwrap();
        }
        assert!(device.is_realized());
        assert_eq!(device.backend().created.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[should_panic(expected = "after the device was realized")]
    fn add_queue_after_realization_panics() {
        let device = device();
        device.handle().unwrap();
        let _ = device.add_queue(vk::QueueFlags::GRAPHICS, None);
    }

    #[test]
    #[should_panic(expected = "before its device was realized")]
    fn queue_handle_before_realization_panics() {
        let device = device();
        let queue = device.add_queue(vk::QueueFlags::GRAPHICS, None).unwrap();
        let _ = queue.handle();
    }

    #[test]
    fn destroy_is_idempotent() {
        let device = device();
        device.handle().unwrap();
        device.destroy();
        device.destroy();
        assert_eq!(device.backend().destroyed.load(Ordering::SeqCst), 1);
        assert!(device.handle().is_err());
        // Drop runs destroy once more; still a no-op.
    }

    #[test]
    fn destroying_unrealized_device_creates_nothing() {
        let device = device();
        device.destroy();
        assert_eq!(device.backend().created.load(Ordering::SeqCst), 0);
        assert_eq!(device.backend().destroyed.load(Ordering::SeqCst), 0);
    }
}
