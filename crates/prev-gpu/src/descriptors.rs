//! Declarative descriptor bindings and the per-draw descriptor-set ring.
//!
//! A [`BindingTable`] describes a shader's resources as data. [`ShaderBindings`]
//! turns it into a set layout and a pool of sets that is handed out one set
//! per draw: resources are bound by name, then
//! [`ShaderBindings::update_next_descriptor_set`] writes them into the next
//! set of the ring in one batched update.

use std::sync::Arc;

use ash::vk;
use hashbrown::HashMap;

use crate::error::Result;
use crate::ring::RingCursor;
use crate::ubo::{UniformBlock, Ubo};

/// Sets allocated by a fresh [`ShaderBindings`].
pub const DEFAULT_DESCRIPTOR_POOL_CAPACITY: u32 = 20;

/// One named shader resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingDesc {
    pub name: String,
    pub binding: u32,
    pub descriptor_type: vk::DescriptorType,
    pub count: u32,
    pub stages: vk::ShaderStageFlags,
}

/// The resources of one descriptor set layout, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingTable {
    bindings: Vec<BindingDesc>,
}

impl BindingTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding.
    ///
    /// # Panics
    /// If `name` or `binding` is already in the table.
    #[must_use]
    pub fn binding(
        mut self,
        name: impl Into<String>,
        binding: u32,
        descriptor_type: vk::DescriptorType,
        stages: vk::ShaderStageFlags,
    ) -> Self {
        let name = name.into();
        assert!(
            self.find(&name).is_none(),
            "binding name \"{name}\" declared twice"
        );
        assert!(
            self.bindings.iter().all(|b| b.binding != binding),
            "binding index {binding} declared twice"
        );
        self.bindings.push(BindingDesc {
            name,
            binding,
            descriptor_type,
            count: 1,
            stages,
        });
        self
    }

    #[must_use]
    pub fn uniform_buffer(self, name: impl Into<String>, binding: u32, stages: vk::ShaderStageFlags) -> Self {
        self.binding(name, binding, vk::DescriptorType::UNIFORM_BUFFER, stages)
    }

    #[must_use]
    pub fn storage_buffer(self, name: impl Into<String>, binding: u32, stages: vk::ShaderStageFlags) -> Self {
        self.binding(name, binding, vk::DescriptorType::STORAGE_BUFFER, stages)
    }

    #[must_use]
    pub fn sampled_image(self, name: impl Into<String>, binding: u32, stages: vk::ShaderStageFlags) -> Self {
        self.binding(name, binding, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, stages)
    }

    #[must_use]
    pub fn storage_image(self, name: impl Into<String>, binding: u32, stages: vk::ShaderStageFlags) -> Self {
        self.binding(name, binding, vk::DescriptorType::STORAGE_IMAGE, stages)
    }

    pub fn find(&self, name: &str) -> Option<&BindingDesc> {
        self.bindings.iter().find(|b| b.name == name)
    }

    pub fn bindings(&self) -> &[BindingDesc] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Layout bindings for `vkCreateDescriptorSetLayout`.
    pub fn layout_bindings(&self) -> Vec<vk::DescriptorSetLayoutBinding<'static>> {
        self.bindings
            .iter()
            .map(|b| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(b.binding)
                    .descriptor_type(b.descriptor_type)
                    .descriptor_count(b.count)
                    .stage_flags(b.stages)
            })
            .collect()
    }

    /// Pool sizes for `set_count` sets of this layout, one entry per
    /// descriptor type.
    pub fn pool_sizes(&self, set_count: u32) -> Vec<vk::DescriptorPoolSize> {
        let mut totals: Vec<vk::DescriptorPoolSize> = Vec::new();
        for b in &self.bindings {
            let count = b.count * set_count;
            match totals.iter_mut().find(|s| s.ty == b.descriptor_type) {
                Some(size) => size.descriptor_count += count,
                None => totals.push(vk::DescriptorPoolSize {
                    ty: b.descriptor_type,
                    descriptor_count: count,
                }),
            }
        }
        totals
    }
}

/// Native descriptor operations used by [`ShaderBindings`].
pub trait DescriptorBackend {
    fn create_layout(&self, bindings: &[vk::DescriptorSetLayoutBinding<'_>]) -> Result<vk::DescriptorSetLayout>;

    fn destroy_layout(&self, layout: vk::DescriptorSetLayout);

    fn create_pool(&self, max_sets: u32, sizes: &[vk::DescriptorPoolSize]) -> Result<vk::DescriptorPool>;

    /// Destroy a pool, which also frees every set allocated from it.
    fn destroy_pool(&self, pool: vk::DescriptorPool);

    fn allocate_sets(
        &self,
        pool: vk::DescriptorPool,
        layouts: &[vk::DescriptorSetLayout],
    ) -> Result<Vec<vk::DescriptorSet>>;

    fn update_sets(&self, writes: &[vk::WriteDescriptorSet<'_>]);
}

impl DescriptorBackend for ash::Device {
    fn create_layout(&self, bindings: &[vk::DescriptorSetLayoutBinding<'_>]) -> Result<vk::DescriptorSetLayout> {
        let info = vk::DescriptorSetLayoutCreateInfo::default().bindings(bindings);
        Ok(unsafe { self.create_descriptor_set_layout(&info, None)? })
    }

    fn destroy_layout(&self, layout: vk::DescriptorSetLayout) {
        unsafe { self.destroy_descriptor_set_layout(layout, None) };
    }

    fn create_pool(&self, max_sets: u32, sizes: &[vk::DescriptorPoolSize]) -> Result<vk::DescriptorPool> {
        let info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(max_sets)
            .pool_sizes(sizes);
        Ok(unsafe { self.create_descriptor_pool(&info, None)? })
    }

    fn destroy_pool(&self, pool: vk::DescriptorPool) {
        unsafe { self.destroy_descriptor_pool(pool, None) };
    }

    fn allocate_sets(
        &self,
        pool: vk::DescriptorPool,
        layouts: &[vk::DescriptorSetLayout],
    ) -> Result<Vec<vk::DescriptorSet>> {
        let info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool)
            .set_layouts(layouts);
        Ok(unsafe { self.allocate_descriptor_sets(&info)? })
    }

    fn update_sets(&self, writes: &[vk::WriteDescriptorSet<'_>]) {
        unsafe { self.update_descriptor_sets(writes, &[]) };
    }
}

impl<T: DescriptorBackend + ?Sized> DescriptorBackend for Arc<T> {
    fn create_layout(&self, bindings: &[vk::DescriptorSetLayoutBinding<'_>]) -> Result<vk::DescriptorSetLayout> {
        (**self).create_layout(bindings)
    }

    fn destroy_layout(&self, layout: vk::DescriptorSetLayout) {
        (**self).destroy_layout(layout);
    }

    fn create_pool(&self, max_sets: u32, sizes: &[vk::DescriptorPoolSize]) -> Result<vk::DescriptorPool> {
        (**self).create_pool(max_sets, sizes)
    }

    fn destroy_pool(&self, pool: vk::DescriptorPool) {
        (**self).destroy_pool(pool);
    }

    fn allocate_sets(
        &self,
        pool: vk::DescriptorPool,
        layouts: &[vk::DescriptorSetLayout],
    ) -> Result<Vec<vk::DescriptorSet>> {
        (**self).allocate_sets(pool, layouts)
    }

    fn update_sets(&self, writes: &[vk::WriteDescriptorSet<'_>]) {
        (**self).update_sets(writes);
    }
}

#[derive(Debug, Clone, Copy)]
enum Resource {
    Buffer(vk::DescriptorBufferInfo),
    Image(vk::DescriptorImageInfo),
}

#[derive(Debug, Clone, Copy)]
struct PendingWrite {
    binding: u32,
    descriptor_type: vk::DescriptorType,
    resource: Resource,
}

/// Descriptor layout, pool and set ring for one shader.
///
/// Not synchronized; use from the render thread only.
pub struct ShaderBindings<B: DescriptorBackend = Arc<ash::Device>> {
    backend: B,
    table: BindingTable,
    layout: vk::DescriptorSetLayout,
    pool: vk::DescriptorPool,
    sets: Vec<vk::DescriptorSet>,
    cursor: RingCursor,
    pending: HashMap<u32, PendingWrite>,
}

impl<B: DescriptorBackend> ShaderBindings<B> {
    /// Create the layout and a pool of
    /// [`DEFAULT_DESCRIPTOR_POOL_CAPACITY`] sets.
    pub fn new(backend: B, table: BindingTable) -> Result<Self> {
        let layout = backend.create_layout(&table.layout_bindings())?;
        let mut bindings = Self {
            backend,
            table,
            layout,
            pool: vk::DescriptorPool::null(),
            sets: Vec::new(),
            cursor: RingCursor::new(0),
            pending: HashMap::new(),
        };
        bindings.adjust_descriptor_pool_capacity(DEFAULT_DESCRIPTOR_POOL_CAPACITY)?;
        Ok(bindings)
    }

    pub const fn table(&self) -> &BindingTable {
        &self.table
    }

    pub const fn layout(&self) -> vk::DescriptorSetLayout {
        self.layout
    }

    /// Number of sets in the ring.
    pub fn capacity(&self) -> u32 {
        self.sets.len() as u32
    }

    /// Grow the set ring to `desired` sets.
    ///
    /// Does nothing unless `desired` exceeds the current capacity. When it
    /// grows, the old pool is destroyed and every set handed out before
    /// becomes invalid. On failure the old pool and ring stay in place.
    /// Returns whether the pool was rebuilt.
    pub fn adjust_descriptor_pool_capacity(&mut self, desired: u32) -> Result<bool> {
        if desired <= self.capacity() {
            return Ok(false);
        }

        let pool = self
            .backend
            .create_pool(desired, &self.table.pool_sizes(desired))?;
        let layouts = vec![self.layout; desired as usize];
        let sets = match self.backend.allocate_sets(pool, &layouts) {
            Ok(sets) => sets,
            Err(e) => {
                self.backend.destroy_pool(pool);
                return Err(e);
            }
        };

        let old = std::mem::replace(&mut self.pool, pool);
        if old != vk::DescriptorPool::null() {
            self.backend.destroy_pool(old);
        }
        self.sets = sets;
        self.cursor = RingCursor::new(self.sets.len());

        tracing::debug!("Descriptor pool resized to {desired} sets");
        Ok(true)
    }

    fn record(&mut self, name: &str, resource: Resource) -> bool {
        let Some(desc) = self.table.find(name) else {
            tracing::error!("Could not find shader binding named \"{name}\"");
            return false;
        };
        self.pending.insert(
            desc.binding,
            PendingWrite {
                binding: desc.binding,
                descriptor_type: desc.descriptor_type,
                resource,
            },
        );
        true
    }

    /// Bind a buffer range to `name`.
    ///
    /// Returns `false` (and logs an error) if the table has no such binding.
    pub fn bind_buffer(&mut self, name: &str, buffer: vk::Buffer, offset: u64, range: u64) -> bool {
        self.record(
            name,
            Resource::Buffer(vk::DescriptorBufferInfo {
                buffer,
                offset,
                range,
            }),
        )
    }

    /// Bind one slot of a UBO pool to `name`.
    pub fn bind_ubo<T: bytemuck::Pod, U: UniformBlock>(&mut self, name: &str, ubo: &Ubo<'_, T, U>) -> bool {
        self.record(name, Resource::Buffer(ubo.descriptor_info()))
    }

    /// Bind an image view (with `sampler` for combined image samplers) to
    /// `name`.
    pub fn bind_image(
        &mut self,
        name: &str,
        view: vk::ImageView,
        sampler: vk::Sampler,
        layout: vk::ImageLayout,
    ) -> bool {
        self.record(
            name,
            Resource::Image(vk::DescriptorImageInfo {
                sampler,
                image_view: view,
                image_layout: layout,
            }),
        )
    }

    /// Number of bindings recorded since the last update.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Write the recorded resources into the next set of the ring and return
    /// it.
    ///
    /// # Panics
    /// If a binding of the table has no resource recorded.
    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn update_next_descriptor_set(&mut self) -> vk::DescriptorSet {
        for desc in self.table.bindings() {
            assert!(
                self.pending.contains_key(&desc.binding),
                "shader binding \"{}\" was not bound before updating the descriptor set",
                desc.name
            );
        }

        let set = self.sets[self.cursor.advance()];
        let pending: Vec<PendingWrite> = self.pending.drain().map(|(_, w)| w).collect();

        let writes: Vec<vk::WriteDescriptorSet<'_>> = pending
            .iter()
            .map(|w| {
                let write = vk::WriteDescriptorSet::default()
                    .dst_set(set)
                    .dst_binding(w.binding)
                    .descriptor_type(w.descriptor_type);
                match &w.resource {
                    Resource::Buffer(info) => write.buffer_info(std::slice::from_ref(info)),
                    Resource::Image(info) => write.image_info(std::slice::from_ref(info)),
                }
            })
            .collect();
        self.backend.update_sets(&writes);

        set
    }
}

impl<B: DescriptorBackend> Drop for ShaderBindings<B> {
    fn drop(&mut self) {
        if self.pool != vk::DescriptorPool::null() {
            self.backend.destroy_pool(self.pool);
        }
        self.backend.destroy_layout(self.layout);
    }
}
