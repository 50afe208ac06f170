//! Ring of uniform buffer slots carved out of one persistently mapped buffer.
//!
//! Each draw takes the next slot with [`UboPool::get_next`], writes its data
//! and binds the slot's range. With at least as many slots as draws per frame
//! times frames in flight, no slot is rewritten while the GPU still reads it.

use std::marker::PhantomData;
use std::sync::Arc;

use ash::vk;
use gpu_allocator::MemoryLocation;
use parking_lot::Mutex;

use crate::error::Result;
use crate::memory::{GpuAllocator, GpuBuffer};
use crate::ring::RingCursor;

/// A host-visible block of uniform memory.
pub trait UniformBlock {
    /// Native buffer the block lives in.
    fn buffer(&self) -> vk::Buffer;

    /// Copy `bytes` to `offset` within the block.
    fn write(&self, offset: u64, bytes: &[u8]) -> Result<()>;
}

/// Source of uniform blocks.
pub trait UniformMemory {
    type Block: UniformBlock;

    /// Allocate a mapped block of `size` bytes.
    fn allocate(&mut self, size: u64, name: &str) -> Result<Self::Block>;

    fn free(&mut self, block: Self::Block) -> Result<()>;
}

impl UniformBlock for GpuBuffer {
    fn buffer(&self) -> vk::Buffer {
        self.buffer
    }

    fn write(&self, offset: u64, bytes: &[u8]) -> Result<()> {
        self.write_bytes(offset, bytes)
    }
}

/// [`UniformMemory`] served by the shared device allocator.
#[derive(Clone)]
pub struct GpuUniformMemory {
    allocator: Arc<Mutex<GpuAllocator>>,
}

impl GpuUniformMemory {
    pub const fn new(allocator: Arc<Mutex<GpuAllocator>>) -> Self {
        Self { allocator }
    }
}

impl UniformMemory for GpuUniformMemory {
    type Block = GpuBuffer;

    fn allocate(&mut self, size: u64, name: &str) -> Result<GpuBuffer> {
        self.allocator.lock().create_buffer(
            size,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            MemoryLocation::CpuToGpu,
            name,
        )
    }

    fn free(&mut self, mut block: GpuBuffer) -> Result<()> {
        self.allocator.lock().free_buffer(&mut block)
    }
}

/// Round `size` up to a multiple of `alignment`.
#[must_use]
pub const fn align_up(size: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        size
    } else {
        size.div_ceil(alignment) * alignment
    }
}

/// One slot of a [`UboPool`].
pub struct Ubo<'a, T, B> {
    block: &'a B,
    offset: u64,
    range: u64,
    _marker: PhantomData<fn(&T)>,
}

impl<T: bytemuck::Pod, B: UniformBlock> Ubo<'_, T, B> {
    /// Write this slot's data.
    pub fn update(&self, value: &T) -> Result<()> {
        self.block.write(self.offset, bytemuck::bytes_of(value))
    }

    pub fn buffer(&self) -> vk::Buffer {
        self.block.buffer()
    }

    pub const fn offset(&self) -> u64 {
        self.offset
    }

    pub const fn range(&self) -> u64 {
        self.range
    }

    /// Buffer info to bind this slot as a uniform buffer.
    pub fn descriptor_info(&self) -> vk::DescriptorBufferInfo {
        vk::DescriptorBufferInfo {
            buffer: self.buffer(),
            offset: self.offset,
            range: self.range,
        }
    }
}

/// Ring of `capacity` uniform slots of type `T`.
pub struct UboPool<T, M: UniformMemory = GpuUniformMemory> {
    memory: M,
    block: Option<M::Block>,
    cursor: RingCursor,
    stride: u64,
    _marker: PhantomData<fn(&T)>,
}

impl<T: bytemuck::Pod, M: UniformMemory> UboPool<T, M> {
    /// An empty pool; call [`UboPool::adjust_capacity`] before use.
    pub const fn new(memory: M) -> Self {
        Self {
            memory,
            block: None,
            cursor: RingCursor::new(0),
            stride: 0,
            _marker: PhantomData,
        }
    }

    /// Reallocate the pool with `capacity` slots, each aligned to
    /// `alignment` bytes. Pass the device's
    /// `minUniformBufferOffsetAlignment`.
    ///
    /// Always rebuilds, so every slot handed out before is invalid afterwards.
    /// If the new block cannot be allocated the pool keeps its old one.
    pub fn adjust_capacity(&mut self, capacity: usize, alignment: u64) -> Result<()> {
        let stride = align_up(std::mem::size_of::<T>() as u64, alignment);
        let name = std::any::type_name::<T>();
        let block = self.memory.allocate(stride * capacity as u64, name)?;

        let old = self.block.replace(block);
        self.stride = stride;
        self.cursor = RingCursor::new(capacity);
        tracing::debug!("UBO pool for {name}: {capacity} slots x {stride} bytes");

        if let Some(old) = old {
            self.memory.free(old)?;
        }
        Ok(())
    }

    pub const fn capacity(&self) -> usize {
        self.cursor.capacity()
    }

    /// Byte distance between consecutive slots.
    pub const fn stride(&self) -> u64 {
        self.stride
    }

    /// Advance the ring and return the slot it lands on.
    ///
    /// # Panics
    /// If the pool has no slots.
    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn get_next(&mut self) -> Ubo<'_, T, M::Block> {
        let slot = self.cursor.advance();
        let Some(block) = self.block.as_ref() else {
            unreachable!("UBO pool has capacity but no memory block");
        };
        Ubo {
            block,
            offset: slot as u64 * self.stride,
            range: std::mem::size_of::<T>() as u64,
            _marker: PhantomData,
        }
    }
}

impl<T, M: UniformMemory> Drop for UboPool<T, M> {
    fn drop(&mut self) {
        if let Some(block) = self.block.take() {
            if let Err(e) = self.memory.free(block) {
                tracing::error!("Failed to free UBO pool memory: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use bytemuck::{Pod, Zeroable};
    use glam::{Mat4, Vec4};

    use super::*;
    use crate::error::GpuError;

    #[derive(Clone)]
    struct HostBlock {
        bytes: Rc<RefCell<Vec<u8>>>,
    }

    impl UniformBlock for HostBlock {
        fn buffer(&self) -> vk::Buffer {
            vk::Handle::from_raw(0xB0)
        }

        fn write(&self, offset: u64, bytes: &[u8]) -> Result<()> {
            let offset = offset as usize;
            self.bytes.borrow_mut()[offset..offset + bytes.len()].copy_from_slice(bytes);
            Ok(())
        }
    }

    const ALIGNMENT: u64 = 256;

    #[derive(Default)]
    struct HostMemory {
        allocations: Vec<u64>,
        frees: usize,
        last: Option<Rc<RefCell<Vec<u8>>>>,
        out_of_memory: bool,
    }

    impl UniformMemory for &mut HostMemory {
        type Block = HostBlock;

        fn allocate(&mut self, size: u64, _name: &str) -> Result<HostBlock> {
            if self.out_of_memory {
                return Err(GpuError::AllocationFailed("host memory exhausted".to_string()));
            }
            let bytes = Rc::new(RefCell::new(vec![0; size as usize]));
            self.allocations.push(size);
            self.last = Some(bytes.clone());
            Ok(HostBlock { bytes })
        }

        fn free(&mut self, _block: HostBlock) -> Result<()> {
            self.frees += 1;
            Ok(())
        }
    }

    #[repr(C)]
    #[derive(Clone, Copy, Pod, Zeroable)]
    struct Uniforms {
        model: Mat4,
        color: Vec4,
    }

    #[test]
    fn stride_is_rounded_to_alignment() {
        assert_eq!(align_up(80, 32), 96);
        assert_eq!(align_up(64, 32), 64);
        assert_eq!(align_up(80, 256), 256);
        assert_eq!(align_up(7, 0), 7);

        let mut memory = HostMemory::default();
        let mut pool = UboPool::<Uniforms, _>::new(&mut memory);
        pool.adjust_capacity(4, 256).unwrap();
        assert_eq!(pool.stride(), 256);
        assert_eq!(pool.capacity(), 4);
        drop(pool);
        assert_eq!(memory.allocations, vec![1024]);
        assert_eq!(memory.frees, 1);
    }

    #[test]
    fn adjust_capacity_always_rebuilds() {
        let mut memory = HostMemory::default();
        let mut pool = UboPool::<Uniforms, _>::new(&mut memory);
        pool.adjust_capacity(3, ALIGNMENT).unwrap();
        pool.adjust_capacity(3, ALIGNMENT).unwrap();
        pool.adjust_capacity(2, ALIGNMENT).unwrap();
        drop(pool);
        assert_eq!(memory.allocations.len(), 3);
        assert_eq!(memory.frees, 3);
    }

    #[test]
    fn every_slot_visited_once_per_cycle() {
        for capacity in 1..=6 {
            let mut memory = HostMemory::default();
            let mut pool = UboPool::<Uniforms, _>::new(&mut memory);
            pool.adjust_capacity(capacity, ALIGNMENT).unwrap();

            let mut offsets: Vec<u64> = (0..capacity).map(|_| pool.get_next().offset()).collect();
            offsets.sort_unstable();
            offsets.dedup();
            assert_eq!(offsets.len(), capacity);
        }
    }

    #[test]
    fn first_slot_handed_out_is_slot_one() {
        let mut memory = HostMemory::default();
        let mut pool = UboPool::<Uniforms, _>::new(&mut memory);
        pool.adjust_capacity(3, 128).unwrap();
        assert_eq!(pool.get_next().offset(), 128);
        assert_eq!(pool.get_next().offset(), 256);
        assert_eq!(pool.get_next().offset(), 0);
    }

    #[test]
    fn writes_stay_inside_their_slot() {
        let mut memory = HostMemory::default();
        let mut pool = UboPool::<Uniforms, _>::new(&mut memory);
        pool.adjust_capacity(4, ALIGNMENT).unwrap();

        let uniforms = |i: usize| Uniforms {
            model: Mat4::from_scale(glam::Vec3::splat(i as f32 + 1.0)),
            color: Vec4::splat(i as f32),
        };

        let mut slots = Vec::new();
        for i in 0..4 {
            let ubo = pool.get_next();
            ubo.update(&uniforms(i)).unwrap();
            slots.push((ubo.offset(), i));
        }
        assert!(pool.stride() as usize >= std::mem::size_of::<Uniforms>());
        drop(pool);

        let bytes = memory.last.as_ref().unwrap().borrow();
        for (offset, i) in slots {
            let offset = offset as usize;
            let end = offset + std::mem::size_of::<Uniforms>();
            let stored: Uniforms = bytemuck::pod_read_unaligned(&bytes[offset..end]);
            assert_eq!(stored.color, Vec4::splat(i as f32));
            assert_eq!(stored.model, uniforms(i).model);
        }
    }

    #[test]
    fn descriptor_info_covers_one_value() {
        let mut memory = HostMemory::default();
        let mut pool = UboPool::<Uniforms, _>::new(&mut memory);
        pool.adjust_capacity(2, 64).unwrap();
        let info = pool.get_next().descriptor_info();
        assert_eq!(info.offset, 128);
        assert_eq!(info.range, std::mem::size_of::<Uniforms>() as u64);
    }

    #[test]
    fn failed_rebuild_keeps_the_old_block() {
        let mut memory = HostMemory::default();
        let mut pool = UboPool::<Uniforms, _>::new(&mut memory);
        pool.adjust_capacity(3, ALIGNMENT).unwrap();

        pool.memory.out_of_memory = true;
        assert!(matches!(
            pool.adjust_capacity(8, 64),
            Err(GpuError::AllocationFailed(_))
        ));
        assert_eq!(pool.capacity(), 3);
        assert_eq!(pool.stride(), ALIGNMENT);

        let ubo = pool.get_next();
        assert_eq!(ubo.offset(), ALIGNMENT);
        ubo.update(&Uniforms::zeroed()).unwrap();

        drop(pool);
        assert_eq!(memory.allocations.len(), 1);
        assert_eq!(memory.frees, 1);
    }
}
