/// Mock GPU device and fence for unit tests (no GPU required)
///
/// MockDevice records every create/destroy so tests can assert exactly what
/// was torn down and when. MockFence is the fake fence clock: a slot only
/// reports completion after the test signals it.

use std::sync::Mutex;
use std::time::Duration;
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::engine_bail;
use crate::device::{
    GpuDevice, FrameFence, ImageDesc, ImageAllocation, BufferDesc, BufferAllocation,
    DescriptorPoolSize, DescriptorAllocError, DeviceCapabilities, ImageUsage,
    ImageHandle, ImageViewHandle, MemoryHandle, BufferHandle, FramebufferHandle,
    DescriptorPoolHandle, DescriptorSetHandle, DescriptorSetLayoutHandle, FrameSlot,
};

// ============================================================================
// Mock Device
// ============================================================================

#[derive(Debug)]
pub struct MockPool {
    pub max_sets: u32,
    pub allocated: u32,
}

/// Everything the mock device has seen
#[derive(Debug, Default)]
pub struct MockDeviceState {
    next_handle: u64,
    pub created_images: Vec<ImageDesc>,
    pub destroyed_images: Vec<ImageAllocation>,
    pub created_buffers: Vec<BufferDesc>,
    pub destroyed_buffers: Vec<BufferAllocation>,
    pub destroyed_framebuffers: Vec<FramebufferHandle>,
    pub writes: Vec<(MemoryHandle, u64, Vec<u8>)>,
    pub pools: FxHashMap<DescriptorPoolHandle, MockPool>,
    pub created_pool_capacities: Vec<u32>,
    pub destroyed_pools: Vec<DescriptorPoolHandle>,
    pub wait_idle_calls: u32,
    pub fail_image_creation: bool,
    pub fail_buffer_creation: bool,
    pub fail_pool_creation: bool,
    pub injected_descriptor_failures: Vec<DescriptorAllocError>,
}

impl MockDeviceState {
    fn next(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

pub struct MockDevice {
    pub state: Mutex<MockDeviceState>,
    pub capabilities: DeviceCapabilities,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockDeviceState::default()),
            capabilities: DeviceCapabilities::default(),
        }
    }

    pub fn with_capabilities(capabilities: DeviceCapabilities) -> Self {
        Self {
            state: Mutex::new(MockDeviceState::default()),
            capabilities,
        }
    }

    /// Make the next descriptor allocations fail with these results (FIFO)
    pub fn inject_descriptor_failure(&self, error: DescriptorAllocError) {
        self.state.lock().unwrap().injected_descriptor_failures.push(error);
    }

    pub fn set_fail_image_creation(&self, fail: bool) {
        self.state.lock().unwrap().fail_image_creation = fail;
    }

    pub fn set_fail_buffer_creation(&self, fail: bool) {
        self.state.lock().unwrap().fail_buffer_creation = fail;
    }

    pub fn set_fail_pool_creation(&self, fail: bool) {
        self.state.lock().unwrap().fail_pool_creation = fail;
    }

    pub fn created_image_count(&self) -> usize {
        self.state.lock().unwrap().created_images.len()
    }

    pub fn destroyed_image_count(&self) -> usize {
        self.state.lock().unwrap().destroyed_images.len()
    }

    pub fn created_buffer_count(&self) -> usize {
        self.state.lock().unwrap().created_buffers.len()
    }

    pub fn destroyed_buffer_count(&self) -> usize {
        self.state.lock().unwrap().destroyed_buffers.len()
    }

    pub fn destroyed_buffers(&self) -> Vec<BufferHandle> {
        self.state.lock().unwrap().destroyed_buffers.iter().map(|b| b.buffer).collect()
    }

    pub fn destroyed_images(&self) -> Vec<ImageHandle> {
        self.state.lock().unwrap().destroyed_images.iter().map(|i| i.image).collect()
    }

    pub fn destroyed_framebuffers(&self) -> Vec<FramebufferHandle> {
        self.state.lock().unwrap().destroyed_framebuffers.clone()
    }
}

impl GpuDevice for MockDevice {
    fn create_image(&self, desc: &ImageDesc) -> Result<ImageAllocation> {
        let mut state = self.state.lock().unwrap();
        if state.fail_image_creation {
            return Err(Error::OutOfMemory);
        }
        state.created_images.push(desc.clone());
        let image = ImageHandle::from_raw(state.next());
        let memory = MemoryHandle::from_raw(state.next());
        let view = if desc.usage.intersects(ImageUsage::SAMPLED | ImageUsage::STORAGE) {
            ImageViewHandle::from_raw(state.next())
        } else {
            ImageViewHandle::NULL
        };
        let attachment_views = if desc.usage.intersects(
            ImageUsage::COLOR_ATTACHMENT | ImageUsage::DEPTH_STENCIL_ATTACHMENT,
        ) {
            (0..desc.array_layers)
                .map(|_| ImageViewHandle::from_raw(state.next()))
                .collect()
        } else {
            Vec::new()
        };
        Ok(ImageAllocation { image, memory, view, attachment_views, sampler: None })
    }

    fn destroy_image(&self, allocation: &ImageAllocation) {
        self.state.lock().unwrap().destroyed_images.push(allocation.clone());
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<BufferAllocation> {
        let mut state = self.state.lock().unwrap();
        if state.fail_buffer_creation {
            return Err(Error::OutOfMemory);
        }
        state.created_buffers.push(desc.clone());
        let buffer = BufferHandle::from_raw(state.next());
        let memory = MemoryHandle::from_raw(state.next());
        Ok(BufferAllocation { buffer, memory, size: desc.size })
    }

    fn destroy_buffer(&self, allocation: &BufferAllocation) {
        self.state.lock().unwrap().destroyed_buffers.push(*allocation);
    }

    fn destroy_framebuffer(&self, framebuffer: FramebufferHandle) {
        self.state.lock().unwrap().destroyed_framebuffers.push(framebuffer);
    }

    fn write_memory(&self, memory: MemoryHandle, offset: u64, data: &[u8]) -> Result<()> {
        self.state.lock().unwrap().writes.push((memory, offset, data.to_vec()));
        Ok(())
    }

    fn create_descriptor_pool(
        &self,
        max_sets: u32,
        _pool_sizes: &[DescriptorPoolSize],
    ) -> Result<DescriptorPoolHandle> {
        let mut state = self.state.lock().unwrap();
        if state.fail_pool_creation {
            engine_bail!("framegraph::MockDevice", "descriptor pool creation refused");
        }
        let pool = DescriptorPoolHandle::from_raw(state.next());
        state.pools.insert(pool, MockPool { max_sets, allocated: 0 });
        state.created_pool_capacities.push(max_sets);
        Ok(pool)
    }

    fn allocate_descriptor_sets(
        &self,
        pool: DescriptorPoolHandle,
        layouts: &[DescriptorSetLayoutHandle],
    ) -> std::result::Result<Vec<DescriptorSetHandle>, DescriptorAllocError> {
        let mut state = self.state.lock().unwrap();
        if !state.injected_descriptor_failures.is_empty() {
            return Err(state.injected_descriptor_failures.remove(0));
        }
        let requested = layouts.len() as u32;
        let fits = match state.pools.get(&pool) {
            Some(entry) => entry.allocated + requested <= entry.max_sets,
            None => return Err(DescriptorAllocError::Other("unknown pool".to_string())),
        };
        if !fits {
            return Err(DescriptorAllocError::OutOfPoolMemory);
        }
        if let Some(entry) = state.pools.get_mut(&pool) {
            entry.allocated += requested;
        }
        Ok((0..requested)
            .map(|_| DescriptorSetHandle::from_raw(state.next()))
            .collect())
    }

    fn destroy_descriptor_pool(&self, pool: DescriptorPoolHandle) {
        let mut state = self.state.lock().unwrap();
        state.pools.remove(&pool);
        state.destroyed_pools.push(pool);
    }

    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    fn wait_idle(&self) -> Result<()> {
        self.state.lock().unwrap().wait_idle_calls += 1;
        Ok(())
    }
}

// ============================================================================
// Mock Fence (fake fence clock)
// ============================================================================

pub struct MockFence {
    signaled: Mutex<Vec<bool>>,
    pub waits: Mutex<Vec<(FrameSlot, Duration)>>,
}

impl MockFence {
    /// Fence with `slots` slots, all in the given initial state
    pub fn new(slots: usize, signaled: bool) -> Self {
        Self {
            signaled: Mutex::new(vec![signaled; slots]),
            waits: Mutex::new(Vec::new()),
        }
    }

    /// Mark the slot's submitted work as complete
    pub fn signal(&self, slot: FrameSlot) {
        self.signaled.lock().unwrap()[slot.index()] = true;
    }

    /// Mark the slot as having new in-flight work
    pub fn reset(&self, slot: FrameSlot) {
        self.signaled.lock().unwrap()[slot.index()] = false;
    }

    pub fn wait_count(&self) -> usize {
        self.waits.lock().unwrap().len()
    }
}

impl FrameFence for MockFence {
    fn is_complete(&self, slot: FrameSlot) -> Result<bool> {
        let signaled = self.signaled.lock().unwrap();
        match signaled.get(slot.index()) {
            Some(done) => Ok(*done),
            None => Err(Error::InvalidResource(format!("no fence for slot {}", slot.index()))),
        }
    }

    fn wait(&self, slot: FrameSlot, timeout: Duration) -> Result<bool> {
        self.waits.lock().unwrap().push((slot, timeout));
        self.is_complete(slot)
    }
}
