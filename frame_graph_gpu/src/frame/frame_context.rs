/// FrameResourceContext - frame-slot clock and per-frame resource services
///
/// Owns the retirement table, the staging pool and the compute descriptor
/// cache, and enforces their ordering at the start of each frame:
/// wait for the slot's fence, drain the slot's retirement list, reclaim the
/// staging buffers released into the slot, trim the staging pool, then hand
/// the slot to the recorder.

use std::sync::Arc;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::{engine_debug, engine_info, engine_warn};
use crate::device::{
    GpuDevice, FrameFence, FrameSlot, BufferAllocation, ImageAllocation, FramebufferHandle,
    BufferUsage, MemoryProperties,
};
use crate::allocator::{ResourceAllocator, PassMetadata};
use crate::compute::ComputeDescriptorCache;
use crate::resource::{ResourcePlanner, Resolution};
use super::retirement::FrameSlotRetirementTable;
use super::staging::{StagingManager, StagingBuffer};

pub struct FrameResourceContext {
    config: Config,
    device: Arc<dyn GpuDevice>,
    fence: Arc<dyn FrameFence>,
    current_slot: FrameSlot,
    frame_count: u64,
    retirement: FrameSlotRetirementTable,
    staging: StagingManager,
    descriptors: ComputeDescriptorCache,
}

impl FrameResourceContext {
    /// Create the context. Fails if the configuration is invalid.
    pub fn new(config: Config, device: Arc<dyn GpuDevice>, fence: Arc<dyn FrameFence>) -> Result<Self> {
        config.validate()?;
        let retirement = FrameSlotRetirementTable::new(config.frames_in_flight);
        let staging = StagingManager::new(
            config.staging_idle_frames_before_eviction,
            config.staging_max_pooled_buffers,
        );
        let descriptors = ComputeDescriptorCache::new(
            config.descriptor_block_base_capacity,
            config.descriptor_block_growth,
        );
        engine_info!(
            "framegraph::FrameResourceContext",
            "Created with {} frames in flight",
            config.frames_in_flight
        );
        Ok(Self {
            config,
            device,
            fence,
            current_slot: FrameSlot(0),
            frame_count: 0,
            retirement,
            staging,
            descriptors,
        })
    }

    /// Enter the next frame slot
    ///
    /// Waits (bounded) for the slot's previous GPU work, then destroys what
    /// was retired into it, reclaims its staging buffers and trims the staging
    /// pool. On timeout nothing is drained and the current slot does not change.
    pub fn begin_frame(&mut self) -> Result<FrameSlot> {
        let next = if self.frame_count == 0 {
            FrameSlot(0)
        } else {
            FrameSlot((self.current_slot.index() + 1) % self.config.frames_in_flight)
        };

        if !self.fence.wait(next, self.config.frame_wait_timeout)? {
            engine_warn!(
                "framegraph::FrameResourceContext",
                "Frame slot {} still in flight after {:?}",
                next.index(),
                self.config.frame_wait_timeout
            );
            return Err(Error::Timeout(format!("frame slot {} fence", next.index())));
        }

        let drained = self.retirement.drain(next, self.device.as_ref());
        let reclaimed = self.staging.reclaim(next);
        let evicted = self.staging.trim(self.device.as_ref());
        if drained > 0 || reclaimed > 0 || evicted > 0 {
            engine_debug!(
                "framegraph::FrameResourceContext",
                "Slot {}: {} retired handles destroyed, {} staging buffers reclaimed, {} evicted",
                next.index(), drained, reclaimed, evicted
            );
        }

        self.current_slot = next;
        self.frame_count += 1;
        Ok(next)
    }

    /// Slot currently recording
    pub fn current_slot(&self) -> FrameSlot {
        self.current_slot
    }

    /// Number of frames begun so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn device(&self) -> &Arc<dyn GpuDevice> {
        &self.device
    }

    pub fn retirement(&self) -> &FrameSlotRetirementTable {
        &self.retirement
    }

    pub fn staging(&self) -> &StagingManager {
        &self.staging
    }

    pub fn descriptor_cache(&self) -> &ComputeDescriptorCache {
        &self.descriptors
    }

    // ===== RETIREMENT (current slot) =====

    pub fn retire_buffer(&self, allocation: BufferAllocation) -> bool {
        self.retirement.retire_buffer(self.current_slot, allocation)
    }

    pub fn retire_image(&self, allocation: ImageAllocation) -> bool {
        self.retirement.retire_image(self.current_slot, allocation)
    }

    pub fn retire_framebuffer(&self, framebuffer: FramebufferHandle) -> bool {
        self.retirement.retire_framebuffer(self.current_slot, framebuffer)
    }

    // ===== STAGING =====

    /// Pooled upload buffer filled with `data`
    pub fn upload(&self, data: &[u8]) -> Result<StagingBuffer> {
        self.staging.acquire(
            self.device.as_ref(),
            data.len() as u64,
            BufferUsage::TRANSFER_SRC,
            MemoryProperties::HOST_VISIBLE | MemoryProperties::HOST_COHERENT,
            Some(data),
        )
    }

    /// Give a staging buffer back once the copy reading it is recorded
    ///
    /// Pooled buffers become reusable when the current slot is next entered.
    /// Unpooled buffers are retired into the current slot instead.
    pub fn release_staging(&self, staging: StagingBuffer) {
        if !staging.pooled || !self.staging.release_after(staging.buffer, self.current_slot) {
            self.retire_buffer(staging.allocation());
        }
    }

    // ===== PHYSICAL PLAN =====

    /// Rebuild the allocator's physical plan, retiring old allocations into the current slot
    ///
    /// Cached compute descriptor sets point at the retired views, so they are dropped too.
    pub fn rebuild_physical_plan(
        &self,
        allocator: &mut ResourceAllocator,
        resolution: &Resolution,
        passes: &[PassMetadata],
        planner: &ResourcePlanner,
    ) {
        allocator.rebuild_physical_plan(&self.retirement, self.current_slot, resolution, passes, planner);
        self.descriptors.clear_sets();
    }

    /// Tear everything down
    ///
    /// Waits for the device to go idle first: the flush skips per-slot checks.
    pub fn shutdown(&mut self, allocator: &mut ResourceAllocator) -> Result<()> {
        self.device.wait_idle()?;
        allocator.destroy_all(self.device.as_ref());
        let flushed = self.retirement.flush_all(self.device.as_ref());
        let staging = self.staging.destroy_all(self.device.as_ref());
        self.descriptors.destroy(self.device.as_ref());
        engine_info!(
            "framegraph::FrameResourceContext",
            "Shutdown: {} retired handles and {} staging buffers destroyed",
            flushed, staging
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "frame_context_tests.rs"]
mod tests;
