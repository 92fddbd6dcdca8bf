/// VulkanFrameFences - one VkFence per frame slot
///
/// Implements `FrameFence` for the frame resource context: a slot is
/// complete once the fence of the last submission tagged with it signals.

use ash::vk;
use frame_graph_gpu::framegraph::{Error, Result};
use frame_graph_gpu::framegraph::device::{FrameFence, FrameSlot};
use frame_graph_gpu::{engine_err, engine_trace};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use crate::vulkan_context::GpuContext;

const SOURCE: &str = "framegraph::vulkan::fence";

pub struct VulkanFrameFences {
    ctx: Arc<GpuContext>,
    fences: Vec<vk::Fence>,
}

impl VulkanFrameFences {
    /// Create `count` fences, initially signaled so the first use of each
    /// slot never waits
    pub fn new(ctx: Arc<GpuContext>, count: usize) -> Result<Self> {
        let info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);
        let mut fences = Vec::with_capacity(count);
        for _ in 0..count {
            match unsafe { ctx.device.create_fence(&info, None) } {
                Ok(fence) => fences.push(fence),
                Err(e) => {
                    for fence in fences {
                        unsafe { ctx.device.destroy_fence(fence, None) };
                    }
                    return Err(Error::InitializationFailed(format!("Failed to create frame fence: {:?}", e)));
                }
            }
        }
        Ok(Self { ctx, fences })
    }

    pub fn len(&self) -> usize {
        self.fences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fences.is_empty()
    }

    /// Raw fence of a slot
    pub fn fence(&self, slot: FrameSlot) -> Result<vk::Fence> {
        self.fences
            .get(slot.index())
            .copied()
            .ok_or_else(|| Error::InvalidResource(format!("Frame slot {} out of range ({} fences)", slot.index(), self.fences.len())))
    }

    /// Submit command buffers for `slot`, signaling its fence on completion
    ///
    /// The fence is reset first, so the caller must have waited on it
    /// (`FrameResourceContext::begin_frame` does).
    pub fn submit(&self, slot: FrameSlot, command_buffers: &[vk::CommandBuffer]) -> Result<()> {
        let fence = self.fence(slot)?;
        let submit_info = vk::SubmitInfo::default().command_buffers(command_buffers);
        let _queue = self.ctx.queue_lock.lock().unwrap_or_else(PoisonError::into_inner);
        unsafe {
            self.ctx.device
                .reset_fences(&[fence])
                .map_err(|e| engine_err!(SOURCE, "Failed to reset fence for slot {}: {:?}", slot.index(), e))?;
            self.ctx.device
                .queue_submit(self.ctx.graphics_queue, &[submit_info], fence)
                .map_err(|e| engine_err!(SOURCE, "Failed to submit slot {}: {:?}", slot.index(), e))?;
        }
        engine_trace!(SOURCE, "Submitted {} command buffers for slot {}", command_buffers.len(), slot.index());
        Ok(())
    }
}

impl FrameFence for VulkanFrameFences {
    fn is_complete(&self, slot: FrameSlot) -> Result<bool> {
        let fence = self.fence(slot)?;
        unsafe {
            self.ctx.device
                .get_fence_status(fence)
                .map_err(|e| engine_err!(SOURCE, "Failed to query fence for slot {}: {:?}", slot.index(), e))
        }
    }

    fn wait(&self, slot: FrameSlot, timeout: Duration) -> Result<bool> {
        let fence = self.fence(slot)?;
        let timeout_ns = u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX);
        match unsafe { self.ctx.device.wait_for_fences(&[fence], true, timeout_ns) } {
            Ok(()) => Ok(true),
            Err(vk::Result::TIMEOUT) => Ok(false),
            Err(e) => Err(engine_err!(SOURCE, "Failed to wait for slot {}: {:?}", slot.index(), e)),
        }
    }
}

impl Drop for VulkanFrameFences {
    fn drop(&mut self) {
        unsafe {
            for &fence in &self.fences {
                self.ctx.device.destroy_fence(fence, None);
            }
        }
    }
}
