/// BufferReadback - GPU to CPU buffer copy, run as a ReadbackJob
///
/// `BufferReadback::submit` records and submits the copy immediately; the
/// scheduler then waits on the fence off the render thread and hands the
/// bytes to the callback.
///
/// Release never blocks. Objects of a copy that never reached the queue, or
/// whose fence has signaled, are destroyed at once. A copy still executing
/// hands its objects to the `GpuContext`, which destroys them once the fence
/// signals (next submit, `wait_idle` or device drop).

use ash::vk;
use frame_graph_gpu::framegraph::{Error, Result};
use frame_graph_gpu::framegraph::readback::ReadbackJob;
use frame_graph_gpu::{engine_err, engine_warn};
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use crate::vulkan_context::GpuContext;

const SOURCE: &str = "framegraph::vulkan::readback";

/// What release does with a job's Vulkan objects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReleasePath {
    /// Nothing on the GPU uses them
    DestroyNow,
    /// Hand them to the context until the fence signals
    Defer,
}

/// Only a submitted copy can still be executing
pub(crate) fn release_path(submitted: bool, copy_finished: impl FnOnce() -> bool) -> ReleasePath {
    if !submitted || copy_finished() {
        ReleasePath::DestroyNow
    } else {
        ReleasePath::Defer
    }
}

/// Vulkan objects of one readback, detached from the job
pub(crate) struct ReadbackObjects {
    pub(crate) buffer: vk::Buffer,
    pub(crate) allocation: Option<Allocation>,
    pub(crate) command_buffer: vk::CommandBuffer,
    pub(crate) fence: vk::Fence,
}

impl ReadbackObjects {
    /// Destroy every object. The fence must be signaled or never submitted.
    pub(crate) fn destroy(mut self, ctx: &GpuContext) {
        let device = &ctx.device;
        unsafe {
            if self.fence != vk::Fence::null() {
                device.destroy_fence(self.fence, None);
            }
            if self.command_buffer != vk::CommandBuffer::null() {
                let pool = ctx.transfer_command_pool.lock().unwrap_or_else(PoisonError::into_inner);
                if *pool != vk::CommandPool::null() {
                    device.free_command_buffers(*pool, &[self.command_buffer]);
                }
            }
            if self.buffer != vk::Buffer::null() {
                device.destroy_buffer(self.buffer, None);
            }
        }
        if let Some(allocation) = self.allocation.take() {
            let mut allocator = ctx.allocator.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = allocator.free(allocation) {
                engine_warn!(SOURCE, "Failed to free readback memory: {:?}", e);
            }
        }
    }
}

pub struct BufferReadback {
    ctx: Arc<GpuContext>,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    command_buffer: vk::CommandBuffer,
    fence: vk::Fence,
    size: u64,
    /// Set once the copy reached the queue
    submitted: bool,
}

impl BufferReadback {
    /// Copy `size` bytes of `source` starting at `offset` into a host buffer
    ///
    /// Prior GPU writes to `source` are made visible by a full memory
    /// barrier recorded before the copy.
    pub fn submit(ctx: Arc<GpuContext>, source: vk::Buffer, offset: u64, size: u64) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidResource("Readback of 0 bytes".to_string()));
        }
        ctx.collect_deferred_readbacks();
        let mut job = Self {
            ctx,
            buffer: vk::Buffer::null(),
            allocation: None,
            command_buffer: vk::CommandBuffer::null(),
            fence: vk::Fence::null(),
            size,
            submitted: false,
        };
        // On failure, dropping `job` releases whatever was created
        job.record_and_submit(source, offset)?;
        Ok(job)
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    fn record_and_submit(&mut self, source: vk::Buffer, offset: u64) -> Result<()> {
        let device = &self.ctx.device;
        unsafe {
            let buffer_info = vk::BufferCreateInfo::default()
                .size(self.size)
                .usage(vk::BufferUsageFlags::TRANSFER_DST)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);
            self.buffer = device.create_buffer(&buffer_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create readback buffer ({} bytes): {:?}", self.size, e))?;

            let requirements = device.get_buffer_memory_requirements(self.buffer);
            let allocation = self.ctx.allocator
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .allocate(&AllocationCreateDesc {
                    name: "readback",
                    requirements,
                    location: MemoryLocation::GpuToCpu,
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|e| engine_err!(SOURCE, "Failed to allocate readback memory: {:?}", e))?;
            let bind = device.bind_buffer_memory(self.buffer, allocation.memory(), allocation.offset());
            self.allocation = Some(allocation);
            bind.map_err(|e| engine_err!(SOURCE, "Failed to bind readback memory: {:?}", e))?;

            {
                let pool = self.ctx.transfer_command_pool.lock().unwrap_or_else(PoisonError::into_inner);
                let alloc_info = vk::CommandBufferAllocateInfo::default()
                    .command_pool(*pool)
                    .level(vk::CommandBufferLevel::PRIMARY)
                    .command_buffer_count(1);
                let buffers = device.allocate_command_buffers(&alloc_info)
                    .map_err(|e| engine_err!(SOURCE, "Failed to allocate readback command buffer: {:?}", e))?;
                self.command_buffer = buffers
                    .first()
                    .copied()
                    .ok_or_else(|| engine_err!(SOURCE, "Driver returned no readback command buffer"))?;

                let begin_info = vk::CommandBufferBeginInfo::default()
                    .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
                device.begin_command_buffer(self.command_buffer, &begin_info)
                    .map_err(|e| engine_err!(SOURCE, "Failed to begin readback command buffer: {:?}", e))?;

                let before = vk::MemoryBarrier::default()
                    .src_access_mask(vk::AccessFlags::MEMORY_WRITE)
                    .dst_access_mask(vk::AccessFlags::TRANSFER_READ);
                device.cmd_pipeline_barrier(
                    self.command_buffer,
                    vk::PipelineStageFlags::ALL_COMMANDS,
                    vk::PipelineStageFlags::TRANSFER,
                    vk::DependencyFlags::empty(),
                    &[before],
                    &[],
                    &[],
                );

                let region = vk::BufferCopy { src_offset: offset, dst_offset: 0, size: self.size };
                device.cmd_copy_buffer(self.command_buffer, source, self.buffer, &[region]);

                let after = vk::MemoryBarrier::default()
                    .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                    .dst_access_mask(vk::AccessFlags::HOST_READ);
                device.cmd_pipeline_barrier(
                    self.command_buffer,
                    vk::PipelineStageFlags::TRANSFER,
                    vk::PipelineStageFlags::HOST,
                    vk::DependencyFlags::empty(),
                    &[after],
                    &[],
                    &[],
                );

                device.end_command_buffer(self.command_buffer)
                    .map_err(|e| engine_err!(SOURCE, "Failed to end readback command buffer: {:?}", e))?;
            }

            self.fence = device.create_fence(&vk::FenceCreateInfo::default(), None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create readback fence: {:?}", e))?;

            let command_buffers = [self.command_buffer];
            let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
            let _queue = self.ctx.queue_lock.lock().unwrap_or_else(PoisonError::into_inner);
            device.queue_submit(self.ctx.graphics_queue, &[submit_info], self.fence)
                .map_err(|e| engine_err!(SOURCE, "Failed to submit readback: {:?}", e))?;
        }
        self.submitted = true;
        Ok(())
    }
}

impl ReadbackJob for BufferReadback {
    type Output = Vec<u8>;

    fn wait(&mut self, timeout: Duration) -> Result<bool> {
        let timeout_ns = u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX);
        match unsafe { self.ctx.device.wait_for_fences(&[self.fence], true, timeout_ns) } {
            Ok(()) => Ok(true),
            Err(vk::Result::TIMEOUT) => Ok(false),
            Err(e) => Err(engine_err!(SOURCE, "Failed to wait for readback: {:?}", e)),
        }
    }

    fn read(&mut self) -> Result<Vec<u8>> {
        let allocation = self
            .allocation
            .as_ref()
            .ok_or_else(|| Error::InvalidResource("Readback already released".to_string()))?;
        let mapped = allocation
            .mapped_slice()
            .ok_or_else(|| engine_err!(SOURCE, "Readback memory is not host-visible"))?;
        let len = (self.size as usize).min(mapped.len());
        Ok(mapped[..len].to_vec())
    }

    fn release(&mut self) {
        let objects = ReadbackObjects {
            buffer: std::mem::replace(&mut self.buffer, vk::Buffer::null()),
            allocation: self.allocation.take(),
            command_buffer: std::mem::replace(&mut self.command_buffer, vk::CommandBuffer::null()),
            fence: std::mem::replace(&mut self.fence, vk::Fence::null()),
        };
        let submitted = std::mem::replace(&mut self.submitted, false);

        let device = &self.ctx.device;
        let fence = objects.fence;
        let path = release_path(submitted, || unsafe {
            matches!(device.get_fence_status(fence), Ok(true))
        });
        match path {
            ReleasePath::DestroyNow => objects.destroy(&self.ctx),
            ReleasePath::Defer => {
                engine_warn!(SOURCE, "Readback copy of {} bytes still pending at release, deferring its destruction", self.size);
                self.ctx.defer_readback(objects);
            }
        }
    }
}

impl Drop for BufferReadback {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
#[path = "vulkan_readback_tests.rs"]
mod tests;
