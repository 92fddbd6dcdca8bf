/// GpuContext - Shared Vulkan objects for the device, fences and readbacks
///
/// Contains everything needed for GPU operations:
/// - Device for Vulkan API calls
/// - Allocator for memory management
/// - Queue for command submission
/// - Command pool for one-shot transfer (readback) command buffers
/// - Readbacks released while their copy was still executing

use ash::vk;
use frame_graph_gpu::engine_debug;
use gpu_allocator::vulkan::Allocator;
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex, PoisonError};

use crate::vulkan_readback::ReadbackObjects;

/// Shared GPU context.
///
/// Shared (via `Arc`) by `VulkanDevice`, `VulkanFrameFences` and every
/// `BufferReadback` so each of them can reach the device and queue.
///
/// Note: device and instance destruction is handled by `VulkanDevice::drop()`
/// so the allocator can be dropped before the device it allocates from.
pub struct GpuContext {
    /// Vulkan logical device
    pub device: ash::Device,

    /// GPU memory allocator (shared, requires mutex for thread safety)
    /// Wrapped in ManuallyDrop so it is dropped BEFORE the device is destroyed
    pub allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,

    /// Graphics queue for command submission
    pub graphics_queue: vk::Queue,

    /// Graphics queue family index
    pub graphics_queue_family: u32,

    /// Command pool for one-shot transfer command buffers
    /// (created with TRANSIENT + RESET_COMMAND_BUFFER flags)
    pub transfer_command_pool: Mutex<vk::CommandPool>,

    /// Queue submissions must be externally synchronized
    pub(crate) queue_lock: Mutex<()>,

    /// Readbacks waiting for their fence before destruction
    deferred_readbacks: Mutex<Vec<ReadbackObjects>>,
}

impl GpuContext {
    /// Create a new GPU context
    ///
    /// # Arguments
    ///
    /// * `device` - Vulkan logical device
    /// * `allocator` - GPU memory allocator
    /// * `graphics_queue` - Graphics queue for command submission
    /// * `graphics_queue_family` - Graphics queue family index
    /// * `transfer_command_pool` - Command pool for readback copies
    pub fn new(
        device: ash::Device,
        allocator: Arc<Mutex<Allocator>>,
        graphics_queue: vk::Queue,
        graphics_queue_family: u32,
        transfer_command_pool: vk::CommandPool,
    ) -> Self {
        Self {
            device,
            allocator: ManuallyDrop::new(allocator),
            graphics_queue,
            graphics_queue_family,
            transfer_command_pool: Mutex::new(transfer_command_pool),
            queue_lock: Mutex::new(()),
            deferred_readbacks: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn defer_readback(&self, objects: ReadbackObjects) {
        self.deferred_readbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(objects);
    }

    /// Destroy deferred readbacks whose fence has signaled. Returns the number destroyed.
    pub fn collect_deferred_readbacks(&self) -> usize {
        let finished: Vec<ReadbackObjects> = {
            let mut deferred = self.deferred_readbacks.lock().unwrap_or_else(PoisonError::into_inner);
            let (finished, pending): (Vec<_>, Vec<_>) = deferred.drain(..).partition(|objects| unsafe {
                matches!(self.device.get_fence_status(objects.fence), Ok(true))
            });
            *deferred = pending;
            finished
        };
        let count = finished.len();
        for objects in finished {
            objects.destroy(self);
        }
        if count > 0 {
            engine_debug!("framegraph::vulkan::readback", "Destroyed {} deferred readbacks", count);
        }
        count
    }

    /// Destroy every deferred readback. The device must be idle.
    pub(crate) fn destroy_deferred_readbacks(&self) -> usize {
        let all = std::mem::take(&mut *self.deferred_readbacks.lock().unwrap_or_else(PoisonError::into_inner));
        let count = all.len();
        for objects in all {
            objects.destroy(self);
        }
        count
    }

    /// Number of released readbacks still waiting for their copy
    pub fn deferred_readback_count(&self) -> usize {
        self.deferred_readbacks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
