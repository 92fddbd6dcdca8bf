/*!
# Frame Graph GPU - Vulkan Backend

Vulkan implementation of the frame_graph_gpu device traits.

This crate provides a headless Vulkan device using the Ash library for
Vulkan bindings and gpu-allocator for memory management:

- **VulkanDevice**: `GpuDevice` (images, buffers, memory, descriptor pools)
- **VulkanFrameFences**: `FrameFence` (one fence per frame slot)
- **VulkanCommandSink**: `IndirectCommandSink` (replayed indirect draws)
- **BufferReadback**: `ReadbackJob` (GPU to CPU buffer copies)
*/

mod vulkan_context;
mod vulkan_device;
mod vulkan_fence;
mod vulkan_format;
mod vulkan_indirect;
mod vulkan_readback;
#[cfg(feature = "vulkan-validation")]
mod vulkan_debug;

pub use vulkan_context::GpuContext;
pub use vulkan_device::{VulkanDevice, VulkanDeviceConfig};
pub use vulkan_fence::VulkanFrameFences;
pub use vulkan_indirect::VulkanCommandSink;
pub use vulkan_readback::BufferReadback;

/// Pure conversions from core types to Vulkan enums and flags
pub mod format {
    pub use crate::vulkan_format::{
        texture_format_to_vk, aspect_mask, view_aspect_mask, image_usage_to_vk,
        buffer_usage_to_vk, memory_location, image_layout_to_vk,
        descriptor_kind_to_vk, index_type_to_vk,
    };
}
