/// Device abstraction: handles, formats, usage flags and backend traits

pub mod handles;
pub mod format;
pub mod flags;
pub mod gpu_device;

#[cfg(test)]
pub mod mock_device;

pub use handles::{
    ImageHandle, ImageViewHandle, SamplerHandle, MemoryHandle, BufferHandle,
    FramebufferHandle, DescriptorPoolHandle, DescriptorSetHandle,
    DescriptorSetLayoutHandle, FrameSlot,
};
pub use format::{TextureFormat, DEFAULT_TEXTURE_FORMAT};
pub use flags::{ImageUsage, BufferUsage, MemoryProperties, ImageLayout};
pub use gpu_device::{
    GpuDevice, FrameFence, ImageDesc, ImageAllocation, BufferDesc, BufferAllocation,
    DescriptorKind, DescriptorPoolSize, DescriptorAllocError, DeviceCapabilities,
};
