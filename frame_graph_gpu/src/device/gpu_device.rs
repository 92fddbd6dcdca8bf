/// GpuDevice and FrameFence traits - the backend callback interface
///
/// The allocator, retirement table, staging pool and descriptor cache never
/// call a graphics API directly. They describe what they need (extent,
/// format, usage, memory properties) and the backend performs the actual
/// object creation and memory-type selection.

use std::fmt;
use std::time::Duration;
use glam::UVec2;
use crate::error::Result;
use crate::device::{
    TextureFormat, ImageUsage, BufferUsage, MemoryProperties,
    ImageHandle, ImageViewHandle, SamplerHandle, MemoryHandle, BufferHandle,
    FramebufferHandle, DescriptorPoolHandle, DescriptorSetHandle,
    DescriptorSetLayoutHandle, FrameSlot,
};

// ===== IMAGES =====

/// Description of a physical image to create
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDesc {
    /// Debug name (alias group label)
    pub name: String,
    /// Extent in pixels (never zero)
    pub extent: UVec2,
    /// Pixel format
    pub format: TextureFormat,
    /// Number of array layers (2 for stereo targets)
    pub array_layers: u32,
    /// Required usage capabilities
    pub usage: ImageUsage,
}

/// Everything created for one physical image
///
/// Destroyed as a unit so that views and samplers can never outlive (or leak
/// past) the image they reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAllocation {
    /// Image object
    pub image: ImageHandle,
    /// Backing memory
    pub memory: MemoryHandle,
    /// Primary (sampled / storage) view, null if neither usage is present
    pub view: ImageViewHandle,
    /// One attachment view per array layer, empty for non-attachments
    pub attachment_views: Vec<ImageViewHandle>,
    /// Optional sampler created alongside the image
    pub sampler: Option<SamplerHandle>,
}

// ===== BUFFERS =====

/// Description of a physical buffer to create
#[derive(Debug, Clone, PartialEq)]
pub struct BufferDesc {
    /// Debug name
    pub name: String,
    /// Size in bytes (never zero)
    pub size: u64,
    /// Required usage capabilities
    pub usage: BufferUsage,
    /// Required memory properties
    pub memory_properties: MemoryProperties,
}

/// A created buffer and its memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferAllocation {
    /// Buffer object
    pub buffer: BufferHandle,
    /// Backing memory
    pub memory: MemoryHandle,
    /// Size in bytes actually allocated
    pub size: u64,
}

// ===== DESCRIPTORS =====

/// Descriptor type for pool sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    UniformBuffer,
    StorageBuffer,
    SampledImage,
    StorageImage,
    CombinedImageSampler,
    Sampler,
}

/// Number of descriptors of one kind required per set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorPoolSize {
    pub kind: DescriptorKind,
    pub count: u32,
}

/// Why a descriptor set allocation failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorAllocError {
    /// Pool has no room left for the requested sets
    OutOfPoolMemory,
    /// Pool has room but it is fragmented
    FragmentedPool,
    /// Any other failure (device lost, host OOM...)
    Other(String),
}

impl fmt::Display for DescriptorAllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorAllocError::OutOfPoolMemory => write!(f, "out of pool memory"),
            DescriptorAllocError::FragmentedPool => write!(f, "fragmented pool"),
            DescriptorAllocError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

// ===== CAPABILITIES =====

/// Optional GPU features the core adapts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceCapabilities {
    /// Indirect draws whose count is read from a GPU buffer
    pub draw_indirect_count: bool,
    /// A dedicated compute queue is available
    pub compute_queue: bool,
}

// ===== TRAITS =====

/// Backend device interface
///
/// Implemented by each graphics backend (see the Vulkan crate) and by the
/// test mock. All methods take `&self`: backends synchronize internally the
/// same way the underlying API requires.
pub trait GpuDevice: Send + Sync {
    /// Create an image, its memory and the views its usage requires
    fn create_image(&self, desc: &ImageDesc) -> Result<ImageAllocation>;

    /// Destroy an image together with its views, sampler and memory
    fn destroy_image(&self, allocation: &ImageAllocation);

    /// Create a buffer and bind memory with the requested properties
    fn create_buffer(&self, desc: &BufferDesc) -> Result<BufferAllocation>;

    /// Destroy a buffer and free its memory
    fn destroy_buffer(&self, allocation: &BufferAllocation);

    /// Destroy a framebuffer object
    fn destroy_framebuffer(&self, framebuffer: FramebufferHandle);

    /// Write host data into host-visible memory
    fn write_memory(&self, memory: MemoryHandle, offset: u64, data: &[u8]) -> Result<()>;

    /// Create a descriptor pool able to hold `max_sets` sets
    fn create_descriptor_pool(
        &self,
        max_sets: u32,
        pool_sizes: &[DescriptorPoolSize],
    ) -> Result<DescriptorPoolHandle>;

    /// Allocate one descriptor set per layout from a pool
    fn allocate_descriptor_sets(
        &self,
        pool: DescriptorPoolHandle,
        layouts: &[DescriptorSetLayoutHandle],
    ) -> std::result::Result<Vec<DescriptorSetHandle>, DescriptorAllocError>;

    /// Destroy a descriptor pool (frees every set allocated from it)
    fn destroy_descriptor_pool(&self, pool: DescriptorPoolHandle);

    /// Optional features supported by this device
    fn capabilities(&self) -> DeviceCapabilities;

    /// Block until every queue is idle
    fn wait_idle(&self) -> Result<()>;
}

/// Per-slot GPU completion signal (fence or timeline semaphore)
pub trait FrameFence: Send + Sync {
    /// Whether the work last submitted for `slot` has completed
    fn is_complete(&self, slot: FrameSlot) -> Result<bool>;

    /// Wait up to `timeout` for the slot's work. Returns false on timeout.
    fn wait(&self, slot: FrameSlot, timeout: Duration) -> Result<bool>;
}
