/// Capability flags for images, buffers and memory

use bitflags::bitflags;

bitflags! {
    /// Ways a physical image may be used by the GPU
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ImageUsage: u32 {
        const SAMPLED = 1 << 0;
        const STORAGE = 1 << 1;
        const COLOR_ATTACHMENT = 1 << 2;
        const DEPTH_STENCIL_ATTACHMENT = 1 << 3;
        const TRANSFER_SRC = 1 << 4;
        const TRANSFER_DST = 1 << 5;
    }
}

bitflags! {
    /// Ways a physical buffer may be used by the GPU
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BufferUsage: u32 {
        const UNIFORM = 1 << 0;
        const STORAGE = 1 << 1;
        const VERTEX = 1 << 2;
        const INDEX = 1 << 3;
        const INDIRECT = 1 << 4;
        const TRANSFER_SRC = 1 << 5;
        const TRANSFER_DST = 1 << 6;
    }
}

bitflags! {
    /// Memory property requirements for an allocation
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MemoryProperties: u32 {
        const DEVICE_LOCAL = 1 << 0;
        const HOST_VISIBLE = 1 << 1;
        const HOST_COHERENT = 1 << 2;
        const HOST_CACHED = 1 << 3;
    }
}

/// Image layout as last recorded by a barrier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageLayout {
    /// Contents undefined (freshly created)
    #[default]
    Undefined,
    /// General layout (storage access)
    General,
    /// Color attachment optimal
    ColorAttachment,
    /// Depth/stencil attachment optimal
    DepthStencilAttachment,
    /// Shader read-only optimal
    ShaderReadOnly,
    /// Transfer source optimal
    TransferSrc,
    /// Transfer destination optimal
    TransferDst,
}
