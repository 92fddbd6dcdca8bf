/// Logical resource descriptors (texture, buffer, framebuffer)
///
/// Descriptors are produced by a registry and consumed unchanged by the
/// planner. They describe what a frame needs, never how it is backed.

use std::hash::{Hash, Hasher};
use glam::{UVec2, Vec2};
use crate::device::{BufferUsage, MemoryProperties};

// ===== LIFETIME =====

/// Lifetime class of a logical resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceLifetime {
    /// Lives for the whole session (history buffers, LUTs...)
    Persistent,
    /// Only needed inside one frame; may share memory with other transients
    Transient,
    /// Owned outside the frame graph (imported)
    External,
}

// ===== SIZE POLICY =====

/// Window and internal (render) resolution used to resolve size policies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Presentation surface size in pixels
    pub window: UVec2,
    /// Internal render size in pixels (after render scale)
    pub internal: UVec2,
}

impl Resolution {
    pub fn new(window: UVec2, internal: UVec2) -> Self {
        Self { window, internal }
    }

    /// Window and internal resolution are the same
    pub fn uniform(size: UVec2) -> Self {
        Self { window: size, internal: size }
    }
}

/// How the extent of a texture is derived
#[derive(Debug, Clone, Copy)]
pub enum SizePolicy {
    /// Fixed size in pixels
    Absolute(UVec2),
    /// Internal resolution multiplied by a scale (1.0 = full res)
    InternalResolution(f32),
    /// Window resolution multiplied by a scale
    WindowResolution(f32),
    /// Internal resolution multiplied by a per-axis scale
    Custom(Vec2),
}

impl SizePolicy {
    /// Resolve the policy to a concrete extent. Each axis is at least 1.
    pub fn resolve(&self, resolution: &Resolution) -> UVec2 {
        let extent = match *self {
            SizePolicy::Absolute(size) => size,
            SizePolicy::InternalResolution(scale) => scale_extent(resolution.internal, Vec2::splat(scale)),
            SizePolicy::WindowResolution(scale) => scale_extent(resolution.window, Vec2::splat(scale)),
            SizePolicy::Custom(scale) => scale_extent(resolution.internal, scale),
        };
        extent.max(UVec2::ONE)
    }
}

fn scale_extent(base: UVec2, scale: Vec2) -> UVec2 {
    let scaled = (base.as_vec2() * scale).round().max(Vec2::ZERO);
    scaled.as_uvec2()
}

// Scales are compared by bit pattern so policies can key hash maps.
impl PartialEq for SizePolicy {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SizePolicy::Absolute(a), SizePolicy::Absolute(b)) => a == b,
            (SizePolicy::InternalResolution(a), SizePolicy::InternalResolution(b)) => a.to_bits() == b.to_bits(),
            (SizePolicy::WindowResolution(a), SizePolicy::WindowResolution(b)) => a.to_bits() == b.to_bits(),
            (SizePolicy::Custom(a), SizePolicy::Custom(b)) => {
                a.x.to_bits() == b.x.to_bits() && a.y.to_bits() == b.y.to_bits()
            }
            _ => false,
        }
    }
}

impl Eq for SizePolicy {}

impl Hash for SizePolicy {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            SizePolicy::Absolute(size) => size.hash(state),
            SizePolicy::InternalResolution(scale) | SizePolicy::WindowResolution(scale) => {
                scale.to_bits().hash(state)
            }
            SizePolicy::Custom(scale) => {
                scale.x.to_bits().hash(state);
                scale.y.to_bits().hash(state);
            }
        }
    }
}

// ===== TEXTURE =====

/// Logical texture descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescriptor {
    /// Unique name (case-insensitive)
    pub name: String,
    /// Lifetime class
    pub lifetime: ResourceLifetime,
    /// Extent derivation
    pub size_policy: SizePolicy,
    /// Format label ("R16G16B16A16_SFLOAT", "rgba16f", ...)
    pub format: String,
    /// Array layers (stereo targets use 2)
    pub array_layers: u32,
    /// Can be rendered as a stereo (multiview) target
    pub stereo_compatible: bool,
    /// May share memory with other transient resources
    pub allow_aliasing: bool,
    /// Written through storage access invisible to pass declarations
    pub requires_storage_usage: bool,
}

impl TextureDescriptor {
    /// Single-layer, non-aliased, non-stereo texture
    pub fn new(
        name: impl Into<String>,
        lifetime: ResourceLifetime,
        size_policy: SizePolicy,
        format: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            lifetime,
            size_policy,
            format: format.into(),
            array_layers: 1,
            stereo_compatible: false,
            allow_aliasing: false,
            requires_storage_usage: false,
        }
    }

    pub fn with_aliasing(mut self, allow: bool) -> Self {
        self.allow_aliasing = allow;
        self
    }

    pub fn with_array_layers(mut self, layers: u32) -> Self {
        self.array_layers = layers;
        self
    }

    pub fn with_stereo(mut self, stereo: bool) -> Self {
        self.stereo_compatible = stereo;
        self
    }

    pub fn with_storage_usage(mut self, required: bool) -> Self {
        self.requires_storage_usage = required;
        self
    }
}

// ===== BUFFER =====

/// Binding target a buffer is created for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Vertex,
    Index,
    Uniform,
    Storage,
    /// Indirect draw/dispatch arguments
    Indirect,
    /// Indirect draw count (read by count-draws)
    Parameter,
}

impl BufferTarget {
    /// Capability flags implied by the target
    pub fn usage_flags(self) -> BufferUsage {
        match self {
            BufferTarget::Vertex => BufferUsage::VERTEX,
            BufferTarget::Index => BufferUsage::INDEX,
            BufferTarget::Uniform => BufferUsage::UNIFORM,
            BufferTarget::Storage => BufferUsage::STORAGE,
            BufferTarget::Indirect | BufferTarget::Parameter => BufferUsage::INDIRECT,
        }
    }
}

/// Expected update/read pattern of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsageHint {
    /// Uploaded once through staging
    Static,
    /// Updated often through staging
    Dynamic,
    /// Rewritten by the CPU every frame (host-visible)
    Stream,
    /// Read back by the CPU
    ReadBack,
}

impl BufferUsageHint {
    /// Capability flags implied by the hint
    pub fn usage_flags(self) -> BufferUsage {
        match self {
            BufferUsageHint::Static | BufferUsageHint::Dynamic => BufferUsage::TRANSFER_DST,
            BufferUsageHint::Stream => BufferUsage::empty(),
            BufferUsageHint::ReadBack => BufferUsage::TRANSFER_SRC,
        }
    }

    /// Memory properties implied by the hint
    pub fn memory_properties(self) -> MemoryProperties {
        match self {
            BufferUsageHint::Static | BufferUsageHint::Dynamic => MemoryProperties::DEVICE_LOCAL,
            BufferUsageHint::Stream => MemoryProperties::HOST_VISIBLE | MemoryProperties::HOST_COHERENT,
            BufferUsageHint::ReadBack => MemoryProperties::HOST_VISIBLE | MemoryProperties::HOST_CACHED,
        }
    }
}

/// Logical buffer descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDescriptor {
    /// Unique name (case-insensitive)
    pub name: String,
    /// Lifetime class
    pub lifetime: ResourceLifetime,
    /// Size in bytes
    pub size_in_bytes: u64,
    /// Binding target
    pub target: BufferTarget,
    /// Update pattern
    pub usage_hint: BufferUsageHint,
    /// May share memory with other transient resources
    pub allow_aliasing: bool,
    /// Written through storage access invisible to pass declarations
    pub requires_storage_usage: bool,
}

impl BufferDescriptor {
    pub fn new(
        name: impl Into<String>,
        lifetime: ResourceLifetime,
        size_in_bytes: u64,
        target: BufferTarget,
        usage_hint: BufferUsageHint,
    ) -> Self {
        Self {
            name: name.into(),
            lifetime,
            size_in_bytes,
            target,
            usage_hint,
            allow_aliasing: false,
            requires_storage_usage: false,
        }
    }

    pub fn with_aliasing(mut self, allow: bool) -> Self {
        self.allow_aliasing = allow;
        self
    }

    pub fn with_storage_usage(mut self, required: bool) -> Self {
        self.requires_storage_usage = required;
        self
    }
}

// ===== FRAMEBUFFER =====

/// Attachment point inside a framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentSlot {
    Color(u32),
    Depth,
    Stencil,
    DepthStencil,
}

impl AttachmentSlot {
    /// Parse "color0".."colorN", "depth", "stencil" or "depthstencil"
    pub fn parse(label: &str) -> Option<Self> {
        let lower = label.to_ascii_lowercase();
        match lower.as_str() {
            "depth" => Some(AttachmentSlot::Depth),
            "stencil" => Some(AttachmentSlot::Stencil),
            "depthstencil" | "depth_stencil" => Some(AttachmentSlot::DepthStencil),
            other => other
                .strip_prefix("color")
                .and_then(|index| index.parse::<u32>().ok())
                .map(AttachmentSlot::Color),
        }
    }

    /// Whether a reference to `self` is satisfied by an attachment declared at `declared`
    ///
    /// A combined depth/stencil attachment answers both depth and stencil references.
    pub fn matches(self, declared: AttachmentSlot) -> bool {
        match (self, declared) {
            (AttachmentSlot::Depth, AttachmentSlot::DepthStencil)
            | (AttachmentSlot::Stencil, AttachmentSlot::DepthStencil)
            | (AttachmentSlot::DepthStencil, AttachmentSlot::Depth)
            | (AttachmentSlot::DepthStencil, AttachmentSlot::Stencil) => true,
            (a, b) => a == b,
        }
    }

    pub fn is_color(self) -> bool {
        matches!(self, AttachmentSlot::Color(_))
    }
}

/// One texture bound to a framebuffer slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramebufferAttachment {
    pub slot: AttachmentSlot,
    /// Name of the texture descriptor
    pub texture: String,
}

/// Logical framebuffer descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramebufferDescriptor {
    /// Unique name (case-insensitive)
    pub name: String,
    /// Attachments in declaration order
    pub attachments: Vec<FramebufferAttachment>,
}

impl FramebufferDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), attachments: Vec::new() }
    }

    pub fn with_attachment(mut self, slot: AttachmentSlot, texture: impl Into<String>) -> Self {
        self.attachments.push(FramebufferAttachment { slot, texture: texture.into() });
        self
    }

    /// Texture bound at a slot, if any
    pub fn attachment(&self, slot: AttachmentSlot) -> Option<&FramebufferAttachment> {
        self.attachments.iter().find(|a| slot.matches(a.slot))
    }
}

// ===== REQUEST =====

/// A texture or buffer descriptor as it appears in a plan
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceRequest {
    Texture(TextureDescriptor),
    Buffer(BufferDescriptor),
}

impl ResourceRequest {
    pub fn name(&self) -> &str {
        match self {
            ResourceRequest::Texture(t) => &t.name,
            ResourceRequest::Buffer(b) => &b.name,
        }
    }

    pub fn lifetime(&self) -> ResourceLifetime {
        match self {
            ResourceRequest::Texture(t) => t.lifetime,
            ResourceRequest::Buffer(b) => b.lifetime,
        }
    }

    pub fn allow_aliasing(&self) -> bool {
        match self {
            ResourceRequest::Texture(t) => t.allow_aliasing,
            ResourceRequest::Buffer(b) => b.allow_aliasing,
        }
    }

    pub fn requires_storage_usage(&self) -> bool {
        match self {
            ResourceRequest::Texture(t) => t.requires_storage_usage,
            ResourceRequest::Buffer(b) => b.requires_storage_usage,
        }
    }
}

#[cfg(test)]
#[path = "descriptor_tests.rs"]
mod tests;
