/// Usage inference - which capabilities each physical resource needs
///
/// Passes declare how they use resources through `ResourceRef`s parsed once
/// when the pass is described. Profiles are additive: every declaration and
/// every framebuffer attachment ORs its flags into the resource's profile.

use rustc_hash::FxHashMap;
use crate::engine_warn;
use crate::device::{ImageUsage, BufferUsage, TextureFormat};
use crate::resource::{AttachmentSlot, ResourcePlanner, ResourceRequest};
use super::alias::AliasGroup;

/// Reserved name of the final presentation target
pub const PRESENTATION_TARGET: &str = "@present";

// ===== RESOURCE REFERENCES =====

/// A pass's reference to a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceRef {
    /// `fbo::<framebuffer>::<slot>`
    FramebufferSlot { framebuffer: String, slot: AttachmentSlot },
    /// `tex::<name>`
    Texture(String),
    /// `buf::<name>`
    Buffer(String),
    /// The swapchain image, never resolved to a planned resource
    PresentationTarget,
    /// Untagged name (texture or buffer)
    Named(String),
}

impl ResourceRef {
    /// Parse a tagged resource name. Names are lowercased.
    pub fn parse(name: &str) -> Self {
        let trimmed = name.trim();
        if trimmed.eq_ignore_ascii_case(PRESENTATION_TARGET) {
            return ResourceRef::PresentationTarget;
        }
        let lower = trimmed.to_lowercase();
        if let Some(rest) = lower.strip_prefix("fbo::") {
            if let Some((framebuffer, slot_label)) = rest.rsplit_once("::") {
                if let Some(slot) = AttachmentSlot::parse(slot_label) {
                    return ResourceRef::FramebufferSlot {
                        framebuffer: framebuffer.to_string(),
                        slot,
                    };
                }
            }
            engine_warn!("framegraph::UsageInference", "Malformed framebuffer reference '{}'", name);
            return ResourceRef::Named(lower);
        }
        if let Some(texture) = lower.strip_prefix("tex::") {
            return ResourceRef::Texture(texture.to_string());
        }
        if let Some(buffer) = lower.strip_prefix("buf::") {
            return ResourceRef::Buffer(buffer.to_string());
        }
        ResourceRef::Named(lower)
    }
}

// ===== USAGE TYPES =====

/// How a pass uses a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceUsageType {
    ColorAttachment,
    DepthAttachment,
    StencilAttachment,
    ResolveAttachment,
    SampledTexture,
    StorageTexture,
    TransferSource,
    TransferDestination,
    UniformBuffer,
    StorageBuffer,
    VertexBuffer,
    IndexBuffer,
    IndirectBuffer,
}

impl ResourceUsageType {
    /// Image capabilities implied by this usage
    pub fn image_usage(self) -> ImageUsage {
        match self {
            ResourceUsageType::ColorAttachment => ImageUsage::COLOR_ATTACHMENT,
            ResourceUsageType::DepthAttachment
            | ResourceUsageType::StencilAttachment => ImageUsage::DEPTH_STENCIL_ATTACHMENT,
            ResourceUsageType::ResolveAttachment => {
                ImageUsage::COLOR_ATTACHMENT | ImageUsage::TRANSFER_DST
            }
            ResourceUsageType::SampledTexture => ImageUsage::SAMPLED,
            ResourceUsageType::StorageTexture => ImageUsage::STORAGE,
            ResourceUsageType::TransferSource => ImageUsage::TRANSFER_SRC,
            ResourceUsageType::TransferDestination => ImageUsage::TRANSFER_DST,
            _ => ImageUsage::empty(),
        }
    }

    /// Buffer capabilities implied by this usage
    pub fn buffer_usage(self) -> BufferUsage {
        match self {
            ResourceUsageType::UniformBuffer => BufferUsage::UNIFORM,
            ResourceUsageType::StorageBuffer => BufferUsage::STORAGE,
            ResourceUsageType::VertexBuffer => BufferUsage::VERTEX,
            ResourceUsageType::IndexBuffer => BufferUsage::INDEX,
            ResourceUsageType::IndirectBuffer => BufferUsage::INDIRECT,
            ResourceUsageType::TransferSource => BufferUsage::TRANSFER_SRC,
            ResourceUsageType::TransferDestination => BufferUsage::TRANSFER_DST,
            _ => BufferUsage::empty(),
        }
    }
}

// ===== PASS METADATA =====

/// One declared usage inside a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassResourceUsage {
    pub resource: ResourceRef,
    pub usage: ResourceUsageType,
}

/// Resource usages declared by one render/compute pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassMetadata {
    pub pass_index: u32,
    pub name: String,
    pub usages: Vec<PassResourceUsage>,
}

impl PassMetadata {
    pub fn new(pass_index: u32, name: impl Into<String>) -> Self {
        Self { pass_index, name: name.into(), usages: Vec::new() }
    }

    /// Declare a usage; `resource` is a tagged name parsed here, once
    pub fn with_usage(mut self, resource: &str, usage: ResourceUsageType) -> Self {
        self.usages.push(PassResourceUsage { resource: ResourceRef::parse(resource), usage });
        self
    }
}

// ===== PROFILES =====

/// Accumulated capabilities of one logical resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UsageProfile {
    pub image: ImageUsage,
    pub buffer: BufferUsage,
}

impl UsageProfile {
    pub fn add(&mut self, usage: ResourceUsageType) {
        self.image |= usage.image_usage();
        self.buffer |= usage.buffer_usage();
    }
}

/// Profiles of every referenced resource, keyed by lowercase name
#[derive(Debug, Clone, Default)]
pub struct UsageProfiles {
    profiles: FxHashMap<String, UsageProfile>,
}

impl UsageProfiles {
    /// Build profiles from pass declarations and framebuffer attachments
    pub fn build(passes: &[PassMetadata], planner: &ResourcePlanner) -> Self {
        let mut profiles = Self::default();

        for pass in passes {
            for declared in &pass.usages {
                match &declared.resource {
                    ResourceRef::FramebufferSlot { framebuffer, slot } => {
                        let texture = planner
                            .framebuffer(framebuffer)
                            .and_then(|fb| fb.attachment(*slot))
                            .map(|attachment| attachment.texture.to_lowercase());
                        match texture {
                            Some(texture) => profiles.add(&texture, declared.usage),
                            None => engine_warn!(
                                "framegraph::UsageInference",
                                "Pass '{}' references unknown attachment {:?} of framebuffer '{}'",
                                pass.name, slot, framebuffer
                            ),
                        }
                    }
                    ResourceRef::Texture(name)
                    | ResourceRef::Buffer(name)
                    | ResourceRef::Named(name) => profiles.add(name, declared.usage),
                    ResourceRef::PresentationTarget => {}
                }
            }
        }

        for framebuffer in &planner.plan().framebuffers {
            for attachment in &framebuffer.attachments {
                let usage = if attachment.slot.is_color() {
                    ResourceUsageType::ColorAttachment
                } else {
                    ResourceUsageType::DepthAttachment
                };
                profiles.add(&attachment.texture.to_lowercase(), usage);
            }
        }

        profiles
    }

    fn add(&mut self, name: &str, usage: ResourceUsageType) {
        self.profiles.entry(name.to_string()).or_default().add(usage);
    }

    pub fn get(&self, name: &str) -> Option<&UsageProfile> {
        self.profiles.get(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

// ===== INFERENCE =====

/// Inferred usage of a physical group and the members nobody referenced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredUsage<U> {
    pub usage: U,
    pub unreferenced: Vec<String>,
}

/// Image usage for an alias group of textures
///
/// Members without any profile fall back to an attachment type chosen by
/// format, plus sampled. Depth/stencil attachments are always sampled too.
pub fn infer_image_usage(
    group: &AliasGroup,
    format: TextureFormat,
    profiles: &UsageProfiles,
) -> InferredUsage<ImageUsage> {
    let mut usage = ImageUsage::empty();
    let mut unreferenced = Vec::new();

    for member in &group.members {
        match profiles.get(member.name()) {
            Some(profile) => usage |= profile.image,
            None => {
                usage |= if format.has_depth() || format.has_stencil() {
                    ImageUsage::DEPTH_STENCIL_ATTACHMENT
                } else {
                    ImageUsage::COLOR_ATTACHMENT
                };
                usage |= ImageUsage::SAMPLED;
                unreferenced.push(member.name().to_string());
            }
        }
        if member.request.requires_storage_usage() {
            usage |= ImageUsage::STORAGE;
        }
    }

    if usage.contains(ImageUsage::DEPTH_STENCIL_ATTACHMENT) {
        usage |= ImageUsage::SAMPLED;
    }
    if usage.is_empty() {
        usage = ImageUsage::SAMPLED;
    }
    InferredUsage { usage, unreferenced }
}

/// Buffer usage for an alias group of buffers
///
/// Target and hint flags are unioned with profile flags; an empty result
/// becomes generic storage.
pub fn infer_buffer_usage(group: &AliasGroup, profiles: &UsageProfiles) -> InferredUsage<BufferUsage> {
    let mut usage = BufferUsage::empty();
    let mut unreferenced = Vec::new();

    for member in &group.members {
        if let ResourceRequest::Buffer(desc) = &member.request {
            usage |= desc.target.usage_flags() | desc.usage_hint.usage_flags();
            if desc.requires_storage_usage {
                usage |= BufferUsage::STORAGE;
            }
        }
        match profiles.get(member.name()) {
            Some(profile) => usage |= profile.buffer,
            None => unreferenced.push(member.name().to_string()),
        }
    }

    if usage.is_empty() {
        usage = BufferUsage::STORAGE;
    }
    InferredUsage { usage, unreferenced }
}

#[cfg(test)]
#[path = "usage_tests.rs"]
mod tests;
