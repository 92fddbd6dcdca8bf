/// Tests for resource references and usage inference

use super::*;
use crate::allocator::alias::{AliasGroup, AllocationRequest};
use crate::resource::{
    ResourceDescriptorRegistry, TextureDescriptor, BufferDescriptor, FramebufferDescriptor,
    ResourceLifetime, SizePolicy, BufferTarget, BufferUsageHint,
};

fn tex(name: &str, format: &str) -> TextureDescriptor {
    TextureDescriptor::new(name, ResourceLifetime::Transient, SizePolicy::InternalResolution(1.0), format)
}

fn planner_with(registry: &ResourceDescriptorRegistry) -> ResourcePlanner {
    let mut planner = ResourcePlanner::new();
    planner.sync(Some(registry));
    planner
}

fn group_of(desc: TextureDescriptor) -> AliasGroup {
    let request = AllocationRequest::new(ResourceRequest::Texture(desc));
    let mut group = AliasGroup::new(request.group_key());
    group.add(request);
    group
}

// ============================================================================
// ResourceRef
// ============================================================================

#[test]
fn test_parse_tagged_names() {
    assert_eq!(
        ResourceRef::parse("fbo::GBuffer::color1"),
        ResourceRef::FramebufferSlot { framebuffer: "gbuffer".to_string(), slot: AttachmentSlot::Color(1) }
    );
    assert_eq!(
        ResourceRef::parse("fbo::shadow::depth"),
        ResourceRef::FramebufferSlot { framebuffer: "shadow".to_string(), slot: AttachmentSlot::Depth }
    );
    assert_eq!(ResourceRef::parse("tex::Bloom"), ResourceRef::Texture("bloom".to_string()));
    assert_eq!(ResourceRef::parse("buf::Lights"), ResourceRef::Buffer("lights".to_string()));
    assert_eq!(ResourceRef::parse("history"), ResourceRef::Named("history".to_string()));
    assert_eq!(ResourceRef::parse(PRESENTATION_TARGET), ResourceRef::PresentationTarget);
}

#[test]
fn test_malformed_framebuffer_reference_becomes_named() {
    assert_eq!(ResourceRef::parse("fbo::main"), ResourceRef::Named("fbo::main".to_string()));
    assert_eq!(ResourceRef::parse("fbo::main::albedo"), ResourceRef::Named("fbo::main::albedo".to_string()));
}

#[test]
fn test_pass_metadata_parses_at_registration() {
    let pass = PassMetadata::new(3, "bloom")
        .with_usage("tex::hdr", ResourceUsageType::SampledTexture)
        .with_usage(PRESENTATION_TARGET, ResourceUsageType::ColorAttachment);
    assert_eq!(pass.usages[0].resource, ResourceRef::Texture("hdr".to_string()));
    assert_eq!(pass.usages[1].resource, ResourceRef::PresentationTarget);
}

// ============================================================================
// Profiles
// ============================================================================

#[test]
fn test_profiles_are_additive_across_passes() {
    let mut registry = ResourceDescriptorRegistry::new();
    registry.register_texture(tex("hdr", "rgba16f"));
    let planner = planner_with(&registry);

    let passes = vec![
        PassMetadata::new(0, "lighting").with_usage("tex::hdr", ResourceUsageType::ColorAttachment),
        PassMetadata::new(1, "tonemap").with_usage("tex::hdr", ResourceUsageType::SampledTexture),
    ];
    let profiles = UsageProfiles::build(&passes, &planner);
    let profile = profiles.get("HDR").unwrap();
    assert!(profile.image.contains(ImageUsage::COLOR_ATTACHMENT | ImageUsage::SAMPLED));
}

#[test]
fn test_framebuffer_slot_resolves_to_texture() {
    let mut registry = ResourceDescriptorRegistry::new();
    registry.register_texture(tex("albedo", "rgba8"));
    registry.register_texture(tex("depth", "depth32f"));
    registry.register_framebuffer(
        FramebufferDescriptor::new("gbuffer")
            .with_attachment(AttachmentSlot::Color(0), "Albedo")
            .with_attachment(AttachmentSlot::DepthStencil, "depth"),
    );
    let planner = planner_with(&registry);

    let passes = vec![
        PassMetadata::new(0, "ssao").with_usage("fbo::gbuffer::depth", ResourceUsageType::SampledTexture),
        PassMetadata::new(1, "copy").with_usage("fbo::gbuffer::color0", ResourceUsageType::TransferSource),
    ];
    let profiles = UsageProfiles::build(&passes, &planner);

    let albedo = profiles.get("albedo").unwrap();
    assert!(albedo.image.contains(ImageUsage::COLOR_ATTACHMENT | ImageUsage::TRANSFER_SRC));
    let depth = profiles.get("depth").unwrap();
    assert!(depth.image.contains(ImageUsage::DEPTH_STENCIL_ATTACHMENT | ImageUsage::SAMPLED));
}

#[test]
fn test_presentation_target_is_not_profiled() {
    let registry = ResourceDescriptorRegistry::new();
    let planner = planner_with(&registry);
    let passes = vec![
        PassMetadata::new(0, "present").with_usage(PRESENTATION_TARGET, ResourceUsageType::ColorAttachment),
    ];
    assert!(UsageProfiles::build(&passes, &planner).is_empty());
}

#[test]
fn test_buffer_profile_flags() {
    let mut profile = UsageProfile::default();
    profile.add(ResourceUsageType::IndirectBuffer);
    profile.add(ResourceUsageType::StorageBuffer);
    profile.add(ResourceUsageType::TransferDestination);
    assert_eq!(
        profile.buffer,
        BufferUsage::INDIRECT | BufferUsage::STORAGE | BufferUsage::TRANSFER_DST
    );
    assert_eq!(profile.image, ImageUsage::TRANSFER_DST);
}

// ============================================================================
// Inference
// ============================================================================

#[test]
fn test_image_usage_from_profile() {
    let mut registry = ResourceDescriptorRegistry::new();
    registry.register_texture(tex("hdr", "rgba16f"));
    let planner = planner_with(&registry);
    let passes = vec![
        PassMetadata::new(0, "blur").with_usage("tex::hdr", ResourceUsageType::StorageTexture),
    ];
    let profiles = UsageProfiles::build(&passes, &planner);

    let inferred = infer_image_usage(&group_of(tex("hdr", "rgba16f")), TextureFormat::R16G16B16A16_SFLOAT, &profiles);
    assert_eq!(inferred.usage, ImageUsage::STORAGE);
    assert!(inferred.unreferenced.is_empty());
}

#[test]
fn test_requires_storage_forces_storage() {
    let mut registry = ResourceDescriptorRegistry::new();
    registry.register_texture(tex("lum", "r32f"));
    let planner = planner_with(&registry);
    let passes = vec![
        PassMetadata::new(0, "exposure").with_usage("tex::lum", ResourceUsageType::SampledTexture),
    ];
    let profiles = UsageProfiles::build(&passes, &planner);

    let group = group_of(tex("lum", "r32f").with_storage_usage(true));
    let inferred = infer_image_usage(&group, TextureFormat::R32_SFLOAT, &profiles);
    assert_eq!(inferred.usage, ImageUsage::SAMPLED | ImageUsage::STORAGE);
}

#[test]
fn test_depth_attachment_always_sampled() {
    let mut registry = ResourceDescriptorRegistry::new();
    registry.register_texture(tex("shadow", "depth32f"));
    let planner = planner_with(&registry);
    let passes = vec![
        PassMetadata::new(0, "shadow").with_usage("tex::shadow", ResourceUsageType::DepthAttachment),
    ];
    let profiles = UsageProfiles::build(&passes, &planner);

    let inferred = infer_image_usage(&group_of(tex("shadow", "depth32f")), TextureFormat::D32_SFLOAT, &profiles);
    assert_eq!(inferred.usage, ImageUsage::DEPTH_STENCIL_ATTACHMENT | ImageUsage::SAMPLED);
}

#[test]
fn test_unreferenced_falls_back_by_format() {
    let profiles = UsageProfiles::default();

    let color = infer_image_usage(&group_of(tex("dead", "rgba8")), TextureFormat::R8G8B8A8_UNORM, &profiles);
    assert_eq!(color.usage, ImageUsage::COLOR_ATTACHMENT | ImageUsage::SAMPLED);
    assert_eq!(color.unreferenced, vec!["dead".to_string()]);

    let depth = infer_image_usage(&group_of(tex("zdead", "depth24stencil8")), TextureFormat::D24_UNORM_S8_UINT, &profiles);
    assert_eq!(depth.usage, ImageUsage::DEPTH_STENCIL_ATTACHMENT | ImageUsage::SAMPLED);
}

#[test]
fn test_buffer_usage_union_and_default() {
    let profiles = UsageProfiles::default();
    let buffer_group = |desc: BufferDescriptor| {
        let request = AllocationRequest::new(ResourceRequest::Buffer(desc));
        let mut group = AliasGroup::new(request.group_key());
        group.add(request);
        group
    };

    let args = buffer_group(BufferDescriptor::new(
        "args", ResourceLifetime::Transient, 64, BufferTarget::Indirect, BufferUsageHint::Dynamic,
    ));
    let inferred = infer_buffer_usage(&args, &profiles);
    assert_eq!(inferred.usage, BufferUsage::INDIRECT | BufferUsage::TRANSFER_DST);
    assert_eq!(inferred.unreferenced, vec!["args".to_string()]);

    let scratch = buffer_group(BufferDescriptor::new(
        "scratch", ResourceLifetime::Transient, 64, BufferTarget::Storage, BufferUsageHint::Stream,
    ));
    assert_eq!(infer_buffer_usage(&scratch, &profiles).usage, BufferUsage::STORAGE);
}
