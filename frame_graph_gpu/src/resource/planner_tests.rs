/// Tests for ResourcePlanner

use super::*;
use crate::resource::{
    ResourceDescriptorRegistry, SizePolicy, BufferTarget, BufferUsageHint, AttachmentSlot,
};

fn tex(name: &str, lifetime: ResourceLifetime) -> TextureDescriptor {
    TextureDescriptor::new(name, lifetime, SizePolicy::InternalResolution(1.0), "rgba8")
}

fn sample_registry() -> ResourceDescriptorRegistry {
    let mut registry = ResourceDescriptorRegistry::new();
    registry.register_texture(tex("history", ResourceLifetime::Persistent));
    registry.register_texture(tex("bloom0", ResourceLifetime::Transient));
    registry.register_texture(tex("bloom1", ResourceLifetime::Transient));
    registry.register_texture(tex("imported", ResourceLifetime::External));
    registry.register_buffer(BufferDescriptor::new(
        "cull_args", ResourceLifetime::Transient, 256, BufferTarget::Indirect, BufferUsageHint::Dynamic,
    ));
    registry.register_framebuffer(
        FramebufferDescriptor::new("main").with_attachment(AttachmentSlot::Color(0), "bloom0"),
    );
    registry
}

#[test]
fn test_sync_buckets_by_lifetime_in_order() {
    let registry = sample_registry();
    let mut planner = ResourcePlanner::new();
    planner.sync(Some(&registry));

    let plan = planner.plan();
    assert_eq!(plan.persistent.len(), 1);
    let transient: Vec<&str> = plan.transient.iter().map(|r| r.name()).collect();
    assert_eq!(transient, vec!["bloom0", "bloom1", "cull_args"]);
    assert_eq!(plan.bucket(ResourceLifetime::External)[0].name(), "imported");
    assert_eq!(plan.framebuffers.len(), 1);
    assert_eq!(plan.len(), 5);
}

#[test]
fn test_sync_keeps_every_request() {
    let registry = sample_registry();
    let mut planner = ResourcePlanner::new();
    planner.sync(Some(&registry));

    let total = registry.textures().len() + registry.buffers().len();
    assert_eq!(planner.plan().requests().count(), total);
}

#[test]
fn test_sync_is_full_replace() {
    let mut registry = sample_registry();
    let mut planner = ResourcePlanner::new();
    planner.sync(Some(&registry));

    registry.remove_texture("bloom1");
    planner.sync(Some(&registry));

    assert!(planner.texture("bloom1").is_none());
    assert_eq!(planner.plan().transient.len(), 2);
}

#[test]
fn test_sync_without_registry_resets_plan() {
    let registry = sample_registry();
    let mut planner = ResourcePlanner::new();
    planner.sync(Some(&registry));
    assert!(!planner.plan().is_empty());

    planner.sync(None);
    assert!(planner.plan().is_empty());
    assert!(planner.texture("history").is_none());
    assert!(planner.framebuffer("main").is_none());
}

#[test]
fn test_lookups_are_case_insensitive() {
    let registry = sample_registry();
    let mut planner = ResourcePlanner::new();
    planner.sync(Some(&registry));

    assert!(planner.texture("HISTORY").is_some());
    assert!(planner.buffer("Cull_Args").is_some());
    assert!(planner.framebuffer("MAIN").is_some());
}
