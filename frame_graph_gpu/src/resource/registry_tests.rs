/// Tests for ResourceDescriptorRegistry

use super::*;
use crate::resource::{
    ResourceLifetime, SizePolicy, BufferTarget, BufferUsageHint, AttachmentSlot,
};

fn tex(name: &str) -> TextureDescriptor {
    TextureDescriptor::new(name, ResourceLifetime::Transient, SizePolicy::InternalResolution(1.0), "rgba8")
}

#[test]
fn test_lookup_is_case_insensitive() {
    let mut registry = ResourceDescriptorRegistry::new();
    registry.register_texture(tex("SceneColor"));

    assert!(registry.texture("scenecolor").is_some());
    assert!(registry.texture("SCENECOLOR").is_some());
    assert_eq!(registry.texture("scenecolor").unwrap().name, "SceneColor");
}

#[test]
fn test_enumeration_keeps_insertion_order() {
    let mut registry = ResourceDescriptorRegistry::new();
    registry.register_texture(tex("c"));
    registry.register_texture(tex("a"));
    registry.register_texture(tex("b"));

    let names: Vec<&str> = registry.textures().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["c", "a", "b"]);
}

#[test]
fn test_reregister_replaces_in_place() {
    let mut registry = ResourceDescriptorRegistry::new();
    registry.register_texture(tex("a"));
    registry.register_texture(tex("b"));

    let previous = registry.register_texture(tex("A").with_array_layers(2));
    assert_eq!(previous.map(|t| t.name), Some("a".to_string()));

    let textures = registry.textures();
    assert_eq!(textures.len(), 2);
    assert_eq!(textures[0].name, "A");
    assert_eq!(textures[0].array_layers, 2);
}

#[test]
fn test_remove_reindexes() {
    let mut registry = ResourceDescriptorRegistry::new();
    registry.register_texture(tex("a"));
    registry.register_texture(tex("b"));
    registry.register_texture(tex("c"));

    assert!(registry.remove_texture("B").is_some());
    assert!(registry.remove_texture("b").is_none());
    assert_eq!(registry.texture("c").unwrap().name, "c");
    assert_eq!(registry.textures().len(), 2);
}

#[test]
fn test_buffers_and_framebuffers() {
    let mut registry = ResourceDescriptorRegistry::new();
    registry.register_buffer(BufferDescriptor::new(
        "Lights", ResourceLifetime::Persistent, 1024, BufferTarget::Storage, BufferUsageHint::Dynamic,
    ));
    registry.register_framebuffer(
        FramebufferDescriptor::new("GBuffer").with_attachment(AttachmentSlot::Color(0), "albedo"),
    );

    assert_eq!(registry.buffer("lights").unwrap().size_in_bytes, 1024);
    assert_eq!(registry.framebuffer("gbuffer").unwrap().attachments.len(), 1);

    registry.clear();
    assert!(registry.buffers().is_empty());
    assert!(registry.framebuffers().is_empty());
}
