//! Unit tests for Vulkan conversion functions
//!
//! Pure mappings only, no GPU required.

use super::*;
use ash::vk;
use frame_graph_gpu::framegraph::device::{
    TextureFormat, ImageUsage, BufferUsage, MemoryProperties, ImageLayout, DescriptorKind,
};
use frame_graph_gpu::framegraph::draw::IndexType;
use gpu_allocator::MemoryLocation;

// ============================================================================
// TEXTURE FORMAT CONVERSION TESTS
// ============================================================================

#[test]
fn test_texture_format_to_vk_color_formats() {
    assert_eq!(texture_format_to_vk(TextureFormat::R8G8B8A8_UNORM), vk::Format::R8G8B8A8_UNORM);
    assert_eq!(texture_format_to_vk(TextureFormat::B8G8R8A8_SRGB), vk::Format::B8G8R8A8_SRGB);
    assert_eq!(
        texture_format_to_vk(TextureFormat::R16G16B16A16_SFLOAT),
        vk::Format::R16G16B16A16_SFLOAT
    );
    assert_eq!(
        texture_format_to_vk(TextureFormat::B10G11R11_UFLOAT),
        vk::Format::B10G11R11_UFLOAT_PACK32
    );
}

#[test]
fn test_texture_format_to_vk_depth_formats() {
    assert_eq!(texture_format_to_vk(TextureFormat::D32_SFLOAT), vk::Format::D32_SFLOAT);
    assert_eq!(texture_format_to_vk(TextureFormat::D24_UNORM_S8_UINT), vk::Format::D24_UNORM_S8_UINT);
    assert_eq!(texture_format_to_vk(TextureFormat::S8_UINT), vk::Format::S8_UINT);
}

#[test]
fn test_every_texture_format_maps_to_a_defined_vk_format() {
    for &format in TextureFormat::ALL {
        assert_ne!(texture_format_to_vk(format), vk::Format::UNDEFINED, "{:?}", format);
    }
}

// ============================================================================
// ASPECT TESTS
// ============================================================================

#[test]
fn test_aspect_mask_color_and_depth() {
    assert_eq!(aspect_mask(TextureFormat::R8G8B8A8_UNORM), vk::ImageAspectFlags::COLOR);
    assert_eq!(aspect_mask(TextureFormat::D32_SFLOAT), vk::ImageAspectFlags::DEPTH);
    assert_eq!(
        aspect_mask(TextureFormat::D24_UNORM_S8_UINT),
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    );
}

#[test]
fn test_view_aspect_mask_uses_depth_for_combined_formats() {
    assert_eq!(view_aspect_mask(TextureFormat::D24_UNORM_S8_UINT), vk::ImageAspectFlags::DEPTH);
    assert_eq!(view_aspect_mask(TextureFormat::S8_UINT), vk::ImageAspectFlags::STENCIL);
}

// ============================================================================
// USAGE FLAG TESTS
// ============================================================================

#[test]
fn test_image_usage_to_vk() {
    assert_eq!(image_usage_to_vk(ImageUsage::empty()), vk::ImageUsageFlags::empty());
    assert_eq!(
        image_usage_to_vk(ImageUsage::SAMPLED | ImageUsage::COLOR_ATTACHMENT),
        vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::COLOR_ATTACHMENT
    );
    assert_eq!(
        image_usage_to_vk(ImageUsage::all()),
        vk::ImageUsageFlags::SAMPLED
            | vk::ImageUsageFlags::STORAGE
            | vk::ImageUsageFlags::COLOR_ATTACHMENT
            | vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT
            | vk::ImageUsageFlags::TRANSFER_SRC
            | vk::ImageUsageFlags::TRANSFER_DST
    );
}

#[test]
fn test_buffer_usage_to_vk() {
    assert_eq!(
        buffer_usage_to_vk(BufferUsage::INDIRECT | BufferUsage::STORAGE),
        vk::BufferUsageFlags::INDIRECT_BUFFER | vk::BufferUsageFlags::STORAGE_BUFFER
    );
    assert_eq!(
        buffer_usage_to_vk(BufferUsage::VERTEX | BufferUsage::INDEX | BufferUsage::TRANSFER_DST),
        vk::BufferUsageFlags::VERTEX_BUFFER
            | vk::BufferUsageFlags::INDEX_BUFFER
            | vk::BufferUsageFlags::TRANSFER_DST
    );
}

// ============================================================================
// MEMORY / LAYOUT / DESCRIPTOR TESTS
// ============================================================================

#[test]
fn test_memory_location() {
    assert_eq!(memory_location(MemoryProperties::DEVICE_LOCAL), MemoryLocation::GpuOnly);
    assert_eq!(
        memory_location(MemoryProperties::HOST_VISIBLE | MemoryProperties::HOST_COHERENT),
        MemoryLocation::CpuToGpu
    );
    assert_eq!(
        memory_location(MemoryProperties::HOST_VISIBLE | MemoryProperties::HOST_CACHED),
        MemoryLocation::GpuToCpu
    );
}

#[test]
fn test_image_layout_to_vk() {
    assert_eq!(image_layout_to_vk(ImageLayout::Undefined), vk::ImageLayout::UNDEFINED);
    assert_eq!(
        image_layout_to_vk(ImageLayout::ShaderReadOnly),
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
    );
    assert_eq!(image_layout_to_vk(ImageLayout::General), vk::ImageLayout::GENERAL);
}

#[test]
fn test_descriptor_kind_to_vk() {
    assert_eq!(descriptor_kind_to_vk(DescriptorKind::StorageImage), vk::DescriptorType::STORAGE_IMAGE);
    assert_eq!(
        descriptor_kind_to_vk(DescriptorKind::CombinedImageSampler),
        vk::DescriptorType::COMBINED_IMAGE_SAMPLER
    );
}

#[test]
fn test_index_type_to_vk() {
    assert_eq!(index_type_to_vk(IndexType::U16), vk::IndexType::UINT16);
    assert_eq!(index_type_to_vk(IndexType::U32), vk::IndexType::UINT32);
}
