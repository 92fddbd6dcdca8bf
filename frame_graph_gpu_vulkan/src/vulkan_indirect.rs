/// VulkanCommandSink - records replayed indirect draws into a command buffer

use ash::vk;
use ash::vk::Handle;
use frame_graph_gpu::framegraph::Result;
use frame_graph_gpu::framegraph::device::BufferHandle;
use frame_graph_gpu::framegraph::draw::{IndexType, IndirectCommandSink};
use frame_graph_gpu::engine_bail;

use crate::vulkan_format::index_type_to_vk;

const SOURCE: &str = "framegraph::vulkan::indirect";

/// Command buffer in the recording state, inside the pass being replayed
pub struct VulkanCommandSink<'a> {
    device: &'a ash::Device,
    command_buffer: vk::CommandBuffer,
    draw_indirect_count: bool,
}

impl<'a> VulkanCommandSink<'a> {
    /// `draw_indirect_count` must match the feature enabled on `device`
    /// (see `DeviceCapabilities`)
    pub fn new(device: &'a ash::Device, command_buffer: vk::CommandBuffer, draw_indirect_count: bool) -> Self {
        Self { device, command_buffer, draw_indirect_count }
    }

    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }
}

fn buffer(handle: BufferHandle) -> vk::Buffer {
    vk::Buffer::from_raw(handle.as_raw())
}

impl IndirectCommandSink for VulkanCommandSink<'_> {
    fn bind_index_buffer(&mut self, index_buffer: BufferHandle, offset: u64, index_type: IndexType) -> Result<()> {
        if index_buffer.is_null() {
            engine_bail!(SOURCE, "Cannot bind a null index buffer");
        }
        unsafe {
            self.device.cmd_bind_index_buffer(
                self.command_buffer,
                buffer(index_buffer),
                offset,
                index_type_to_vk(index_type),
            );
        }
        Ok(())
    }

    fn draw_indexed_indirect(
        &mut self,
        indirect_buffer: BufferHandle,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) -> Result<()> {
        unsafe {
            self.device.cmd_draw_indexed_indirect(
                self.command_buffer,
                buffer(indirect_buffer),
                offset,
                draw_count,
                stride,
            );
        }
        Ok(())
    }

    fn draw_indexed_indirect_count(
        &mut self,
        indirect_buffer: BufferHandle,
        offset: u64,
        count_buffer: BufferHandle,
        count_offset: u64,
        max_draw_count: u32,
        stride: u32,
    ) -> Result<()> {
        if !self.draw_indirect_count {
            engine_bail!(SOURCE, "drawIndirectCount is not enabled on this device");
        }
        unsafe {
            self.device.cmd_draw_indexed_indirect_count(
                self.command_buffer,
                buffer(indirect_buffer),
                offset,
                buffer(count_buffer),
                count_offset,
                max_draw_count,
                stride,
            );
        }
        Ok(())
    }
}
