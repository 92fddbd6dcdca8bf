/// Indirect draw recording
///
/// Draws are not recorded when requested: accepted calls become operations
/// in a frame-scoped queue tagged with the active pass index, replayed into
/// an `IndirectCommandSink` when the pass's command buffer is recorded.
/// Missing bindings are authoring mistakes: the call is skipped with a
/// warning. Count-draws degrade to fixed-count draws when the device or the
/// bindings cannot support them.

use bytemuck::{Pod, Zeroable};
use crate::error::Result;
use crate::{engine_debug, engine_warn};
use crate::device::{BufferHandle, DeviceCapabilities};

/// GPU layout of one indexed indirect draw (matches VkDrawIndexedIndirectCommand)
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndexedIndirectCommand {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub first_instance: u32,
}

/// Stride of a tightly packed command array
pub const DRAW_INDEXED_INDIRECT_STRIDE: u32 = std::mem::size_of::<DrawIndexedIndirectCommand>() as u32;

/// Index element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    U16,
    U32,
}

/// A deferred draw operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOperation {
    DrawIndexedIndirect {
        index_buffer: BufferHandle,
        index_type: IndexType,
        indirect_buffer: BufferHandle,
        offset: u64,
        draw_count: u32,
        stride: u32,
    },
    DrawIndexedIndirectCount {
        index_buffer: BufferHandle,
        index_type: IndexType,
        indirect_buffer: BufferHandle,
        offset: u64,
        count_buffer: BufferHandle,
        count_offset: u64,
        max_draw_count: u32,
        stride: u32,
    },
}

/// An operation and the pass it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedOperation {
    pub pass_index: u32,
    pub operation: FrameOperation,
}

/// Frame-scoped queue of deferred operations, in submission order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameOperationQueue {
    operations: Vec<QueuedOperation>,
}

impl FrameOperationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pass_index: u32, operation: FrameOperation) {
        self.operations.push(QueuedOperation { pass_index, operation });
    }

    pub fn operations(&self) -> &[QueuedOperation] {
        &self.operations
    }

    /// Operations of one pass, in submission order
    pub fn for_pass(&self, pass_index: u32) -> impl Iterator<Item = &FrameOperation> {
        self.operations
            .iter()
            .filter(move |queued| queued.pass_index == pass_index)
            .map(|queued| &queued.operation)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn clear(&mut self) {
        self.operations.clear();
    }

    /// Record every operation of `pass_index` into `sink`
    pub fn replay(&self, pass_index: u32, sink: &mut dyn IndirectCommandSink) -> Result<usize> {
        let mut recorded = 0;
        for operation in self.for_pass(pass_index) {
            match *operation {
                FrameOperation::DrawIndexedIndirect {
                    index_buffer, index_type, indirect_buffer, offset, draw_count, stride,
                } => {
                    sink.bind_index_buffer(index_buffer, 0, index_type)?;
                    sink.draw_indexed_indirect(indirect_buffer, offset, draw_count, stride)?;
                }
                FrameOperation::DrawIndexedIndirectCount {
                    index_buffer, index_type, indirect_buffer, offset,
                    count_buffer, count_offset, max_draw_count, stride,
                } => {
                    sink.bind_index_buffer(index_buffer, 0, index_type)?;
                    sink.draw_indexed_indirect_count(
                        indirect_buffer, offset, count_buffer, count_offset, max_draw_count, stride,
                    )?;
                }
            }
            recorded += 1;
        }
        Ok(recorded)
    }
}

/// Command recorder able to execute replayed draw operations
pub trait IndirectCommandSink {
    /// Bind an index buffer
    fn bind_index_buffer(&mut self, buffer: BufferHandle, offset: u64, index_type: IndexType) -> Result<()>;

    /// Indexed indirect draw with a CPU-known draw count
    fn draw_indexed_indirect(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) -> Result<()>;

    /// Indexed indirect draw whose count is read from `count_buffer`
    fn draw_indexed_indirect_count(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        count_buffer: BufferHandle,
        count_offset: u64,
        max_draw_count: u32,
        stride: u32,
    ) -> Result<()>;
}

#[derive(Debug, Clone, Copy)]
struct BoundIndexedMesh {
    index_buffer: BufferHandle,
    index_type: IndexType,
    index_count: u32,
}

/// Binding state and deferred queue for indirect draws
#[derive(Debug)]
pub struct IndirectDrawRecorder {
    supports_indirect_count: bool,
    mesh: Option<BoundIndexedMesh>,
    indirect_buffer: BufferHandle,
    parameter_buffer: BufferHandle,
    active_pass: Option<u32>,
    queue: FrameOperationQueue,
}

impl IndirectDrawRecorder {
    pub fn new(capabilities: DeviceCapabilities) -> Self {
        Self {
            supports_indirect_count: capabilities.draw_indirect_count,
            mesh: None,
            indirect_buffer: BufferHandle::NULL,
            parameter_buffer: BufferHandle::NULL,
            active_pass: None,
            queue: FrameOperationQueue::new(),
        }
    }

    // ===== BINDINGS =====

    /// Bind the indexed mesh the next draws read indices from
    pub fn bind_indexed_mesh(&mut self, index_buffer: BufferHandle, index_type: IndexType, index_count: u32) {
        self.mesh = Some(BoundIndexedMesh { index_buffer, index_type, index_count });
    }

    pub fn unbind_indexed_mesh(&mut self) {
        self.mesh = None;
    }

    /// Bind the buffer holding `DrawIndexedIndirectCommand`s (NULL unbinds)
    pub fn bind_indirect_buffer(&mut self, buffer: BufferHandle) {
        self.indirect_buffer = buffer;
    }

    /// Bind the buffer holding the draw count (NULL unbinds)
    pub fn bind_parameter_buffer(&mut self, buffer: BufferHandle) {
        self.parameter_buffer = buffer;
    }

    // ===== PASSES =====

    /// Tag subsequent operations with `pass_index`
    pub fn begin_pass(&mut self, pass_index: u32) {
        self.active_pass = Some(pass_index);
    }

    pub fn end_pass(&mut self) {
        self.active_pass = None;
    }

    // ===== DRAWS =====

    /// Indexed indirect draws starting at offset 0
    pub fn multi_draw_elements_indirect(&mut self, draw_count: u32, stride: u32) -> bool {
        self.multi_draw_elements_indirect_with_offset(0, draw_count, stride)
    }

    /// Indexed indirect draws starting at `offset` bytes into the indirect buffer
    ///
    /// A stride of 0 means tightly packed commands. Returns whether an
    /// operation was queued.
    pub fn multi_draw_elements_indirect_with_offset(&mut self, offset: u64, draw_count: u32, stride: u32) -> bool {
        let Some((pass_index, mesh)) = self.check_bindings("multi_draw_elements_indirect") else {
            return false;
        };
        self.queue.push(pass_index, FrameOperation::DrawIndexedIndirect {
            index_buffer: mesh.index_buffer,
            index_type: mesh.index_type,
            indirect_buffer: self.indirect_buffer,
            offset,
            draw_count,
            stride: effective_stride(stride),
        });
        true
    }

    /// Indexed indirect draws whose count is read from the parameter buffer
    ///
    /// Without device support or a bound parameter buffer this queues the
    /// same operation as `multi_draw_elements_indirect_with_offset` with
    /// `max_draw_count` draws.
    pub fn multi_draw_elements_indirect_count(
        &mut self,
        offset: u64,
        count_offset: u64,
        max_draw_count: u32,
        stride: u32,
    ) -> bool {
        if !self.supports_indirect_count || self.parameter_buffer.is_null() {
            engine_debug!(
                "framegraph::IndirectDraw",
                "Count draw falls back to {} fixed draws ({})",
                max_draw_count,
                if self.supports_indirect_count { "no parameter buffer" } else { "unsupported" }
            );
            return self.multi_draw_elements_indirect_with_offset(offset, max_draw_count, stride);
        }
        let Some((pass_index, mesh)) = self.check_bindings("multi_draw_elements_indirect_count") else {
            return false;
        };
        self.queue.push(pass_index, FrameOperation::DrawIndexedIndirectCount {
            index_buffer: mesh.index_buffer,
            index_type: mesh.index_type,
            indirect_buffer: self.indirect_buffer,
            offset,
            count_buffer: self.parameter_buffer,
            count_offset,
            max_draw_count,
            stride: effective_stride(stride),
        });
        true
    }

    fn check_bindings(&self, call: &str) -> Option<(u32, BoundIndexedMesh)> {
        if self.indirect_buffer.is_null() {
            engine_warn!("framegraph::IndirectDraw", "{} skipped: no indirect buffer bound", call);
            return None;
        }
        let mesh = match self.mesh {
            Some(mesh) if mesh.index_count > 0 => mesh,
            _ => {
                engine_warn!("framegraph::IndirectDraw", "{} skipped: no indexed mesh bound", call);
                return None;
            }
        };
        let Some(pass_index) = self.active_pass else {
            engine_warn!("framegraph::IndirectDraw", "{} skipped: no active pass", call);
            return None;
        };
        Some((pass_index, mesh))
    }

    // ===== QUEUE =====

    pub fn queue(&self) -> &FrameOperationQueue {
        &self.queue
    }

    /// Take the frame's operations, leaving an empty queue
    pub fn take_operations(&mut self) -> FrameOperationQueue {
        std::mem::take(&mut self.queue)
    }
}

fn effective_stride(stride: u32) -> u32 {
    if stride == 0 { DRAW_INDEXED_INDIRECT_STRIDE } else { stride }
}

#[cfg(test)]
#[path = "indirect_tests.rs"]
mod tests;
