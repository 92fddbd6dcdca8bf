/// Indirect draw path

pub mod indirect;

pub use indirect::{
    DrawIndexedIndirectCommand, DRAW_INDEXED_INDIRECT_STRIDE, IndexType,
    FrameOperation, QueuedOperation, FrameOperationQueue,
    IndirectCommandSink, IndirectDrawRecorder,
};
