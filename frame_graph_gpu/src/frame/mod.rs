/// Per-frame resource services: retirement, staging and the frame clock

pub mod retirement;
pub mod staging;
pub mod frame_context;

pub use retirement::{FrameSlotRetirementTable, RetirementEntry};
pub use staging::{StagingManager, StagingBuffer};
pub use frame_context::FrameResourceContext;
