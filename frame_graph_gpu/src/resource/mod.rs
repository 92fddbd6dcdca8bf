/// Logical resources: descriptors, registry and planner

pub mod descriptor;
pub mod registry;
pub mod planner;

pub use descriptor::{
    ResourceLifetime, Resolution, SizePolicy,
    TextureDescriptor, BufferDescriptor, BufferTarget, BufferUsageHint,
    AttachmentSlot, FramebufferAttachment, FramebufferDescriptor, ResourceRequest,
};
pub use registry::{ResourceDescriptorSource, ResourceDescriptorRegistry};
pub use planner::{ResourcePlanner, ResourcePlan};
