/// Resource allocator: alias groups, usage inference and physical groups

pub mod alias;
pub mod usage;
pub mod physical;
pub mod resource_allocator;

pub use alias::{AliasKey, AliasGroupKey, AliasGroup, AllocationRequest, SHARED_DISCRIMINATOR};
pub use usage::{
    ResourceRef, ResourceUsageType, PassResourceUsage, PassMetadata,
    UsageProfile, UsageProfiles, InferredUsage, PRESENTATION_TARGET,
    infer_image_usage, infer_buffer_usage,
};
pub use physical::{PhysicalGroup, PhysicalGroupKey, PhysicalResourceDesc, PhysicalAllocation};
pub use resource_allocator::{ResourceAllocator, AllocatorStats};
