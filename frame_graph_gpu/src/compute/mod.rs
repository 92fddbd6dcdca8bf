/// Compute path helpers

pub mod descriptor_cache;

pub use descriptor_cache::{ComputeDescriptorCache, DescriptorCacheKey};
