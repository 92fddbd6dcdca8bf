/// ComputeDescriptorCache - descriptor sets for compute dispatches
///
/// Sets are cached per (swapchain image index, binding schema, binding key).
/// They are allocated from pool blocks owned by the schema. A block that
/// reports out-of-pool-memory or fragmentation is marked exhausted and never
/// tried again. When no block can serve a request a larger block is created
/// (base capacity, then base + growth * block count) and the allocation is
/// retried once. Blocks live until `destroy`.
///
/// Cached sets are only valid while the resources behind their binding key
/// exist. `clear_sets` runs on every physical plan rebuild; callers that key
/// by physical handles may use `invalidate` instead.

use std::sync::{Mutex, MutexGuard, PoisonError};
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::{engine_debug, engine_warn};
use crate::device::{
    GpuDevice, DescriptorAllocError, DescriptorPoolSize, DescriptorPoolHandle,
    DescriptorSetHandle, DescriptorSetLayoutHandle,
};

/// Cache key of one descriptor-set array
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DescriptorCacheKey {
    pub image_index: u32,
    pub schema_key: String,
    pub binding_key: String,
}

#[derive(Debug)]
struct PoolBlock {
    pool: DescriptorPoolHandle,
    capacity: u32,
    exhausted: bool,
}

#[derive(Debug, Default)]
struct CacheState {
    sets: FxHashMap<DescriptorCacheKey, Vec<DescriptorSetHandle>>,
    blocks: FxHashMap<String, Vec<PoolBlock>>,
}

/// Growable descriptor-set cache, guarded by one lock
#[derive(Debug)]
pub struct ComputeDescriptorCache {
    state: Mutex<CacheState>,
    base_capacity: u32,
    growth: u32,
}

impl ComputeDescriptorCache {
    pub fn new(base_capacity: u32, growth: u32) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            base_capacity,
            growth,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached sets for the key, allocating them on a miss
    ///
    /// # Arguments
    ///
    /// * `image_index` - Swapchain image the sets are recorded for
    /// * `schema_key` - Binding layout schema (selects the pool blocks)
    /// * `binding_key` - Identity of the bound resources
    /// * `layouts` - One layout per set to allocate
    /// * `pool_sizes` - Descriptors needed by one set of this schema
    pub fn try_get_or_create(
        &self,
        device: &dyn GpuDevice,
        image_index: u32,
        schema_key: &str,
        binding_key: &str,
        layouts: &[DescriptorSetLayoutHandle],
        pool_sizes: &[DescriptorPoolSize],
    ) -> Result<Vec<DescriptorSetHandle>> {
        let key = DescriptorCacheKey {
            image_index,
            schema_key: schema_key.to_string(),
            binding_key: binding_key.to_string(),
        };

        let mut guard = self.lock();
        let state = &mut *guard;
        if let Some(sets) = state.sets.get(&key) {
            return Ok(sets.clone());
        }

        let blocks = state.blocks.entry(schema_key.to_string()).or_default();

        for block in blocks.iter_mut().filter(|b| !b.exhausted) {
            match device.allocate_descriptor_sets(block.pool, layouts) {
                Ok(sets) => {
                    state.sets.insert(key, sets.clone());
                    return Ok(sets);
                }
                Err(DescriptorAllocError::OutOfPoolMemory)
                | Err(DescriptorAllocError::FragmentedPool) => {
                    block.exhausted = true;
                }
                Err(DescriptorAllocError::Other(message)) => {
                    return Err(Error::BackendError(format!(
                        "descriptor set allocation for schema '{}' failed: {}",
                        schema_key, message
                    )));
                }
            }
        }

        let capacity = self.next_capacity(blocks.len()).max(layouts.len() as u32);
        let scaled: Vec<DescriptorPoolSize> = pool_sizes
            .iter()
            .map(|size| DescriptorPoolSize {
                kind: size.kind,
                count: size.count.saturating_mul(capacity),
            })
            .collect();
        let pool = device.create_descriptor_pool(capacity, &scaled)?;
        blocks.push(PoolBlock { pool, capacity, exhausted: false });
        engine_debug!(
            "framegraph::ComputeDescriptorCache",
            "Schema '{}' grew to {} blocks (new block holds {} sets)",
            schema_key, blocks.len(), capacity
        );

        let result = device.allocate_descriptor_sets(pool, layouts);
        match result {
            Ok(sets) => {
                state.sets.insert(key, sets.clone());
                Ok(sets)
            }
            Err(error) => {
                if let Some(block) = blocks.last_mut() {
                    if matches!(error, DescriptorAllocError::OutOfPoolMemory | DescriptorAllocError::FragmentedPool) {
                        block.exhausted = true;
                    }
                }
                engine_warn!(
                    "framegraph::ComputeDescriptorCache",
                    "Allocation from a fresh block failed for schema '{}': {}",
                    schema_key, error
                );
                Err(Error::BackendError(format!(
                    "descriptor set allocation for schema '{}' failed: {}",
                    schema_key, error
                )))
            }
        }
    }

    fn next_capacity(&self, block_count: usize) -> u32 {
        if block_count == 0 {
            self.base_capacity
        } else {
            self.base_capacity
                .saturating_add(self.growth.saturating_mul(block_count as u32))
        }
    }

    /// Number of pool blocks created for a schema
    pub fn block_count(&self, schema_key: &str) -> usize {
        self.lock().blocks.get(schema_key).map_or(0, Vec::len)
    }

    /// Capacities of a schema's blocks, in creation order
    pub fn block_capacities(&self, schema_key: &str) -> Vec<u32> {
        self.lock()
            .blocks
            .get(schema_key)
            .map(|blocks| blocks.iter().map(|b| b.capacity).collect())
            .unwrap_or_default()
    }

    /// Forget the cached sets for a binding key across images and schemas.
    /// Returns the number of set arrays dropped.
    pub fn invalidate(&self, binding_key: &str) -> usize {
        let mut state = self.lock();
        let before = state.sets.len();
        state.sets.retain(|key, _| key.binding_key != binding_key);
        before - state.sets.len()
    }

    /// Forget every cached set. Pool blocks are kept.
    ///
    /// Dropped sets keep their pool space until `destroy`; sets still
    /// referenced by in-flight command buffers stay valid.
    pub fn clear_sets(&self) -> usize {
        let mut state = self.lock();
        let cleared = state.sets.len();
        state.sets.clear();
        if cleared > 0 {
            engine_debug!("framegraph::ComputeDescriptorCache", "Cleared {} cached set arrays", cleared);
        }
        cleared
    }

    /// Number of cached set arrays
    pub fn cached_count(&self) -> usize {
        self.lock().sets.len()
    }

    /// Destroy every pool block (device must be idle)
    pub fn destroy(&self, device: &dyn GpuDevice) {
        let mut state = self.lock();
        state.sets.clear();
        for (_, blocks) in state.blocks.drain() {
            for block in blocks {
                device.destroy_descriptor_pool(block.pool);
            }
        }
    }
}

#[cfg(test)]
#[path = "descriptor_cache_tests.rs"]
mod tests;
