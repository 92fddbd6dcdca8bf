/// Tests for ComputeDescriptorCache

use super::*;
use crate::device::mock_device::MockDevice;
use crate::device::DescriptorKind;

const LAYOUT: DescriptorSetLayoutHandle = DescriptorSetLayoutHandle::from_raw(900);

fn sizes() -> Vec<DescriptorPoolSize> {
    vec![DescriptorPoolSize { kind: DescriptorKind::StorageImage, count: 2 }]
}

fn get(cache: &ComputeDescriptorCache, device: &MockDevice, image: u32, binding: &str) -> Result<Vec<DescriptorSetHandle>> {
    cache.try_get_or_create(device, image, "blur", binding, &[LAYOUT], &sizes())
}

#[test]
fn test_cache_hit_returns_same_sets() {
    let device = MockDevice::new();
    let cache = ComputeDescriptorCache::new(4, 16);

    let first = get(&cache, &device, 0, "a").unwrap();
    let second = get(&cache, &device, 0, "a").unwrap();
    assert_eq!(first, second);
    assert_eq!(cache.cached_count(), 1);
    assert_eq!(cache.block_count("blur"), 1);
}

#[test]
fn test_sets_are_scoped_per_image_index() {
    let device = MockDevice::new();
    let cache = ComputeDescriptorCache::new(4, 16);

    let image0 = get(&cache, &device, 0, "a").unwrap();
    let image1 = get(&cache, &device, 1, "a").unwrap();
    assert_ne!(image0, image1);
    assert_eq!(cache.cached_count(), 2);
}

#[test]
fn test_exhausted_block_grows_geometrically() {
    let device = MockDevice::new();
    let cache = ComputeDescriptorCache::new(2, 16);

    get(&cache, &device, 0, "a").unwrap();
    get(&cache, &device, 0, "b").unwrap();
    assert_eq!(cache.block_capacities("blur"), vec![2]);

    get(&cache, &device, 0, "c").unwrap();
    assert_eq!(cache.block_capacities("blur"), vec![2, 18]);

    // The second block serves further requests
    get(&cache, &device, 0, "d").unwrap();
    assert_eq!(cache.block_count("blur"), 2);
    assert_eq!(device.state.lock().unwrap().created_pool_capacities, vec![2, 18]);
}

#[test]
fn test_fragmented_block_is_never_retried() {
    let device = MockDevice::new();
    let cache = ComputeDescriptorCache::new(4, 16);

    get(&cache, &device, 0, "a").unwrap();
    device.inject_descriptor_failure(DescriptorAllocError::FragmentedPool);
    get(&cache, &device, 0, "b").unwrap();
    assert_eq!(cache.block_count("blur"), 2);

    get(&cache, &device, 0, "c").unwrap();
    assert_eq!(cache.block_count("blur"), 2);

    // The first block still only holds the first set
    let state = device.state.lock().unwrap();
    let first_block = state.pools.values().find(|p| p.max_sets == 4).unwrap();
    assert_eq!(first_block.allocated, 1);
}

#[test]
fn test_schemas_own_separate_blocks() {
    let device = MockDevice::new();
    let cache = ComputeDescriptorCache::new(4, 16);

    get(&cache, &device, 0, "a").unwrap();
    cache.try_get_or_create(&device, 0, "tonemap", "a", &[LAYOUT], &sizes()).unwrap();
    assert_eq!(cache.block_count("blur"), 1);
    assert_eq!(cache.block_count("tonemap"), 1);
    assert_eq!(cache.block_count("unknown"), 0);
}

#[test]
fn test_other_failure_propagates_without_growth() {
    let device = MockDevice::new();
    let cache = ComputeDescriptorCache::new(4, 16);

    get(&cache, &device, 0, "a").unwrap();
    device.inject_descriptor_failure(DescriptorAllocError::Other("device lost".to_string()));

    let result = get(&cache, &device, 0, "b");
    assert!(matches!(result, Err(Error::BackendError(_))));
    assert_eq!(cache.block_count("blur"), 1);
    assert_eq!(cache.cached_count(), 1);
}

#[test]
fn test_fresh_block_failure_is_not_retried_again() {
    let device = MockDevice::new();
    let cache = ComputeDescriptorCache::new(4, 16);

    get(&cache, &device, 0, "a").unwrap();
    device.inject_descriptor_failure(DescriptorAllocError::OutOfPoolMemory);
    device.inject_descriptor_failure(DescriptorAllocError::OutOfPoolMemory);

    assert!(get(&cache, &device, 0, "b").is_err());
    assert_eq!(cache.block_count("blur"), 2);
}

#[test]
fn test_pool_creation_failure_propagates() {
    let device = MockDevice::new();
    device.set_fail_pool_creation(true);
    let cache = ComputeDescriptorCache::new(4, 16);

    assert!(get(&cache, &device, 0, "a").is_err());
    assert_eq!(cache.cached_count(), 0);
}

#[test]
fn test_destroy_releases_every_block() {
    let device = MockDevice::new();
    let cache = ComputeDescriptorCache::new(1, 16);

    get(&cache, &device, 0, "a").unwrap();
    get(&cache, &device, 0, "b").unwrap();
    assert_eq!(cache.block_count("blur"), 2);

    cache.destroy(&device);
    assert_eq!(device.state.lock().unwrap().destroyed_pools.len(), 2);
    assert_eq!(cache.block_count("blur"), 0);
    assert_eq!(cache.cached_count(), 0);
}

#[test]
fn test_invalidate_drops_only_matching_binding_key() {
    let device = MockDevice::new();
    let cache = ComputeDescriptorCache::new(8, 16);

    let old = get(&cache, &device, 0, "bloom_tmp").unwrap();
    get(&cache, &device, 1, "bloom_tmp").unwrap();
    let other = get(&cache, &device, 0, "hdr").unwrap();

    assert_eq!(cache.invalidate("bloom_tmp"), 2);
    assert_eq!(cache.cached_count(), 1);
    assert_eq!(get(&cache, &device, 0, "hdr").unwrap(), other);

    let fresh = get(&cache, &device, 0, "bloom_tmp").unwrap();
    assert_ne!(fresh, old);
    assert_eq!(cache.block_count("blur"), 1);
}

#[test]
fn test_clear_sets_keeps_blocks() {
    let device = MockDevice::new();
    let cache = ComputeDescriptorCache::new(8, 16);

    get(&cache, &device, 0, "a").unwrap();
    get(&cache, &device, 0, "b").unwrap();
    assert_eq!(cache.clear_sets(), 2);
    assert_eq!(cache.cached_count(), 0);
    assert_eq!(cache.block_count("blur"), 1);
    assert!(device.state.lock().unwrap().destroyed_pools.is_empty());
}
