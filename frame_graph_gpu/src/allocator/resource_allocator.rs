/// ResourceAllocator - logical to physical resource translation
///
/// `update_plan` rebuilds the alias groups from a plan, from scratch.
/// `rebuild_physical_plan` turns every alias group into a physical group
/// with resolved extent, format and inferred usage. It runs when the frame
/// graph topology or the resolution changes. GPU memory is only created
/// lazily through `ensure_allocated`.

use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;
use crate::error::{Error, Result};
use crate::{engine_debug, engine_info, engine_warn};
use crate::device::{
    GpuDevice, ImageDesc, BufferDesc, ImageLayout, FrameSlot,
};
use crate::frame::FrameSlotRetirementTable;
use crate::resource::{ResourcePlan, ResourcePlanner, Resolution};
use super::alias::{AliasGroup, AliasGroupKey, AliasKey, AllocationRequest};
use super::physical::{PhysicalGroup, PhysicalGroupKey, PhysicalResourceDesc, PhysicalAllocation};
use super::usage::{PassMetadata, UsageProfiles, infer_image_usage, infer_buffer_usage};

/// Allocation statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocatorStats {
    /// Unique logical resources in the current plan
    pub logical_resources: usize,
    /// Alias groups built by the last `update_plan`
    pub alias_groups: usize,
    /// Alias groups shared by more than one aliasable resource
    pub aliased_groups: usize,
    /// Physical groups built by the last rebuild
    pub physical_groups: usize,
    /// Physical groups currently holding GPU memory
    pub allocated_groups: usize,
    /// Resources no pass or framebuffer referenced at the last rebuild
    pub unreferenced_resources: usize,
}

/// Alias groups and physical groups of the current plan
#[derive(Debug, Default)]
pub struct ResourceAllocator {
    requests: Vec<AllocationRequest>,
    alias_groups: Vec<AliasGroup>,
    physical_groups: SlotMap<PhysicalGroupKey, PhysicalGroup>,
    /// Lowercase logical name -> physical group
    resource_to_physical: FxHashMap<String, PhysicalGroupKey>,
    unreferenced: Vec<String>,
}

impl ResourceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild alias groups from a plan
    ///
    /// Every unique name yields exactly one request. Later duplicates of a
    /// name (case-insensitive) are dropped with a warning.
    pub fn update_plan(&mut self, plan: &ResourcePlan) {
        self.requests.clear();
        self.alias_groups.clear();

        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut group_index: FxHashMap<AliasGroupKey, usize> = FxHashMap::default();

        for request in plan.requests() {
            if !seen.insert(request.name().to_lowercase()) {
                engine_warn!(
                    "framegraph::ResourceAllocator",
                    "Duplicate resource name '{}' ignored",
                    request.name()
                );
                continue;
            }
            let allocation_request = AllocationRequest::new(request.clone());
            let key = allocation_request.group_key();
            let index = *group_index.entry(key.clone()).or_insert_with(|| {
                self.alias_groups.push(AliasGroup::new(key));
                self.alias_groups.len() - 1
            });
            self.alias_groups[index].add(allocation_request.clone());
            self.requests.push(allocation_request);
        }

        engine_debug!(
            "framegraph::ResourceAllocator",
            "Plan updated: {} resources in {} alias groups",
            self.requests.len(),
            self.alias_groups.len()
        );
    }

    /// Rebuild physical groups from the alias groups
    ///
    /// Existing allocations are retired into `slot`, never destroyed here.
    /// Extents come from `resolution`, usage from `passes` and the
    /// planner's framebuffers.
    pub fn rebuild_physical_plan(
        &mut self,
        retirement: &FrameSlotRetirementTable,
        slot: FrameSlot,
        resolution: &Resolution,
        passes: &[PassMetadata],
        planner: &ResourcePlanner,
    ) {
        let retired = self.retire_all(retirement, slot);
        self.physical_groups.clear();
        self.resource_to_physical.clear();
        self.unreferenced.clear();

        let profiles = UsageProfiles::build(passes, planner);

        for group in &self.alias_groups {
            let (desc, unreferenced) = match &group.key.alias_key {
                AliasKey::Texture { size_policy, format, array_layers, .. } => {
                    let inferred = infer_image_usage(group, *format, &profiles);
                    let desc = PhysicalResourceDesc::Image(ImageDesc {
                        name: group.label().to_string(),
                        extent: size_policy.resolve(resolution),
                        format: *format,
                        array_layers: *array_layers,
                        usage: inferred.usage,
                    });
                    (desc, inferred.unreferenced)
                }
                AliasKey::Buffer { size_in_bytes, usage_hint, .. } => {
                    let inferred = infer_buffer_usage(group, &profiles);
                    let desc = PhysicalResourceDesc::Buffer(BufferDesc {
                        name: group.label().to_string(),
                        size: (*size_in_bytes).max(1),
                        usage: inferred.usage,
                        memory_properties: usage_hint.memory_properties(),
                    });
                    (desc, inferred.unreferenced)
                }
            };

            for name in &unreferenced {
                engine_warn!(
                    "framegraph::ResourceAllocator",
                    "Resource '{}' is not referenced by any pass or framebuffer, using conservative usage",
                    name
                );
            }
            self.unreferenced.extend(unreferenced);

            let members: Vec<String> = group.member_names().map(str::to_lowercase).collect();
            let key = self.physical_groups.insert(PhysicalGroup::new(
                desc,
                members.clone(),
                group.allows_aliasing() && group.members.len() > 1,
            ));
            for name in members {
                self.resource_to_physical.insert(name, key);
            }
        }

        engine_info!(
            "framegraph::ResourceAllocator",
            "Physical plan rebuilt: {} physical groups for {} resources ({} allocations retired)",
            self.physical_groups.len(),
            self.requests.len(),
            retired
        );
    }

    /// Materialize the physical group backing `name`
    pub fn ensure_allocated(&mut self, name: &str, device: &dyn GpuDevice) -> Result<&PhysicalAllocation> {
        let key = self.physical_group_key(name).ok_or_else(|| {
            Error::InvalidResource(format!("no physical group for resource '{}'", name))
        })?;
        let group = self.physical_groups.get_mut(key).ok_or_else(|| {
            Error::InvalidResource(format!("stale physical group for resource '{}'", name))
        })?;
        group.ensure_allocated(device)
    }

    /// Retire every allocated physical group into `slot`. Groups stay valid.
    pub fn retire_all(&mut self, retirement: &FrameSlotRetirementTable, slot: FrameSlot) -> usize {
        let mut retired = 0;
        for group in self.physical_groups.values_mut() {
            if group.retire(retirement, slot) {
                retired += 1;
            }
        }
        retired
    }

    /// Destroy every allocation now (device must be idle)
    pub fn destroy_all(&mut self, device: &dyn GpuDevice) {
        for group in self.physical_groups.values_mut() {
            group.destroy(device);
        }
    }

    pub fn requests(&self) -> &[AllocationRequest] {
        &self.requests
    }

    pub fn alias_groups(&self) -> &[AliasGroup] {
        &self.alias_groups
    }

    /// Alias group containing `name`
    pub fn alias_group_of(&self, name: &str) -> Option<&AliasGroup> {
        self.alias_groups
            .iter()
            .find(|group| group.member_names().any(|m| m.eq_ignore_ascii_case(name)))
    }

    pub fn physical_group_key(&self, name: &str) -> Option<PhysicalGroupKey> {
        self.resource_to_physical.get(&name.to_lowercase()).copied()
    }

    pub fn physical_group(&self, name: &str) -> Option<&PhysicalGroup> {
        self.physical_group_key(name).and_then(|key| self.physical_groups.get(key))
    }

    pub fn physical_groups(&self) -> impl Iterator<Item = (PhysicalGroupKey, &PhysicalGroup)> {
        self.physical_groups.iter()
    }

    /// Record the layout the resource's image was transitioned to
    pub fn set_last_known_layout(&mut self, name: &str, layout: ImageLayout) -> bool {
        match self.physical_group_key(name).and_then(|key| self.physical_groups.get_mut(key)) {
            Some(group) => {
                group.set_last_known_layout(layout);
                true
            }
            None => false,
        }
    }

    pub fn last_known_layout(&self, name: &str) -> Option<ImageLayout> {
        self.physical_group(name).map(PhysicalGroup::last_known_layout)
    }

    /// Names flagged as unreferenced at the last rebuild
    pub fn unreferenced_resources(&self) -> &[String] {
        &self.unreferenced
    }

    pub fn stats(&self) -> AllocatorStats {
        AllocatorStats {
            logical_resources: self.requests.len(),
            alias_groups: self.alias_groups.len(),
            aliased_groups: self
                .alias_groups
                .iter()
                .filter(|group| group.allows_aliasing() && group.members.len() > 1)
                .count(),
            physical_groups: self.physical_groups.len(),
            allocated_groups: self.physical_groups.values().filter(|g| g.is_allocated()).count(),
            unreferenced_resources: self.unreferenced.len(),
        }
    }
}

#[cfg(test)]
#[path = "resource_allocator_tests.rs"]
mod tests;
