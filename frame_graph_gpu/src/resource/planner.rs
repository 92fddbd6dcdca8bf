/// ResourcePlanner - snapshots a registry into a lifetime-bucketed plan
///
/// `sync` is a full replace: local descriptor maps and the plan are cleared
/// and rebuilt from the registry every call, never merged.

use rustc_hash::FxHashMap;
use crate::engine_debug;
use crate::resource::{
    ResourceDescriptorSource, TextureDescriptor, BufferDescriptor, FramebufferDescriptor,
    ResourceLifetime, ResourceRequest,
};

/// Texture/buffer requests bucketed by lifetime, plus framebuffers verbatim
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourcePlan {
    pub persistent: Vec<ResourceRequest>,
    pub transient: Vec<ResourceRequest>,
    pub external: Vec<ResourceRequest>,
    pub framebuffers: Vec<FramebufferDescriptor>,
}

impl ResourcePlan {
    /// Bucket for a lifetime class
    pub fn bucket(&self, lifetime: ResourceLifetime) -> &[ResourceRequest] {
        match lifetime {
            ResourceLifetime::Persistent => &self.persistent,
            ResourceLifetime::Transient => &self.transient,
            ResourceLifetime::External => &self.external,
        }
    }

    /// Every request: persistent, then transient, then external
    pub fn requests(&self) -> impl Iterator<Item = &ResourceRequest> {
        self.persistent.iter().chain(self.transient.iter()).chain(self.external.iter())
    }

    /// Number of texture/buffer requests
    pub fn len(&self) -> usize {
        self.persistent.len() + self.transient.len() + self.external.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0 && self.framebuffers.is_empty()
    }

    fn push(&mut self, request: ResourceRequest) {
        match request.lifetime() {
            ResourceLifetime::Persistent => self.persistent.push(request),
            ResourceLifetime::Transient => self.transient.push(request),
            ResourceLifetime::External => self.external.push(request),
        }
    }
}

/// Local snapshot of the registry and the plan built from it
#[derive(Debug, Default)]
pub struct ResourcePlanner {
    textures: FxHashMap<String, TextureDescriptor>,
    buffers: FxHashMap<String, BufferDescriptor>,
    framebuffers: FxHashMap<String, FramebufferDescriptor>,
    plan: ResourcePlan,
}

impl ResourcePlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild descriptor maps and plan from the registry
    ///
    /// With no registry the plan is reset to empty.
    pub fn sync(&mut self, registry: Option<&dyn ResourceDescriptorSource>) {
        self.textures.clear();
        self.buffers.clear();
        self.framebuffers.clear();
        self.plan = ResourcePlan::default();

        let Some(registry) = registry else {
            engine_debug!("framegraph::ResourcePlanner", "No registry, plan reset to empty");
            return;
        };

        for texture in registry.textures() {
            self.textures.insert(texture.name.to_lowercase(), texture.clone());
            self.plan.push(ResourceRequest::Texture(texture.clone()));
        }
        for buffer in registry.buffers() {
            self.buffers.insert(buffer.name.to_lowercase(), buffer.clone());
            self.plan.push(ResourceRequest::Buffer(buffer.clone()));
        }
        for framebuffer in registry.framebuffers() {
            self.framebuffers.insert(framebuffer.name.to_lowercase(), framebuffer.clone());
            self.plan.framebuffers.push(framebuffer.clone());
        }

        engine_debug!(
            "framegraph::ResourcePlanner",
            "Plan synced: {} persistent, {} transient, {} external, {} framebuffers",
            self.plan.persistent.len(),
            self.plan.transient.len(),
            self.plan.external.len(),
            self.plan.framebuffers.len()
        );
    }

    pub fn plan(&self) -> &ResourcePlan {
        &self.plan
    }

    pub fn texture(&self, name: &str) -> Option<&TextureDescriptor> {
        self.textures.get(&name.to_lowercase())
    }

    pub fn buffer(&self, name: &str) -> Option<&BufferDescriptor> {
        self.buffers.get(&name.to_lowercase())
    }

    pub fn framebuffer(&self, name: &str) -> Option<&FramebufferDescriptor> {
        self.framebuffers.get(&name.to_lowercase())
    }
}

#[cfg(test)]
#[path = "planner_tests.rs"]
mod tests;
