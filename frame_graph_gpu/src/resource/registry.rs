/// Resource descriptor registry
///
/// The planner pulls descriptors from any `ResourceDescriptorSource`.
/// `ResourceDescriptorRegistry` is the stock implementation: names are
/// case-insensitive and enumeration follows insertion order.

use rustc_hash::FxHashMap;
use crate::resource::{TextureDescriptor, BufferDescriptor, FramebufferDescriptor};

/// Enumerable source of named logical resource descriptors
pub trait ResourceDescriptorSource {
    /// Every texture descriptor, in a stable order
    fn textures(&self) -> Vec<&TextureDescriptor>;

    /// Every buffer descriptor, in a stable order
    fn buffers(&self) -> Vec<&BufferDescriptor>;

    /// Every framebuffer descriptor, in a stable order
    fn framebuffers(&self) -> Vec<&FramebufferDescriptor>;
}

/// Insertion-ordered map keyed by lowercase name
#[derive(Debug, Clone)]
struct OrderedMap<T> {
    entries: Vec<T>,
    index: FxHashMap<String, usize>,
}

impl<T> OrderedMap<T> {
    fn new() -> Self {
        Self { entries: Vec::new(), index: FxHashMap::default() }
    }

    fn insert(&mut self, name: &str, value: T) -> Option<T> {
        let key = name.to_lowercase();
        match self.index.get(&key) {
            Some(&i) => Some(std::mem::replace(&mut self.entries[i], value)),
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(value);
                None
            }
        }
    }

    fn get(&self, name: &str) -> Option<&T> {
        self.index.get(&name.to_lowercase()).map(|&i| &self.entries[i])
    }

    fn remove(&mut self, name: &str, name_of: impl Fn(&T) -> &str) -> Option<T> {
        let i = self.index.remove(&name.to_lowercase())?;
        let removed = self.entries.remove(i);
        self.index.clear();
        for (pos, entry) in self.entries.iter().enumerate() {
            self.index.insert(name_of(entry).to_lowercase(), pos);
        }
        Some(removed)
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

/// Concrete registry of texture, buffer and framebuffer descriptors
#[derive(Debug, Clone)]
pub struct ResourceDescriptorRegistry {
    textures: OrderedMap<TextureDescriptor>,
    buffers: OrderedMap<BufferDescriptor>,
    framebuffers: OrderedMap<FramebufferDescriptor>,
}

impl Default for ResourceDescriptorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceDescriptorRegistry {
    pub fn new() -> Self {
        Self {
            textures: OrderedMap::new(),
            buffers: OrderedMap::new(),
            framebuffers: OrderedMap::new(),
        }
    }

    /// Register a texture. Replaces (in place) one with the same name.
    pub fn register_texture(&mut self, desc: TextureDescriptor) -> Option<TextureDescriptor> {
        let name = desc.name.clone();
        self.textures.insert(&name, desc)
    }

    /// Register a buffer. Replaces (in place) one with the same name.
    pub fn register_buffer(&mut self, desc: BufferDescriptor) -> Option<BufferDescriptor> {
        let name = desc.name.clone();
        self.buffers.insert(&name, desc)
    }

    /// Register a framebuffer. Replaces (in place) one with the same name.
    pub fn register_framebuffer(&mut self, desc: FramebufferDescriptor) -> Option<FramebufferDescriptor> {
        let name = desc.name.clone();
        self.framebuffers.insert(&name, desc)
    }

    pub fn texture(&self, name: &str) -> Option<&TextureDescriptor> {
        self.textures.get(name)
    }

    pub fn buffer(&self, name: &str) -> Option<&BufferDescriptor> {
        self.buffers.get(name)
    }

    pub fn framebuffer(&self, name: &str) -> Option<&FramebufferDescriptor> {
        self.framebuffers.get(name)
    }

    pub fn remove_texture(&mut self, name: &str) -> Option<TextureDescriptor> {
        self.textures.remove(name, |t| &t.name)
    }

    pub fn remove_buffer(&mut self, name: &str) -> Option<BufferDescriptor> {
        self.buffers.remove(name, |b| &b.name)
    }

    pub fn remove_framebuffer(&mut self, name: &str) -> Option<FramebufferDescriptor> {
        self.framebuffers.remove(name, |f| &f.name)
    }

    pub fn clear(&mut self) {
        self.textures.clear();
        self.buffers.clear();
        self.framebuffers.clear();
    }
}

impl ResourceDescriptorSource for ResourceDescriptorRegistry {
    fn textures(&self) -> Vec<&TextureDescriptor> {
        self.textures.entries.iter().collect()
    }

    fn buffers(&self) -> Vec<&BufferDescriptor> {
        self.buffers.entries.iter().collect()
    }

    fn framebuffers(&self) -> Vec<&FramebufferDescriptor> {
        self.framebuffers.entries.iter().collect()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
