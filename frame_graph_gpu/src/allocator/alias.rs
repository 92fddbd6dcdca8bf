/// Alias keys and alias groups
///
/// Requests with equal alias key, equal lifetime and a shared discriminator
/// land in the same group and may share one physical allocation. Requests
/// that cannot alias use their own name as discriminator and get a solo group.

use crate::device::TextureFormat;
use crate::resource::{
    ResourceLifetime, ResourceRequest, SizePolicy, BufferTarget, BufferUsageHint,
};

/// Discriminator shared by every aliasable transient request
pub const SHARED_DISCRIMINATOR: &str = "<shared>";

/// Shape of a request: only requests with equal shapes may share memory
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AliasKey {
    Texture {
        size_policy: SizePolicy,
        format: TextureFormat,
        array_layers: u32,
        stereo: bool,
    },
    Buffer {
        size_in_bytes: u64,
        target: BufferTarget,
        usage_hint: BufferUsageHint,
    },
}

impl AliasKey {
    pub fn from_request(request: &ResourceRequest) -> Self {
        match request {
            ResourceRequest::Texture(t) => AliasKey::Texture {
                size_policy: t.size_policy,
                format: TextureFormat::from_label(&t.format),
                array_layers: t.array_layers.max(1),
                stereo: t.stereo_compatible,
            },
            ResourceRequest::Buffer(b) => AliasKey::Buffer {
                size_in_bytes: b.size_in_bytes,
                target: b.target,
                usage_hint: b.usage_hint,
            },
        }
    }
}

/// Full grouping key of a request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AliasGroupKey {
    pub alias_key: AliasKey,
    pub lifetime: ResourceLifetime,
    /// `SHARED_DISCRIMINATOR` or the request's lowercase name
    pub discriminator: String,
}

/// A descriptor together with its derived alias key
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationRequest {
    pub request: ResourceRequest,
    pub alias_key: AliasKey,
}

impl AllocationRequest {
    pub fn new(request: ResourceRequest) -> Self {
        let alias_key = AliasKey::from_request(&request);
        Self { request, alias_key }
    }

    pub fn name(&self) -> &str {
        self.request.name()
    }

    /// Aliasing-eligible and transient
    pub fn can_alias(&self) -> bool {
        self.request.allow_aliasing() && self.request.lifetime() == ResourceLifetime::Transient
    }

    pub fn group_key(&self) -> AliasGroupKey {
        let discriminator = if self.can_alias() {
            SHARED_DISCRIMINATOR.to_string()
        } else {
            self.name().to_lowercase()
        };
        AliasGroupKey {
            alias_key: self.alias_key.clone(),
            lifetime: self.request.lifetime(),
            discriminator,
        }
    }
}

/// Requests sharing one group key
#[derive(Debug, Clone, PartialEq)]
pub struct AliasGroup {
    pub key: AliasGroupKey,
    pub members: Vec<AllocationRequest>,
    allows_aliasing: bool,
}

impl AliasGroup {
    pub fn new(key: AliasGroupKey) -> Self {
        Self { key, members: Vec::new(), allows_aliasing: true }
    }

    /// Add a member; the group stays aliasable only if every member can alias
    pub fn add(&mut self, request: AllocationRequest) {
        self.allows_aliasing &= request.can_alias();
        self.members.push(request);
    }

    pub fn allows_aliasing(&self) -> bool {
        self.allows_aliasing && !self.members.is_empty()
    }

    /// Name of the first member, used as debug label of the physical group
    pub fn label(&self) -> &str {
        self.members.first().map_or("", |m| m.name())
    }

    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.name())
    }

    pub fn is_texture(&self) -> bool {
        matches!(self.key.alias_key, AliasKey::Texture { .. })
    }
}

#[cfg(test)]
#[path = "alias_tests.rs"]
mod tests;
