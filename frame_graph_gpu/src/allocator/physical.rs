/// Physical groups - the GPU allocations backing alias groups
///
/// A physical group is created empty when its alias group is discovered.
/// GPU memory is only created by `ensure_allocated`, on first use.

use slotmap::new_key_type;
use crate::error::{Error, Result};
use crate::device::{
    GpuDevice, ImageDesc, BufferDesc, ImageAllocation, BufferAllocation,
    ImageLayout, FrameSlot,
};
use crate::frame::FrameSlotRetirementTable;

new_key_type! {
    /// Stable key of a physical group inside a ResourceAllocator
    pub struct PhysicalGroupKey;
}

/// What to create for a physical group
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicalResourceDesc {
    Image(ImageDesc),
    Buffer(BufferDesc),
}

/// Live GPU objects of a physical group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhysicalAllocation {
    Image(ImageAllocation),
    Buffer(BufferAllocation),
}

/// Realized allocation of one alias group
#[derive(Debug)]
pub struct PhysicalGroup {
    desc: PhysicalResourceDesc,
    /// Lowercase names of the logical resources sharing this allocation
    members: Vec<String>,
    aliased: bool,
    allocation: Option<PhysicalAllocation>,
    last_known_layout: ImageLayout,
}

impl PhysicalGroup {
    pub fn new(desc: PhysicalResourceDesc, members: Vec<String>, aliased: bool) -> Self {
        Self {
            desc,
            members,
            aliased,
            allocation: None,
            last_known_layout: ImageLayout::Undefined,
        }
    }

    pub fn desc(&self) -> &PhysicalResourceDesc {
        &self.desc
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Shared by several logical resources
    pub fn is_aliased(&self) -> bool {
        self.aliased
    }

    pub fn is_allocated(&self) -> bool {
        self.allocation.is_some()
    }

    pub fn allocation(&self) -> Option<&PhysicalAllocation> {
        self.allocation.as_ref()
    }

    pub fn image(&self) -> Option<&ImageAllocation> {
        match &self.allocation {
            Some(PhysicalAllocation::Image(image)) => Some(image),
            _ => None,
        }
    }

    pub fn buffer(&self) -> Option<&BufferAllocation> {
        match &self.allocation {
            Some(PhysicalAllocation::Buffer(buffer)) => Some(buffer),
            _ => None,
        }
    }

    /// Create the GPU objects if they do not exist yet
    ///
    /// Creation failure is returned to the caller; the group stays empty.
    pub fn ensure_allocated(&mut self, device: &dyn GpuDevice) -> Result<&PhysicalAllocation> {
        if self.allocation.is_none() {
            let allocation = match &self.desc {
                PhysicalResourceDesc::Image(desc) => PhysicalAllocation::Image(device.create_image(desc)?),
                PhysicalResourceDesc::Buffer(desc) => PhysicalAllocation::Buffer(device.create_buffer(desc)?),
            };
            self.allocation = Some(allocation);
            self.last_known_layout = ImageLayout::Undefined;
        }
        self.allocation
            .as_ref()
            .ok_or_else(|| Error::InvalidResource("physical group has no allocation".to_string()))
    }

    /// Destroy the GPU objects now (device must not be using them)
    pub fn destroy(&mut self, device: &dyn GpuDevice) {
        match self.allocation.take() {
            Some(PhysicalAllocation::Image(image)) => device.destroy_image(&image),
            Some(PhysicalAllocation::Buffer(buffer)) => device.destroy_buffer(&buffer),
            None => {}
        }
        self.last_known_layout = ImageLayout::Undefined;
    }

    /// Hand the GPU objects to the retirement table for `slot`
    ///
    /// Returns true if there was something to retire.
    pub fn retire(&mut self, retirement: &FrameSlotRetirementTable, slot: FrameSlot) -> bool {
        self.last_known_layout = ImageLayout::Undefined;
        match self.allocation.take() {
            Some(PhysicalAllocation::Image(image)) => retirement.retire_image(slot, image),
            Some(PhysicalAllocation::Buffer(buffer)) => retirement.retire_buffer(slot, buffer),
            None => false,
        }
    }

    /// Layout the image was left in by the last recorded barrier
    pub fn last_known_layout(&self) -> ImageLayout {
        self.last_known_layout
    }

    pub fn set_last_known_layout(&mut self, layout: ImageLayout) {
        self.last_known_layout = layout;
    }
}

#[cfg(test)]
#[path = "physical_tests.rs"]
mod tests;
