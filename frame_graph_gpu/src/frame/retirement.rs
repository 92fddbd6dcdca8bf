/// FrameSlotRetirementTable - per-frame-slot deferred destruction
///
/// Handles that an in-flight command buffer may still reference are queued
/// against the frame slot that was recording when they were retired. A
/// slot's queue is destroyed only once that slot's fence has signaled, right
/// before the slot records again. One lock guards every slot so enqueue and
/// drain never interleave.

use std::sync::{Mutex, PoisonError};
use rustc_hash::FxHashSet;
use crate::error::Result;
use crate::{engine_trace, engine_warn};
use crate::device::{
    GpuDevice, FrameFence, FrameSlot, ImageAllocation, BufferAllocation,
    ImageHandle, BufferHandle, FramebufferHandle,
};

/// A deferred-destroy record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetirementEntry {
    Buffer(BufferAllocation),
    /// Image, memory, views and sampler, destroyed together
    Image(ImageAllocation),
    Framebuffer(FramebufferHandle),
}

#[derive(Debug, Default)]
struct SlotQueue {
    entries: Vec<RetirementEntry>,
    buffers: FxHashSet<BufferHandle>,
    images: FxHashSet<ImageHandle>,
    framebuffers: FxHashSet<FramebufferHandle>,
}

impl SlotQueue {
    fn take(&mut self) -> Vec<RetirementEntry> {
        self.buffers.clear();
        self.images.clear();
        self.framebuffers.clear();
        std::mem::take(&mut self.entries)
    }
}

/// Retirement lists indexed by frame slot
#[derive(Debug)]
pub struct FrameSlotRetirementTable {
    slots: Mutex<Vec<SlotQueue>>,
}

impl FrameSlotRetirementTable {
    /// Create a table with one queue per frame slot
    pub fn new(frames_in_flight: usize) -> Self {
        let slots = (0..frames_in_flight).map(|_| SlotQueue::default()).collect();
        Self { slots: Mutex::new(slots) }
    }

    /// Number of frame slots
    pub fn slot_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SlotQueue>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a buffer for destruction once `slot` completes
    ///
    /// Returns false when the handle is null, already queued in that slot or
    /// the slot does not exist.
    pub fn retire_buffer(&self, slot: FrameSlot, allocation: BufferAllocation) -> bool {
        if allocation.buffer.is_null() {
            return false;
        }
        let mut slots = self.lock();
        let Some(queue) = slots.get_mut(slot.index()) else {
            engine_warn!("framegraph::Retirement", "Buffer retired into unknown slot {}", slot.index());
            return false;
        };
        if !queue.buffers.insert(allocation.buffer) {
            return false;
        }
        queue.entries.push(RetirementEntry::Buffer(allocation));
        true
    }

    /// Queue an image (and everything created with it) for destruction
    pub fn retire_image(&self, slot: FrameSlot, allocation: ImageAllocation) -> bool {
        if allocation.image.is_null() {
            return false;
        }
        let mut slots = self.lock();
        let Some(queue) = slots.get_mut(slot.index()) else {
            engine_warn!("framegraph::Retirement", "Image retired into unknown slot {}", slot.index());
            return false;
        };
        if !queue.images.insert(allocation.image) {
            return false;
        }
        queue.entries.push(RetirementEntry::Image(allocation));
        true
    }

    /// Queue a framebuffer for destruction once `slot` completes
    pub fn retire_framebuffer(&self, slot: FrameSlot, framebuffer: FramebufferHandle) -> bool {
        if framebuffer.is_null() {
            return false;
        }
        let mut slots = self.lock();
        let Some(queue) = slots.get_mut(slot.index()) else {
            engine_warn!("framegraph::Retirement", "Framebuffer retired into unknown slot {}", slot.index());
            return false;
        };
        if !queue.framebuffers.insert(framebuffer) {
            return false;
        }
        queue.entries.push(RetirementEntry::Framebuffer(framebuffer));
        true
    }

    /// Number of entries waiting in a slot
    pub fn pending(&self, slot: FrameSlot) -> usize {
        self.lock().get(slot.index()).map_or(0, |q| q.entries.len())
    }

    /// Number of entries waiting across all slots
    pub fn total_pending(&self) -> usize {
        self.lock().iter().map(|q| q.entries.len()).sum()
    }

    /// Drain `slot` if its fence reports completion
    ///
    /// Returns `Ok(None)` (and destroys nothing) while the slot's previous
    /// work is still in flight, otherwise the number of destroyed entries.
    pub fn drain_completed(
        &self,
        slot: FrameSlot,
        fence: &dyn FrameFence,
        device: &dyn GpuDevice,
    ) -> Result<Option<usize>> {
        if !fence.is_complete(slot)? {
            return Ok(None);
        }
        Ok(Some(self.drain(slot, device)))
    }

    /// Destroy everything queued in `slot`
    ///
    /// The caller must already have observed the slot's fence.
    pub fn drain(&self, slot: FrameSlot, device: &dyn GpuDevice) -> usize {
        // Take the entries under the lock, destroy outside of it.
        let entries = match self.lock().get_mut(slot.index()) {
            Some(queue) => queue.take(),
            None => return 0,
        };
        let count = entries.len();
        destroy_entries(entries, device);
        if count > 0 {
            engine_trace!("framegraph::Retirement", "Slot {} drained {} handles", slot.index(), count);
        }
        count
    }

    /// Destroy every queued entry of every slot
    ///
    /// Skips completion checks: only valid after a device-wide idle wait.
    pub fn flush_all(&self, device: &dyn GpuDevice) -> usize {
        let entries: Vec<RetirementEntry> = self.lock()
            .iter_mut()
            .flat_map(|queue| queue.take())
            .collect();
        let count = entries.len();
        destroy_entries(entries, device);
        if count > 0 {
            engine_trace!("framegraph::Retirement", "Flushed {} handles from all slots", count);
        }
        count
    }
}

fn destroy_entries(entries: Vec<RetirementEntry>, device: &dyn GpuDevice) {
    for entry in entries {
        match entry {
            RetirementEntry::Buffer(allocation) => device.destroy_buffer(&allocation),
            RetirementEntry::Image(allocation) => device.destroy_image(&allocation),
            RetirementEntry::Framebuffer(framebuffer) => device.destroy_framebuffer(framebuffer),
        }
    }
}

#[cfg(test)]
#[path = "retirement_tests.rs"]
mod tests;
