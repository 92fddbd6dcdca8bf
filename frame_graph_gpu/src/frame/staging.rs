/// StagingManager - pool of reusable host-visible upload buffers
///
/// Plain host-visible + coherent transfer-source buffers are pooled and lent
/// out by best fit. A buffer read by a recorded copy goes back through
/// `release_after` and stays lent until `reclaim` is called for that frame
/// slot, after its fence. `trim` runs once per frame: idle entries age and are
/// destroyed after a configured number of consecutive idle trims, or earlier
/// when the pool grows past its cap.

use std::sync::{Mutex, MutexGuard, PoisonError};
use crate::error::{Error, Result};
use crate::{engine_debug, engine_trace};
use crate::device::{
    GpuDevice, BufferDesc, BufferAllocation, BufferUsage, MemoryProperties,
    BufferHandle, MemoryHandle, FrameSlot,
};

/// A buffer lent by the staging manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagingBuffer {
    pub buffer: BufferHandle,
    pub memory: MemoryHandle,
    /// Allocated size (>= requested size)
    pub size: u64,
    /// Owned by the pool; give it back with `release_after` (or `try_release`
    /// if the GPU never saw it). Unpooled buffers belong to the caller.
    pub pooled: bool,
}

impl StagingBuffer {
    /// The underlying allocation (for retiring unpooled buffers)
    pub fn allocation(&self) -> BufferAllocation {
        BufferAllocation { buffer: self.buffer, memory: self.memory, size: self.size }
    }
}

#[derive(Debug)]
struct StagingEntry {
    allocation: BufferAllocation,
    usage: BufferUsage,
    properties: MemoryProperties,
    in_use: bool,
    idle_frames: u32,
    /// Slot whose fence must pass before the entry is idle again
    pending_slot: Option<FrameSlot>,
}

/// Pool of staging buffers, guarded by one lock
#[derive(Debug)]
pub struct StagingManager {
    entries: Mutex<Vec<StagingEntry>>,
    idle_frames_before_eviction: u32,
    max_pooled_buffers: usize,
}

impl StagingManager {
    pub fn new(idle_frames_before_eviction: u32, max_pooled_buffers: usize) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            idle_frames_before_eviction,
            max_pooled_buffers,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<StagingEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Only plain upload buffers are pooled
    pub fn can_pool(usage: BufferUsage, properties: MemoryProperties) -> bool {
        usage == BufferUsage::TRANSFER_SRC
            && properties == (MemoryProperties::HOST_VISIBLE | MemoryProperties::HOST_COHERENT)
    }

    /// Get a buffer of at least `size` bytes, optionally filled with `data`
    pub fn acquire(
        &self,
        device: &dyn GpuDevice,
        size: u64,
        usage: BufferUsage,
        properties: MemoryProperties,
        data: Option<&[u8]>,
    ) -> Result<StagingBuffer> {
        if size == 0 {
            return Err(Error::InvalidResource("staging buffer of size 0".to_string()));
        }
        if let Some(bytes) = data {
            if bytes.len() as u64 > size {
                return Err(Error::InvalidResource(format!(
                    "staging upload of {} bytes does not fit in {} bytes",
                    bytes.len(), size
                )));
            }
        }

        let staging = if Self::can_pool(usage, properties) {
            self.acquire_pooled(device, size, usage, properties)?
        } else {
            let allocation = device.create_buffer(&BufferDesc {
                name: "staging".to_string(),
                size,
                usage,
                memory_properties: properties,
            })?;
            StagingBuffer {
                buffer: allocation.buffer,
                memory: allocation.memory,
                size: allocation.size,
                pooled: false,
            }
        };

        if let Some(bytes) = data {
            if let Err(error) = device.write_memory(staging.memory, 0, bytes) {
                if staging.pooled {
                    self.try_release(staging.buffer);
                } else {
                    device.destroy_buffer(&staging.allocation());
                }
                return Err(error);
            }
        }
        Ok(staging)
    }

    fn acquire_pooled(
        &self,
        device: &dyn GpuDevice,
        size: u64,
        usage: BufferUsage,
        properties: MemoryProperties,
    ) -> Result<StagingBuffer> {
        let mut entries = self.lock();

        let mut best: Option<(usize, u64)> = None;
        for (i, entry) in entries.iter().enumerate() {
            if entry.in_use
                || entry.usage != usage
                || entry.properties != properties
                || entry.allocation.size < size
            {
                continue;
            }
            let waste = entry.allocation.size - size;
            if waste == 0 {
                best = Some((i, 0));
                break;
            }
            if best.map_or(true, |(_, best_waste)| waste < best_waste) {
                best = Some((i, waste));
            }
        }

        if let Some((i, _)) = best {
            let entry = &mut entries[i];
            entry.in_use = true;
            entry.idle_frames = 0;
            entry.pending_slot = None;
            engine_trace!("framegraph::StagingManager", "Reused {} byte buffer for {} bytes", entry.allocation.size, size);
            return Ok(StagingBuffer {
                buffer: entry.allocation.buffer,
                memory: entry.allocation.memory,
                size: entry.allocation.size,
                pooled: true,
            });
        }

        let allocation = device.create_buffer(&BufferDesc {
            name: "staging".to_string(),
            size,
            usage,
            memory_properties: properties,
        })?;
        entries.push(StagingEntry {
            allocation,
            usage,
            properties,
            in_use: true,
            idle_frames: 0,
            pending_slot: None,
        });
        engine_trace!("framegraph::StagingManager", "Allocated {} byte staging buffer ({} pooled)", size, entries.len());
        Ok(StagingBuffer {
            buffer: allocation.buffer,
            memory: allocation.memory,
            size: allocation.size,
            pooled: true,
        })
    }

    /// Return a pooled buffer no submitted work reads.
    /// Returns false if the handle is not pooled.
    pub fn try_release(&self, buffer: BufferHandle) -> bool {
        let mut entries = self.lock();
        match entries.iter_mut().find(|e| e.allocation.buffer == buffer) {
            Some(entry) => {
                entry.in_use = false;
                entry.idle_frames = 0;
                entry.pending_slot = None;
                true
            }
            None => false,
        }
    }

    /// Return a pooled buffer once `slot`'s GPU work has completed
    ///
    /// The entry stays lent (not reusable, not evictable) until `reclaim(slot)`.
    /// Returns false if the handle is not pooled.
    pub fn release_after(&self, buffer: BufferHandle, slot: FrameSlot) -> bool {
        let mut entries = self.lock();
        match entries.iter_mut().find(|e| e.allocation.buffer == buffer) {
            Some(entry) => {
                entry.pending_slot = Some(slot);
                true
            }
            None => false,
        }
    }

    /// Make the buffers released into `slot` idle again. Call after the slot's fence.
    pub fn reclaim(&self, slot: FrameSlot) -> usize {
        let mut entries = self.lock();
        let mut reclaimed = 0;
        for entry in entries.iter_mut().filter(|e| e.pending_slot == Some(slot)) {
            entry.in_use = false;
            entry.idle_frames = 0;
            entry.pending_slot = None;
            reclaimed += 1;
        }
        reclaimed
    }

    /// Age idle entries and destroy the stale ones. Returns the number destroyed.
    pub fn trim(&self, device: &dyn GpuDevice) -> usize {
        let mut entries = self.lock();
        let mut evicted = Vec::new();

        for entry in entries.iter_mut() {
            if !entry.in_use {
                entry.idle_frames += 1;
            }
        }
        let threshold = self.idle_frames_before_eviction;
        let mut i = 0;
        while i < entries.len() {
            if !entries[i].in_use && entries[i].idle_frames >= threshold {
                evicted.push(entries.remove(i).allocation);
            } else {
                i += 1;
            }
        }

        // Over the cap: drop idle entries in pool order
        let mut i = 0;
        while entries.len() > self.max_pooled_buffers && i < entries.len() {
            if !entries[i].in_use {
                evicted.push(entries.remove(i).allocation);
            } else {
                i += 1;
            }
        }
        drop(entries);

        for allocation in &evicted {
            device.destroy_buffer(allocation);
        }
        if !evicted.is_empty() {
            engine_debug!("framegraph::StagingManager", "Evicted {} staging buffers", evicted.len());
        }
        evicted.len()
    }

    /// Number of pooled buffers (idle or lent)
    pub fn pooled_count(&self) -> usize {
        self.lock().len()
    }

    /// Number of pooled buffers currently lent out (including pending ones)
    pub fn in_use_count(&self) -> usize {
        self.lock().iter().filter(|e| e.in_use).count()
    }

    /// Number of pooled buffers waiting on a frame slot's fence
    pub fn pending_count(&self) -> usize {
        self.lock().iter().filter(|e| e.pending_slot.is_some()).count()
    }

    /// Total bytes held by the pool
    pub fn pooled_bytes(&self) -> u64 {
        self.lock().iter().map(|e| e.allocation.size).sum()
    }

    /// Destroy every pooled buffer (device must be idle)
    pub fn destroy_all(&self, device: &dyn GpuDevice) -> usize {
        let entries = std::mem::take(&mut *self.lock());
        for entry in &entries {
            device.destroy_buffer(&entry.allocation);
        }
        entries.len()
    }
}

#[cfg(test)]
#[path = "staging_tests.rs"]
mod tests;
