/// Configuration for the frame graph GPU layer

use std::time::Duration;
use crate::error::{Error, Result};

/// Tunables for frame slots, staging pool, descriptor cache and readbacks
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of rotating frame slots (double/triple buffering)
    pub frames_in_flight: usize,
    /// Consecutive idle trims after which a pooled staging buffer is destroyed
    pub staging_idle_frames_before_eviction: u32,
    /// Upper bound on pooled staging buffers
    pub staging_max_pooled_buffers: usize,
    /// Descriptor sets in the first compute descriptor pool block of a schema
    pub descriptor_block_base_capacity: u32,
    /// Extra sets per existing block when a schema needs another block
    pub descriptor_block_growth: u32,
    /// Bounded wait applied to each readback fence
    pub readback_timeout: Duration,
    /// Number of background readback worker threads
    pub readback_workers: usize,
    /// Bounded wait applied when re-entering a frame slot
    pub frame_wait_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frames_in_flight: 2,
            staging_idle_frames_before_eviction: 3,
            staging_max_pooled_buffers: 32,
            descriptor_block_base_capacity: 32,
            descriptor_block_growth: 16,
            readback_timeout: Duration::from_secs(5),
            readback_workers: 2,
            frame_wait_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Check the configuration for values the subsystems cannot work with
    ///
    /// An idle staging buffer may only be destroyed once no frame slot can
    /// still reference it, so the idle threshold must cover every slot.
    pub fn validate(&self) -> Result<()> {
        if self.frames_in_flight == 0 {
            return Err(Error::InitializationFailed(
                "frames_in_flight must be at least 1".to_string(),
            ));
        }
        if self.readback_workers == 0 {
            return Err(Error::InitializationFailed(
                "readback_workers must be at least 1".to_string(),
            ));
        }
        if (self.staging_idle_frames_before_eviction as usize) < self.frames_in_flight {
            return Err(Error::InitializationFailed(format!(
                "staging_idle_frames_before_eviction ({}) must be >= frames_in_flight ({})",
                self.staging_idle_frames_before_eviction, self.frames_in_flight
            )));
        }
        if self.descriptor_block_base_capacity == 0 {
            return Err(Error::InitializationFailed(
                "descriptor_block_base_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
