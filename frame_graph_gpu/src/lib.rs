/*!
# Frame Graph GPU

Frame-graph-aware GPU resource management for explicit graphics APIs.

This crate is platform-agnostic: it plans logical resources, groups them
into alias groups, infers their usage, and decides when GPU objects may be
created, reused or destroyed. Backends (see `frame_graph_gpu_vulkan`)
perform the actual API calls through the `GpuDevice` and `FrameFence` traits.

## Architecture

- **ResourcePlanner**: snapshots a descriptor registry into a lifetime-bucketed plan
- **ResourceAllocator**: alias groups, usage inference and lazily allocated physical groups
- **FrameSlotRetirementTable**: per-frame-slot deferred destruction
- **StagingManager**: pooled host-visible upload buffers
- **ComputeDescriptorCache**: growable descriptor pool blocks for compute sets
- **IndirectDrawRecorder**: deferred indirect draws with count-draw fallback
- **ReadbackScheduler**: bounded background readbacks
*/

// Internal modules
mod error;
mod engine;
mod config;
pub mod log;
pub mod device;
pub mod resource;
pub mod allocator;
pub mod frame;
pub mod compute;
pub mod draw;
pub mod readback;

// Main framegraph namespace module
pub mod framegraph {
    // Error types
    pub use crate::error::{Error, Result};

    // Global logger entry point
    pub use crate::engine::Engine;

    // Configuration
    pub use crate::config::Config;

    // Logging sub-module (types only; the engine_* macros live at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Device abstraction sub-module
    pub mod device {
        pub use crate::device::*;
    }

    // Logical resources sub-module
    pub mod resource {
        pub use crate::resource::*;
    }

    // Allocator sub-module
    pub mod allocator {
        pub use crate::allocator::*;
    }

    // Per-frame services sub-module
    pub mod frame {
        pub use crate::frame::*;
    }

    // Compute sub-module
    pub mod compute {
        pub use crate::compute::*;
    }

    // Indirect draw sub-module
    pub mod draw {
        pub use crate::draw::*;
    }

    // Readback sub-module
    pub mod readback {
        pub use crate::readback::*;
    }
}

// Re-export math library at crate root
pub use glam;
