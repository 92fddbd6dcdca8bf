//! Error types for the frame graph GPU layer
//!
//! This module defines the error types used throughout the crate,
//! including device allocation, planning, and synchronization failures.

use std::fmt;

/// Result type for frame graph GPU operations
pub type Result<T> = std::result::Result<T, Error>;

/// Frame graph GPU errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Backend-specific error (Vulkan, Direct3D 12, etc.)
    BackendError(String),

    /// Out of GPU memory (image, buffer or device memory creation)
    OutOfMemory,

    /// Invalid resource (unknown name, bad descriptor, stale handle)
    InvalidResource(String),

    /// Initialization failed (device, configuration, worker threads)
    InitializationFailed(String),

    /// A bounded wait (fence, readback, worker drain) expired
    Timeout(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::Timeout(msg) => write!(f, "Timed out: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
