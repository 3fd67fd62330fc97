//! Error types for the buffer module.
//!
//! The taxonomy distinguishes handles that failed validation, flag
//! combinations this module cannot serve, unknown device names, and failures
//! reported by the external allocator service. Cleanup failures (unmap, cache
//! sync) are deliberately *not* represented here: cleanup paths log and
//! swallow them so best-effort teardown is never blocked by a secondary
//! failure.

use crate::handle::BufferFlags;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the buffer module operations.
#[derive(Debug, Error)]
pub enum BufferError {
    /// The handle failed validation (magic or envelope counts mismatch).
    /// Nothing about such a handle may be trusted, including its fields.
    #[error("buffer handle failed validation")]
    InvalidHandle,

    /// The handle's flags name a backing configuration this module cannot
    /// serve (e.g. framebuffer-backed buffers in the registration path).
    #[error("unsupported buffer configuration (flags = {flags:?})")]
    UnsupportedConfiguration { flags: BufferFlags },

    /// The device name passed to the module-open entry point is not served
    /// by this module.
    #[error("device {name:?} is not served by this module")]
    UnsupportedDevice { name: String },

    /// A call into the external allocator service failed. Propagated for
    /// mapping failures; unmap and sync failures stay inside the cleanup
    /// paths.
    #[error("allocator service failure")]
    Allocator(#[from] AllocatorError),
}

/// Errors reported by the external allocator service client.
#[derive(Debug, Error)]
pub enum AllocatorError {
    /// The allocator heap device could not be opened.
    #[error("failed to open allocator device {path:?}")]
    DeviceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Duplicating the shared-memory descriptor for mapping failed.
    #[error("failed to duplicate shared memory descriptor: {source}")]
    DescriptorUnusable {
        #[source]
        source: nix::errno::Errno,
    },

    /// Mapping the shared memory into the process address space failed.
    #[error("failed to map {size} bytes of shared memory: {source}")]
    MapFailed {
        size: usize,
        #[source]
        source: std::io::Error,
    },

    /// An unmap was requested for an address this client never mapped.
    #[error("no mapping registered at base {base:#x}")]
    UnknownMapping { base: u64 },

    /// The cache-synchronization call for a shared-memory descriptor failed.
    #[error("cache synchronization failed: {source}")]
    SyncFailed {
        #[source]
        source: nix::errno::Errno,
    },
}
