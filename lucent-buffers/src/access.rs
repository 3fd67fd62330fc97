//! Access synchronizer: the lock/unlock bracket around CPU access.
//!
//! Locking exposes the process-local mapping for CPU use and records whether
//! write access was requested; unlocking flushes CPU caches after a
//! write-capable lock so the memory is consistent for non-CPU consumers.
//! Neither operation takes the module registration mutex: concurrent
//! lock/unlock races on one handle are the caller's responsibility.

use crate::errors::BufferError;
use crate::handle::{BufferFlags, BufferHandle, UsageFlags};
use crate::module::BufferModule;
use std::ptr::NonNull;
use tracing::{error, warn};

/// Region of interest supplied with a lock request.
///
/// Informational in this design: the full mapped region is always
/// addressable, and no partial-mapping optimization is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRegion {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl AccessRegion {
    pub fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        AccessRegion {
            left,
            top,
            width,
            height,
        }
    }
}

/// Begins a period of access to a mapped buffer.
///
/// For heap-backed buffers, records whether `usage` includes CPU write
/// access; this is the authoritative signal consulted by [`unlock_buffer`].
/// Returns the process-local access pointer if any CPU access was requested
/// and the buffer is currently mapped; hardware-only usage produces no
/// pointer.
pub fn lock_buffer(
    _module: &BufferModule,
    handle: &mut BufferHandle,
    usage: UsageFlags,
    _region: AccessRegion,
) -> Result<Option<NonNull<u8>>, BufferError> {
    if let Err(err) = handle.validate() {
        error!("refusing to lock an invalid buffer handle");
        return Err(err);
    }

    if handle.flags.contains(BufferFlags::HEAP) {
        handle.write_owner = usage.intersects(UsageFlags::CPU_WRITE);
    }

    if usage.intersects(UsageFlags::CPU_ACCESS) {
        return Ok(NonNull::new(handle.base as *mut u8));
    }
    Ok(None)
}

/// Ends a period of access begun by [`lock_buffer`].
///
/// If the preceding lock on a heap-backed buffer requested write access, a
/// cache-synchronization call is issued to the allocator service so CPU
/// writes become visible to device consumers. Synchronization is
/// best-effort: an unreachable service or a failed call is logged and never
/// surfaced to the caller. No lock state is cleared here; the write-owner
/// flag persists until the next lock overwrites it.
pub fn unlock_buffer(module: &BufferModule, handle: &BufferHandle) -> Result<(), BufferError> {
    if let Err(err) = handle.validate() {
        error!("refusing to unlock an invalid buffer handle");
        return Err(err);
    }

    if handle.flags.contains(BufferFlags::HEAP) && handle.write_owner {
        match (module.allocator(), handle.heap_share_fd()) {
            (Ok(allocator), Some(share_fd)) => {
                if let Err(err) = allocator.sync_for_device(share_fd) {
                    warn!(error = %err, "cache synchronization failed after write access");
                }
            }
            (Err(err), _) => {
                warn!(error = %err, "allocator service unavailable; skipping cache synchronization");
            }
            (_, None) => {
                warn!("heap-flagged buffer carries no shared memory descriptor");
            }
        }
    }

    Ok(())
}
