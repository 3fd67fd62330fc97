//! Registration engine: mapping received handles into the calling process.
//!
//! Registration turns a transported handle into a usable process-local
//! mapping through the allocator service; unregistration releases that
//! mapping. Both operations validate the handle first, run inside the module
//! registration mutex, and follow the best-effort cleanup policy: failures
//! while tearing down are logged, never propagated.

use crate::errors::BufferError;
use crate::handle::{BufferFlags, BufferHandle};
use crate::module::BufferModule;
use tracing::{debug, error, warn};

/// Maps the handle's backing memory into the calling process and records the
/// registering process id.
///
/// Framebuffer-backed handles are refused: their memory is pre-mapped by the
/// display subsystem and must never be registered through this path. Flag
/// combinations naming no supported backing are refused as an unsupported
/// configuration, leaving the handle unmapped.
pub fn register_buffer(module: &BufferModule, handle: &mut BufferHandle) -> Result<(), BufferError> {
    if let Err(err) = handle.validate() {
        error!("refusing to register an invalid buffer handle");
        return Err(err);
    }

    let _guard = module.registration_guard();

    if handle.flags.contains(BufferFlags::FRAMEBUFFER) {
        error!("cannot register a framebuffer-backed buffer");
        return Err(BufferError::UnsupportedConfiguration { flags: handle.flags });
    }

    if !handle.flags.contains(BufferFlags::HEAP) {
        error!(flags = ?handle.flags, "buffer flags name no supported backing");
        return Err(BufferError::UnsupportedConfiguration { flags: handle.flags });
    }

    let Some(share_fd) = handle.heap_share_fd() else {
        // Only reachable by mutating flags out from under the backing payload.
        warn!(flags = ?handle.flags, "buffer flags disagree with the backing payload");
        return Err(BufferError::UnsupportedConfiguration { flags: handle.flags });
    };

    let base = module.allocator()?.map(share_fd, handle.size as usize)?;
    handle.base = base;
    handle.lock_state.set_mapped();
    handle.pid = module.pid();
    debug!(
        pid = handle.pid,
        size = handle.size,
        "registered shared buffer"
    );
    Ok(())
}

/// Releases the process-local mapping established by [`register_buffer`].
///
/// Only the registering process may release the mapping: a call from any
/// other process is a no-op reported as success. Unregistering a buffer with
/// outstanding readers is a contract violation surfaced as a diagnostic; the
/// unregistration still proceeds. The handle always leaves this function
/// with `base`, lock state, and write-owner zeroed (unless the call was a
/// foreign-process no-op), ready for a later registration.
pub fn unregister_buffer(
    module: &BufferModule,
    handle: &mut BufferHandle,
) -> Result<(), BufferError> {
    if let Err(err) = handle.validate() {
        error!("refusing to unregister an invalid buffer handle");
        return Err(err);
    }

    let _guard = module.registration_guard();

    if handle.flags.contains(BufferFlags::FRAMEBUFFER) {
        error!("cannot unregister a framebuffer-backed buffer");
        return Err(BufferError::UnsupportedConfiguration { flags: handle.flags });
    }

    if handle.lock_state.has_readers() {
        warn!(
            lock_state = handle.lock_state.bits(),
            "unregistering a buffer that is still locked"
        );
    }

    if handle.pid != module.pid() {
        // Never unmap a buffer that was registered by another process.
        warn!(
            owner = handle.pid,
            caller = module.pid(),
            "buffer was registered by another process; leaving it untouched"
        );
        return Ok(());
    }

    if handle.base != 0 {
        match module.allocator() {
            Ok(allocator) => {
                if let Err(err) = allocator.unmap(handle.base, handle.size as usize) {
                    warn!(error = %err, "failed to unmap buffer during unregistration");
                }
            }
            Err(err) => {
                warn!(error = %err, "allocator service unavailable during unregistration");
            }
        }
    }

    handle.base = 0;
    handle.lock_state.clear();
    handle.write_owner = false;
    debug!(pid = module.pid(), "unregistered shared buffer");
    Ok(())
}
