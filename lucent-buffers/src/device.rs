//! Device surface exposed to the host module loader.
//!
//! The host opens devices by name. The buffer device served here bundles the
//! four lifecycle operations over one module context. The framebuffer device
//! lives in the display subsystem and is not served by this module; asking
//! for it (or any unknown name) is refused.

use crate::access::{lock_buffer, unlock_buffer, AccessRegion};
use crate::errors::BufferError;
use crate::handle::{BufferHandle, UsageFlags};
use crate::module::BufferModule;
use crate::registry::{register_buffer, unregister_buffer};
use std::ptr::NonNull;
use std::sync::Arc;
use tracing::debug;

/// Name of the buffer device served by this module.
pub const BUFFER_DEVICE_NAME: &str = "gpu0";

/// Name of the framebuffer device, served by the display subsystem.
pub const FRAMEBUFFER_DEVICE_NAME: &str = "fb0";

/// The opened buffer device: the four lifecycle operations bound to one
/// module context.
pub struct BufferDevice {
    module: Arc<BufferModule>,
}

impl std::fmt::Debug for BufferDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferDevice").finish_non_exhaustive()
    }
}

impl BufferDevice {
    pub fn module(&self) -> &BufferModule {
        &self.module
    }

    /// See [`register_buffer`].
    pub fn register(&self, handle: &mut BufferHandle) -> Result<(), BufferError> {
        register_buffer(&self.module, handle)
    }

    /// See [`unregister_buffer`].
    pub fn unregister(&self, handle: &mut BufferHandle) -> Result<(), BufferError> {
        unregister_buffer(&self.module, handle)
    }

    /// See [`lock_buffer`].
    pub fn lock(
        &self,
        handle: &mut BufferHandle,
        usage: UsageFlags,
        region: AccessRegion,
    ) -> Result<Option<NonNull<u8>>, BufferError> {
        lock_buffer(&self.module, handle, usage, region)
    }

    /// See [`unlock_buffer`].
    pub fn unlock(&self, handle: &BufferHandle) -> Result<(), BufferError> {
        unlock_buffer(&self.module, handle)
    }
}

/// Opens a device of this module by name.
///
/// Only [`BUFFER_DEVICE_NAME`] is served here; the framebuffer path belongs
/// to the display subsystem, so that name (and any unknown one) yields
/// [`BufferError::UnsupportedDevice`].
pub fn open_device(module: &Arc<BufferModule>, name: &str) -> Result<BufferDevice, BufferError> {
    if name == BUFFER_DEVICE_NAME {
        debug!(name, "opening buffer device");
        return Ok(BufferDevice {
            module: module.clone(),
        });
    }
    Err(BufferError::UnsupportedDevice {
        name: name.to_string(),
    })
}
