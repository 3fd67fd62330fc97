//! # Lucent Buffer Module (`lucent-buffers`)
//!
//! This crate implements shared graphics buffer handle management for the
//! Lucent display stack: a serializable, cross-process buffer handle and the
//! lifecycle operations that let independent processes safely share, map,
//! and synchronize access to a block of shared graphics memory.
//!
//! Physical allocation is performed by an external kernel allocator service;
//! this crate validates handles arriving from other processes, maps their
//! backing memory locally ([`registry`]), and brackets CPU access with cache
//! synchronization ([`access`]). The buffer contents are an opaque memory
//! region from this crate's point of view.
//!
//! A typical consumer:
//!
//! ```rust,ignore
//! use lucent_buffers::{open_device, BufferModule, BUFFER_DEVICE_NAME};
//! use lucent_buffers::{AccessRegion, BufferHandle, UsageFlags};
//! use std::sync::Arc;
//!
//! let module = Arc::new(BufferModule::new(config.allocator.clone()));
//! let device = open_device(&module, BUFFER_DEVICE_NAME)?;
//!
//! let mut handle = BufferHandle::from_raw(&received_envelope)?;
//! device.register(&mut handle)?;
//! if let Some(ptr) = device.lock(&mut handle, UsageFlags::CPU_WRITE, AccessRegion::new(0, 0, w, h))? {
//!     // ... write pixels through ptr ...
//! }
//! device.unlock(&handle)?;
//! device.unregister(&mut handle)?;
//! ```

pub mod access;
pub mod allocator;
pub mod device;
pub mod errors;
pub mod handle;
pub mod module;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types for convenience.
pub use access::{lock_buffer, unlock_buffer, AccessRegion};
pub use allocator::{AllocatorService, SystemAllocator};
pub use device::{open_device, BufferDevice, BUFFER_DEVICE_NAME, FRAMEBUFFER_DEVICE_NAME};
pub use errors::{AllocatorError, BufferError};
pub use handle::{
    Backing, BufferFlags, BufferHandle, ColorSpace, LockState, RawBufferHandle, UsageFlags,
};
pub use module::{BufferModule, ModuleInfo};
pub use registry::{register_buffer, unregister_buffer};
