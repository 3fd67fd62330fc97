//! Client for the external graphics memory allocator service.
//!
//! Physical allocation lives in the kernel; this module only consumes three
//! primitives of that service, expressed as the [`AllocatorService`] trait so
//! the registration and access paths stay independent of the concrete
//! transport: mapping a shared-memory descriptor into this process, undoing
//! that mapping, and flushing CPU caches so device consumers observe CPU
//! writes.
//!
//! [`SystemAllocator`] is the production client. Mappings are retained as
//! owned regions keyed by their base address, so unmapping is a drop of the
//! owning region and cannot be missed on any exit path.

use crate::errors::AllocatorError;
use lucent_core::config::AllocatorConfig;
use memmap2::{MmapMut, MmapOptions};
use nix::unistd::dup;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Cache-synchronization request handed to the heap device.
#[repr(C)]
struct HeapSyncRequest {
    fd: RawFd,
    reserved: u32,
}

const HEAP_IOC_MAGIC: u8 = b'H';
const HEAP_IOC_SYNC: u8 = 7;

nix::ioctl_write_ptr!(heap_buffer_sync, HEAP_IOC_MAGIC, HEAP_IOC_SYNC, HeapSyncRequest);

/// The three allocator-service primitives this module consumes.
///
/// `map` returns the process-local base address of the new mapping; `unmap`
/// releases a mapping previously produced by `map`; `sync_for_device` makes
/// CPU writes to the buffer visible to non-CPU consumers.
pub trait AllocatorService: Send + Sync {
    fn map(&self, share_fd: RawFd, size: usize) -> Result<u64, AllocatorError>;
    fn unmap(&self, base: u64, size: usize) -> Result<(), AllocatorError>;
    fn sync_for_device(&self, share_fd: RawFd) -> Result<(), AllocatorError>;
}

/// A live mapping owned by the allocator client. Dropping it unmaps.
struct MappedRegion {
    mmap: MmapMut,
}

/// Production allocator client.
///
/// The connection to the heap device is opened lazily, at most once; mapping
/// and unmapping work without it, so processes that only ever consume
/// already-allocated buffers never touch the device node.
pub struct SystemAllocator {
    config: AllocatorConfig,
    device: OnceCell<File>,
    mappings: Mutex<HashMap<u64, MappedRegion>>,
}

impl SystemAllocator {
    pub fn new(config: AllocatorConfig) -> Self {
        SystemAllocator {
            config,
            device: OnceCell::new(),
            mappings: Mutex::new(HashMap::new()),
        }
    }

    /// The client handle to the heap device, opened on first use.
    fn client(&self) -> Result<&File, AllocatorError> {
        self.device.get_or_try_init(|| {
            OpenOptions::new()
                .read(true)
                .write(true)
                .open(&self.config.device_path)
                .map_err(|source| AllocatorError::DeviceUnavailable {
                    path: self.config.device_path.clone(),
                    source,
                })
        })
    }
}

impl AllocatorService for SystemAllocator {
    fn map(&self, share_fd: RawFd, size: usize) -> Result<u64, AllocatorError> {
        // The descriptor is borrowed from the handle; map through a duplicate
        // so the caller keeps ownership of the original. The mapping keeps
        // the pages alive after the duplicate closes.
        let duplicate = dup(share_fd).map_err(|source| AllocatorError::DescriptorUnusable { source })?;
        let file = unsafe { File::from_raw_fd(duplicate) };

        let mut mmap = unsafe { MmapOptions::new().len(size).map_mut(&file) }
            .map_err(|source| AllocatorError::MapFailed { size, source })?;

        let base = mmap.as_mut_ptr() as u64;
        debug!(base = format_args!("{base:#x}"), size, "mapped shared buffer");
        self.mappings
            .lock()
            .unwrap() // Handle potential poison
            .insert(base, MappedRegion { mmap });
        Ok(base)
    }

    fn unmap(&self, base: u64, size: usize) -> Result<(), AllocatorError> {
        let region = self
            .mappings
            .lock()
            .unwrap()
            .remove(&base)
            .ok_or(AllocatorError::UnknownMapping { base })?;

        if region.mmap.len() != size {
            warn!(
                base = format_args!("{base:#x}"),
                declared = size,
                mapped = region.mmap.len(),
                "unmap size differs from mapped size"
            );
        }
        drop(region);
        debug!(base = format_args!("{base:#x}"), size, "unmapped shared buffer");
        Ok(())
    }

    fn sync_for_device(&self, share_fd: RawFd) -> Result<(), AllocatorError> {
        let client = self.client()?;
        let request = HeapSyncRequest {
            fd: share_fd,
            reserved: 0,
        };
        unsafe { heap_buffer_sync(client.as_raw_fd(), &request) }
            .map_err(|source| AllocatorError::SyncFailed { source })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn shared_memory_fixture(size: u64) -> File {
        let file = tempfile::tempfile().unwrap();
        file.set_len(size).unwrap();
        file
    }

    #[test]
    fn test_map_write_read_unmap_round_trip() {
        let allocator = SystemAllocator::new(AllocatorConfig::default());
        let file = shared_memory_fixture(4096);

        let base = allocator.map(file.as_raw_fd(), 4096).unwrap();
        assert_ne!(base, 0);

        unsafe {
            let ptr = base as *mut u8;
            ptr.write(0xAB);
            assert_eq!(ptr.read(), 0xAB);
        }

        allocator.unmap(base, 4096).unwrap();
    }

    #[test]
    fn test_unmap_of_unknown_base_is_an_error() {
        let allocator = SystemAllocator::new(AllocatorConfig::default());
        let err = allocator.unmap(0xdead_0000, 4096).unwrap_err();
        assert!(matches!(err, AllocatorError::UnknownMapping { base: 0xdead_0000 }));
    }

    #[test]
    fn test_double_unmap_is_an_error() {
        let allocator = SystemAllocator::new(AllocatorConfig::default());
        let file = shared_memory_fixture(4096);
        let base = allocator.map(file.as_raw_fd(), 4096).unwrap();

        allocator.unmap(base, 4096).unwrap();
        assert!(matches!(
            allocator.unmap(base, 4096),
            Err(AllocatorError::UnknownMapping { .. })
        ));
    }

    #[test]
    fn test_map_with_bad_descriptor_fails() {
        let allocator = SystemAllocator::new(AllocatorConfig::default());
        let err = allocator.map(-1, 4096).unwrap_err();
        assert!(matches!(err, AllocatorError::DescriptorUnusable { .. }));
    }

    #[test]
    fn test_sync_reports_unavailable_device() {
        let allocator = SystemAllocator::new(AllocatorConfig {
            device_path: PathBuf::from("/dev/lucent-test-no-such-heap"),
        });
        let file = shared_memory_fixture(64);
        let err = allocator.sync_for_device(file.as_raw_fd()).unwrap_err();
        assert!(matches!(err, AllocatorError::DeviceUnavailable { .. }));
    }
}
