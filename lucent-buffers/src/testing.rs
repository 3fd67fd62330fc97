//! Shared test doubles for the module's unit tests.

use crate::allocator::AllocatorService;
use crate::errors::AllocatorError;
use std::os::unix::io::RawFd;
use std::sync::Mutex;

/// One recorded allocator-service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AllocatorCall {
    Map { fd: RawFd, size: usize },
    Unmap { base: u64, size: usize },
    Sync { fd: RawFd },
}

/// Allocator stand-in returning an arranged base address and recording every
/// call, so tests can assert on the exact service traffic an operation
/// produced. Optionally fails unmap or sync to exercise the best-effort
/// cleanup paths.
pub(crate) struct RecordingAllocator {
    base: u64,
    fail_map: bool,
    fail_unmap: bool,
    fail_sync: bool,
    calls: Mutex<Vec<AllocatorCall>>,
}

impl RecordingAllocator {
    pub fn with_base(base: u64) -> Self {
        RecordingAllocator {
            base,
            fail_map: false,
            fail_unmap: false,
            fail_sync: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_map(base: u64) -> Self {
        RecordingAllocator {
            fail_map: true,
            ..Self::with_base(base)
        }
    }

    pub fn failing_unmap(base: u64) -> Self {
        RecordingAllocator {
            fail_unmap: true,
            ..Self::with_base(base)
        }
    }

    pub fn failing_sync(base: u64) -> Self {
        RecordingAllocator {
            fail_sync: true,
            ..Self::with_base(base)
        }
    }

    pub fn calls(&self) -> Vec<AllocatorCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sync_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, AllocatorCall::Sync { .. }))
            .count()
    }

    pub fn unmap_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, AllocatorCall::Unmap { .. }))
            .count()
    }
}

impl AllocatorService for RecordingAllocator {
    fn map(&self, share_fd: RawFd, size: usize) -> Result<u64, AllocatorError> {
        self.calls
            .lock()
            .unwrap()
            .push(AllocatorCall::Map { fd: share_fd, size });
        if self.fail_map {
            return Err(AllocatorError::MapFailed {
                size,
                source: std::io::Error::from(std::io::ErrorKind::OutOfMemory),
            });
        }
        Ok(self.base)
    }

    fn unmap(&self, base: u64, size: usize) -> Result<(), AllocatorError> {
        self.calls
            .lock()
            .unwrap()
            .push(AllocatorCall::Unmap { base, size });
        if self.fail_unmap {
            return Err(AllocatorError::UnknownMapping { base });
        }
        Ok(())
    }

    fn sync_for_device(&self, share_fd: RawFd) -> Result<(), AllocatorError> {
        self.calls
            .lock()
            .unwrap()
            .push(AllocatorCall::Sync { fd: share_fd });
        if self.fail_sync {
            return Err(AllocatorError::SyncFailed {
                source: nix::errno::Errno::ENOTTY,
            });
        }
        Ok(())
    }
}
