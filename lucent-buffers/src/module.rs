//! Process-wide state of the buffer module.
//!
//! Rather than a hidden global with a static mutex, the state is an explicit
//! [`BufferModule`] context that callers construct once per process and pass
//! to the registration and access operations. The allocator service client
//! inside it is resolved lazily, at most once, behind a [`OnceCell`].

use crate::allocator::{AllocatorService, SystemAllocator};
use crate::errors::BufferError;
use lucent_core::config::AllocatorConfig;
use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Static description of the module, mirrored into logs on startup.
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    pub name: &'static str,
    pub author: &'static str,
    pub version: (u16, u16),
}

impl Default for ModuleInfo {
    fn default() -> Self {
        ModuleInfo {
            name: "Graphics Memory Buffer Module",
            author: "Lucent Developers",
            version: (1, 0),
        }
    }
}

/// Process-wide context scoping the buffer operations.
///
/// Holds the mutex that serializes registration and unregistration within
/// this process, the lazily-resolved allocator service client, and the
/// process id recorded into handles at registration time. Lives for the
/// whole process; no teardown is required.
pub struct BufferModule {
    info: ModuleInfo,
    config: AllocatorConfig,
    registration_lock: Mutex<()>,
    allocator: OnceCell<Arc<dyn AllocatorService>>,
    pid: i32,
}

impl BufferModule {
    /// Creates the context for the calling process, talking to the allocator
    /// service named in `config`.
    pub fn new(config: AllocatorConfig) -> Self {
        let info = ModuleInfo::default();
        debug!(
            name = info.name,
            version = format_args!("{}.{}", info.version.0, info.version.1),
            "buffer module context created"
        );
        BufferModule {
            info,
            config,
            registration_lock: Mutex::new(()),
            allocator: OnceCell::new(),
            pid: std::process::id() as i32,
        }
    }

    /// Creates a context with an injected allocator client and process id.
    ///
    /// This is the seam for embedders and tests that need to stand in for
    /// the external allocator service or simulate another process's view of
    /// a shared handle.
    pub fn with_allocator(
        config: AllocatorConfig,
        allocator: Arc<dyn AllocatorService>,
        pid: i32,
    ) -> Self {
        let module = BufferModule {
            info: ModuleInfo::default(),
            config,
            registration_lock: Mutex::new(()),
            allocator: OnceCell::new(),
            pid,
        };
        // A freshly created cell cannot already be set.
        let _ = module.allocator.set(allocator);
        module
    }

    pub fn info(&self) -> &ModuleInfo {
        &self.info
    }

    /// The process id recorded into handles registered through this context.
    pub fn pid(&self) -> i32 {
        self.pid
    }

    /// Resolves the allocator service client, connecting on first use.
    pub fn allocator(&self) -> Result<&Arc<dyn AllocatorService>, BufferError> {
        self.allocator.get_or_try_init(|| {
            debug!(device = ?self.config.device_path, "connecting allocator service client");
            Ok(Arc::new(SystemAllocator::new(self.config.clone())) as Arc<dyn AllocatorService>)
        })
    }

    /// Serializes register/unregister critical sections within this process.
    /// Lock and unlock deliberately do not take this mutex.
    pub(crate) fn registration_guard(&self) -> MutexGuard<'_, ()> {
        self.registration_lock.lock().unwrap() // Handle potential poison
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingAllocator;

    #[test]
    fn test_allocator_client_is_resolved_once() {
        let module = BufferModule::new(AllocatorConfig::default());
        let first = Arc::as_ptr(module.allocator().unwrap());
        let second = Arc::as_ptr(module.allocator().unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn test_with_allocator_uses_injected_client_and_pid() {
        let recording: Arc<dyn AllocatorService> = Arc::new(RecordingAllocator::with_base(0x1000));
        let module =
            BufferModule::with_allocator(AllocatorConfig::default(), recording.clone(), 4321);

        assert_eq!(module.pid(), 4321);
        let resolved = module.allocator().unwrap();
        assert!(Arc::ptr_eq(resolved, &recording));
    }

    #[test]
    fn test_module_info_defaults() {
        let module = BufferModule::new(AllocatorConfig::default());
        assert_eq!(module.info().version, (1, 0));
        assert!(!module.info().name.is_empty());
    }
}
