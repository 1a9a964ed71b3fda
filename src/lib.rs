pub mod backend;
pub mod discover;
pub mod handle;
pub mod loader;
pub mod probe;
pub mod query;

pub use backend::{DeviceBackend, LibraryKind, MemoryReading, QueryError};
pub use handle::{CudaHandle, InitError};
pub use probe::{GpuInfo, ProbeError};
pub use query::{ComputeCapability, MemoryInfo};

/// Tests that touch process environment variables hold this lock so the
/// parallel test harness cannot interleave them.
#[cfg(test)]
pub(crate) fn env_guard() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
