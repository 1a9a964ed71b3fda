use std::marker::PhantomData;
use std::path::Path;

use log::debug;

use super::InitError;
use crate::backend::{ActiveBackend, CudartApi, LibraryKind, NvmlApi, QueryError};
use crate::loader::CudaLibrary;
use crate::query::{
    aggregate_memory, reduce_compute_capability, ComputeCapability, MemoryInfo,
};

/// A probed GPU library: the open image, the resolved entry-point tables and
/// the one active backend. A handle only exists when initialization fully
/// succeeded, so every query operates on a valid backend.
///
/// The cudart backend keeps a process-global current-device selection, so
/// concurrent queries against one handle must be serialized by the caller;
/// the handle is deliberately neither `Send` nor `Sync`.
#[derive(Debug)]
pub struct CudaHandle {
    backend: ActiveBackend,
    verbose: bool,
    // field order: the backend's pointers must drop before the image unloads
    library: CudaLibrary,
    _not_sync: PhantomData<*mut ()>,
}

impl CudaHandle {
    /// Open the library at `path`, resolve both vocabularies and activate
    /// exactly one backend. Any missing symbol is fatal; the image is
    /// released on every failure path.
    pub fn init(path: &Path, verbose: bool) -> Result<Self, InitError> {
        let library = CudaLibrary::open(path)?;
        if verbose {
            debug!(
                "wiring nvidia management library functions in {}",
                library.path()
            );
        }

        let cudart = CudartApi::resolve(&library, verbose)?;
        let nvml = NvmlApi::resolve(&library, verbose)?;

        let backend = ActiveBackend::select(cudart, nvml)?;
        if verbose {
            debug!(
                "GPU backend {} activated via {}",
                backend.kind(),
                library.path()
            );
            backend.log_driver_version();
        }

        Ok(Self {
            backend,
            verbose,
            library,
            _not_sync: PhantomData,
        })
    }

    pub fn kind(&self) -> LibraryKind {
        self.backend.kind()
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Path of the library image backing this handle.
    pub fn library_path(&self) -> &str {
        self.library.path()
    }

    /// Total and free VRAM summed across all visible devices.
    pub fn memory_info(&self) -> Result<MemoryInfo, QueryError> {
        aggregate_memory(self.backend.as_device_backend())
    }

    /// The lowest compute capability across all visible devices, `(0, 0)`
    /// when the backend reports none.
    pub fn compute_capability(&self) -> Result<ComputeCapability, QueryError> {
        reduce_compute_capability(self.backend.as_device_backend())
    }
}

impl Drop for CudaHandle {
    fn drop(&mut self) {
        let status = self.backend.shutdown();
        if status != 0 {
            debug!("{} shutdown returned {}", self.backend.kind(), status);
        }
    }
}
