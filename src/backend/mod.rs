use std::fmt;

use log::debug;

pub mod cudart;
pub mod error;
pub mod nvml;

pub use cudart::CudartApi;
pub use error::{ActivationError, QueryError};
pub use nvml::NvmlApi;

/// Which of the two supported library vocabularies is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryKind {
    Cudart,
    Nvml,
}

impl fmt::Display for LibraryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryKind::Cudart => write!(f, "cudart"),
            LibraryKind::Nvml => write!(f, "nvml"),
        }
    }
}

/// One device's memory reading, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryReading {
    pub total: u64,
    pub free: u64,
}

/// The typed seam over the two backend vocabularies. Per-device reads are
/// only meaningful for indices below `device_count()`, queried in ascending
/// order within one aggregation pass (the cudart backend keeps a global
/// current-device selection).
pub trait DeviceBackend {
    fn kind(&self) -> LibraryKind;

    fn device_count(&self) -> Result<u32, QueryError>;

    fn memory_info(&self, index: u32) -> Result<MemoryReading, QueryError>;

    fn compute_capability(&self, index: u32) -> Result<(i32, i32), QueryError>;
}

/// Exactly one backend vocabulary is active per handle, chosen once at
/// initialization and fixed afterwards.
#[derive(Debug)]
pub enum ActiveBackend {
    Cudart(CudartApi),
    Nvml(NvmlApi),
}

impl ActiveBackend {
    /// Activate one backend with cudart taking priority: a single idempotent
    /// select of device 0 must succeed. When it does not, fall back to
    /// `nvmlInit_v2`. Both failing means no usable backend.
    pub fn select(cudart: CudartApi, nvml: NvmlApi) -> Result<Self, ActivationError> {
        let cudart_status = cudart.activate();
        if cudart_status == cudart::CUDART_SUCCESS {
            return Ok(ActiveBackend::Cudart(cudart));
        }
        debug!("cudaSetDevice err: {}", cudart_status);

        let nvml_status = nvml.activate();
        if nvml_status == nvml::NVML_SUCCESS {
            return Ok(ActiveBackend::Nvml(nvml));
        }
        debug!("nvmlInit_v2 err: {}", nvml_status);

        Err(ActivationError::NoUsableBackend {
            cudart_status,
            nvml_status,
        })
    }

    pub fn kind(&self) -> LibraryKind {
        self.as_device_backend().kind()
    }

    pub fn as_device_backend(&self) -> &dyn DeviceBackend {
        match self {
            ActiveBackend::Cudart(api) => api,
            ActiveBackend::Nvml(api) => api,
        }
    }

    /// Best-effort driver version report for observability. Never fails.
    pub fn log_driver_version(&self) {
        match self {
            ActiveBackend::Cudart(api) => api.log_driver_version(),
            ActiveBackend::Nvml(api) => api.log_driver_version(),
        }
    }

    /// Best-effort backend teardown before the library unloads. Returns the
    /// backend status code.
    pub fn shutdown(&self) -> i32 {
        match self {
            ActiveBackend::Cudart(api) => api.reset(),
            ActiveBackend::Nvml(api) => api.shutdown(),
        }
    }
}
