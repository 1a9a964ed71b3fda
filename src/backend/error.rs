use thiserror::Error;

/// Neither vocabulary could be brought up; both status codes are surfaced so
/// the caller can tell a missing driver from a broken install.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ActivationError {
    #[error("cudart vram init failure: {cudart_status}; nvml vram init failure: {nvml_status}")]
    NoUsableBackend { cudart_status: i32, nvml_status: i32 },
}

/// A backend call inside one query reported a non-success status. Fatal to
/// that query only; the handle stays usable.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum QueryError {
    #[error("unable to get device count: {status}")]
    DeviceCount { status: i32 },

    #[error("unable to get device handle {index}: {status}")]
    DeviceHandle { index: u32, status: i32 },

    #[error("device memory info lookup failure {index}: {status}")]
    MemoryInfo { index: u32, status: i32 },

    #[error("device compute capability lookup failure {index}: {status}")]
    ComputeCapability { index: u32, status: i32 },
}
