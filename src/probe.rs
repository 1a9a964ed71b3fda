use std::env;

use log::info;
use thiserror::Error;

use crate::backend::{LibraryKind, QueryError};
use crate::discover;
use crate::handle::CudaHandle;
use crate::query::ComputeCapability;

/// Oldest compute capability the compiled kernels support.
pub const COMPUTE_CAPABILITY_MIN: ComputeCapability = ComputeCapability { major: 5, minor: 0 };

/// Environment switch for verbose probe diagnostics.
pub const DEBUG_ENV: &str = "CUDAPROBE_DEBUG";

/// Environment override for the schedulable-VRAM computation, in bytes.
pub const MAX_VRAM_ENV: &str = "CUDAPROBE_MAX_VRAM";

const GIB: u64 = 1024 * 1024 * 1024;

/// What a scheduler needs to know about the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuInfo {
    pub kind: LibraryKind,
    pub device_count: u32,
    pub total_memory: u64,
    pub free_memory: u64,
    pub compute_capability: ComputeCapability,
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("no CUDA devices detected")]
    NoDevices,

    #[error("CUDA compute capability {found} is below the supported minimum {min}")]
    UnsupportedCapability {
        found: ComputeCapability,
        min: ComputeCapability,
    },

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("invalid {var} setting {value}: {reason}")]
    InvalidOverride {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Try every discovered candidate, cudart first, and keep the first library
/// that initializes. Candidates that fail are logged and skipped; `None`
/// means no usable library exists on this host.
pub fn detect(verbose: bool) -> Option<CudaHandle> {
    for kind in [LibraryKind::Cudart, LibraryKind::Nvml] {
        for path in discover::library_candidates(kind) {
            match CudaHandle::init(&path, verbose) {
                Ok(handle) => {
                    info!("Nvidia GPU detected via {}", path.display());
                    return Some(handle);
                }
                Err(err) => {
                    info!(
                        "unable to load {} management library {}: {}",
                        kind,
                        path.display(),
                        err
                    );
                }
            }
        }
    }
    None
}

/// `detect` with verbosity taken from the `CUDAPROBE_DEBUG` environment.
pub fn detect_from_env() -> Option<CudaHandle> {
    detect(verbose_from_env())
}

pub fn verbose_from_env() -> bool {
    env::var_os(DEBUG_ENV).is_some_and(|value| !value.is_empty())
}

/// Aggregate the fleet behind `handle` and gate it on the minimum supported
/// compute capability. A fleet that is present but too old is unusable.
pub fn gpu_info(handle: &CudaHandle) -> Result<GpuInfo, ProbeError> {
    let memory = handle.memory_info()?;
    if memory.device_count == 0 {
        return Err(ProbeError::NoDevices);
    }

    let capability = handle.compute_capability()?;
    if !capability.at_least(COMPUTE_CAPABILITY_MIN) {
        return Err(ProbeError::UnsupportedCapability {
            found: capability,
            min: COMPUTE_CAPABILITY_MIN,
        });
    }

    Ok(GpuInfo {
        kind: handle.kind(),
        device_count: memory.device_count,
        total_memory: memory.total,
        free_memory: memory.free,
        compute_capability: capability,
    })
}

/// Free VRAM worth handing to a scheduler: reported free memory minus a
/// headroom of max(10% of free, 1 GiB per device) for unaccounted overhead.
pub fn available_vram(info: &GpuInfo) -> u64 {
    let mut overhead = info.free_memory / 10;
    let per_device_floor = u64::from(info.device_count) * GIB;
    if overhead < per_device_floor {
        overhead = per_device_floor;
    }
    info.free_memory.saturating_sub(overhead)
}

/// `available_vram` with the `CUDAPROBE_MAX_VRAM` override taking
/// precedence when set.
pub fn available_vram_with_override(info: &GpuInfo) -> Result<u64, ProbeError> {
    if let Ok(value) = env::var(MAX_VRAM_ENV) {
        if !value.is_empty() {
            return value
                .parse::<u64>()
                .map_err(|e| ProbeError::InvalidOverride {
                    var: MAX_VRAM_ENV,
                    value,
                    reason: e.to_string(),
                });
        }
    }
    Ok(available_vram(info))
}
