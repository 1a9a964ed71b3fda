use std::os::raw::c_int;

use log::debug;

use super::error::QueryError;
use super::{DeviceBackend, LibraryKind, MemoryReading};
use crate::loader::{CudaLibrary, LoaderError};

pub(crate) const CUDART_SUCCESS: c_int = 0;

// cudaDevAttrComputeCapabilityMajor / Minor
const ATTR_COMPUTE_CAPABILITY_MAJOR: c_int = 75;
const ATTR_COMPUTE_CAPABILITY_MINOR: c_int = 76;

/// Entry-point table for the CUDA runtime vocabulary. Every slot is resolved
/// before the table is handed out; the pointers stay valid for the lifetime
/// of the library that resolved them.
#[derive(Debug, Clone, Copy)]
pub struct CudartApi {
    set_device: unsafe extern "C" fn(c_int) -> c_int,
    device_reset: unsafe extern "C" fn() -> c_int,
    mem_get_info: unsafe extern "C" fn(*mut usize, *mut usize) -> c_int,
    get_device_count: unsafe extern "C" fn(*mut c_int) -> c_int,
    device_get_attribute: unsafe extern "C" fn(*mut c_int, c_int, c_int) -> c_int,
    driver_get_version: unsafe extern "C" fn(*mut c_int) -> c_int,
    verbose: bool,
}

impl CudartApi {
    pub fn resolve(lib: &CudaLibrary, verbose: bool) -> Result<Self, LoaderError> {
        unsafe {
            Ok(Self {
                set_device: lib.get(b"cudaSetDevice\0")?,
                device_reset: lib.get(b"cudaDeviceReset\0")?,
                mem_get_info: lib.get(b"cudaMemGetInfo\0")?,
                get_device_count: lib.get(b"cudaGetDeviceCount\0")?,
                device_get_attribute: lib.get(b"cudaDeviceGetAttribute\0")?,
                driver_get_version: lib.get(b"cudaDriverGetVersion\0")?,
                verbose,
            })
        }
    }

    /// Select device 0. Success means the runtime vocabulary is usable.
    pub(crate) fn activate(&self) -> c_int {
        unsafe { (self.set_device)(0) }
    }

    pub(crate) fn reset(&self) -> c_int {
        unsafe { (self.device_reset)() }
    }

    pub(crate) fn log_driver_version(&self) {
        let mut version: c_int = 0;
        let status = unsafe { (self.driver_get_version)(&mut version) };
        if status != CUDART_SUCCESS {
            debug!("cudaDriverGetVersion failed: {}", status);
            return;
        }
        let major = version / 1000;
        let minor = (version - major * 1000) / 10;
        debug!("CUDA driver version: {}.{}", major, minor);
    }

    // The runtime keeps a global current device; it must be selected before
    // any per-device query.
    fn select_device(&self, index: u32) -> Result<(), QueryError> {
        let status = unsafe { (self.set_device)(index as c_int) };
        if status != CUDART_SUCCESS {
            return Err(QueryError::DeviceHandle { index, status });
        }
        Ok(())
    }

    fn attribute(&self, attr: c_int, index: u32) -> Result<c_int, QueryError> {
        let mut value: c_int = 0;
        let status = unsafe { (self.device_get_attribute)(&mut value, attr, index as c_int) };
        if status != CUDART_SUCCESS {
            return Err(QueryError::ComputeCapability { index, status });
        }
        Ok(value)
    }
}

impl DeviceBackend for CudartApi {
    fn kind(&self) -> LibraryKind {
        LibraryKind::Cudart
    }

    fn device_count(&self) -> Result<u32, QueryError> {
        let mut count: c_int = 0;
        let status = unsafe { (self.get_device_count)(&mut count) };
        if status != CUDART_SUCCESS {
            return Err(QueryError::DeviceCount { status });
        }
        Ok(count.max(0) as u32)
    }

    fn memory_info(&self, index: u32) -> Result<MemoryReading, QueryError> {
        self.select_device(index)?;

        let mut free: usize = 0;
        let mut total: usize = 0;
        let status = unsafe { (self.mem_get_info)(&mut free, &mut total) };
        if status != CUDART_SUCCESS {
            return Err(QueryError::MemoryInfo { index, status });
        }

        if self.verbose {
            debug!("[{}] CUDA totalMem {}", index, total);
            debug!("[{}] CUDA freeMem {}", index, free);
        }

        Ok(MemoryReading {
            total: total as u64,
            free: free as u64,
        })
    }

    fn compute_capability(&self, index: u32) -> Result<(i32, i32), QueryError> {
        self.select_device(index)?;

        let major = self.attribute(ATTR_COMPUTE_CAPABILITY_MAJOR, index)?;
        let minor = self.attribute(ATTR_COMPUTE_CAPABILITY_MINOR, index)?;
        Ok((major, minor))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

    unsafe extern "C" fn set_device_ok(_device: c_int) -> c_int {
        0
    }

    unsafe extern "C" fn reset_ok() -> c_int {
        0
    }

    unsafe extern "C" fn mem_get_info_empty(free: *mut usize, total: *mut usize) -> c_int {
        unsafe {
            *free = 0;
            *total = 0;
        }
        0
    }

    unsafe extern "C" fn count_zero(count: *mut c_int) -> c_int {
        unsafe { *count = 0 };
        0
    }

    unsafe extern "C" fn attribute_zero(value: *mut c_int, _attr: c_int, _device: c_int) -> c_int {
        unsafe { *value = 0 };
        0
    }

    unsafe extern "C" fn version_zero(version: *mut c_int) -> c_int {
        unsafe { *version = 0 };
        0
    }

    /// Table over inert entry points with one slot of interest swapped in.
    pub(crate) fn cudart_api_with(set_device: unsafe extern "C" fn(c_int) -> c_int) -> CudartApi {
        CudartApi {
            set_device,
            device_reset: reset_ok,
            mem_get_info: mem_get_info_empty,
            get_device_count: count_zero,
            device_get_attribute: attribute_zero,
            driver_get_version: version_zero,
            verbose: false,
        }
    }

    #[test]
    fn memory_info_selects_device_before_reading() {
        static SELECTED: AtomicI32 = AtomicI32::new(-1);

        unsafe extern "C" fn record_device(device: c_int) -> c_int {
            SELECTED.store(device, Ordering::SeqCst);
            0
        }

        unsafe extern "C" fn per_device_memory(free: *mut usize, total: *mut usize) -> c_int {
            let device = SELECTED.load(Ordering::SeqCst) as usize;
            unsafe {
                *total = (device + 1) * 1_000;
                *free = (device + 1) * 100;
            }
            0
        }

        let mut api = cudart_api_with(record_device);
        api.mem_get_info = per_device_memory;

        let reading = api.memory_info(1).unwrap();
        assert_eq!(SELECTED.load(Ordering::SeqCst), 1);
        assert_eq!(
            reading,
            MemoryReading {
                total: 2_000,
                free: 200
            }
        );
    }

    #[test]
    fn memory_failure_carries_index_and_status() {
        unsafe extern "C" fn mem_get_info_err(_free: *mut usize, _total: *mut usize) -> c_int {
            2
        }

        let mut api = cudart_api_with(set_device_ok);
        api.mem_get_info = mem_get_info_err;

        let err = api.memory_info(3).unwrap_err();
        assert_eq!(err, QueryError::MemoryInfo { index: 3, status: 2 });
    }

    #[test]
    fn count_failure_reports_status_without_device_reads() {
        static MEMORY_READS: AtomicUsize = AtomicUsize::new(0);

        unsafe extern "C" fn count_err(_count: *mut c_int) -> c_int {
            100
        }

        unsafe extern "C" fn counted_memory(free: *mut usize, total: *mut usize) -> c_int {
            MEMORY_READS.fetch_add(1, Ordering::SeqCst);
            unsafe {
                *free = 0;
                *total = 0;
            }
            0
        }

        let mut api = cudart_api_with(set_device_ok);
        api.get_device_count = count_err;
        api.mem_get_info = counted_memory;

        let err = api.device_count().unwrap_err();
        assert_eq!(err, QueryError::DeviceCount { status: 100 });
        assert_eq!(MEMORY_READS.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn compute_capability_reads_major_then_minor() {
        unsafe extern "C" fn capability_attr(
            value: *mut c_int,
            attr: c_int,
            _device: c_int,
        ) -> c_int {
            unsafe {
                *value = match attr {
                    ATTR_COMPUTE_CAPABILITY_MAJOR => 8,
                    ATTR_COMPUTE_CAPABILITY_MINOR => 6,
                    _ => -1,
                };
            }
            0
        }

        let mut api = cudart_api_with(set_device_ok);
        api.device_get_attribute = capability_attr;

        assert_eq!(api.compute_capability(0).unwrap(), (8, 6));
    }
}
