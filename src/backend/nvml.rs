use std::ffi::c_void;
use std::os::raw::{c_char, c_int, c_uint};
use std::ptr;

use log::debug;

use super::error::QueryError;
use super::{DeviceBackend, LibraryKind, MemoryReading};
use crate::loader::{CudaLibrary, LoaderError};

pub(crate) const NVML_SUCCESS: c_int = 0;

// Length of the scratch buffer handed to the NVML string getters.
const TEXT_BUFFER_LEN: usize = 96;

/// Opaque per-device handle resolved by index for each query.
type NvmlDevice = *mut c_void;

#[repr(C)]
struct NvmlMemory {
    total: u64,
    free: u64,
    used: u64,
}

/// Entry-point table for the driver-management vocabulary. The metadata
/// slots at the bottom are only exercised in verbose mode and never fail a
/// query.
#[derive(Debug, Clone, Copy)]
pub struct NvmlApi {
    init: unsafe extern "C" fn() -> c_int,
    shutdown: unsafe extern "C" fn() -> c_int,
    device_get_handle_by_index: unsafe extern "C" fn(c_uint, *mut NvmlDevice) -> c_int,
    device_get_memory_info: unsafe extern "C" fn(NvmlDevice, *mut NvmlMemory) -> c_int,
    device_get_count: unsafe extern "C" fn(*mut c_uint) -> c_int,
    device_get_cuda_compute_capability:
        unsafe extern "C" fn(NvmlDevice, *mut c_int, *mut c_int) -> c_int,
    system_get_driver_version: unsafe extern "C" fn(*mut c_char, c_uint) -> c_int,
    device_get_name: unsafe extern "C" fn(NvmlDevice, *mut c_char, c_uint) -> c_int,
    device_get_serial: unsafe extern "C" fn(NvmlDevice, *mut c_char, c_uint) -> c_int,
    device_get_vbios_version: unsafe extern "C" fn(NvmlDevice, *mut c_char, c_uint) -> c_int,
    device_get_board_part_number: unsafe extern "C" fn(NvmlDevice, *mut c_char, c_uint) -> c_int,
    device_get_brand: unsafe extern "C" fn(NvmlDevice, *mut c_int) -> c_int,
    verbose: bool,
}

impl NvmlApi {
    pub fn resolve(lib: &CudaLibrary, verbose: bool) -> Result<Self, LoaderError> {
        unsafe {
            Ok(Self {
                init: lib.get(b"nvmlInit_v2\0")?,
                shutdown: lib.get(b"nvmlShutdown\0")?,
                device_get_handle_by_index: lib.get(b"nvmlDeviceGetHandleByIndex\0")?,
                device_get_memory_info: lib.get(b"nvmlDeviceGetMemoryInfo\0")?,
                device_get_count: lib.get(b"nvmlDeviceGetCount_v2\0")?,
                device_get_cuda_compute_capability: lib
                    .get(b"nvmlDeviceGetCudaComputeCapability\0")?,
                system_get_driver_version: lib.get(b"nvmlSystemGetDriverVersion\0")?,
                device_get_name: lib.get(b"nvmlDeviceGetName\0")?,
                device_get_serial: lib.get(b"nvmlDeviceGetSerial\0")?,
                device_get_vbios_version: lib.get(b"nvmlDeviceGetVbiosVersion\0")?,
                device_get_board_part_number: lib.get(b"nvmlDeviceGetBoardPartNumber\0")?,
                device_get_brand: lib.get(b"nvmlDeviceGetBrand\0")?,
                verbose,
            })
        }
    }

    pub(crate) fn activate(&self) -> c_int {
        unsafe { (self.init)() }
    }

    pub(crate) fn shutdown(&self) -> c_int {
        unsafe { (self.shutdown)() }
    }

    pub(crate) fn log_driver_version(&self) {
        let mut buf = [0 as c_char; TEXT_BUFFER_LEN];
        let status =
            unsafe { (self.system_get_driver_version)(buf.as_mut_ptr(), TEXT_BUFFER_LEN as c_uint) };
        if status != NVML_SUCCESS {
            debug!("nvmlSystemGetDriverVersion failed: {}", status);
        } else {
            debug!("CUDA driver version: {}", buffer_text(&buf));
        }
    }

    fn device(&self, index: u32) -> Result<NvmlDevice, QueryError> {
        let mut device: NvmlDevice = ptr::null_mut();
        let status = unsafe { (self.device_get_handle_by_index)(index as c_uint, &mut device) };
        if status != NVML_SUCCESS {
            return Err(QueryError::DeviceHandle { index, status });
        }
        Ok(device)
    }

    // Extra card detail for verbose mode; lookup failures are reported but
    // never fail the surrounding query.
    fn log_device_metadata(&self, index: u32, device: NvmlDevice) {
        let getters: [(&str, unsafe extern "C" fn(NvmlDevice, *mut c_char, c_uint) -> c_int); 4] = [
            ("device name", self.device_get_name),
            ("part number", self.device_get_board_part_number),
            ("S/N", self.device_get_serial),
            ("vbios version", self.device_get_vbios_version),
        ];

        for (label, getter) in getters {
            let mut buf = [0 as c_char; TEXT_BUFFER_LEN];
            let status = unsafe { getter(device, buf.as_mut_ptr(), TEXT_BUFFER_LEN as c_uint) };
            if status != NVML_SUCCESS {
                debug!("CUDA {} lookup failed: {}", label, status);
            } else {
                debug!("[{}] CUDA {}: {}", index, label, buffer_text(&buf));
            }
        }

        let mut brand: c_int = 0;
        let status = unsafe { (self.device_get_brand)(device, &mut brand) };
        if status != NVML_SUCCESS {
            debug!("nvmlDeviceGetBrand failed: {}", status);
        } else {
            debug!("[{}] CUDA brand: {}", index, brand);
        }
    }
}

impl DeviceBackend for NvmlApi {
    fn kind(&self) -> LibraryKind {
        LibraryKind::Nvml
    }

    fn device_count(&self) -> Result<u32, QueryError> {
        let mut count: c_uint = 0;
        let status = unsafe { (self.device_get_count)(&mut count) };
        if status != NVML_SUCCESS {
            return Err(QueryError::DeviceCount { status });
        }
        Ok(count)
    }

    fn memory_info(&self, index: u32) -> Result<MemoryReading, QueryError> {
        let device = self.device(index)?;

        let mut memory = NvmlMemory {
            total: 0,
            free: 0,
            used: 0,
        };
        let status = unsafe { (self.device_get_memory_info)(device, &mut memory) };
        if status != NVML_SUCCESS {
            return Err(QueryError::MemoryInfo { index, status });
        }

        if self.verbose {
            self.log_device_metadata(index, device);
            debug!("[{}] CUDA totalMem {}", index, memory.total);
            debug!("[{}] CUDA freeMem {}", index, memory.free);
        }

        Ok(MemoryReading {
            total: memory.total,
            free: memory.free,
        })
    }

    fn compute_capability(&self, index: u32) -> Result<(i32, i32), QueryError> {
        let device = self.device(index)?;

        let mut major: c_int = 0;
        let mut minor: c_int = 0;
        let status =
            unsafe { (self.device_get_cuda_compute_capability)(device, &mut major, &mut minor) };
        if status != NVML_SUCCESS {
            return Err(QueryError::ComputeCapability { index, status });
        }
        Ok((major, minor))
    }
}

fn buffer_text(buf: &[c_char]) -> String {
    let bytes: Vec<u8> = buf
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}
