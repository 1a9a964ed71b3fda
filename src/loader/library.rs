use libloading::{Library, Symbol};
use std::path::Path;

use log::debug;

use super::LoaderError;

/// An open shared-library image. Dropping it unloads the image, so resolved
/// function pointers must not outlive the owning `CudaLibrary`.
#[derive(Debug)]
pub struct CudaLibrary {
    lib: Library,
    path: String,
}

impl CudaLibrary {
    pub fn open(path: &Path) -> Result<Self, LoaderError> {
        let display = path.display().to_string();

        let lib = unsafe {
            Library::new(path).map_err(|e| {
                debug!("library {} load err: {}", display, e);
                LoaderError::Open {
                    path: display.clone(),
                    reason: e.to_string(),
                }
            })?
        };

        Ok(Self { lib, path: display })
    }

    /// Resolve a NUL-terminated symbol name to a typed function pointer,
    /// copied out of the borrow.
    ///
    /// # Safety
    ///
    /// `T` must be the exact `unsafe extern "C" fn` signature of the symbol,
    /// and the returned pointer must not be called after `self` is dropped.
    pub unsafe fn get<T: Copy>(&self, symbol: &[u8]) -> Result<T, LoaderError> {
        unsafe {
            let resolved: Symbol<'_, T> = self.lib.get(symbol).map_err(|e| {
                let name = symbol.strip_suffix(b"\0").unwrap_or(symbol);
                LoaderError::Symbol {
                    symbol: String::from_utf8_lossy(name).into_owned(),
                    reason: e.to_string(),
                }
            })?;
            Ok(*resolved)
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}
