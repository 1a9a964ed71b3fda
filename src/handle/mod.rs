pub mod error;
pub mod handle;

pub use error::InitError;
pub use handle::CudaHandle;
