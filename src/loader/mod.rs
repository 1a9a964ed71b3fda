pub mod error;
pub mod library;

pub use error::LoaderError;
pub use library::CudaLibrary;
