use thiserror::Error;

use crate::backend::ActivationError;
use crate::loader::LoaderError;

/// Initialization failed and no handle exists: either the library image or
/// one of its symbols could not be loaded, or neither backend activated.
#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    Load(#[from] LoaderError),

    #[error(transparent)]
    Activation(#[from] ActivationError),
}
