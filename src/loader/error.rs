use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("unable to load {path} library to query for Nvidia GPUs: {reason}")]
    Open { path: String, reason: String },

    #[error("symbol lookup for {symbol} failed: {reason}")]
    Symbol { symbol: String, reason: String },
}
