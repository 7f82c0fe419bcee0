use thiserror::Error;

/// Errors returned by generator construction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("short code length must be at least 1")]
    ZeroLength,
}
