#![forbid(unsafe_code)]

use std::collections::TryReserveError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PakError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid pak: {0}")]
    Format(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("capacity: {0}")]
    Capacity(String),
}

impl From<TryReserveError> for PakError {
    fn from(e: TryReserveError) -> Self {
        PakError::Capacity(e.to_string())
    }
}

pub type PakResult<T> = Result<T, PakError>;
