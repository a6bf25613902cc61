//! Crate error type.

use thiserror::Error;

use crate::probe::DecodeError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("probe decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("report encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("probe queue closed")]
    QueueClosed,

    #[error("engine stopped")]
    EngineStopped,
}

pub type Result<T> = std::result::Result<T, Error>;
