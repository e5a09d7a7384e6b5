use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The buffer handed to a fixed-size decoder had the wrong length.
    #[error("invalid packet size: expected {expected} bytes, got {actual}")]
    InvalidPacketSize { expected: usize, actual: usize },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
