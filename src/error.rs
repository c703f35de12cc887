use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvolveError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Allocation failed: {0}")]
    Allocation(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Communication error: {0}")]
    Comm(String),

    #[error("Peer rank {0} disconnected")]
    PeerDisconnected(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConvolveError>;
