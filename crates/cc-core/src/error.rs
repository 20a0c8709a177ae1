use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompactError {
    #[error("Invalid codebook: {0}")]
    InvalidCodebook(String),
    #[error(
        "Round-trip violation: restored {restored_len} bytes from {original_len}, \
         first mismatch at byte {first_mismatch}"
    )]
    RoundTripViolation {
        original_len: usize,
        restored_len: usize,
        first_mismatch: usize,
    },
    #[error("Invalid similarity threshold: {0} (expected 0.0..=1.0)")]
    InvalidThreshold(f64),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CompactError>;
