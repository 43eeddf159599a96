//! Error types for the core crate.

use thiserror::Error;

/// Errors that can occur in core operations (cipher, parsing).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("invalid IV length: expected 16 bytes, got {0}")]
    InvalidIvLength(usize),

    #[error("invalid wallet address: {0}")]
    InvalidWalletAddress(String),

    #[error("ciphertext is not a whole number of cipher blocks")]
    TruncatedCiphertext,

    #[error("malformed padding in final cipher block")]
    MalformedPadding,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
