//! Error types for the auth module.

use thiserror::Error;

/// Errors from the ledger oracle.
///
/// Resolution maps all of these to a deny (fail closed); they are kept
/// distinct for logging.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Transport-level failure reaching the RPC endpoint.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The RPC endpoint returned an error object.
    #[error("rpc error: {0}")]
    Rpc(String),

    /// The RPC response could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The asset's registration id is not a valid token id.
    #[error("invalid registration id: {0}")]
    InvalidRegistrationId(String),

    /// Store lookup failed while resolving grants.
    #[error("store error: {0}")]
    Store(#[from] vaultstream_store::StoreError),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
