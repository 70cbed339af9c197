//! Error types for blob-store envelope operations.

use envault_crypto::CryptoError;
use thiserror::Error;

/// Result type for envelope operations.
pub type CloudResult<T> = Result<T, CloudError>;

/// Result type for raw blob-store transport calls.
pub type TransportResult<T> = Result<T, TransportError>;

/// Failure surfaced by a [`crate::blob_store::BlobStore`] implementation.
///
/// Opaque to the envelope layer: transport errors are passed through
/// unretried. The one distinction the envelope layer needs is "the object
/// does not exist", which drives sidecar-missing handling.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("blob store operation failed: {0}")]
    Other(String),
}

/// Errors that can occur in envelope encryption operations.
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("no private key configured; unable to unwrap the content key")]
    MissingPrivateKey,

    #[error("crypto operation failed: {0}")]
    Crypto(CryptoError),

    #[error("wrapped key not found: {0}")]
    KeyNotFound(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("cleanup of {resource} failed: {source}")]
    Cleanup {
        resource: String,
        source: TransportError,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("object stream read failed: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CryptoError> for CloudError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::MissingPrivateKey => CloudError::MissingPrivateKey,
            other => CloudError::Crypto(other),
        }
    }
}
