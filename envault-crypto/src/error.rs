//! Crypto error types.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in cipher and key-wrapping operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid content key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("no private key available; unable to unwrap the content key")]
    MissingPrivateKey,

    #[error("key wrap failed: {0}")]
    Wrap(String),

    #[error("key unwrap failed (wrong key or corrupted ciphertext): {0}")]
    Unwrap(String),

    #[error("invalid wrapped key encoding: {0}")]
    Encoding(String),

    #[error("chunk size must be at least 1 byte")]
    InvalidChunkSize,
}
