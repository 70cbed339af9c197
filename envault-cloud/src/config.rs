//! Envelope encryption configuration.

use crate::error::{CloudError, CloudResult};
use serde::{Deserialize, Serialize};

/// Default cipher chunk size: 5 MiB, the conventional S3 part size.
pub const DEFAULT_CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// Configuration for the envelope manager.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    /// Size in bytes of one cipher chunk.
    ///
    /// Object bodies are encrypted in units of this size, and multipart
    /// parts must be exactly this size (the final part may be shorter) so
    /// the completed object decrypts with the same chunk geometry.
    pub chunk_size: usize,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl EnvelopeConfig {
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self { chunk_size }
    }

    pub fn validate(&self) -> CloudResult<()> {
        if self.chunk_size == 0 {
            return Err(CloudError::Config(
                "chunk size must be at least 1 byte".to_string(),
            ));
        }
        Ok(())
    }
}
