//! Lazy chunk-at-a-time decryption of a ciphertext byte source.
//!
//! The reader pulls one chunk of ciphertext at a time from the underlying
//! source, decrypts it as an independent unit, and serves plaintext from an
//! internal buffer. Only one chunk is ever resident, so objects of any size
//! decrypt in constant memory.
//!
//! Output is byte-identical regardless of read granularity: single-byte
//! reads, arbitrary caller buffers, and [`read_to_end`] all yield the same
//! sequence.
//!
//! [`read_to_end`]: ChunkedDecryptingStream::read_to_end

use crate::error::{CloudError, CloudResult};
use envault_crypto::{decrypt_chunk, ContentKey};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Pull-based decrypting reader over a ciphertext source.
///
/// The chunk size must match the one used at encryption time. Not for
/// concurrent use: reads take `&mut self`. Forward-only; re-reading means
/// re-opening from the source's start. Dropping the stream drops the
/// underlying source.
pub struct ChunkedDecryptingStream<R> {
    source: R,
    key: ContentKey,
    chunk_size: usize,
    /// Decrypted bytes of the current chunk.
    buffer: Vec<u8>,
    /// Next unserved position within `buffer`; always <= buffer.len().
    cursor: usize,
    /// Index of the next chunk to pull from the source.
    chunk_index: u64,
    /// Set exactly once, on the chunk shorter than `chunk_size`.
    last_chunk: bool,
    exhausted: bool,
}

impl<R: AsyncRead + Unpin> ChunkedDecryptingStream<R> {
    pub fn new(source: R, key: ContentKey, chunk_size: usize) -> CloudResult<Self> {
        if chunk_size == 0 {
            return Err(CloudError::Config(
                "chunk size must be at least 1 byte".to_string(),
            ));
        }
        Ok(Self {
            source,
            key,
            chunk_size,
            buffer: Vec::new(),
            cursor: 0,
            chunk_index: 0,
            last_chunk: false,
            exhausted: false,
        })
    }

    /// Reads decrypted bytes into `buf`.
    ///
    /// Returns the number of bytes written; `Ok(0)` means end of stream
    /// (for a non-empty `buf`). A single call may return fewer bytes than
    /// `buf` holds when a chunk boundary intervenes.
    pub async fn read(&mut self, buf: &mut [u8]) -> CloudResult<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            if self.exhausted {
                return Ok(0);
            }

            if self.cursor < self.buffer.len() {
                let n = (self.buffer.len() - self.cursor).min(buf.len());
                buf[..n].copy_from_slice(&self.buffer[self.cursor..self.cursor + n]);
                self.cursor += n;
                if self.cursor == self.buffer.len() && self.last_chunk {
                    self.exhausted = true;
                }
                return Ok(n);
            }

            // Current chunk is drained.
            if self.last_chunk {
                self.exhausted = true;
                return Ok(0);
            }
            self.fill_chunk().await?;
        }
    }

    /// Reads a single decrypted byte; `None` at end of stream.
    pub async fn read_byte(&mut self) -> CloudResult<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.read(&mut byte).await? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// Drains the remaining plaintext into one buffer.
    pub async fn read_to_end(&mut self) -> CloudResult<Vec<u8>> {
        let mut out = Vec::new();
        let mut buf = vec![0u8; self.chunk_size.min(64 * 1024)];
        loop {
            let n = self.read(&mut buf).await?;
            if n == 0 {
                return Ok(out);
            }
            out.extend_from_slice(&buf[..n]);
        }
    }

    /// Pulls and decrypts the next chunk from the source.
    ///
    /// Reads until the chunk is full or the source reports end-of-input; a
    /// short chunk marks the stream's final chunk. The chunk is decrypted
    /// as one independent unit under its own index-derived IV.
    async fn fill_chunk(&mut self) -> CloudResult<()> {
        let mut encrypted = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < self.chunk_size {
            let n = self.source.read(&mut encrypted[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        encrypted.truncate(filled);

        if filled < self.chunk_size {
            self.last_chunk = true;
        }

        self.buffer = decrypt_chunk(&self.key, self.chunk_index, &encrypted);
        self.chunk_index += 1;
        self.cursor = 0;
        Ok(())
    }

    /// Consumes the stream, returning the underlying source.
    pub fn into_inner(self) -> R {
        self.source
    }
}

impl<R> std::fmt::Debug for ChunkedDecryptingStream<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedDecryptingStream")
            .field("chunk_size", &self.chunk_size)
            .field("chunk_index", &self.chunk_index)
            .field("buffered", &(self.buffer.len() - self.cursor))
            .field("last_chunk", &self.last_chunk)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}
