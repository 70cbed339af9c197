//! Cryptographic primitives for Envault envelope encryption.
//!
//! Provides the two layers of the envelope scheme:
//!
//! 1. **Content cipher**: AES-128-CFB applied per chunk. A chunk is one
//!    independent cipher unit with its own derived IV, so any chunk can be
//!    decrypted without state from its predecessors. Ciphertext length
//!    equals plaintext length.
//!
//! 2. **Key wrapping**: the per-object content key is wrapped with
//!    RSA-OAEP (SHA-256) under the recipient's public key. The wrapped key
//!    travels hex-encoded in object metadata or as a sidecar object body.
//!
//! This crate is synchronous and performs no I/O; `envault-cloud` drives it
//! against the blob store.

mod cipher;
mod error;
mod keywrap;

pub use cipher::{
    decrypt_chunk, decrypt_chunked, encrypt_chunk, encrypt_chunked, ContentKey, CONTENT_KEY_SIZE,
};
pub use error::{CryptoError, CryptoResult};
pub use keywrap::{KeyWrapper, WrappedKey};
