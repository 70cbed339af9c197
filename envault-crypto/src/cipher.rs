//! Content cipher: AES-128-CFB applied one chunk at a time.
//!
//! Each chunk is encrypted as an independent unit under the content key and
//! an IV derived from the key plus the chunk's position. Decrypting chunk N
//! therefore needs no state from chunks 0..N, which is what lets the
//! streaming reader and multipart uploads transform chunks in isolation.
//!
//! CFB is a keystream mode: ciphertext length always equals plaintext
//! length, and callers never see block alignment.

use crate::error::{CryptoError, CryptoResult};
use aes::cipher::{AsyncStreamCipher, KeyIvInit};
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

type Aes128CfbEnc = cfb_mode::Encryptor<aes::Aes128>;
type Aes128CfbDec = cfb_mode::Decryptor<aes::Aes128>;

/// Content key length in bytes (AES-128).
pub const CONTENT_KEY_SIZE: usize = 16;

/// IV length in bytes (AES block size).
const IV_SIZE: usize = 16;

/// Domain separator for per-chunk IV derivation.
const CHUNK_IV_DOMAIN: &[u8] = b"envault.chunk-iv.v1";

/// Symmetric key encrypting one object's body.
///
/// Generated fresh for every put or multipart initiate and never reused
/// across objects. Zeroized on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ContentKey([u8; CONTENT_KEY_SIZE]);

impl ContentKey {
    /// Generates a new content key from the supplied CSPRNG.
    pub fn generate(rng: &mut (impl RngCore + CryptoRng)) -> Self {
        let mut bytes = [0u8; CONTENT_KEY_SIZE];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; CONTENT_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Builds a key from a caller-supplied slice.
    pub fn try_from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let bytes: [u8; CONTENT_KEY_SIZE] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: CONTENT_KEY_SIZE,
                    actual: bytes.len(),
                })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; CONTENT_KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ContentKey(..)")
    }
}

/// Derives the IV for one chunk: SHA-256(domain || key || index), truncated
/// to the AES block size.
///
/// The key's raw bytes are never used as an IV directly, and distinct chunk
/// indices under the same key always get distinct IVs.
fn chunk_iv(key: &ContentKey, chunk_index: u64) -> [u8; IV_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(CHUNK_IV_DOMAIN);
    hasher.update(key.as_bytes());
    hasher.update(chunk_index.to_be_bytes());
    let digest = hasher.finalize();

    let mut iv = [0u8; IV_SIZE];
    iv.copy_from_slice(&digest[..IV_SIZE]);
    iv
}

/// Encrypts one chunk as an independent cipher unit.
pub fn encrypt_chunk(key: &ContentKey, chunk_index: u64, plaintext: &[u8]) -> Vec<u8> {
    let iv = chunk_iv(key, chunk_index);
    let mut buf = plaintext.to_vec();
    Aes128CfbEnc::new(key.as_bytes().into(), (&iv).into()).encrypt(&mut buf);
    buf
}

/// Decrypts one chunk previously produced by [`encrypt_chunk`] with the same
/// key and chunk index.
pub fn decrypt_chunk(key: &ContentKey, chunk_index: u64, ciphertext: &[u8]) -> Vec<u8> {
    let iv = chunk_iv(key, chunk_index);
    let mut buf = ciphertext.to_vec();
    Aes128CfbDec::new(key.as_bytes().into(), (&iv).into()).decrypt(&mut buf);
    buf
}

/// Encrypts a whole buffer in `chunk_size` units, indices starting at 0.
///
/// The output is the concatenation of the per-chunk ciphertexts and has the
/// same length as the input. The final chunk may be shorter than
/// `chunk_size`; an exact-multiple input produces only full chunks.
pub fn encrypt_chunked(
    key: &ContentKey,
    plaintext: &[u8],
    chunk_size: usize,
) -> CryptoResult<Vec<u8>> {
    if chunk_size == 0 {
        return Err(CryptoError::InvalidChunkSize);
    }

    let mut out = Vec::with_capacity(plaintext.len());
    for (index, chunk) in plaintext.chunks(chunk_size).enumerate() {
        out.extend_from_slice(&encrypt_chunk(key, index as u64, chunk));
    }
    Ok(out)
}

/// Inverse of [`encrypt_chunked`]; `chunk_size` must match the value used at
/// encryption time.
pub fn decrypt_chunked(
    key: &ContentKey,
    ciphertext: &[u8],
    chunk_size: usize,
) -> CryptoResult<Vec<u8>> {
    if chunk_size == 0 {
        return Err(CryptoError::InvalidChunkSize);
    }

    let mut out = Vec::with_capacity(ciphertext.len());
    for (index, chunk) in ciphertext.chunks(chunk_size).enumerate() {
        out.extend_from_slice(&decrypt_chunk(key, index as u64, chunk));
    }
    Ok(out)
}
