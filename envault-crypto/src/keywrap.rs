//! Asymmetric wrapping of content keys.
//!
//! A content key is wrapped with RSA-OAEP (SHA-256) under the recipient's
//! public key. The wrapped form is what gets persisted next to the object;
//! only the holder of the matching private key can recover the content key.
//!
//! A party configured with just the private key can still wrap: the public
//! half is reconstructed from the private key's modulus and public exponent.

use crate::cipher::ContentKey;
use crate::error::{CryptoError, CryptoResult};
use rand::{CryptoRng, RngCore};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

/// The encrypted form of a content key.
///
/// Opaque to the storage layer; [`WrappedKey::to_hex`] is the transport
/// encoding used in metadata headers and sidecar bodies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrappedKey(Vec<u8>);

impl WrappedKey {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn from_hex(encoded: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(encoded.trim())
            .map_err(|e| CryptoError::Encoding(e.to_string()))?;
        Ok(Self(bytes))
    }
}

/// Envelope operations over one configured RSA key pair.
///
/// Built from a private key (wrap + unwrap) or a public key alone
/// (wrap only).
pub struct KeyWrapper {
    public: RsaPublicKey,
    private: Option<RsaPrivateKey>,
}

impl KeyWrapper {
    /// Configures a wrapper from a private key.
    ///
    /// The public half is derived from the private key's modulus and public
    /// exponent, so no separately supplied public key is needed.
    pub fn from_private_key(private: RsaPrivateKey) -> Self {
        let public = private.to_public_key();
        Self {
            public,
            private: Some(private),
        }
    }

    /// Configures a wrap-only party. Unwrapping fails with
    /// [`CryptoError::MissingPrivateKey`].
    pub fn from_public_key(public: RsaPublicKey) -> Self {
        Self {
            public,
            private: None,
        }
    }

    pub fn has_private_key(&self) -> bool {
        self.private.is_some()
    }

    /// Wraps a content key under the configured public key.
    ///
    /// Fails deterministically if the payload is too large for the modulus.
    pub fn wrap(
        &self,
        content_key: &ContentKey,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> CryptoResult<WrappedKey> {
        let wrapped = self
            .public
            .encrypt(rng, Oaep::new::<Sha256>(), content_key.as_bytes())
            .map_err(|e| CryptoError::Wrap(e.to_string()))?;
        Ok(WrappedKey(wrapped))
    }

    /// Unwraps a content key with the configured private key.
    pub fn unwrap(&self, wrapped: &WrappedKey) -> CryptoResult<ContentKey> {
        let private = self.private.as_ref().ok_or(CryptoError::MissingPrivateKey)?;

        let bytes = private
            .decrypt(Oaep::new::<Sha256>(), wrapped.as_bytes())
            .map_err(|e| CryptoError::Unwrap(e.to_string()))?;

        ContentKey::try_from_slice(&bytes)
    }
}
