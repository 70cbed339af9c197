//! Sidecar key objects for multipart upload sessions.
//!
//! Object metadata can only be attached when a multipart upload is
//! initiated, so the wrapped content key also lives in its own sidecar
//! object for the duration of the session: each part upload fetches and
//! unwraps it, and completing (or aborting) the session removes it.

use crate::blob_store::BlobStore;
use crate::error::{CloudError, CloudResult, TransportError};
use crate::types::{ObjectMetadata, ReadAccess};
use envault_crypto::WrappedKey;

/// Suffix appended to the object key to name its sidecar key object.
pub const SIDECAR_SUFFIX: &str = ".key";

/// Returns the sidecar key object name for an object key.
pub fn sidecar_key(object_key: &str) -> String {
    format!("{object_key}{SIDECAR_SUFFIX}")
}

/// Wrapped-key storage for one open multipart session.
pub(crate) struct MultipartKeySession<'a> {
    store: &'a dyn BlobStore,
    bucket: &'a str,
    object_key: &'a str,
}

impl<'a> MultipartKeySession<'a> {
    pub(crate) fn new(store: &'a dyn BlobStore, bucket: &'a str, object_key: &'a str) -> Self {
        Self {
            store,
            bucket,
            object_key,
        }
    }

    fn sidecar(&self) -> String {
        sidecar_key(self.object_key)
    }

    /// Persists the wrapped key as the sidecar object's entire body.
    ///
    /// The sidecar is granted authenticated-read access so other authorized
    /// actors in the same upload flow can encrypt parts.
    pub(crate) async fn store_wrapped_key(&self, wrapped: &WrappedKey) -> CloudResult<()> {
        self.store
            .put(
                self.bucket,
                &self.sidecar(),
                wrapped.to_hex().into_bytes(),
                &ObjectMetadata::new(),
                ReadAccess::AuthenticatedRead,
            )
            .await?;
        Ok(())
    }

    /// Fetches the wrapped key back from the sidecar object.
    ///
    /// A missing sidecar means the session is not open (never initiated, or
    /// already completed/aborted).
    pub(crate) async fn fetch_wrapped_key(&self) -> CloudResult<WrappedKey> {
        let sidecar = self.sidecar();
        let fetched = self.store.get(self.bucket, &sidecar).await.map_err(|e| {
            match e {
                TransportError::NotFound { .. } => CloudError::KeyNotFound(format!(
                    "no sidecar key object at {}/{sidecar}; multipart session is not open",
                    self.bucket
                )),
                other => CloudError::Transport(other),
            }
        })?;

        let mut body = fetched.body;
        let mut encoded = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut body, &mut encoded).await?;

        let encoded = String::from_utf8(encoded).map_err(|_| {
            CloudError::KeyNotFound(format!(
                "sidecar key object {}/{sidecar} is not valid text",
                self.bucket
            ))
        })?;
        Ok(WrappedKey::from_hex(&encoded)?)
    }

    /// Deletes the sidecar object.
    ///
    /// Callers treat failure here as cleanup: logged, never fatal to an
    /// already-successful primary operation.
    pub(crate) async fn remove_wrapped_key(&self) -> Result<(), CloudError> {
        let sidecar = self.sidecar();
        self.store
            .delete(self.bucket, &sidecar)
            .await
            .map_err(|source| CloudError::Cleanup {
                resource: format!("{}/{sidecar}", self.bucket),
                source,
            })
    }
}
