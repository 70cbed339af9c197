//! Envelope encryption orchestration over a blob store.
//!
//! The manager composes the key wrapper, the content cipher, and an
//! injected [`BlobStore`] to provide transparent put/get and multipart
//! operations. Two key-sourcing modes exist per call:
//!
//! - **auto**: a fresh content key is generated and wrapped under the
//!   configured public key; the wrapped key travels with the object
//!   (metadata header, or sidecar during a multipart session).
//! - **caller-supplied** (`*_with_key` methods): the caller provides the
//!   content key out-of-band and no key material is ever persisted; the
//!   object is not self-describing.

use crate::blob_store::BlobStore;
use crate::config::EnvelopeConfig;
use crate::error::{CloudError, CloudResult};
use crate::multipart::MultipartKeySession;
use crate::stream::ChunkedDecryptingStream;
use crate::types::{ObjectBody, ObjectMetadata, PartReceipt, PutReceipt, ReadAccess};
use envault_crypto::{
    decrypt_chunked, encrypt_chunk, encrypt_chunked, ContentKey, KeyWrapper, WrappedKey,
};
use rand::rngs::OsRng;
use std::sync::Arc;
use tracing::{debug, warn};

/// Metadata header carrying the hex-encoded wrapped content key.
pub const WRAPPED_KEY_HEADER: &str = "wrapped-key";

/// Transparent client-side encryption for blob-store objects.
pub struct EnvelopeManager {
    store: Arc<dyn BlobStore>,
    config: EnvelopeConfig,
    wrapper: Option<KeyWrapper>,
}

impl EnvelopeManager {
    /// Creates a manager without key material; only the `*_with_key`
    /// operations are usable until a wrapper is set.
    pub fn new(store: Arc<dyn BlobStore>, config: EnvelopeConfig) -> CloudResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            wrapper: None,
        })
    }

    /// Creates a manager with a configured key wrapper for auto-key mode.
    pub fn with_key_wrapper(
        store: Arc<dyn BlobStore>,
        config: EnvelopeConfig,
        wrapper: KeyWrapper,
    ) -> CloudResult<Self> {
        let mut manager = Self::new(store, config)?;
        manager.set_key_wrapper(wrapper);
        Ok(manager)
    }

    /// Sets the key wrapper (e.g. after key material is unlocked).
    pub fn set_key_wrapper(&mut self, wrapper: KeyWrapper) {
        self.wrapper = Some(wrapper);
    }

    pub fn has_key_wrapper(&self) -> bool {
        self.wrapper.is_some()
    }

    fn wrapper(&self) -> CloudResult<&KeyWrapper> {
        self.wrapper.as_ref().ok_or_else(|| {
            CloudError::Config("no key pair configured for auto-key mode".to_string())
        })
    }

    /// Recovers the content key from an object's metadata envelope.
    fn unwrap_from_metadata(
        &self,
        metadata: &ObjectMetadata,
        bucket: &str,
        key: &str,
    ) -> CloudResult<ContentKey> {
        let wrapper = self.wrapper()?;
        let encoded = metadata.get(WRAPPED_KEY_HEADER).ok_or_else(|| {
            CloudError::KeyNotFound(format!(
                "{bucket}/{key} carries no {WRAPPED_KEY_HEADER} metadata header"
            ))
        })?;
        let wrapped = WrappedKey::from_hex(encoded)?;
        Ok(wrapper.unwrap(&wrapped)?)
    }

    // ------------------------------------------------------------------
    // Single-object put
    // ------------------------------------------------------------------

    /// Encrypts and stores an object under a freshly generated content key.
    ///
    /// The wrapped key is attached to the object's metadata, making the
    /// stored object self-describing for [`get_object`].
    ///
    /// [`get_object`]: EnvelopeManager::get_object
    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        plaintext: &[u8],
    ) -> CloudResult<PutReceipt> {
        let wrapper = self.wrapper()?;
        let content_key = ContentKey::generate(&mut OsRng);
        let wrapped = wrapper.wrap(&content_key, &mut OsRng)?;

        let mut metadata = ObjectMetadata::new();
        metadata.insert(WRAPPED_KEY_HEADER, wrapped.to_hex());

        let ciphertext = encrypt_chunked(&content_key, plaintext, self.config.chunk_size)?;
        let receipt = self
            .store
            .put(bucket, key, ciphertext, &metadata, ReadAccess::Private)
            .await?;

        debug!(
            "stored envelope-encrypted object {bucket}/{key} ({} bytes)",
            plaintext.len()
        );
        Ok(receipt)
    }

    /// Encrypts and stores an object under a caller-supplied content key.
    ///
    /// No key material is written to metadata; the caller is solely
    /// responsible for retaining the key.
    pub async fn put_object_with_key(
        &self,
        bucket: &str,
        key: &str,
        plaintext: &[u8],
        content_key: &ContentKey,
    ) -> CloudResult<PutReceipt> {
        let ciphertext = encrypt_chunked(content_key, plaintext, self.config.chunk_size)?;
        let receipt = self
            .store
            .put(bucket, key, ciphertext, &ObjectMetadata::new(), ReadAccess::Private)
            .await?;

        debug!(
            "stored caller-keyed object {bucket}/{key} ({} bytes)",
            plaintext.len()
        );
        Ok(receipt)
    }

    // ------------------------------------------------------------------
    // Single-object get
    // ------------------------------------------------------------------

    /// Fetches and eagerly decrypts an object via its metadata envelope.
    ///
    /// The whole body is buffered and decrypted before returning; any
    /// failure aborts with no plaintext produced.
    pub async fn get_object(&self, bucket: &str, key: &str) -> CloudResult<Vec<u8>> {
        let fetched = self.store.get(bucket, key).await?;
        let content_key = self.unwrap_from_metadata(&fetched.metadata, bucket, key)?;

        let ciphertext = read_body(fetched.body).await?;
        let plaintext = decrypt_chunked(&content_key, &ciphertext, self.config.chunk_size)?;

        debug!("fetched and decrypted {bucket}/{key} ({} bytes)", plaintext.len());
        Ok(plaintext)
    }

    /// Fetches an object and returns a lazy decrypting reader over its raw
    /// body stream.
    ///
    /// The wrapped key is resolved up front; a missing private key fails
    /// here, before any plaintext is served.
    pub async fn get_object_streaming(
        &self,
        bucket: &str,
        key: &str,
    ) -> CloudResult<ChunkedDecryptingStream<ObjectBody>> {
        let fetched = self.store.get(bucket, key).await?;
        let content_key = self.unwrap_from_metadata(&fetched.metadata, bucket, key)?;
        ChunkedDecryptingStream::new(fetched.body, content_key, self.config.chunk_size)
    }

    /// Fetches and eagerly decrypts an object with a caller-supplied key,
    /// ignoring any metadata envelope.
    pub async fn get_object_with_key(
        &self,
        bucket: &str,
        key: &str,
        content_key: &ContentKey,
    ) -> CloudResult<Vec<u8>> {
        let fetched = self.store.get(bucket, key).await?;
        let ciphertext = read_body(fetched.body).await?;
        Ok(decrypt_chunked(content_key, &ciphertext, self.config.chunk_size)?)
    }

    /// Streaming variant of [`get_object_with_key`].
    ///
    /// [`get_object_with_key`]: EnvelopeManager::get_object_with_key
    pub async fn get_object_streaming_with_key(
        &self,
        bucket: &str,
        key: &str,
        content_key: &ContentKey,
    ) -> CloudResult<ChunkedDecryptingStream<ObjectBody>> {
        let fetched = self.store.get(bucket, key).await?;
        ChunkedDecryptingStream::new(fetched.body, content_key.clone(), self.config.chunk_size)
    }

    // ------------------------------------------------------------------
    // Multipart lifecycle
    // ------------------------------------------------------------------

    /// Starts a multipart upload session.
    ///
    /// Generates and wraps a content key, persists it as a sidecar object
    /// readable by other authenticated actors in the upload flow, and puts
    /// the wrapped key into the initiate metadata so the completed object
    /// is self-describing. Returns the upload id.
    pub async fn initiate_multipart(&self, bucket: &str, key: &str) -> CloudResult<String> {
        let wrapper = self.wrapper()?;
        let content_key = ContentKey::generate(&mut OsRng);
        let wrapped = wrapper.wrap(&content_key, &mut OsRng)?;

        let session = MultipartKeySession::new(self.store.as_ref(), bucket, key);
        session.store_wrapped_key(&wrapped).await?;

        let mut metadata = ObjectMetadata::new();
        metadata.insert(WRAPPED_KEY_HEADER, wrapped.to_hex());
        let upload_id = self.store.initiate_multipart(bucket, key, &metadata).await?;

        debug!("initiated multipart session for {bucket}/{key} (upload {upload_id})");
        Ok(upload_id)
    }

    /// Encrypts and uploads one part of an open session.
    ///
    /// The content key is recovered from the sidecar on every call. Each
    /// part is one independent cipher unit at chunk index
    /// `part_number - 1`; every part except the last must be exactly the
    /// configured chunk size so the assembled object decrypts with the same
    /// chunk geometry.
    pub async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        part: &[u8],
    ) -> CloudResult<PartReceipt> {
        self.check_part(part_number, part)?;
        let wrapper = self.wrapper()?;

        let session = MultipartKeySession::new(self.store.as_ref(), bucket, key);
        let wrapped = session.fetch_wrapped_key().await?;
        let content_key = wrapper.unwrap(&wrapped)?;

        let ciphertext = encrypt_chunk(&content_key, (part_number - 1) as u64, part);
        let receipt = self
            .store
            .upload_part(bucket, key, upload_id, part_number, ciphertext)
            .await?;

        debug!("uploaded encrypted part {part_number} for {bucket}/{key}");
        Ok(receipt)
    }

    /// Caller-keyed variant of [`upload_part`]: no sidecar is consulted.
    ///
    /// Caller-keyed flows initiate and complete their upload directly
    /// against the blob store; only part encryption is augmented here.
    ///
    /// [`upload_part`]: EnvelopeManager::upload_part
    pub async fn upload_part_with_key(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        part: &[u8],
        content_key: &ContentKey,
    ) -> CloudResult<PartReceipt> {
        self.check_part(part_number, part)?;

        let ciphertext = encrypt_chunk(content_key, (part_number - 1) as u64, part);
        let receipt = self
            .store
            .upload_part(bucket, key, upload_id, part_number, ciphertext)
            .await?;

        debug!("uploaded caller-keyed part {part_number} for {bucket}/{key}");
        Ok(receipt)
    }

    /// Closes the session: removes the sidecar key object, then finalizes
    /// the underlying multipart upload. Returns the assembled object's
    /// location.
    ///
    /// Sidecar removal failure is cleanup: logged and non-fatal.
    pub async fn complete_multipart(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<PartReceipt>,
    ) -> CloudResult<String> {
        let session = MultipartKeySession::new(self.store.as_ref(), bucket, key);
        if let Err(err) = session.remove_wrapped_key().await {
            warn!("{err}");
        }

        let location = self
            .store
            .complete_multipart(bucket, key, upload_id, &parts)
            .await?;

        debug!("completed multipart session for {bucket}/{key}");
        Ok(location)
    }

    /// Abandons the session: aborts the underlying upload, then removes the
    /// sidecar key object so nothing is left orphaned.
    ///
    /// Sidecar removal failure is cleanup: logged and non-fatal.
    pub async fn abort_multipart(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> CloudResult<()> {
        self.store.abort_multipart(bucket, key, upload_id).await?;

        let session = MultipartKeySession::new(self.store.as_ref(), bucket, key);
        if let Err(err) = session.remove_wrapped_key().await {
            warn!("{err}");
        }

        debug!("aborted multipart session for {bucket}/{key}");
        Ok(())
    }

    fn check_part(&self, part_number: i32, part: &[u8]) -> CloudResult<()> {
        if part_number < 1 {
            return Err(CloudError::Config(format!(
                "part number must be >= 1, got {part_number}"
            )));
        }
        if part.len() > self.config.chunk_size {
            return Err(CloudError::Config(format!(
                "part of {} bytes exceeds the configured chunk size of {}",
                part.len(),
                self.config.chunk_size
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for EnvelopeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeManager")
            .field("config", &self.config)
            .field("has_key_wrapper", &self.wrapper.is_some())
            .finish()
    }
}

async fn read_body(mut body: ObjectBody) -> CloudResult<Vec<u8>> {
    use tokio::io::AsyncReadExt;

    let mut bytes = Vec::new();
    body.read_to_end(&mut bytes).await?;
    Ok(bytes)
}
