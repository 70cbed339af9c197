//! The blob-store capability consumed by the envelope layer.
//!
//! The envelope manager takes this trait as an injected dependency and
//! augments only the operations it cares about; it never re-exposes the
//! storage API wholesale. Retry and timeout policy belong to the
//! implementation behind this trait, not to the envelope layer.

use crate::error::TransportResult;
use crate::types::{FetchedObject, ObjectMetadata, PartReceipt, PutReceipt, ReadAccess};
use async_trait::async_trait;

/// Remote blob storage operations.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores an object body with the given metadata and read access.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        metadata: &ObjectMetadata,
        access: ReadAccess,
    ) -> TransportResult<PutReceipt>;

    /// Fetches an object's body stream and metadata.
    async fn get(&self, bucket: &str, key: &str) -> TransportResult<FetchedObject>;

    /// Deletes an object. Deleting a missing object is not an error.
    async fn delete(&self, bucket: &str, key: &str) -> TransportResult<()>;

    /// Starts a multipart upload; the metadata is applied to the completed
    /// object.
    async fn initiate_multipart(
        &self,
        bucket: &str,
        key: &str,
        metadata: &ObjectMetadata,
    ) -> TransportResult<String>;

    /// Uploads one part of an open multipart upload.
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> TransportResult<PartReceipt>;

    /// Finalizes a multipart upload from the given part receipts, returning
    /// the location of the assembled object.
    async fn complete_multipart(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[PartReceipt],
    ) -> TransportResult<String>;

    /// Abandons a multipart upload and discards its parts.
    async fn abort_multipart(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> TransportResult<()>;
}
