//! Shared test helpers: an in-memory blob store double, plus an
//! S3Transport factory for the MinIO integration tests.

use async_trait::async_trait;
use envault_cloud::blob_store::BlobStore;
use envault_cloud::error::{TransportError, TransportResult};
use envault_cloud::s3_transport::S3Transport;
use envault_cloud::types::{
    FetchedObject, ObjectMetadata, PartReceipt, PutReceipt, ReadAccess,
};
use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

/// One stored object with everything the tests need to inspect.
#[derive(Clone)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub metadata: ObjectMetadata,
    pub access: ReadAccess,
}

struct PendingUpload {
    bucket: String,
    key: String,
    metadata: ObjectMetadata,
    parts: BTreeMap<i32, Vec<u8>>,
}

/// In-memory [`BlobStore`] with S3-like semantics (idempotent delete,
/// initiate metadata applied to the completed object).
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<(String, String), StoredObject>>,
    uploads: Mutex<HashMap<String, PendingUpload>>,
    upload_counter: AtomicU64,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.stored(bucket, key).is_some()
    }

    pub fn has_upload(&self, upload_id: &str) -> bool {
        self.uploads.lock().unwrap().contains_key(upload_id)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        metadata: &ObjectMetadata,
        access: ReadAccess,
    ) -> TransportResult<PutReceipt> {
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body,
                metadata: metadata.clone(),
                access,
            },
        );
        Ok(PutReceipt::default())
    }

    async fn get(&self, bucket: &str, key: &str) -> TransportResult<FetchedObject> {
        let stored = self
            .stored(bucket, key)
            .ok_or_else(|| TransportError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })?;
        Ok(FetchedObject {
            body: Box::pin(Cursor::new(stored.body)),
            metadata: stored.metadata,
        })
    }

    async fn delete(&self, bucket: &str, key: &str) -> TransportResult<()> {
        self.objects
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn initiate_multipart(
        &self,
        bucket: &str,
        key: &str,
        metadata: &ObjectMetadata,
    ) -> TransportResult<String> {
        let upload_id = format!("upload-{}", self.upload_counter.fetch_add(1, Ordering::SeqCst));
        self.uploads.lock().unwrap().insert(
            upload_id.clone(),
            PendingUpload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                metadata: metadata.clone(),
                parts: BTreeMap::new(),
            },
        );
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        _bucket: &str,
        _key: &str,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> TransportResult<PartReceipt> {
        let mut uploads = self.uploads.lock().unwrap();
        let upload = uploads.get_mut(upload_id).ok_or_else(|| {
            TransportError::Other(format!("no such upload: {upload_id}"))
        })?;
        upload.parts.insert(part_number, body);
        Ok(PartReceipt {
            part_number,
            e_tag: Some(format!("etag-{part_number}")),
        })
    }

    async fn complete_multipart(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[PartReceipt],
    ) -> TransportResult<String> {
        let upload = self
            .uploads
            .lock()
            .unwrap()
            .remove(upload_id)
            .ok_or_else(|| TransportError::Other(format!("no such upload: {upload_id}")))?;

        let mut receipts: Vec<&PartReceipt> = parts.iter().collect();
        receipts.sort_by_key(|r| r.part_number);

        let mut body = Vec::new();
        for receipt in receipts {
            let part = upload.parts.get(&receipt.part_number).ok_or_else(|| {
                TransportError::Other(format!(
                    "part {} was never uploaded for {upload_id}",
                    receipt.part_number
                ))
            })?;
            body.extend_from_slice(part);
        }

        self.objects.lock().unwrap().insert(
            (upload.bucket, upload.key),
            StoredObject {
                body,
                metadata: upload.metadata,
                access: ReadAccess::Private,
            },
        );
        Ok(format!("mem://{bucket}/{key}"))
    }

    async fn abort_multipart(
        &self,
        _bucket: &str,
        _key: &str,
        upload_id: &str,
    ) -> TransportResult<()> {
        self.uploads
            .lock()
            .unwrap()
            .remove(upload_id)
            .map(|_| ())
            .ok_or_else(|| TransportError::Other(format!("no such upload: {upload_id}")))
    }
}

/// S3Transport pointing at local MinIO (docker-compose.test.yml).
pub async fn test_transport() -> S3Transport {
    S3Transport::new(
        Some("us-east-1".to_string()),
        Some("http://localhost:9000".to_string()),
    )
    .await
}

/// Per-test unique object key prefix to prevent collisions.
pub fn unique_prefix() -> String {
    format!("test-runs/{}", Uuid::new_v4())
}
