//! S3 implementation of the blob-store capability.
//!
//! Thin mapping from [`BlobStore`] onto `aws-sdk-s3`. Credentials come from
//! the default provider chain; retry and timeout behavior is whatever the
//! SDK client was configured with. The endpoint override (with path-style
//! addressing) exists for MinIO in testing.

use crate::blob_store::BlobStore;
use crate::error::{TransportError, TransportResult};
use crate::types::{FetchedObject, ObjectMetadata, PartReceipt, PutReceipt, ReadAccess};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, ObjectCannedAcl};
use aws_sdk_s3::Client as S3Client;
use tracing::debug;

/// S3 transport for encrypted object storage.
pub struct S3Transport {
    client: S3Client,
}

impl S3Transport {
    /// Builds a transport from the default AWS config chain.
    pub async fn new(region: Option<String>, endpoint_override: Option<String>) -> Self {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let mut config_builder = aws_sdk_s3::config::Builder::from(&sdk_config);

        if let Some(region) = region {
            config_builder = config_builder.region(aws_sdk_s3::config::Region::new(region));
        }
        if let Some(endpoint) = endpoint_override {
            config_builder = config_builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: S3Client::from_conf(config_builder.build()),
        }
    }

    /// Wraps an already-configured SDK client.
    pub fn from_client(client: S3Client) -> Self {
        Self { client }
    }

    fn canned_acl(access: ReadAccess) -> ObjectCannedAcl {
        match access {
            ReadAccess::Private => ObjectCannedAcl::Private,
            ReadAccess::AuthenticatedRead => ObjectCannedAcl::AuthenticatedRead,
        }
    }
}

#[async_trait]
impl BlobStore for S3Transport {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        metadata: &ObjectMetadata,
        access: ReadAccess,
    ) -> TransportResult<PutReceipt> {
        let size = body.len();
        let resp = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .acl(Self::canned_acl(access))
            .set_metadata(Some(metadata.to_map()))
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| TransportError::Other(format!("put failed for {bucket}/{key}: {e}")))?;

        debug!("uploaded {size} bytes to s3://{bucket}/{key}");
        Ok(PutReceipt {
            e_tag: resp.e_tag().map(str::to_string),
        })
    }

    async fn get(&self, bucket: &str, key: &str) -> TransportResult<FetchedObject> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_err = e.into_service_error();
                if service_err.is_no_such_key() {
                    TransportError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    TransportError::Other(format!("get failed for {bucket}/{key}: {service_err}"))
                }
            })?;

        let metadata = ObjectMetadata::from_map(resp.metadata().cloned().unwrap_or_default());
        debug!("fetched s3://{bucket}/{key}");
        Ok(FetchedObject {
            body: Box::pin(resp.body.into_async_read()),
            metadata,
        })
    }

    async fn delete(&self, bucket: &str, key: &str) -> TransportResult<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                TransportError::Other(format!("delete failed for {bucket}/{key}: {e}"))
            })?;

        debug!("deleted s3://{bucket}/{key}");
        Ok(())
    }

    async fn initiate_multipart(
        &self,
        bucket: &str,
        key: &str,
        metadata: &ObjectMetadata,
    ) -> TransportResult<String> {
        let resp = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .set_metadata(Some(metadata.to_map()))
            .send()
            .await
            .map_err(|e| {
                TransportError::Other(format!(
                    "initiate multipart failed for {bucket}/{key}: {e}"
                ))
            })?;

        resp.upload_id()
            .map(str::to_string)
            .ok_or_else(|| {
                TransportError::Other(format!("no upload id returned for {bucket}/{key}"))
            })
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> TransportResult<PartReceipt> {
        let size = body.len();
        let resp = self
            .client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                TransportError::Other(format!(
                    "upload part {part_number} failed for {bucket}/{key}: {e}"
                ))
            })?;

        debug!("uploaded part {part_number} ({size} bytes) to s3://{bucket}/{key}");
        Ok(PartReceipt {
            part_number,
            e_tag: resp.e_tag().map(str::to_string),
        })
    }

    async fn complete_multipart(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[PartReceipt],
    ) -> TransportResult<String> {
        let completed_parts: Vec<CompletedPart> = parts
            .iter()
            .map(|part| {
                CompletedPart::builder()
                    .part_number(part.part_number)
                    .set_e_tag(part.e_tag.clone())
                    .build()
            })
            .collect();

        let resp = self
            .client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed_parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| {
                TransportError::Other(format!(
                    "complete multipart failed for {bucket}/{key}: {e}"
                ))
            })?;

        debug!("completed multipart upload for s3://{bucket}/{key}");
        Ok(resp
            .location()
            .map(str::to_string)
            .unwrap_or_else(|| format!("s3://{bucket}/{key}")))
    }

    async fn abort_multipart(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> TransportResult<()> {
        self.client
            .abort_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| {
                TransportError::Other(format!(
                    "abort multipart failed for {bucket}/{key}: {e}"
                ))
            })?;

        debug!("aborted multipart upload for s3://{bucket}/{key}");
        Ok(())
    }
}
