//! Client-side envelope encryption for S3-compatible object storage.
//!
//! Objects are encrypted before they leave the client, so the storage
//! provider never sees plaintext:
//!
//! - Each object body is encrypted with a fresh 16-byte content key, in
//!   independent chunks so downloads can decrypt incrementally.
//! - The content key is wrapped with RSA-OAEP and stored alongside the
//!   object (metadata header, or a sidecar object while a multipart upload
//!   is in flight), or supplied by the caller out-of-band and never
//!   persisted.
//!
//! [`EnvelopeManager`] is the entry point; it composes a [`BlobStore`]
//! implementation (such as [`s3_transport::S3Transport`]) with the
//! primitives from `envault-crypto`.

pub mod blob_store;
pub mod config;
pub mod envelope;
pub mod error;
pub mod multipart;
pub mod s3_transport;
pub mod stream;
pub mod types;

pub use blob_store::BlobStore;
pub use config::{EnvelopeConfig, DEFAULT_CHUNK_SIZE};
pub use envelope::{EnvelopeManager, WRAPPED_KEY_HEADER};
pub use error::{CloudError, CloudResult, TransportError, TransportResult};
pub use stream::ChunkedDecryptingStream;
pub use types::*;
