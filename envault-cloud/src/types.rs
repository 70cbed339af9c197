//! Shared types for blob-store operations.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::pin::Pin;
use tokio::io::AsyncRead;

/// Raw object body as returned by the blob store.
pub type ObjectBody = Pin<Box<dyn AsyncRead + Send>>;

/// User-defined object metadata: string keys mapped to string values.
///
/// Keys are normalized to lowercase on insert, matching how S3 returns
/// user metadata regardless of the case it was stored with.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    entries: HashMap<String, String>,
}

impl ObjectMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into().to_lowercase(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(&key.to_lowercase()).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn from_map(map: HashMap<String, String>) -> Self {
        let mut metadata = Self::new();
        for (key, value) in map {
            metadata.insert(key, value);
        }
        metadata
    }

    pub fn to_map(&self) -> HashMap<String, String> {
        self.entries.clone()
    }
}

/// Read permission applied to a stored object.
///
/// Sidecar key objects are granted [`ReadAccess::AuthenticatedRead`] so that
/// other authorized actors in the same multipart flow can fetch the wrapped
/// key; everything else stays private.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadAccess {
    #[default]
    Private,
    AuthenticatedRead,
}

/// Receipt for a completed single put.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutReceipt {
    pub e_tag: Option<String>,
}

/// Receipt for one uploaded part, echoed back at complete time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartReceipt {
    pub part_number: i32,
    pub e_tag: Option<String>,
}

/// A fetched object: its raw (still encrypted) body plus metadata.
pub struct FetchedObject {
    pub body: ObjectBody,
    pub metadata: ObjectMetadata,
}
