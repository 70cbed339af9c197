//! Envelope manager put/get tests against the in-memory blob store.

mod support;

use envault_cloud::envelope::WRAPPED_KEY_HEADER;
use envault_cloud::{CloudError, EnvelopeConfig, EnvelopeManager, TransportError};
use envault_crypto::{ContentKey, CryptoError, KeyWrapper, WrappedKey};
use pretty_assertions::assert_eq;
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use std::sync::{Arc, OnceLock};
use support::MemoryBlobStore;

const BUCKET: &str = "envault-test";

/// RSA key generation is slow in debug builds; share one pair per process.
fn test_private_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut OsRng, 2048).expect("generate test key"))
}

fn manager_over(store: Arc<MemoryBlobStore>) -> EnvelopeManager {
    EnvelopeManager::with_key_wrapper(
        store,
        EnvelopeConfig::with_chunk_size(8),
        KeyWrapper::from_private_key(test_private_key().clone()),
    )
    .unwrap()
}

#[tokio::test]
async fn auto_key_put_get_roundtrip() {
    let store = Arc::new(MemoryBlobStore::new());
    let manager = manager_over(store.clone());
    let plaintext = b"attack at dawn, bring snacks";

    manager.put_object(BUCKET, "orders.txt", plaintext).await.unwrap();

    // The stored body is ciphertext of equal length, with the wrapped key
    // in the metadata header.
    let stored = store.stored(BUCKET, "orders.txt").unwrap();
    assert_eq!(stored.body.len(), plaintext.len());
    assert_ne!(stored.body, plaintext.to_vec());
    let header = stored.metadata.get(WRAPPED_KEY_HEADER).expect("header present");
    WrappedKey::from_hex(header).expect("header is hex-encoded wrapped key");

    let recovered = manager.get_object(BUCKET, "orders.txt").await.unwrap();
    assert_eq!(recovered, plaintext);
}

#[tokio::test]
async fn streaming_get_matches_eager_get() {
    let store = Arc::new(MemoryBlobStore::new());
    let manager = manager_over(store);
    // Spans several chunks at chunk size 8, with a short final chunk.
    let plaintext: Vec<u8> = (0..100u8).collect();

    manager.put_object(BUCKET, "blob.bin", &plaintext).await.unwrap();

    let eager = manager.get_object(BUCKET, "blob.bin").await.unwrap();
    let mut stream = manager.get_object_streaming(BUCKET, "blob.bin").await.unwrap();
    let lazy = stream.read_to_end().await.unwrap();

    assert_eq!(eager, plaintext);
    assert_eq!(lazy, plaintext);
}

#[tokio::test]
async fn empty_object_roundtrip() {
    let store = Arc::new(MemoryBlobStore::new());
    let manager = manager_over(store);

    manager.put_object(BUCKET, "empty", b"").await.unwrap();
    assert_eq!(manager.get_object(BUCKET, "empty").await.unwrap(), b"");

    let mut stream = manager.get_object_streaming(BUCKET, "empty").await.unwrap();
    assert_eq!(stream.read_byte().await.unwrap(), None);
}

#[tokio::test]
async fn each_put_wraps_a_fresh_content_key() {
    let store = Arc::new(MemoryBlobStore::new());
    let manager = manager_over(store.clone());

    manager.put_object(BUCKET, "a", b"same payload").await.unwrap();
    manager.put_object(BUCKET, "b", b"same payload").await.unwrap();

    let a = store.stored(BUCKET, "a").unwrap();
    let b = store.stored(BUCKET, "b").unwrap();
    assert_ne!(
        a.metadata.get(WRAPPED_KEY_HEADER),
        b.metadata.get(WRAPPED_KEY_HEADER),
        "content keys must not be reused across objects"
    );
    assert_ne!(a.body, b.body);
}

#[tokio::test]
async fn caller_keyed_put_persists_no_key_material() {
    let store = Arc::new(MemoryBlobStore::new());
    let manager = manager_over(store.clone());
    let content_key = ContentKey::generate(&mut OsRng);
    let plaintext = b"caller keeps the key";

    manager
        .put_object_with_key(BUCKET, "external.bin", plaintext, &content_key)
        .await
        .unwrap();

    let stored = store.stored(BUCKET, "external.bin").unwrap();
    assert!(stored.metadata.is_empty(), "no key material in metadata");
    assert_ne!(stored.body, plaintext.to_vec());

    let recovered = manager
        .get_object_with_key(BUCKET, "external.bin", &content_key)
        .await
        .unwrap();
    assert_eq!(recovered, plaintext);

    let mut stream = manager
        .get_object_streaming_with_key(BUCKET, "external.bin", &content_key)
        .await
        .unwrap();
    assert_eq!(stream.read_to_end().await.unwrap(), plaintext);
}

#[tokio::test]
async fn auto_get_of_caller_keyed_object_fails_key_not_found() {
    let store = Arc::new(MemoryBlobStore::new());
    let manager = manager_over(store);
    let content_key = ContentKey::generate(&mut OsRng);

    manager
        .put_object_with_key(BUCKET, "external.bin", b"data", &content_key)
        .await
        .unwrap();

    let err = manager.get_object(BUCKET, "external.bin").await.unwrap_err();
    assert!(matches!(err, CloudError::KeyNotFound(_)));
}

#[tokio::test]
async fn public_only_configuration_can_put_but_not_get() {
    let store = Arc::new(MemoryBlobStore::new());
    let manager = EnvelopeManager::with_key_wrapper(
        store,
        EnvelopeConfig::with_chunk_size(8),
        KeyWrapper::from_public_key(test_private_key().to_public_key()),
    )
    .unwrap();

    manager.put_object(BUCKET, "sealed", b"write-only party").await.unwrap();

    let err = manager.get_object(BUCKET, "sealed").await.unwrap_err();
    assert!(matches!(err, CloudError::MissingPrivateKey));

    // The streaming entry point fails the same way, before any plaintext
    // is served.
    let err = manager.get_object_streaming(BUCKET, "sealed").await.unwrap_err();
    assert!(matches!(err, CloudError::MissingPrivateKey));
}

#[tokio::test]
async fn auto_mode_requires_a_configured_wrapper() {
    let store = Arc::new(MemoryBlobStore::new());
    let manager =
        EnvelopeManager::new(store, EnvelopeConfig::with_chunk_size(8)).unwrap();
    assert!(!manager.has_key_wrapper());

    let err = manager.put_object(BUCKET, "k", b"data").await.unwrap_err();
    assert!(matches!(err, CloudError::Config(_)));

    // Caller-keyed operations still work without a wrapper.
    let content_key = ContentKey::generate(&mut OsRng);
    manager
        .put_object_with_key(BUCKET, "k", b"data", &content_key)
        .await
        .unwrap();
    assert_eq!(
        manager.get_object_with_key(BUCKET, "k", &content_key).await.unwrap(),
        b"data"
    );
}

#[tokio::test]
async fn get_of_missing_object_passes_through_not_found() {
    let store = Arc::new(MemoryBlobStore::new());
    let manager = manager_over(store);

    let err = manager.get_object(BUCKET, "nope").await.unwrap_err();
    assert!(matches!(
        err,
        CloudError::Transport(TransportError::NotFound { .. })
    ));
}

#[tokio::test]
async fn corrupted_wrapped_key_header_aborts_get() {
    let store = Arc::new(MemoryBlobStore::new());
    let manager = manager_over(store.clone());

    manager.put_object(BUCKET, "victim", b"payload").await.unwrap();

    // Overwrite the object with a mangled header; get must abort rather
    // than return ciphertext.
    let stored = store.stored(BUCKET, "victim").unwrap();
    let mut metadata = envault_cloud::ObjectMetadata::new();
    metadata.insert(WRAPPED_KEY_HEADER, "zz-not-hex");
    use envault_cloud::blob_store::BlobStore;
    store
        .put(BUCKET, "victim", stored.body, &metadata, stored.access)
        .await
        .unwrap();

    let err = manager.get_object(BUCKET, "victim").await.unwrap_err();
    assert!(matches!(err, CloudError::Crypto(CryptoError::Encoding(_))));
}

#[tokio::test]
async fn zero_chunk_size_config_rejected() {
    let store = Arc::new(MemoryBlobStore::new());
    let err = EnvelopeManager::new(store, EnvelopeConfig::with_chunk_size(0)).unwrap_err();
    assert!(matches!(err, CloudError::Config(_)));
}
