//! Uploader behavior against in-memory stores.

use std::fs;
use std::sync::Arc;

use ssce_ci_core::fakes::{FlakyStore, MemoryArtifactStore};
use ssce_ci_core::{CiError, RetryPolicy, UploadPlan, Uploader};

fn package(dir: &tempfile::TempDir, name: &str, body: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, body).unwrap();
    path
}

#[tokio::test(start_paused = true)]
async fn upload_stores_file_at_derived_path() {
    let dir = tempfile::tempdir().unwrap();
    let file = package(&dir, "ssce.tar.xz", b"xz payload");
    let store = Arc::new(MemoryArtifactStore::new());

    let plan = UploadPlan::resolve("Linux", "4711", &file).unwrap();
    let receipt = Uploader::new(store.clone(), RetryPolicy::default())
        .upload(&plan)
        .await
        .expect("upload failed");

    assert_eq!(receipt.remote_path, "ssce/linux/4711.tar.xz");
    assert_eq!(receipt.attempts, 1);
    assert_eq!(receipt.bytes, 10);
    assert_eq!(store.get("ssce/linux/4711.tar.xz").unwrap(), b"xz payload");
}

#[tokio::test(start_paused = true)]
async fn upload_keeps_retrying_through_long_outage() {
    let dir = tempfile::tempdir().unwrap();
    let file = package(&dir, "ssce.tar.bz2", b"bz2 payload");
    let store = Arc::new(FlakyStore::new(40));

    let plan = UploadPlan::resolve("Darwin", "12", &file).unwrap();
    let receipt = Uploader::new(store.clone(), RetryPolicy::unbounded())
        .upload(&plan)
        .await
        .expect("unbounded upload must eventually succeed");

    assert_eq!(receipt.attempts, 41);
    assert_eq!(store.attempts(), 41);
    // Every attempt re-reads the file from the start.
    assert_eq!(store.get("ssce/macos/12.tar.bz2").unwrap(), b"bz2 payload");
}

#[tokio::test(start_paused = true)]
async fn bounded_upload_gives_up() {
    let dir = tempfile::tempdir().unwrap();
    let file = package(&dir, "ssce.tar.xz", b"payload");
    let store = Arc::new(FlakyStore::always_failing());

    let plan = UploadPlan::resolve("Windows", "9", &file).unwrap();
    let err = Uploader::new(store.clone(), RetryPolicy::bounded(4))
        .upload(&plan)
        .await
        .unwrap_err();

    assert!(matches!(err, CiError::RetriesExhausted { attempts: 4, .. }));
    assert_eq!(store.attempts(), 4);
}

#[tokio::test(start_paused = true)]
async fn missing_package_fails_before_any_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryArtifactStore::new());

    let plan = UploadPlan::resolve("Linux", "1", dir.path().join("gone.tar.xz")).unwrap();
    let err = Uploader::new(store.clone(), RetryPolicy::default())
        .upload(&plan)
        .await
        .unwrap_err();

    assert!(matches!(err, CiError::InvalidPackage { .. }));
    assert_eq!(store.calls(), 0);
}

#[test]
fn unknown_platform_never_reaches_a_store() {
    let store = MemoryArtifactStore::new();
    let err = UploadPlan::resolve("Haiku", "1", "pkg.tar.xz").unwrap_err();
    assert!(matches!(err, CiError::UnsupportedPlatform(_)));
    assert_eq!(store.calls(), 0);
    assert!(store.is_empty());
}
