//! In-memory artifact stores (testing only)
//!
//! Provide `MemoryArtifactStore` and `FlakyStore`, which satisfy the
//! `ArtifactStore` contract without touching the network.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::upload::ArtifactStore;

// ---------------------------------------------------------------------------
// MemoryArtifactStore
// ---------------------------------------------------------------------------

/// Store that keeps uploaded objects in a `HashMap<remote_path, bytes>`.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    calls: AtomicU32,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes stored at `remote_path`, if any.
    pub fn get(&self, remote_path: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(remote_path).cloned()
    }

    /// Number of `store` calls so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn store(&self, remote_path: &str, local_file: &Path) -> Result<u64, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let data = tokio::fs::read(local_file)
            .await
            .map_err(|e| TransportError::LocalFile {
                path: local_file.to_path_buf(),
                reason: e.to_string(),
            })?;
        let bytes = data.len() as u64;
        self.objects
            .lock()
            .unwrap()
            .insert(remote_path.to_string(), data);
        Ok(bytes)
    }
}

// ---------------------------------------------------------------------------
// FlakyStore
// ---------------------------------------------------------------------------

/// Store that fails its first `failures` calls with a connection error and
/// then behaves like [`MemoryArtifactStore`].
#[derive(Debug)]
pub struct FlakyStore {
    remaining_failures: AtomicU32,
    attempts: AtomicU32,
    inner: MemoryArtifactStore,
}

impl FlakyStore {
    pub fn new(failures: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(failures),
            attempts: AtomicU32::new(0),
            inner: MemoryArtifactStore::new(),
        }
    }

    /// Store that never succeeds.
    pub fn always_failing() -> Self {
        Self::new(u32::MAX)
    }

    /// Number of `store` calls so far, failed ones included.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn get(&self, remote_path: &str) -> Option<Vec<u8>> {
        self.inner.get(remote_path)
    }
}

#[async_trait]
impl ArtifactStore for FlakyStore {
    async fn store(&self, remote_path: &str, local_file: &Path) -> Result<u64, TransportError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let failing = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(TransportError::Connect {
                host: "flaky.invalid".to_string(),
                reason: format!("simulated outage on attempt {attempt}"),
            });
        }
        self.inner.store(remote_path, local_file).await
    }
}
