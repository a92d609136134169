//! Artifact upload to the remote artifact store.
//!
//! Destinations are deterministic: `ssce/<os-family>/<build-id>.<ext>`.
//! The platform is resolved before any store is touched, so an unsupported
//! host never reaches the network. Once the destination is known, every
//! store failure is retried according to the [`RetryPolicy`].

pub mod ftp;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::build_id::BuildId;
use crate::error::{CiError, Result, TransportError};
use crate::platform::OsFamily;
use crate::retry::{retry, RetryPolicy};

/// Top-level collection on the artifact server.
pub const COLLECTION: &str = "ssce";

/// A place archives can be stored.
///
/// Implementations open `local_file` themselves on every call, so a retried
/// store always transfers the file from its first byte.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store the content of `local_file` at `remote_path`; returns the number
    /// of bytes transferred.
    async fn store(
        &self,
        remote_path: &str,
        local_file: &Path,
    ) -> std::result::Result<u64, TransportError>;
}

/// Remote location of an uploaded archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath {
    pub os_family: OsFamily,
    pub build_id: BuildId,
    pub extension: String,
}

impl RemotePath {
    pub fn new(os_family: OsFamily, build_id: BuildId, extension: impl Into<String>) -> Self {
        Self {
            os_family,
            build_id,
            extension: extension.into(),
        }
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{COLLECTION}/{}/{}.{}",
            self.os_family, self.build_id, self.extension
        )
    }
}

/// Archive extension of a package file: the compound `tar.*` extension when
/// present (`pkg.tar.xz` → `tar.xz`), otherwise the plain one.
pub fn package_extension(path: &Path) -> Result<String> {
    let invalid = |reason: &str| CiError::InvalidPackage {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| invalid("file name is not valid UTF-8"))?;

    if let Some(idx) = name.rfind(".tar.") {
        let ext = &name[idx + 1..];
        if ext.len() > "tar.".len() {
            return Ok(ext.to_string());
        }
    }

    path.extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .ok_or_else(|| invalid("file has no extension"))
}

/// A fully resolved upload: which file goes where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPlan {
    pub file: PathBuf,
    pub destination: RemotePath,
}

impl UploadPlan {
    /// Resolve the destination for `file`.
    ///
    /// `system_name` uses `uname -s` spelling (`Linux`, `Darwin`,
    /// `Windows`); anything else fails with
    /// [`CiError::UnsupportedPlatform`].
    pub fn resolve(system_name: &str, build_id: &str, file: impl Into<PathBuf>) -> Result<Self> {
        let os_family = OsFamily::from_system_name(system_name)?;
        let build_id = BuildId::parse(build_id)?;
        let file = file.into();
        let extension = package_extension(&file)?;
        Ok(Self {
            destination: RemotePath::new(os_family, build_id, extension),
            file,
        })
    }
}

/// Result of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub remote_path: String,
    pub attempts: u32,
    pub bytes: u64,
}

/// Uploads archives through an [`ArtifactStore`] with retry.
pub struct Uploader {
    store: Arc<dyn ArtifactStore>,
    policy: RetryPolicy,
}

impl Uploader {
    pub fn new(store: Arc<dyn ArtifactStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    pub async fn upload(&self, plan: &UploadPlan) -> Result<UploadReceipt> {
        if !plan.file.is_file() {
            return Err(CiError::InvalidPackage {
                path: plan.file.clone(),
                reason: "no such file".to_string(),
            });
        }

        let remote_path = plan.destination.to_string();
        info!(file = %plan.file.display(), remote = %remote_path, "Deploying package...");
        if self.policy.is_unbounded() {
            warn!("Upload retries are unbounded; the job runs until the store succeeds or CI times out");
        }

        let (bytes, attempts) = retry(&self.policy, |attempt| {
            let store = Arc::clone(&self.store);
            let remote_path = remote_path.clone();
            let file = plan.file.clone();
            async move {
                debug!(attempt, remote = %remote_path, "Storing package");
                store.store(&remote_path, &file).await
            }
        })
        .await?;

        info!(remote = %remote_path, bytes, attempts, "Package deployed");
        Ok(UploadReceipt {
            remote_path,
            attempts,
            bytes,
        })
    }
}
