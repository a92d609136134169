//! FTP-backed artifact store.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use async_trait::async_trait;
use suppaftp::types::FileType;
use suppaftp::FtpStream;
use tracing::debug;

use super::ArtifactStore;
use crate::error::TransportError;

/// Artifact server used by CI.
pub const DEFAULT_FTP_HOST: &str = "ftp.drivehq.com";

/// Account the CI agents log in with.
pub const DEFAULT_FTP_USER: &str = "Sima214";

pub const DEFAULT_FTP_PORT: u16 = 21;

/// Connection settings for [`FtpStore`].
#[derive(Clone, PartialEq, Eq)]
pub struct FtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl FtpConfig {
    /// Default host and account with the given secret.
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            host: DEFAULT_FTP_HOST.to_string(),
            port: DEFAULT_FTP_PORT,
            user: DEFAULT_FTP_USER.to_string(),
            password: password.into(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }
}

impl fmt::Debug for FtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Stores artifacts with a plain FTP `STOR`.
///
/// Each call opens a fresh control connection, logs in, uploads in binary
/// mode and quits. The blocking client runs on tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct FtpStore {
    config: FtpConfig,
}

impl FtpStore {
    pub fn new(config: FtpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ArtifactStore for FtpStore {
    async fn store(&self, remote_path: &str, local_file: &Path) -> Result<u64, TransportError> {
        let config = self.config.clone();
        let remote = remote_path.to_string();
        let file = local_file.to_path_buf();

        tokio::task::spawn_blocking(move || put_blocking(&config, &remote, &file))
            .await
            .map_err(|e| TransportError::Transfer {
                remote_path: remote_path.to_string(),
                reason: format!("upload task aborted: {e}"),
            })?
    }
}

fn put_blocking(config: &FtpConfig, remote_path: &str, file: &Path) -> Result<u64, TransportError> {
    let mut reader = File::open(file).map(BufReader::new).map_err(|e| {
        TransportError::LocalFile {
            path: file.to_path_buf(),
            reason: e.to_string(),
        }
    })?;

    let transfer_err = |reason: String| TransportError::Transfer {
        remote_path: remote_path.to_string(),
        reason,
    };

    debug!(host = %config.host, port = config.port, "Connecting");
    let mut ftp = FtpStream::connect((config.host.as_str(), config.port)).map_err(|e| {
        TransportError::Connect {
            host: config.host.clone(),
            reason: e.to_string(),
        }
    })?;

    ftp.login(config.user.as_str(), config.password.as_str())
        .map_err(|e| TransportError::Auth {
            user: config.user.clone(),
            reason: e.to_string(),
        })?;

    ftp.transfer_type(FileType::Binary)
        .map_err(|e| transfer_err(e.to_string()))?;

    let bytes = ftp
        .put_file(remote_path, &mut reader)
        .map_err(|e| transfer_err(e.to_string()))?;

    ftp.quit().map_err(|e| transfer_err(e.to_string()))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_ci_server() {
        let config = FtpConfig::new("secret");
        assert_eq!(config.host, DEFAULT_FTP_HOST);
        assert_eq!(config.user, DEFAULT_FTP_USER);
        assert_eq!(config.port, 21);
    }

    #[test]
    fn debug_redacts_password() {
        let config = FtpConfig::new("hunter2").with_host("ftp.example.org");
        let rendered = format!("{config:?}");
        assert!(rendered.contains("ftp.example.org"));
        assert!(!rendered.contains("hunter2"));
    }

    #[tokio::test]
    async fn missing_local_file_is_transport_error() {
        let store = FtpStore::new(FtpConfig::new("x").with_host("127.0.0.1"));
        let err = store
            .store("ssce/linux/1.tar.xz", Path::new("/definitely/not/here.tar.xz"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::LocalFile { .. }));
    }
}
