//! SSCE CI Core Library
//!
//! Shared plumbing for the SSCE CI helpers:
//! - Packaging install output and test artifacts into `.tar.xz` archives
//! - Text transport of archives (base64, hard wrapping)
//! - Uploading archives to the FTP artifact store with randomized retry
//! - Platform detection and tracing setup

pub mod archive;
pub mod build_id;
pub mod error;
pub mod fakes;
pub mod platform;
pub mod retry;
pub mod telemetry;
pub mod upload;
pub mod wrap;

pub use archive::{
    ArchiveEmit, ArchiveSummary, ArchiveTarget, Archiver, ARCHIVE_EXTENSION, TEST_ARTIFACT_PREFIX,
};
pub use build_id::BuildId;
pub use error::{CiError, Result, TransportError};
pub use platform::OsFamily;
pub use retry::{retry, RetryPolicy};
pub use telemetry::init_tracing;
pub use upload::ftp::{FtpConfig, FtpStore, DEFAULT_FTP_HOST, DEFAULT_FTP_USER};
pub use upload::{ArtifactStore, RemotePath, UploadPlan, UploadReceipt, Uploader, COLLECTION};
pub use wrap::{decode_base64, encode_base64, hard_wrap, rule_line, WRAP_WIDTH};
