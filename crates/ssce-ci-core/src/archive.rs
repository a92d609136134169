//! Packaging of build output into a single `.tar.xz` archive.
//!
//! The archive holds every direct child of the install directory (stored
//! under its own name, directories recursively) plus every entry of the
//! artifact directory whose name starts with [`TEST_ARTIFACT_PREFIX`].
//! Entry names are derived from explicit roots, so the process working
//! directory is never changed.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info};
use xz2::write::XzEncoder;

use crate::error::{CiError, Result};
use crate::wrap::{encode_base64, hard_wrap, rule_line, WRAP_WIDTH};

/// File extension appended to the output base name.
pub const ARCHIVE_EXTENSION: &str = "tar.xz";

/// Name prefix marking test artifacts in the artifact directory.
pub const TEST_ARTIFACT_PREFIX: &str = "test_";

/// liblzma preset, same as the `xz` command line default.
const XZ_PRESET: u32 = 6;

/// What to do with the archive once it is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveEmit {
    /// Leave the archive on disk.
    File,
    /// Print the archive base64 encoded on stdout, optionally hard-wrapped.
    Base64 { wrap: Option<usize> },
    /// Hand the archive to the uploader.
    Upload,
}

/// Inputs and output location of one archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveTarget {
    /// Directory whose direct children are archived.
    pub install_dir: PathBuf,

    /// Directory scanned for test artifacts (usually the working directory).
    pub artifact_dir: PathBuf,

    /// Full path of the archive to write.
    pub output: PathBuf,
}

impl ArchiveTarget {
    /// `base_name` is resolved against `artifact_dir` and gets
    /// [`ARCHIVE_EXTENSION`] appended.
    pub fn new(
        install_dir: impl Into<PathBuf>,
        base_name: &str,
        artifact_dir: impl Into<PathBuf>,
    ) -> Self {
        let artifact_dir = artifact_dir.into();
        let output = artifact_dir.join(format!("{base_name}.{ARCHIVE_EXTENSION}"));
        Self {
            install_dir: install_dir.into(),
            artifact_dir,
            output,
        }
    }
}

/// Outcome of a successful archive build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub output: PathBuf,

    /// Top-level entry names, in archive order.
    pub entries: Vec<String>,

    /// Size of the compressed archive.
    pub bytes: u64,

    /// SHA-256 of the compressed archive, lowercase hex.
    pub sha256: String,
}

#[derive(Debug, Clone)]
struct Entry {
    name: OsString,
    source: PathBuf,
}

/// Writes an [`ArchiveTarget`] to disk.
pub struct Archiver {
    target: ArchiveTarget,
}

impl Archiver {
    pub fn new(target: ArchiveTarget) -> Self {
        Self { target }
    }

    /// Write the archive. Any I/O failure aborts the build; a partially
    /// written archive is left as is.
    pub fn build(&self) -> Result<ArchiveSummary> {
        let output = &self.target.output;
        let skip = canonical_output(output)?;
        let entries = self.collect_entries(&skip)?;

        info!(
            output = %output.display(),
            entries = entries.len(),
            "Writing archive"
        );

        let file = File::create(output).map_err(|e| CiError::archive(output, e))?;
        let encoder = XzEncoder::new(BufWriter::new(file), XZ_PRESET);
        let mut builder = tar::Builder::new(encoder);
        builder.follow_symlinks(false);

        for entry in &entries {
            debug!(name = %entry.name.to_string_lossy(), source = %entry.source.display(), "Adding entry");
            append_tree(&mut builder, Path::new(&entry.name), &entry.source, &skip)
                .map_err(|e| CiError::archive(output, e))?;
        }

        let encoder = builder
            .into_inner()
            .map_err(|e| CiError::archive(output, e))?;
        let mut writer = encoder.finish().map_err(|e| CiError::archive(output, e))?;
        writer.flush().map_err(|e| CiError::archive(output, e))?;
        drop(writer);

        let (bytes, sha256) = digest_file(output).map_err(|e| CiError::archive(output, e))?;
        info!(output = %output.display(), bytes, sha256 = %sha256, "Archive written");

        Ok(ArchiveSummary {
            output: output.clone(),
            entries: entries
                .iter()
                .map(|e| e.name.to_string_lossy().into_owned())
                .collect(),
            bytes,
            sha256,
        })
    }

    /// Top-level entries, install children first. Sources are resolved
    /// against canonical roots so `skip` can be compared by path.
    fn collect_entries(&self, skip: &Path) -> Result<Vec<Entry>> {
        let install_dir = canonical_dir(&self.target.install_dir)?;
        let mut entries = sorted_children(&install_dir)
            .map_err(|e| CiError::archive(&install_dir, e))?
            .into_iter()
            .map(|name| Entry {
                source: install_dir.join(&name),
                name,
            })
            .filter(|entry| entry.source != skip)
            .collect::<Vec<_>>();

        let artifact_dir = canonical_dir(&self.target.artifact_dir)?;
        let artifacts = sorted_children(&artifact_dir)
            .map_err(|e| CiError::archive(&artifact_dir, e))?
            .into_iter()
            .filter(|name| is_test_artifact(name))
            .map(|name| Entry {
                source: artifact_dir.join(&name),
                name,
            })
            .filter(|entry| entry.source != skip)
            .collect::<Vec<_>>();

        // install_dir may be the artifact directory itself
        for artifact in artifacts {
            if !entries.iter().any(|e| e.source == artifact.source) {
                entries.push(artifact);
            }
        }

        Ok(entries)
    }
}

/// Whether a file name marks a test artifact.
pub fn is_test_artifact(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with(TEST_ARTIFACT_PREFIX)
}

fn sorted_children(dir: &Path) -> io::Result<Vec<OsString>> {
    let mut names = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.file_name()))
        .collect::<io::Result<Vec<_>>>()?;
    names.sort();
    Ok(names)
}

fn canonical_dir(dir: &Path) -> Result<PathBuf> {
    fs::canonicalize(dir).map_err(|e| CiError::archive(dir, e))
}

/// Where the output will live once created: canonical parent plus file name.
fn canonical_output(output: &Path) -> Result<PathBuf> {
    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let file_name = output.file_name().ok_or_else(|| {
        CiError::archive(
            output,
            io::Error::new(io::ErrorKind::InvalidInput, "output has no file name"),
        )
    })?;
    let parent = fs::canonicalize(parent).map_err(|e| CiError::archive(output, e))?;
    Ok(parent.join(file_name))
}

/// Append `source` as `name`, recursing into real directories. Symlinks are
/// stored as links. The archive being written is never appended.
fn append_tree<W: Write>(
    builder: &mut tar::Builder<W>,
    name: &Path,
    source: &Path,
    skip: &Path,
) -> io::Result<()> {
    if source == skip {
        debug!(name = %name.display(), "Skipping archive output");
        return Ok(());
    }

    let meta = fs::symlink_metadata(source)?;
    if meta.is_dir() {
        builder.append_dir(name, source)?;
        for child in sorted_children(source)? {
            append_tree(builder, &name.join(&child), &source.join(&child), skip)?;
        }
        Ok(())
    } else {
        builder.append_path_with_name(source, name)
    }
}

fn digest_file(path: &Path) -> io::Result<(u64, String)> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let bytes = io::copy(&mut file, &mut hasher)?;
    Ok((bytes, hex::encode(hasher.finalize())))
}

/// Write the archive at `path` as base64 text to `out`.
///
/// With `wrap`, the payload is hard-wrapped at that many columns and
/// bracketed by rule lines; without it the payload is a single line.
pub fn write_base64<W: Write>(path: &Path, wrap: Option<usize>, out: &mut W) -> Result<()> {
    let bytes = fs::read(path).map_err(|e| CiError::archive(path, e))?;
    let encoded = encode_base64(&bytes);

    match wrap {
        Some(width) => {
            let rule = rule_line(WRAP_WIDTH);
            writeln!(out, "{rule}")?;
            for line in hard_wrap(&encoded, width) {
                writeln!(out, "{line}")?;
            }
            writeln!(out, "{rule}")?;
        }
        None => writeln!(out, "{encoded}")?,
    }
    out.flush()?;
    Ok(())
}
