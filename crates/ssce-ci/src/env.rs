//! Environment handed to every build command.
//!
//! The `PATH` seen by build tools gets the project root (where freshly built
//! executables and DLLs land) and, for MinGW builds, the MinGW toolchain
//! prepended. The value is computed once and passed to each child process;
//! the environment of this process is left untouched.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::debug;

use crate::error::BuildError;
use crate::options::BuildOptions;

/// Variable holding the MinGW toolchain `bin` directory.
pub const MINGW_PATH_VAR: &str = "MINGW_PATH";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEnv {
    path: OsString,
    prefixes: Vec<PathBuf>,
}

impl BuildEnv {
    /// Build from the current process environment.
    pub fn from_process(options: &BuildOptions) -> Result<Self, BuildError> {
        Self::from_parts(
            options,
            std::env::var_os("PATH"),
            std::env::var_os(MINGW_PATH_VAR),
        )
    }

    /// Build from explicit `PATH` and `MINGW_PATH` values.
    pub fn from_parts(
        options: &BuildOptions,
        base_path: Option<OsString>,
        mingw_path: Option<OsString>,
    ) -> Result<Self, BuildError> {
        let source_dir = absolute(&options.source_dir)?;

        let mut prefixes = vec![source_dir];
        if options.needs_mingw() {
            let mingw = mingw_path
                .filter(|p| !p.is_empty())
                .ok_or_else(|| BuildError::MissingEnv {
                    name: MINGW_PATH_VAR,
                    reason: "MinGW Makefiles generator selected".to_string(),
                })?;
            prefixes.push(PathBuf::from(mingw));
        }

        let base = base_path.unwrap_or_default();
        let path = std::env::join_paths(
            prefixes
                .iter()
                .cloned()
                .chain(std::env::split_paths(&base)),
        )?;

        debug!(path = %path.to_string_lossy(), "Build PATH");
        Ok(Self { path, prefixes })
    }

    /// Value of `PATH` for child processes.
    pub fn path(&self) -> &OsStr {
        &self.path
    }

    /// Directories prepended to the inherited `PATH`, highest priority first.
    pub fn prefixes(&self) -> &[PathBuf] {
        &self.prefixes
    }

    pub(crate) fn apply(&self, command: &mut Command) {
        command.env("PATH", &self.path);
    }
}

fn absolute(path: &Path) -> Result<PathBuf, BuildError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|source| BuildError::Path {
            path: path.to_path_buf(),
            source,
        })
}
