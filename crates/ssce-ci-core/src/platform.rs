//! Operating system family detection.
//!
//! Upload destinations are bucketed by a coarse OS family. Detection happens
//! once; anything outside the closed set is a configuration error and must
//! be reported before any network activity.

use std::fmt;
use std::str::FromStr;

use crate::error::CiError;

/// Recognized operating system families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsFamily {
    Linux,
    MacOs,
    Windows,
}

impl OsFamily {
    /// Resolve a system name as reported by `uname -s` style APIs
    /// (`Linux`, `Darwin`, `Windows`).
    pub fn from_system_name(name: &str) -> Result<Self, CiError> {
        match name {
            "Linux" => Ok(OsFamily::Linux),
            "Darwin" => Ok(OsFamily::MacOs),
            "Windows" => Ok(OsFamily::Windows),
            other => Err(CiError::UnsupportedPlatform(other.to_string())),
        }
    }

    /// Detect the family of the running host.
    pub fn detect() -> Result<Self, CiError> {
        Self::from_system_name(host_system_name())
    }

    /// Path segment used in remote artifact paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            OsFamily::Linux => "linux",
            OsFamily::MacOs => "macos",
            OsFamily::Windows => "windows",
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OsFamily {
    type Err = CiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_system_name(s)
    }
}

/// System name of the running host, in `uname -s` spelling.
pub fn host_system_name() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows",
        other => other,
    }
}
