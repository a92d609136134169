//! Build stage definitions and configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Stages of a build, in pipeline order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuildStage {
    /// cmake --version
    Version,

    /// cmake -B<build> [options]
    Configure,

    /// cmake --build <build> --parallel N
    Build,

    /// cmake --build <build> --target install
    Install,

    /// cmake --build <build> --target package
    Package,

    /// cmake --build <build> --target deploy
    Deploy,

    /// ctest -VV --timeout N
    Test,
}

impl BuildStage {
    /// Get the stage name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            BuildStage::Version => "version",
            BuildStage::Configure => "configure",
            BuildStage::Build => "build",
            BuildStage::Install => "install",
            BuildStage::Package => "package",
            BuildStage::Deploy => "deploy",
            BuildStage::Test => "test",
        }
    }

    /// CMake target built by this stage, for the target-driven stages.
    pub fn cmake_target(&self) -> Option<&'static str> {
        match self {
            BuildStage::Install => Some("install"),
            BuildStage::Package => Some("package"),
            BuildStage::Deploy => Some("deploy"),
            _ => None,
        }
    }
}

/// Configuration for a build stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageConfig {
    /// Human-readable stage name.
    pub name: String,

    /// Command to execute (first element is executable).
    pub command: Vec<String>,

    /// Directory the command runs in.
    pub working_dir: PathBuf,

    /// Timeout in seconds (0 = none).
    pub timeout_secs: u64,

    /// Capture stdout/stderr instead of streaming them to the console.
    pub capture_output: bool,
}

impl StageConfig {
    /// Create a configuration for a pipeline stage.
    pub fn for_stage(stage: BuildStage, command: Vec<String>, working_dir: PathBuf) -> Self {
        Self::custom(stage.name().to_string(), command, working_dir, 0)
    }

    /// Create a custom stage configuration.
    pub fn custom(
        name: String,
        command: Vec<String>,
        working_dir: PathBuf,
        timeout_secs: u64,
    ) -> Self {
        Self {
            name,
            command,
            working_dir,
            timeout_secs,
            capture_output: false,
        }
    }

    pub fn captured(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }

    /// Command line as logged: every argument quoted.
    pub fn display_command(&self) -> String {
        self.command
            .iter()
            .map(|arg| format!(" \"{arg}\""))
            .collect()
    }
}
