//! Build stage execution.

use crate::env::BuildEnv;
use crate::stage::StageConfig;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::info;

/// Result of a stage execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageResult {
    /// Stage name.
    pub stage_name: String,

    /// Exit code (0 = success, -1 = no exit code).
    pub exit_code: i32,

    /// Captured stdout (empty when streamed).
    pub stdout: String,

    /// Captured stderr (empty when streamed), or the execution error.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Whether execution succeeded.
    pub success: bool,
}

impl StageResult {
    /// Whether this stage passed (exit code 0).
    pub fn passed(&self) -> bool {
        self.success && self.exit_code == 0
    }

    /// Result for a stage that could not be run to completion
    /// (spawn failure, timeout).
    pub fn errored(stage_name: &str, error: &anyhow::Error, duration_ms: u64) -> Self {
        Self {
            stage_name: stage_name.to_string(),
            exit_code: -1,
            stdout: String::new(),
            stderr: format!("{error:#}"),
            duration_ms,
            success: false,
        }
    }
}

/// Executes a single build stage.
pub struct StageRunner;

impl StageRunner {
    /// Execute a single stage and return the result.
    ///
    /// The command runs in the stage's working directory with the `PATH`
    /// from `env`. A non-zero exit is reported in the result; an `Err`
    /// means the command could not be run or timed out.
    pub async fn execute_stage(config: &StageConfig, env: &BuildEnv) -> anyhow::Result<StageResult> {
        let start = Instant::now();

        // Validate command
        if config.command.is_empty() {
            anyhow::bail!("Stage {} has empty command", config.name);
        }

        let exe = &config.command[0];
        let args = &config.command[1..];

        info!(
            "[{}]>{}",
            config.working_dir.display(),
            config.display_command()
        );

        let mut command = Command::new(exe);
        command.args(args).current_dir(&config.working_dir);
        env.apply(&mut command);
        if config.capture_output {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }
        command.kill_on_drop(true);

        let child = command
            .spawn()
            .map_err(|e| anyhow::anyhow!("Stage {} failed to start {}: {}", config.name, exe, e))?;

        // Execute with timeout
        let output = if config.timeout_secs > 0 {
            tokio::time::timeout(
                std::time::Duration::from_secs(config.timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "Stage {} timed out after {} seconds",
                    config.name,
                    config.timeout_secs
                )
            })??
        } else {
            child.wait_with_output().await?
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        let success = output.status.success();

        Ok(StageResult {
            stage_name: config.name.clone(),
            exit_code,
            stdout,
            stderr,
            duration_ms,
            success,
        })
    }
}
