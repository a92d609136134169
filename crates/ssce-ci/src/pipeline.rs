//! Build pipeline orchestration.

use crate::env::BuildEnv;
use crate::runner::{StageResult, StageRunner};
use crate::stage::StageConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::{error, info};

/// Terminal state of a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// Every stage passed.
    Done,

    /// `stage` failed; nothing after it ran.
    Aborted { stage: String, exit_code: i32 },
}

/// Result of a complete build pipeline execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineResult {
    pub outcome: PipelineOutcome,

    /// Results of the stages that ran, in order.
    pub stages: Vec<StageResult>,

    /// Total duration in milliseconds.
    pub duration_ms: u64,
}

impl PipelineResult {
    pub fn success(&self) -> bool {
        self.outcome == PipelineOutcome::Done
    }

    /// Number of stages that passed.
    pub fn passed_count(&self) -> usize {
        self.stages.iter().filter(|s| s.passed()).count()
    }

    /// The stage that aborted the run, if any.
    pub fn failed_stage(&self) -> Option<&StageResult> {
        self.stages.iter().find(|s| !s.passed())
    }

    /// Write this result as pretty-printed JSON.
    pub fn write_report(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write build report {}", path.display()))?;
        Ok(())
    }
}

/// Build pipeline orchestrator.
pub struct BuildPipeline;

impl BuildPipeline {
    /// Execute stages in order, stopping at the first failure.
    ///
    /// A stage fails when its command exits non-zero, cannot be started, or
    /// times out.
    pub async fn run(stages: Vec<StageConfig>, env: &BuildEnv) -> PipelineResult {
        let start = Instant::now();
        let mut stage_results = Vec::new();

        info!(stages = stages.len(), "Starting build pipeline");

        for config in stages {
            info!(stage = %config.name, "Executing stage");

            let stage_start = Instant::now();
            let result = match StageRunner::execute_stage(&config, env).await {
                Ok(r) => r,
                Err(e) => {
                    StageResult::errored(&config.name, &e, stage_start.elapsed().as_millis() as u64)
                }
            };

            if !result.passed() {
                error!(
                    stage = %result.stage_name,
                    exit_code = result.exit_code,
                    "Stage failed, aborting build"
                );
                let outcome = PipelineOutcome::Aborted {
                    stage: result.stage_name.clone(),
                    exit_code: result.exit_code,
                };
                stage_results.push(result);
                return PipelineResult {
                    outcome,
                    stages: stage_results,
                    duration_ms: start.elapsed().as_millis() as u64,
                };
            }

            info!(stage = %result.stage_name, duration_ms = result.duration_ms, "Stage passed");
            stage_results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(duration_ms, "Build pipeline completed successfully");

        PipelineResult {
            outcome: PipelineOutcome::Done,
            stages: stage_results,
            duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, exit_code: i32) -> StageResult {
        StageResult {
            stage_name: name.to_string(),
            exit_code,
            stdout: "".to_string(),
            stderr: if exit_code == 0 { "" } else { "error" }.to_string(),
            duration_ms: 100,
            success: exit_code == 0,
        }
    }

    #[test]
    fn test_pipeline_result_done() {
        let result = PipelineResult {
            outcome: PipelineOutcome::Done,
            stages: vec![result("version", 0), result("configure", 0)],
            duration_ms: 300,
        };

        assert!(result.success());
        assert_eq!(result.passed_count(), 2);
        assert!(result.failed_stage().is_none());
    }

    #[test]
    fn test_pipeline_result_aborted() {
        let result = PipelineResult {
            outcome: PipelineOutcome::Aborted {
                stage: "build".to_string(),
                exit_code: 2,
            },
            stages: vec![result("configure", 0), result("build", 2)],
            duration_ms: 300,
        };

        assert!(!result.success());
        assert_eq!(result.passed_count(), 1);
        assert_eq!(result.failed_stage().unwrap().stage_name, "build");
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(PipelineOutcome::Aborted {
            stage: "test".to_string(),
            exit_code: 8,
        })
        .unwrap();
        assert_eq!(json["status"], "aborted");
        assert_eq!(json["stage"], "test");
        assert_eq!(json["exit_code"], 8);

        let done = serde_json::to_value(PipelineOutcome::Done).unwrap();
        assert_eq!(done["status"], "done");
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let result = PipelineResult {
            outcome: PipelineOutcome::Done,
            stages: vec![result("version", 0)],
            duration_ms: 12,
        };
        result.write_report(&path).unwrap();

        let parsed: PipelineResult =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(parsed, result);
    }
}
