//! Integration tests for the build pipeline with real processes.
#![cfg(unix)]

use ssce_ci::{BuildEnv, BuildOptions, BuildPipeline, PipelineOutcome, StageConfig};
use std::path::{Path, PathBuf};

fn env_at(dir: &Path) -> BuildEnv {
    let options = BuildOptions {
        source_dir: dir.to_path_buf(),
        ..BuildOptions::default()
    };
    BuildEnv::from_parts(&options, std::env::var_os("PATH"), None).expect("build env")
}

fn stage(name: &str, dir: &Path, command: &[&str]) -> StageConfig {
    StageConfig::custom(
        name.to_string(),
        command.iter().map(|s| s.to_string()).collect(),
        dir.to_path_buf(),
        60,
    )
    .captured(true)
}

/// Test: every stage passes
#[tokio::test]
async fn test_successful_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let stages = vec![
        stage("version", dir.path(), &["echo", "cmake version 3.28"]),
        stage("configure", dir.path(), &["touch", "configured"]),
        stage("build", dir.path(), &["touch", "built"]),
    ];

    let result = BuildPipeline::run(stages, &env_at(dir.path())).await;

    assert!(result.success(), "Pipeline should succeed");
    assert_eq!(result.outcome, PipelineOutcome::Done);
    assert_eq!(result.passed_count(), 3);
    assert!(dir.path().join("configured").exists());
    assert!(dir.path().join("built").exists());
}

/// Test: a failing stage stops everything after it
#[tokio::test]
async fn test_failure_aborts_remaining_stages() {
    let dir = tempfile::tempdir().unwrap();
    let stages = vec![
        stage("configure", dir.path(), &["touch", "configured"]),
        stage("build", dir.path(), &["sh", "-c", "echo 'undefined reference' >&2; exit 2"]),
        stage("package", dir.path(), &["touch", "packaged"]),
        stage("test", dir.path(), &["touch", "tested"]),
    ];

    let result = BuildPipeline::run(stages, &env_at(dir.path())).await;

    assert!(!result.success());
    assert_eq!(
        result.outcome,
        PipelineOutcome::Aborted {
            stage: "build".to_string(),
            exit_code: 2,
        }
    );
    assert_eq!(result.stages.len(), 2, "Only configure and build ran");
    let failed = result.failed_stage().unwrap();
    assert!(failed.stderr.contains("undefined reference"));

    assert!(dir.path().join("configured").exists());
    assert!(!dir.path().join("packaged").exists());
    assert!(!dir.path().join("tested").exists());
}

/// Test: an executable that cannot be started aborts like a failed stage
#[tokio::test]
async fn test_spawn_failure_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let stages = vec![
        stage("version", dir.path(), &["ssce-no-such-cmake-4711", "--version"]),
        stage("configure", dir.path(), &["touch", "configured"]),
    ];

    let result = BuildPipeline::run(stages, &env_at(dir.path())).await;

    assert!(matches!(
        result.outcome,
        PipelineOutcome::Aborted { ref stage, exit_code: -1 } if stage == "version"
    ));
    assert!(!dir.path().join("configured").exists());
}

/// Test: a stage that cannot start reports its own duration, not the
/// time spent by earlier stages
#[tokio::test]
async fn test_errored_stage_duration_is_its_own() {
    let dir = tempfile::tempdir().unwrap();
    let stages = vec![
        stage("build", dir.path(), &["sleep", "1"]),
        stage("test", dir.path(), &["ssce-ci-no-such-binary"]),
    ];

    let result = BuildPipeline::run(stages, &env_at(dir.path())).await;

    assert_eq!(result.stages.len(), 2);
    assert!(result.stages[0].duration_ms >= 1000);
    assert_eq!(result.stages[1].exit_code, -1);
    assert!(result.stages[1].duration_ms < result.stages[0].duration_ms);
    assert!(result.duration_ms >= result.stages[0].duration_ms);
}

/// Test: each stage runs in its own working directory
#[tokio::test]
async fn test_stages_use_their_working_dir() {
    let dir = tempfile::tempdir().unwrap();
    let build = dir.path().join("build");
    std::fs::create_dir_all(&build).unwrap();

    let stages = vec![
        stage("configure", dir.path(), &["touch", "at_root"]),
        stage("test", &build, &["touch", "at_build"]),
    ];

    let result = BuildPipeline::run(stages, &env_at(dir.path())).await;

    assert!(result.success());
    assert!(dir.path().join("at_root").exists());
    assert!(build.join("at_build").exists());
    assert!(!PathBuf::from("at_build").exists());
}

/// Test: the report serializes with the outcome tag
#[tokio::test]
async fn test_result_serializes_to_json() {
    let dir = tempfile::tempdir().unwrap();
    let stages = vec![stage("build", dir.path(), &["false"])];

    let result = BuildPipeline::run(stages, &env_at(dir.path())).await;
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["outcome"]["status"], "aborted");
    assert_eq!(json["outcome"]["stage"], "build");
    assert_eq!(json["stages"][0]["stage_name"], "build");
}
