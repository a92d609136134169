//! SSCE CI - CMake build driving
//!
//! Provides a build pipeline that:
//! - Checks the CMake version, configures, builds
//! - Optionally installs, packages and deploys
//! - Optionally runs the CTest suite
//!
//! The first failing stage aborts the run; no later stage executes.

pub mod env;
pub mod error;
pub mod options;
pub mod pipeline;
pub mod runner;
pub mod stage;

// Re-export key types
pub use env::BuildEnv;
pub use error::BuildError;
pub use options::{BuildOptions, MINGW_GENERATOR};
pub use pipeline::{BuildPipeline, PipelineOutcome, PipelineResult};
pub use runner::{StageResult, StageRunner};
pub use stage::{BuildStage, StageConfig};
