//! Build options and the stage plan derived from them.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::stage::{BuildStage, StageConfig};

/// Generator that needs the MinGW toolchain on `PATH`.
pub const MINGW_GENERATOR: &str = "MinGW Makefiles";

/// Knobs of one build.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildOptions {
    /// Project root; configure and build stages run here.
    pub source_dir: PathBuf,

    /// Build tree, relative to `source_dir` unless absolute.
    pub build_dir: PathBuf,

    /// CMake generator (`-G`).
    pub generator: Option<String>,

    /// Install prefix; enables the install stage.
    pub install_dir: Option<PathBuf>,

    /// `CMAKE_VERBOSE_MAKEFILE=ON`.
    pub verbose: bool,

    /// Debug build type for tracing.
    pub trace: bool,

    /// Value of the `SSCE_ALLOCATOR` cache entry.
    pub allocator: String,

    /// Parallel build jobs; host core count when unset.
    pub jobs: Option<usize>,

    pub package: bool,

    /// Build the `deploy` target after packaging.
    pub deploy: bool,

    pub test: bool,

    /// Per-test timeout handed to ctest.
    pub test_timeout_secs: u64,

    /// Capture command output instead of streaming it.
    pub capture_output: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            build_dir: PathBuf::from("build"),
            generator: None,
            install_dir: None,
            verbose: false,
            trace: false,
            allocator: "system".to_string(),
            jobs: None,
            package: true,
            deploy: false,
            test: true,
            test_timeout_secs: 60,
            capture_output: false,
        }
    }
}

impl BuildOptions {
    /// Whether the MinGW toolchain must be put on `PATH`.
    pub fn needs_mingw(&self) -> bool {
        self.generator.as_deref() == Some(MINGW_GENERATOR)
    }

    /// Build tree as seen from the process.
    pub fn build_path(&self) -> PathBuf {
        self.source_dir.join(&self.build_dir)
    }

    fn parallel_jobs(&self) -> usize {
        self.jobs.filter(|&n| n > 0).unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Ordered stages of this build:
    /// `version → configure → build → [install] → [package → [deploy]] → [test]`.
    pub fn plan(&self) -> Vec<StageConfig> {
        let build_dir = self.build_dir.to_string_lossy().into_owned();
        let src = self.source_dir.clone();
        let mut stages = Vec::new();

        stages.push(StageConfig::for_stage(
            BuildStage::Version,
            args(&["cmake", "--version"]),
            src.clone(),
        ));

        let mut configure = vec!["cmake".to_string(), format!("-B{build_dir}")];
        if self.verbose {
            configure.push("-DCMAKE_VERBOSE_MAKEFILE=ON".to_string());
        }
        if self.trace {
            configure.push("-DCMAKE_BUILD_TYPE=Debug".to_string());
        }
        if let Some(generator) = &self.generator {
            configure.push(format!("-G{generator}"));
        }
        if let Some(prefix) = &self.install_dir {
            configure.push(format!("-DCMAKE_INSTALL_PREFIX={}", prefix.display()));
        }
        configure.push(format!("-DSSCE_ALLOCATOR={}", self.allocator));
        stages.push(StageConfig::for_stage(
            BuildStage::Configure,
            configure,
            src.clone(),
        ));

        stages.push(StageConfig::for_stage(
            BuildStage::Build,
            vec![
                "cmake".to_string(),
                "--build".to_string(),
                build_dir.clone(),
                "--parallel".to_string(),
                self.parallel_jobs().to_string(),
            ],
            src.clone(),
        ));

        let mut targets = Vec::new();
        if self.install_dir.is_some() {
            targets.push(BuildStage::Install);
        }
        if self.package {
            targets.push(BuildStage::Package);
            if self.deploy {
                targets.push(BuildStage::Deploy);
            }
        }
        for stage in targets {
            let target = stage.cmake_target().unwrap_or(stage.name());
            stages.push(StageConfig::for_stage(
                stage,
                args(&["cmake", "--build", &build_dir, "--target", target]),
                src.clone(),
            ));
        }

        if self.test {
            stages.push(StageConfig::for_stage(
                BuildStage::Test,
                args(&[
                    "ctest",
                    "-VV",
                    "--timeout",
                    &self.test_timeout_secs.to_string(),
                ]),
                self.build_path(),
            ));
        }

        stages
            .into_iter()
            .map(|s| s.captured(self.capture_output))
            .collect()
    }
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(stages: &[StageConfig]) -> Vec<&str> {
        stages.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_default_plan() {
        let stages = BuildOptions::default().plan();
        assert_eq!(
            names(&stages),
            vec!["version", "configure", "build", "package", "test"]
        );
        assert_eq!(stages[0].command, args(&["cmake", "--version"]));
        assert_eq!(
            stages[1].command,
            args(&["cmake", "-Bbuild", "-DSSCE_ALLOCATOR=system"])
        );
    }

    #[test]
    fn test_minimal_plan() {
        let options = BuildOptions {
            package: false,
            test: false,
            ..BuildOptions::default()
        };
        assert_eq!(names(&options.plan()), vec!["version", "configure", "build"]);
    }

    #[test]
    fn test_full_plan_order() {
        let options = BuildOptions {
            install_dir: Some(PathBuf::from("/opt/ssce")),
            deploy: true,
            ..BuildOptions::default()
        };
        assert_eq!(
            names(&options.plan()),
            vec!["version", "configure", "build", "install", "package", "deploy", "test"]
        );
    }

    #[test]
    fn test_deploy_requires_package() {
        let options = BuildOptions {
            package: false,
            deploy: true,
            ..BuildOptions::default()
        };
        assert!(!names(&options.plan()).contains(&"deploy"));
    }

    #[test]
    fn test_configure_flags() {
        let options = BuildOptions {
            generator: Some(MINGW_GENERATOR.to_string()),
            install_dir: Some(PathBuf::from("/opt/ssce")),
            verbose: true,
            trace: true,
            allocator: "galloc".to_string(),
            ..BuildOptions::default()
        };
        let configure = &options.plan()[1];
        assert_eq!(
            configure.command,
            args(&[
                "cmake",
                "-Bbuild",
                "-DCMAKE_VERBOSE_MAKEFILE=ON",
                "-DCMAKE_BUILD_TYPE=Debug",
                "-GMinGW Makefiles",
                "-DCMAKE_INSTALL_PREFIX=/opt/ssce",
                "-DSSCE_ALLOCATOR=galloc",
            ])
        );
        assert!(options.needs_mingw());
    }

    #[test]
    fn test_build_parallelism() {
        let options = BuildOptions {
            jobs: Some(3),
            ..BuildOptions::default()
        };
        let build = &options.plan()[2];
        assert_eq!(
            build.command,
            args(&["cmake", "--build", "build", "--parallel", "3"])
        );

        let auto = BuildOptions::default().plan();
        let jobs: usize = auto[2].command[4].parse().unwrap();
        assert!(jobs >= 1);
    }

    #[test]
    fn test_stage_runs_in_build_dir() {
        let options = BuildOptions {
            source_dir: PathBuf::from("/src/ssce"),
            test_timeout_secs: 120,
            ..BuildOptions::default()
        };
        let stages = options.plan();
        let test = stages.last().unwrap();
        assert_eq!(test.command, args(&["ctest", "-VV", "--timeout", "120"]));
        assert_eq!(test.working_dir, PathBuf::from("/src/ssce/build"));
        assert_eq!(stages[1].working_dir, PathBuf::from("/src/ssce"));
    }

    #[test]
    fn test_capture_propagates() {
        let options = BuildOptions {
            capture_output: true,
            ..BuildOptions::default()
        };
        assert!(options.plan().iter().all(|s| s.capture_output));
    }
}
