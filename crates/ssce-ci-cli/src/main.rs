//! SSCE CI - helper CLI for CI agents
//!
//! ## Commands
//!
//! - `package`: bundle install output and test artifacts into a `.tar.xz`
//! - `upload`: store a package on the artifact server
//! - `build`: configure, build, package and test with CMake/CTest

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

use ssce_ci::{BuildEnv, BuildOptions, BuildPipeline, PipelineOutcome};
use ssce_ci_core::archive::write_base64;
use ssce_ci_core::platform::host_system_name;
use ssce_ci_core::{
    ArchiveEmit, ArchiveTarget, Archiver, FtpConfig, FtpStore, RetryPolicy, UploadPlan, Uploader,
    DEFAULT_FTP_HOST, DEFAULT_FTP_USER, WRAP_WIDTH,
};

#[derive(Parser)]
#[command(name = "ssce-ci")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Packaging, artifact upload and CMake build helpers for CI", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bundle an install directory and test_* artifacts into <name>.tar.xz
    Package {
        /// Install directory whose children are archived
        install_dir: PathBuf,

        /// Output base name; ".tar.xz" is appended
        name: String,

        /// Any value here also requests an upload
        #[arg(hide = true, conflicts_with = "base64")]
        upload_marker: Option<String>,

        /// Upload the archive after writing it
        #[arg(long)]
        upload: bool,

        /// Print the archive base64 encoded on stdout
        #[arg(long, conflicts_with = "upload")]
        base64: bool,

        /// Column width for base64 output
        #[arg(long, default_value_t = WRAP_WIDTH)]
        wrap: usize,

        /// Print base64 output as a single line without rule lines
        #[arg(long)]
        no_wrap: bool,

        #[command(flatten)]
        remote: RemoteArgs,
    },

    /// Upload a package file to the artifact server
    Upload {
        /// Package file to upload
        package: PathBuf,

        #[command(flatten)]
        remote: RemoteArgs,
    },

    /// Run the CMake/CTest build pipeline
    Build {
        /// CMake generator
        #[arg(long)]
        generator: Option<String>,

        /// Install prefix; enables the install stage
        #[arg(long)]
        install_dir: Option<PathBuf>,

        /// Project root (default: current directory)
        #[arg(long, default_value = ".")]
        source_dir: PathBuf,

        /// Build tree, relative to the project root
        #[arg(long, default_value = "build")]
        build_dir: PathBuf,

        /// Configure with CMAKE_VERBOSE_MAKEFILE=ON
        #[arg(long)]
        verbose_makefile: bool,

        /// Configure a Debug build
        #[arg(long)]
        trace: bool,

        /// Allocator selected at configure time
        #[arg(long, default_value = "system")]
        allocator: String,

        /// Parallel build jobs (default: number of cores)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Skip the package stage
        #[arg(long)]
        no_package: bool,

        /// Skip the test stage
        #[arg(long)]
        no_test: bool,

        /// Build the deploy target after packaging (implied when APPVEYOR is set)
        #[arg(long)]
        deploy: bool,

        /// Per-test timeout in seconds
        #[arg(long, default_value = "60")]
        test_timeout: u64,

        /// Write a JSON build report to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RemoteArgs {
    /// Build identifier used in the remote path
    #[arg(long, env = "ARTIFACT_ID")]
    build_id: Option<String>,

    /// Artifact server password
    #[arg(long, env = "ARTIFACT_PASW", hide_env_values = true)]
    password: Option<String>,

    /// Artifact server host
    #[arg(long, env = "SSCE_FTP_HOST", default_value = DEFAULT_FTP_HOST)]
    host: String,

    /// Artifact server account
    #[arg(long, env = "SSCE_FTP_USER", default_value = DEFAULT_FTP_USER)]
    user: String,

    /// System name override (Linux, Darwin, Windows)
    #[arg(long, env = "SSCE_PLATFORM")]
    platform: Option<String>,

    /// Give up after this many upload attempts (default: retry forever)
    #[arg(long)]
    max_attempts: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    ssce_ci_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Package {
            install_dir,
            name,
            upload_marker,
            upload,
            base64,
            wrap,
            no_wrap,
            remote,
        } => {
            let emit = if upload || upload_marker.is_some() {
                ArchiveEmit::Upload
            } else if base64 {
                ArchiveEmit::Base64 {
                    wrap: (!no_wrap).then_some(wrap),
                }
            } else {
                ArchiveEmit::File
            };
            cmd_package(&install_dir, &name, emit, &remote).await
        }
        Commands::Upload { package, remote } => cmd_upload(&package, &remote).await,
        Commands::Build {
            generator,
            install_dir,
            source_dir,
            build_dir,
            verbose_makefile,
            trace,
            allocator,
            jobs,
            no_package,
            no_test,
            deploy,
            test_timeout,
            report,
        } => {
            let options = BuildOptions {
                source_dir,
                build_dir,
                generator,
                install_dir,
                verbose: verbose_makefile,
                trace,
                allocator,
                jobs,
                package: !no_package,
                deploy: deploy || std::env::var_os("APPVEYOR").is_some(),
                test: !no_test,
                test_timeout_secs: test_timeout,
                capture_output: false,
            };
            cmd_build(&options, report.as_deref()).await
        }
    }
}

/// Write the archive and dispatch it
async fn cmd_package(
    install_dir: &Path,
    name: &str,
    emit: ArchiveEmit,
    remote: &RemoteArgs,
) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let archiver = Archiver::new(ArchiveTarget::new(install_dir, name, &cwd));
    let summary = archiver.build().context("Failed to write archive")?;

    match emit {
        ArchiveEmit::File => {
            info!(
                "Archive {} ({} entries, {} bytes, sha256 {})",
                summary.output.display(),
                summary.entries.len(),
                summary.bytes,
                summary.sha256
            );
            Ok(())
        }
        ArchiveEmit::Base64 { wrap } => {
            let stdout = std::io::stdout();
            write_base64(&summary.output, wrap, &mut stdout.lock())?;
            Ok(())
        }
        ArchiveEmit::Upload => cmd_upload(&summary.output, remote).await,
    }
}

/// Upload a package, retrying transport failures
async fn cmd_upload(package: &Path, remote: &RemoteArgs) -> Result<()> {
    let system_name = remote
        .platform
        .clone()
        .unwrap_or_else(|| host_system_name().to_string());
    let build_id = remote
        .build_id
        .as_deref()
        .context("ARTIFACT_ID (or --build-id) is required for uploads")?;

    // Resolve the destination first: an unsupported platform must fail
    // before any connection is attempted.
    let plan = UploadPlan::resolve(&system_name, build_id, package)?;

    let password = remote
        .password
        .clone()
        .context("ARTIFACT_PASW (or --password) is required for uploads")?;
    let config = FtpConfig::new(password)
        .with_host(remote.host.clone())
        .with_user(remote.user.clone());

    let policy = match remote.max_attempts {
        Some(n) => RetryPolicy::bounded(n),
        None => RetryPolicy::unbounded(),
    };

    let uploader = Uploader::new(Arc::new(FtpStore::new(config)), policy);
    let receipt = uploader
        .upload(&plan)
        .await
        .with_context(|| format!("Failed to upload {}", package.display()))?;

    println!(
        "Uploaded {} to {} ({} bytes, {} attempt(s))",
        package.display(),
        receipt.remote_path,
        receipt.bytes,
        receipt.attempts
    );
    Ok(())
}

/// Run the build pipeline; any failed stage fails the command
async fn cmd_build(options: &BuildOptions, report: Option<&Path>) -> Result<()> {
    let env = BuildEnv::from_process(options).context("Invalid build environment")?;
    let stages = options.plan();

    let result = BuildPipeline::run(stages, &env).await;

    if let Some(path) = report {
        result.write_report(path)?;
    }

    for stage in &result.stages {
        let status = if stage.passed() { "✓" } else { "✗" };
        eprintln!(
            "  {} {} ({}ms, exit code: {})",
            status, stage.stage_name, stage.duration_ms, stage.exit_code
        );
    }

    match &result.outcome {
        PipelineOutcome::Done => {
            info!(duration_ms = result.duration_ms, "Build finished");
            Ok(())
        }
        PipelineOutcome::Aborted { stage, exit_code } => {
            if let Some(failed) = result.failed_stage() {
                if !failed.stdout.is_empty() {
                    eprintln!("{}", failed.stdout);
                }
                if !failed.stderr.is_empty() {
                    eprintln!("{}", failed.stderr);
                }
            }
            anyhow::bail!("Stage '{}' failed with exit code {}", stage, exit_code)
        }
    }
}
