//! Build configuration errors.

/// Errors detected before any build command runs.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("environment variable {name} is required: {reason}")]
    MissingEnv { name: &'static str, reason: String },

    #[error("cannot resolve {path}: {source}")]
    Path {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot assemble PATH: {0}")]
    JoinPaths(#[from] std::env::JoinPathsError),
}
