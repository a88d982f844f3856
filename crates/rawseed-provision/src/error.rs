// crates/rawseed-provision/src/error.rs

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{operation} failed with {status}")]
    CommandFailed {
        operation: String,
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },

    #[error("failed to encode arguments for {operation}: {source}")]
    Arguments {
        operation: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "postgres")]
    #[error("CSV header error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Pipeline(#[from] rawseed_core::PipelineError),

    #[cfg(feature = "postgres")]
    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[cfg(feature = "postgres")]
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProvisionError>;
