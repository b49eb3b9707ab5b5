//! Error types for the benchmark driver
//!
//! Mount failures are local to a single phase and never abort a run.
//! Command failures are fatal and map to a dedicated process exit code.

use thiserror::Error;

/// Exit status used when a workload or `sync` command fails
pub const COMMAND_FAILURE_EXIT_CODE: u8 = 42;

/// Exit status for every other error
pub const GENERIC_FAILURE_EXIT_CODE: u8 = 1;

/// Errors raised while mounting or unmounting the filesystem under test
#[derive(Error, Debug)]
pub enum MountError {
    #[error("Failed to launch filesystem binary {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to prepare {path}: {source}")]
    Storage {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Filesystem process exited before mounting ({status})")]
    Exited { status: String },

    #[error("Failed to unmount {mountpoint}: {reason}")]
    Unmount { mountpoint: String, reason: String },

    #[error("Timed out after {millis} ms waiting for {what}")]
    Timeout { what: String, millis: u128 },
}

/// Errors that stop a benchmark run
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Command `{command}` failed ({status})")]
    CommandFailed { command: String, status: String },

    #[error(transparent)]
    Mount(#[from] MountError),

    #[error("Elapsed time measured as zero, cannot compute throughput")]
    ZeroElapsed,

    #[error("No test case with index {index} (have {count})")]
    NoSuchTestCase { index: usize, count: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BenchError {
    /// Process exit status the binary should terminate with
    pub fn exit_code(&self) -> u8 {
        match self {
            BenchError::CommandFailed { .. } => COMMAND_FAILURE_EXIT_CODE,
            _ => GENERIC_FAILURE_EXIT_CODE,
        }
    }
}

/// Result type for benchmark operations
pub type Result<T> = std::result::Result<T, BenchError>;
