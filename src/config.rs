//! Benchmark configuration
//!
//! Defaults reproduce the stock benchmark: mountpoint `/tmp/x`, storage in
//! `/tmp/sanity-tfhfs-storage`, fixtures under `/tmp/perf`. A TOML file can
//! replace any of it; missing fields keep their defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{BenchError, Result};
use crate::fuse_mounter::{DEFAULT_MOUNT_TIMEOUT, DEFAULT_POLL_INTERVAL};
use crate::suite::{default_test_cases, default_workloads, TestCase, Workload};

/// Everything a benchmark run needs to know
///
/// # Example
/// ```
/// use tfhfs_perf::config::BenchConfig;
///
/// let config = BenchConfig::default();
/// assert_eq!(config.mountpoint.to_str(), Some("/tmp/x"));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Directory the filesystem is mounted on
    pub mountpoint: PathBuf,

    /// Directory the filesystem keeps its backend state in
    pub storage_dir: PathBuf,

    /// Filesystem binary, looked up on `PATH` unless absolute
    pub fs_binary: PathBuf,

    /// How long to wait for a mount to appear or a server to exit
    pub mount_timeout_ms: u64,

    /// How often to check while waiting
    pub poll_interval_ms: u64,

    pub test_cases: Vec<TestCase>,

    pub workloads: Vec<Workload>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            mountpoint: PathBuf::from("/tmp/x"),
            storage_dir: PathBuf::from("/tmp/sanity-tfhfs-storage"),
            fs_binary: PathBuf::from("tfhfs"),
            mount_timeout_ms: DEFAULT_MOUNT_TIMEOUT.as_millis() as u64,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            test_cases: default_test_cases(),
            workloads: default_workloads(),
        }
    }
}

impl BenchConfig {
    /// Parse a TOML document
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| BenchError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn mount_timeout(&self) -> Duration {
        Duration::from_millis(self.mount_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.test_cases.is_empty() {
            return Err(BenchError::InvalidConfig(
                "at least one test case is required".to_string(),
            ));
        }

        if self.workloads.is_empty() {
            return Err(BenchError::InvalidConfig(
                "at least one workload is required".to_string(),
            ));
        }

        if let Some(w) = self.workloads.iter().find(|w| w.units == 0) {
            return Err(BenchError::InvalidConfig(format!(
                "workload units must be positive, got 0 {}s",
                w.unit
            )));
        }

        if self.mountpoint == self.storage_dir {
            return Err(BenchError::InvalidConfig(format!(
                "mountpoint and storage_dir must differ, both are {}",
                self.mountpoint.display()
            )));
        }

        if self.poll_interval_ms == 0 || self.mount_timeout_ms < self.poll_interval_ms {
            return Err(BenchError::InvalidConfig(format!(
                "need 0 < poll_interval_ms <= mount_timeout_ms, got {} and {}",
                self.poll_interval_ms, self.mount_timeout_ms
            )));
        }

        Ok(())
    }
}
