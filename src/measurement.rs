//! Elapsed time and throughput for a single phase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::{BenchError, Result};

/// Write or read half of a workload run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Write,
    Read,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Write => f.write_str("write"),
            Phase::Read => f.write_str("read"),
        }
    }
}

/// Wall-clock time a phase took to move `units` units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub elapsed: Duration,
    pub units: u64,
}

impl Measurement {
    pub fn new(elapsed: Duration, units: u64) -> Self {
        Self { elapsed, units }
    }

    /// Whole units per second, rounded down
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use tfhfs_perf::measurement::Measurement;
    ///
    /// let m = Measurement::new(Duration::from_secs(10), 5078);
    /// assert_eq!(m.throughput().unwrap(), 507);
    /// ```
    pub fn throughput(&self) -> Result<u64> {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return Err(BenchError::ZeroElapsed);
        }
        Ok((self.units as f64 / secs).floor() as u64)
    }
}

/// One reported result line, as emitted in the JSON report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub test_case: String,
    pub phase: Phase,
    pub command: String,
    pub units: u64,
    pub unit: String,
    pub elapsed_secs: f64,
    pub throughput: u64,
}

/// Everything a finished run measured
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub records: Vec<MeasurementRecord>,
    /// Phases that produced no measurement because the mount was unavailable
    pub skipped_phases: usize,
}

impl RunSummary {
    pub(crate) fn record(&mut self, outcome: Option<MeasurementRecord>) {
        match outcome {
            Some(record) => self.records.push(record),
            None => self.skipped_phases += 1,
        }
    }
}
