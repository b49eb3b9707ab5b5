//! Reporting hooks called by the driver as a run progresses

use std::io;

use crate::command::Pipeline;
use crate::measurement::{MeasurementRecord, Phase};
use crate::suite::{TestCase, Workload};

/// Receives benchmark progress and results
pub trait Reporter {
    fn test_case_started(&mut self, index: usize, case: &TestCase) -> io::Result<()>;

    fn phase_started(&mut self, phase: Phase, workload: &Workload, command: &Pipeline) -> io::Result<()>;

    fn measured(&mut self, record: &MeasurementRecord) -> io::Result<()>;

    /// Called once after the last test case
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}
