//! Benchmark driver
//!
//! Runs every selected test case against every workload, strictly one after
//! another. Each write phase gets a clean mount; backends that persist data
//! are then remounted and read back. A mount that fails only skips its phase;
//! a workload or `sync` command that fails ends the run with
//! [`BenchError::CommandFailed`](crate::error::BenchError::CommandFailed).

use std::time::Instant;

use crate::command::{CommandRunner, Pipeline};
use crate::config::BenchConfig;
use crate::error::Result;
use crate::measurement::{Measurement, MeasurementRecord, Phase, RunSummary};
use crate::mounter::{MountHandle, MountRequest, Mounter};
use crate::report::Reporter;
use crate::suite::{read_pipeline, Selection, TestCase, Workload};

pub struct BenchmarkDriver<M, C, R> {
    config: BenchConfig,
    mounter: M,
    runner: C,
    reporter: R,
}

impl<M, C, R> BenchmarkDriver<M, C, R>
where
    M: Mounter,
    C: CommandRunner,
    R: Reporter,
{
    pub fn new(config: BenchConfig, mounter: M, runner: C, reporter: R) -> Self {
        Self {
            config,
            mounter,
            runner,
            reporter,
        }
    }

    pub fn into_reporter(self) -> R {
        self.reporter
    }

    /// Run the selected test cases in declaration order
    pub fn run(&mut self, selection: Selection) -> Result<RunSummary> {
        let selected: Vec<(usize, TestCase)> = selection
            .apply(&self.config.test_cases)?
            .into_iter()
            .map(|(index, case)| (index, case.clone()))
            .collect();
        let workloads = self.config.workloads.clone();

        let mut summary = RunSummary::default();
        for (index, case) in &selected {
            tracing::info!(index, label = %case.label, "starting test case");
            self.reporter.test_case_started(*index, case)?;

            for workload in &workloads {
                let written = self.run_write_workload(case, workload)?;
                summary.record(written);

                if case.persists_data() {
                    let read = self.run_read_workload(case, workload)?;
                    summary.record(read);
                }
            }
        }

        self.reporter.finish()?;
        Ok(summary)
    }

    /// Clean mount, run the write command and `sync`, report throughput
    ///
    /// Returns `None` when the phase was skipped because the filesystem was
    /// not (or no longer) mounted.
    pub fn run_write_workload(
        &mut self,
        case: &TestCase,
        workload: &Workload,
    ) -> Result<Option<MeasurementRecord>> {
        let pipeline = workload.write_pipeline(&self.config.mountpoint);
        self.run_phase(Phase::Write, case, workload, &pipeline)
    }

    /// Remount without cleaning and read every file back
    pub fn run_read_workload(
        &mut self,
        case: &TestCase,
        workload: &Workload,
    ) -> Result<Option<MeasurementRecord>> {
        let pipeline = read_pipeline(&self.config.mountpoint);
        self.run_phase(Phase::Read, case, workload, &pipeline)
    }

    fn run_phase(
        &mut self,
        phase: Phase,
        case: &TestCase,
        workload: &Workload,
        pipeline: &Pipeline,
    ) -> Result<Option<MeasurementRecord>> {
        self.reporter.phase_started(phase, workload, pipeline)?;

        let request = MountRequest {
            mountpoint: self.config.mountpoint.clone(),
            storage_dir: self.config.storage_dir.clone(),
            clean: phase == Phase::Write,
            options: case.options.clone(),
        };
        let mut handle = match self.mounter.mount(&request) {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(label = %case.label, %phase, "skipping, mount failed: {}", e);
                return Ok(None);
            }
        };
        if !handle.mounted() {
            tracing::warn!(label = %case.label, %phase, "skipping, filesystem not mounted");
            return Ok(None);
        }

        let start = Instant::now();
        self.runner.run(pipeline)?;
        if phase == Phase::Write {
            self.runner.run(&Pipeline::sync())?;
        }

        if !handle.mounted() {
            tracing::warn!(label = %case.label, %phase, "filesystem went away during the workload");
            return Ok(None);
        }
        let elapsed = start.elapsed();
        if let Err(e) = handle.close() {
            tracing::warn!(label = %case.label, %phase, "close failed: {}", e);
        }

        let throughput = Measurement::new(elapsed, workload.units).throughput()?;
        let record = MeasurementRecord {
            test_case: case.label.clone(),
            phase,
            command: pipeline.to_string(),
            units: workload.units,
            unit: workload.unit.clone(),
            elapsed_secs: elapsed.as_secs_f64(),
            throughput,
        };
        tracing::info!(label = %case.label, %phase, throughput, "measured");
        self.reporter.measured(&record)?;
        Ok(Some(record))
    }
}
