//! JSON report: every measurement of the run in one document
//!
//! Progress is not streamed; the document is written by `finish`.

use serde::Serialize;
use std::io::{self, Write};

use crate::command::Pipeline;
use crate::measurement::{MeasurementRecord, Phase};
use crate::report::Reporter;
use crate::suite::{TestCase, Workload};

/// Top-level JSON document
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub version: &'a str,
    pub test_cases: &'a [String],
    pub measurements: &'a [MeasurementRecord],
}

pub struct JsonOutput<W: Write> {
    out: W,
    test_cases: Vec<String>,
    measurements: Vec<MeasurementRecord>,
}

impl<W: Write> JsonOutput<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            test_cases: Vec::new(),
            measurements: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for JsonOutput<W> {
    fn test_case_started(&mut self, _index: usize, case: &TestCase) -> io::Result<()> {
        self.test_cases.push(case.label.clone());
        Ok(())
    }

    fn phase_started(&mut self, _phase: Phase, _workload: &Workload, _command: &Pipeline) -> io::Result<()> {
        Ok(())
    }

    fn measured(&mut self, record: &MeasurementRecord) -> io::Result<()> {
        self.measurements.push(record.clone());
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        let report = JsonReport {
            version: env!("CARGO_PKG_VERSION"),
            test_cases: &self.test_cases,
            measurements: &self.measurements,
        };
        serde_json::to_writer_pretty(&mut self.out, &report)?;
        writeln!(self.out)?;
        self.out.flush()
    }
}
