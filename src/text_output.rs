//! Human-readable report, one block per phase
//!
//! ```text
//! # Badger
//! ## Write 5078 megabytes
//! Command: dd if=... of=/tmp/x/foo.dat bs=1048576
//!
//! Took 12.345 seconds
//! 411 megabytes per second
//!
//! ## Read it back
//! Command: find /tmp/x -type f -print0 | xargs -0 cat > /dev/null
//! ```

use std::io::{self, Write};

use crate::command::Pipeline;
use crate::measurement::{MeasurementRecord, Phase};
use crate::report::Reporter;
use crate::suite::{TestCase, Workload};

pub struct TextOutput<W: Write> {
    out: W,
}

impl<W: Write> TextOutput<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for TextOutput<W> {
    fn test_case_started(&mut self, _index: usize, case: &TestCase) -> io::Result<()> {
        writeln!(self.out, "# {}", case.label)?;
        self.out.flush()
    }

    fn phase_started(&mut self, phase: Phase, workload: &Workload, command: &Pipeline) -> io::Result<()> {
        match phase {
            Phase::Write => writeln!(self.out, "## Write {} {}s", workload.units, workload.unit)?,
            Phase::Read => writeln!(self.out, "## Read it back")?,
        }
        writeln!(self.out, "Command: {}", command)?;
        self.out.flush()
    }

    fn measured(&mut self, record: &MeasurementRecord) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "Took {:.3} seconds", record.elapsed_secs)?;
        writeln!(self.out, "{} {}s per second", record.throughput, record.unit)?;
        writeln!(self.out)?;
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendOptions;
    use crate::suite::default_workloads;
    use std::path::Path;

    fn render<F: FnOnce(&mut TextOutput<Vec<u8>>) -> io::Result<()>>(f: F) -> String {
        let mut out = TextOutput::new(Vec::new());
        f(&mut out).unwrap();
        String::from_utf8(out.into_inner()).unwrap()
    }

    #[test]
    fn test_header() {
        let case = TestCase::new("Badger", BackendOptions::default());
        assert_eq!(render(|o| o.test_case_started(2, &case)), "# Badger\n");
    }

    #[test]
    fn test_write_phase_pluralizes_unit() {
        let w = &default_workloads()[1];
        let text = render(|o| o.phase_started(Phase::Write, w, &w.write_pipeline(Path::new("/tmp/x"))));
        assert_eq!(
            text,
            "## Write 60162 files\nCommand: rsync -a /tmp/perf/amount /tmp/x/\n"
        );
    }

    #[test]
    fn test_read_phase_header() {
        let w = &default_workloads()[0];
        let text = render(|o| {
            o.phase_started(Phase::Read, w, &crate::suite::read_pipeline(Path::new("/tmp/x")))
        });
        assert!(text.starts_with("## Read it back\nCommand: find /tmp/x"));
    }

    #[test]
    fn test_measurement_block() {
        let record = MeasurementRecord {
            test_case: "Badger".to_string(),
            phase: Phase::Write,
            command: "dd".to_string(),
            units: 5078,
            unit: "megabyte".to_string(),
            elapsed_secs: 10.0,
            throughput: 507,
        };
        assert_eq!(
            render(|o| o.measured(&record)),
            "\nTook 10.000 seconds\n507 megabytes per second\n\n"
        );
    }
}
