//! Test cases, workloads and test selection

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::backend::{Backend, BackendOptions};
use crate::command::{CommandSpec, Pipeline};
use crate::error::{BenchError, Result};

/// Placeholder replaced by the mountpoint in custom command arguments
pub const MOUNTPOINT_TOKEN: &str = "{mountpoint}";

/// File name `CopyFile` workloads write to inside the mountpoint
pub const COPY_TARGET: &str = "foo.dat";

/// A labelled backend configuration to benchmark
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub label: String,
    #[serde(flatten)]
    pub options: BackendOptions,
}

impl TestCase {
    pub fn new(label: impl Into<String>, options: BackendOptions) -> Self {
        Self {
            label: label.into(),
            options,
        }
    }

    /// Read-back only makes sense when data survives a remount
    pub fn persists_data(&self) -> bool {
        self.options.persists_data()
    }
}

/// What a write workload does to the mounted filesystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkloadKind {
    /// Copy one large file in 1 MiB blocks with `dd`
    CopyFile { source: PathBuf },
    /// Copy a directory tree with `rsync -a`
    SyncTree { source: PathBuf },
    /// Any other program; `{mountpoint}` in an argument is substituted
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

/// A timed write workload and the amount of work it represents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    #[serde(flatten)]
    pub kind: WorkloadKind,
    /// Number of units moved; throughput is reported per unit
    pub units: u64,
    /// Singular unit name, e.g. "megabyte" or "file"
    pub unit: String,
}

impl Workload {
    pub fn new(kind: WorkloadKind, units: u64, unit: impl Into<String>) -> Self {
        Self {
            kind,
            units,
            unit: unit.into(),
        }
    }

    /// Pipeline that writes this workload's data into `mountpoint`
    pub fn write_pipeline(&self, mountpoint: &Path) -> Pipeline {
        let command = match &self.kind {
            WorkloadKind::CopyFile { source } => {
                let mut input = OsString::from("if=");
                input.push(source);
                let mut output = OsString::from("of=");
                output.push(mountpoint.join(COPY_TARGET));
                CommandSpec::new("dd").arg(input).arg(output).arg("bs=1048576")
            }
            WorkloadKind::SyncTree { source } => {
                let mut target = mountpoint.as_os_str().to_os_string();
                target.push("/");
                CommandSpec::new("rsync").arg("-a").arg(source).arg(target)
            }
            WorkloadKind::Command { program, args } => {
                let mp = mountpoint.to_string_lossy();
                CommandSpec::new(program).args(args.iter().map(|a| a.replace(MOUNTPOINT_TOKEN, &mp)))
            }
        };
        Pipeline::single(command)
    }
}

/// Pipeline that reads every file under `mountpoint` and throws the data away
pub fn read_pipeline(mountpoint: &Path) -> Pipeline {
    Pipeline::single(
        CommandSpec::new("find")
            .arg(mountpoint)
            .args(["-type", "f", "-print0"]),
    )
    .pipe(CommandSpec::new("xargs").args(["-0", "cat"]))
    .discard_output()
}

/// Which test cases to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    All,
    Single(usize),
}

impl Selection {
    /// Negative indices select every test case
    pub fn from_index(index: i64) -> Self {
        usize::try_from(index).map_or(Selection::All, Selection::Single)
    }

    /// Pick the selected cases, keeping declaration order
    pub fn apply<'a>(&self, cases: &'a [TestCase]) -> Result<Vec<(usize, &'a TestCase)>> {
        match *self {
            Selection::All => Ok(cases.iter().enumerate().collect()),
            Selection::Single(index) => cases
                .get(index)
                .map(|case| vec![(index, case)])
                .ok_or(BenchError::NoSuchTestCase {
                    index,
                    count: cases.len(),
                }),
        }
    }
}

/// The backend configurations measured by default
pub fn default_test_cases() -> Vec<TestCase> {
    vec![
        TestCase::new("In-memory dict", BackendOptions::with_backend(Backend::InMemory)),
        TestCase::new(
            "Tree (custom nested btree in one file with superblocks)",
            BackendOptions::with_backend(Backend::Tree),
        ),
        TestCase::new("Badger", BackendOptions::default()),
        // Bolt is supported by the filesystem but too slow to be interesting
        TestCase::new(
            "File (raw 64kb blocks on filesystem)",
            BackendOptions::with_backend(Backend::File),
        ),
    ]
}

/// The write workloads run against every test case by default
pub fn default_workloads() -> Vec<Workload> {
    vec![
        // a single large file
        Workload::new(
            WorkloadKind::CopyFile {
                source: PathBuf::from("/tmp/perf/size/install-highsierra-app.tgz"),
            },
            5078,
            "megabyte",
        ),
        // many small files, 1194MB in total
        Workload::new(
            WorkloadKind::SyncTree {
                source: PathBuf::from("/tmp/perf/amount"),
            },
            60162,
            "file",
        ),
    ]
}
