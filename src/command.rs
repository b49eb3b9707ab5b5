//! Subprocess pipelines for workloads
//!
//! Commands are built as explicit argv vectors and never handed to a shell.
//! A [`Pipeline`] connects each stage's stdout to the next stage's stdin.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs::File;
use std::io;
use std::process::{Child, Command, ExitStatus, Stdio};

use crate::error::{BenchError, Result};

/// A single program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl CommandSpec {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

/// Quote an argument for display only; nothing is ever executed through this
fn display_arg(arg: &OsStr) -> String {
    let s = arg.to_string_lossy();
    if s.is_empty() || s.chars().any(|c| c.is_whitespace() || c == '"' || c == '\'') {
        format!("\"{}\"", s.replace('"', "\\\""))
    } else {
        s.into_owned()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", display_arg(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", display_arg(arg))?;
        }
        Ok(())
    }
}

/// One or more commands connected stdout to stdin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub stages: Vec<CommandSpec>,
    /// Send the last stage's stdout to `/dev/null`
    pub discard_output: bool,
}

impl Pipeline {
    pub fn single(command: CommandSpec) -> Self {
        Self {
            stages: vec![command],
            discard_output: false,
        }
    }

    pub fn pipe(mut self, next: CommandSpec) -> Self {
        self.stages.push(next);
        self
    }

    pub fn discard_output(mut self) -> Self {
        self.discard_output = true;
        self
    }

    /// `sync`, used to flush dirty data after a write workload
    pub fn sync() -> Self {
        Self::single(CommandSpec::new("sync"))
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{}", stage)?;
        }
        if self.discard_output {
            f.write_str(" > /dev/null")?;
        }
        Ok(())
    }
}

/// Executes pipelines synchronously
///
/// Any stage failing to start or exiting non-zero is reported as
/// [`BenchError::CommandFailed`].
pub trait CommandRunner {
    fn run(&mut self, pipeline: &Pipeline) -> Result<()>;
}

/// Runs pipelines as real child processes
///
/// Whatever the last stage prints goes to stderr (or the file given to
/// [`SystemRunner::with_output`]), never to stdout, which belongs to the report.
#[derive(Debug, Default)]
pub struct SystemRunner {
    output: Option<File>,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(output: File) -> Self {
        Self {
            output: Some(output),
        }
    }

    fn output_sink(&self) -> io::Result<Stdio> {
        match &self.output {
            Some(file) => Ok(Stdio::from(file.try_clone()?)),
            None => Ok(Stdio::from(io::stderr())),
        }
    }

    fn spawn_all(&self, pipeline: &Pipeline, children: &mut Vec<Child>) -> io::Result<()> {
        let last = pipeline.stages.len().saturating_sub(1);
        let mut previous_stdout = None;

        for (i, stage) in pipeline.stages.iter().enumerate() {
            let mut cmd = stage.to_command();
            if let Some(stdout) = previous_stdout.take() {
                cmd.stdin(Stdio::from(stdout));
            }
            if i < last {
                cmd.stdout(Stdio::piped());
            } else if pipeline.discard_output {
                cmd.stdout(Stdio::null());
            } else {
                cmd.stdout(self.output_sink()?);
            }

            tracing::debug!(stage = %stage, "spawning");
            let mut child = cmd.spawn()?;
            previous_stdout = child.stdout.take();
            children.push(child);
        }
        Ok(())
    }
}

impl CommandRunner for SystemRunner {
    fn run(&mut self, pipeline: &Pipeline) -> Result<()> {
        let command = pipeline.to_string();
        if pipeline.stages.is_empty() {
            return Err(BenchError::CommandFailed {
                command,
                status: "empty pipeline".to_string(),
            });
        }

        let mut children = Vec::with_capacity(pipeline.stages.len());
        let spawned = self.spawn_all(pipeline, &mut children);

        // Reap whatever did start, even when a later stage failed to spawn
        let mut failure: Option<String> = None;
        for (stage, mut child) in pipeline.stages.iter().zip(children) {
            let problem = match child.wait() {
                Ok(status) if status.success() => None,
                Ok(status) => Some(describe_failure(stage, status)),
                Err(e) => Some(format!("{}: wait failed: {}", stage, e)),
            };
            if failure.is_none() {
                failure = problem;
            }
        }

        if let Err(e) = spawned {
            failure = Some(format!("failed to start: {}", e));
        }

        match failure {
            None => {
                tracing::debug!(command = %command, "command succeeded");
                Ok(())
            }
            Some(status) => Err(BenchError::CommandFailed { command, status }),
        }
    }
}

fn describe_failure(stage: &CommandSpec, status: ExitStatus) -> String {
    format!("{} exited with {}", display_arg(&stage.program), status)
}
