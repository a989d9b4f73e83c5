//! Execution of multi-stage pipelines.
//!
//! All pipes are created before the first child is spawned, and every stage is
//! spawned before anything is waited for, so an early stage that fills its pipe
//! always has a reader. Each pipe end is moved into exactly one child; the
//! orchestrator's copies are closed as soon as their owner is spawned and, at the
//! latest, before the first wait. Because every end is close-on-exec, no child
//! inherits a pipe it is not adjacent to, and every reader observes end of stream
//! once its writer exits.

use crate::command::{ExitCode, Stdin, Stdout};
use crate::env::Environment;
use crate::error::ShellError;
use crate::parser::Argv;
use crate::process::{self, Pipe, ProcessHandle};
use log::{debug, warn};
use std::fs::File;

/// How one stage of a pipeline ended.
#[derive(Debug)]
pub enum StageOutcome {
    /// The stage ran and was reaped with this status.
    Exited(ExitCode),
    /// The stage could not be started, or its status could not be collected.
    Failed(ShellError),
}

impl StageOutcome {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            StageOutcome::Exited(code) => *code,
            StageOutcome::Failed(err) => err.exit_code(),
        }
    }
}

/// Per-stage results of a completed pipeline, in stage order.
#[derive(Debug)]
pub struct PipelineReport {
    pub stages: Vec<StageOutcome>,
}

impl PipelineReport {
    /// Status of the pipeline as a whole: the status of its last stage.
    pub fn exit_code(&self) -> ExitCode {
        self.stages.last().map_or(0, StageOutcome::exit_code)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ShellError> {
        self.stages.iter().filter_map(|stage| match stage {
            StageOutcome::Failed(err) => Some(err),
            StageOutcome::Exited(_) => None,
        })
    }
}

/// Read and write ends of one pipe, taken as the adjacent stages are spawned.
struct Link {
    reader: Option<File>,
    writer: Option<File>,
}

/// Run `stages` connected by pipes and wait for all of them.
///
/// The first stage reads the shell's standard input. The last stage writes to
/// `sink` when given, otherwise to the shell's standard output. Only a failure to
/// create a pipe aborts the attempt, before any child exists; a stage that cannot
/// be started is recorded as failed and its neighbours see end of stream or a
/// broken pipe.
pub fn run(
    env: &Environment,
    stages: &[Argv],
    mut sink: Option<Box<dyn Stdout>>,
) -> Result<PipelineReport, ShellError> {
    let mut links = Vec::with_capacity(stages.len().saturating_sub(1));
    for _ in 1..stages.len() {
        let Pipe { reader, writer } = process::pipe()?;
        links.push(Link {
            reader: Some(reader),
            writer: Some(writer),
        });
    }
    debug!("running {} stage pipeline over {} pipes", stages.len(), links.len());

    let last = stages.len().saturating_sub(1);
    let mut spawned: Vec<Result<ProcessHandle, ShellError>> = Vec::with_capacity(stages.len());
    for (i, argv) in stages.iter().enumerate() {
        let stdin: Option<Box<dyn Stdin>> = match i {
            0 => None,
            _ => links[i - 1]
                .reader
                .take()
                .map(|r| Box::new(r) as Box<dyn Stdin>),
        };
        let stdout: Option<Box<dyn Stdout>> = if i < last {
            links[i].writer.take().map(|w| Box::new(w) as Box<dyn Stdout>)
        } else {
            sink.take()
        };

        // On failure the ends handed to this stage are dropped, i.e. closed.
        let handle = process::spawn(env, argv, stdin, stdout);
        if let Err(err) = &handle {
            warn!("pipeline stage {i} failed to start: {err}");
        }
        spawned.push(handle);
    }

    // Nothing may still be held here once waiting starts.
    drop(links);

    let stages = spawned
        .into_iter()
        .map(|handle| match handle.and_then(ProcessHandle::wait) {
            Ok(code) => StageOutcome::Exited(code),
            Err(err) => StageOutcome::Failed(err),
        })
        .collect();
    Ok(PipelineReport { stages })
}
