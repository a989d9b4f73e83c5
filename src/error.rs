use crate::builtin::BuiltinError;
use crate::parser::ParseError;
use std::io;
use thiserror::Error;

/// Every failure the shell can report for one input line.
///
/// Only [`ShellError::Environment`] raised while rendering the prompt and
/// [`ShellError::Input`] are fatal to the read loop; everything else is reported
/// and the loop moves on to the next line.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Builtin(#[from] BuiltinError),

    /// The process could not be created at all.
    #[error("{program}: failed to spawn: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The program was not found or is not executable.
    #[error("{program}: {reason}")]
    Exec { program: String, reason: ExecFailure },

    /// The child was spawned but its status could not be collected.
    #[error("{program}: wait failed: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to create pipe: {0}")]
    Pipe(#[source] nix::Error),

    #[error("{what}: {source}")]
    Environment {
        what: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("failed to read input: {0}")]
    Input(#[source] io::Error),
}

/// Why a program could not be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExecFailure {
    #[error("command not found")]
    NotFound,
    #[error("permission denied")]
    PermissionDenied,
}

impl ExecFailure {
    /// Exit status a conventional shell reports for this failure.
    pub fn exit_code(self) -> crate::command::ExitCode {
        match self {
            ExecFailure::NotFound => 127,
            ExecFailure::PermissionDenied => 126,
        }
    }
}

impl ShellError {
    /// Classify an `io::Error` returned while spawning `program`.
    pub(crate) fn from_spawn(program: &str, source: io::Error) -> Self {
        let reason = match source.kind() {
            io::ErrorKind::NotFound => Some(ExecFailure::NotFound),
            io::ErrorKind::PermissionDenied => Some(ExecFailure::PermissionDenied),
            _ => None,
        };
        match reason {
            Some(reason) => ShellError::Exec {
                program: program.to_owned(),
                reason,
            },
            None => ShellError::Spawn {
                program: program.to_owned(),
                source,
            },
        }
    }

    /// Status recorded for a command that failed with this error.
    pub fn exit_code(&self) -> crate::command::ExitCode {
        match self {
            ShellError::Exec { reason, .. } => reason.exit_code(),
            _ => 1,
        }
    }
}
