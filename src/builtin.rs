use crate::command::{CommandFactory, Context, ExecutableCommand, Outcome};
use crate::env::Environment;
use crate::error::ShellError;
use crate::history::HistoryError;
use crate::interpreter::Factory;
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the built-in commands. None of them ends the session.
#[derive(Debug, Error)]
pub enum BuiltinError {
    #[error("cd: {}: {source}", .path.display())]
    InvalidDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("history: invalid argument {0:?} (expected -c or a single digit)")]
    InvalidHistoryArgument(String),

    /// Rejection text from the argument parser.
    #[error("{0}")]
    InvalidArgs(String),

    #[error("history: {0}")]
    History(#[from] HistoryError),

    #[error("history: recalled commands nested more than {limit} levels deep")]
    RecallTooDeep { limit: usize },

    #[error("write error: {0}")]
    Output(#[from] io::Error),
}

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cd" or "history".
    fn name() -> &'static str;

    fn execute(self, ctx: &mut Context<'_>) -> Result<Outcome, ShellError>;

    /// Build the command without consulting the argument parser.
    ///
    /// Commands that take any arguments at all, including ones that look like
    /// flags, return `Some` here and are never rejected.
    fn from_any_args(_args: &[&str]) -> Option<Self> {
        None
    }
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(self: Box<Self>, ctx: &mut Context<'_>) -> Result<Outcome, ShellError> {
        <T as BuiltinCommand>::execute(*self, ctx)
    }
}

/// Stand-in for a builtin whose arguments were not accepted, or that was asked
/// for `--help`.
struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(self: Box<Self>, ctx: &mut Context<'_>) -> Result<Outcome, ShellError> {
        if self.is_error {
            return Err(BuiltinError::InvalidArgs(self.output.trim_end().to_owned()).into());
        }
        ctx.stdout
            .write_all(self.output.as_bytes())
            .map_err(BuiltinError::from)?;
        Ok(Outcome::Finished(0))
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if name != T::name() {
            return None;
        }
        if let Some(cmd) = T::from_any_args(args) {
            return Some(Box::new(cmd));
        }
        Some(match T::from_args(&[name], args) {
            Ok(cmd) => Box::new(cmd),
            Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                output: match status {
                    Ok(()) => output,
                    Err(()) => format!("{name}: {output}"),
                },
                is_error: status.is_err(),
            }),
        })
    }
}

#[derive(FromArgs)]
/// Exit the shell.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn from_any_args(args: &[&str]) -> Option<Self> {
        Some(Exit {
            _args: args.iter().map(|a| a.to_string()).collect(),
        })
    }

    fn execute(self, ctx: &mut Context<'_>) -> Result<Outcome, ShellError> {
        ctx.env.should_exit = true;
        Ok(Outcome::Finished(0))
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the home directory of the current user.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory. Defaults to the user's home when omitted.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, ctx: &mut Context<'_>) -> Result<Outcome, ShellError> {
        let target = match &self.target {
            Some(t) if !t.is_empty() => PathBuf::from(t),
            _ => ctx.env.home_dir()?,
        };

        let new_dir = if target.is_absolute() {
            target
        } else {
            ctx.env.current_dir.join(target)
        };

        let canonical = fs::canonicalize(&new_dir)
            .and_then(|dir| env::set_current_dir(&dir).map(|()| dir))
            .map_err(|source| BuiltinError::InvalidDirectory {
                path: new_dir.clone(),
                source,
            })?;
        ctx.env.current_dir = canonical;
        Ok(Outcome::Finished(0))
    }
}

#[derive(FromArgs)]
/// List the command history, clear it, or run one of its entries again.
pub struct HistoryCommand {
    #[argh(switch, short = 'c')]
    /// forget every recorded command.
    pub clear: bool,

    #[argh(positional)]
    /// offset (a single digit, as shown by the listing) of the command to run again.
    pub offset: Option<String>,
}

impl BuiltinCommand for HistoryCommand {
    fn name() -> &'static str {
        "history"
    }

    fn execute(self, ctx: &mut Context<'_>) -> Result<Outcome, ShellError> {
        match (self.clear, self.offset) {
            (true, Some(offset)) => Err(BuiltinError::InvalidHistoryArgument(offset).into()),
            (true, None) => {
                ctx.history.clear();
                Ok(Outcome::Finished(0))
            }
            (false, Some(offset)) => {
                let offset = parse_offset(&offset)?;
                let command = ctx.history.recall(offset).map_err(BuiltinError::from)?;
                Ok(Outcome::Rerun(command.to_owned()))
            }
            (false, None) => {
                for (index, command) in ctx.history.list() {
                    writeln!(ctx.stdout, "{index} {command}").map_err(BuiltinError::from)?;
                }
                Ok(Outcome::Finished(0))
            }
        }
    }
}

/// Recall offsets are a single decimal digit.
fn parse_offset(arg: &str) -> Result<usize, BuiltinError> {
    match arg.as_bytes() {
        [digit @ b'0'..=b'9'] => Ok(usize::from(digit - b'0')),
        _ => Err(BuiltinError::InvalidHistoryArgument(arg.to_owned())),
    }
}
