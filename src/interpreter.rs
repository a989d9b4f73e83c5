use crate::builtin::BuiltinError;
use crate::command::{CommandFactory, Context, ExitCode, Outcome};
use crate::config::ShellConfig;
use crate::env::{self, Environment};
use crate::error::{ExecFailure, ShellError};
use crate::history::History;
use crate::io_adapters::{LineEvent, LineSource};
use crate::parser::{self, ParseError};
use crate::pipeline;
use log::{debug, warn};
use std::io::{self, Write};

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate: builtins and ExternalCommand.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// The command shell: parses accepted lines, records them in the history and runs
/// them as built-ins, single external programs, or pipelines.
///
/// Single-stage lines are offered to a list of [`CommandFactory`] objects in order;
/// the first one that recognizes the name runs it. The default list checks `exit`,
/// `cd` and `history` before falling back to an external program. Stages of a
/// pipeline are always external programs.
///
/// Example
/// ```no_run
/// use sish::{Interpreter, ShellConfig};
/// let mut sh = Interpreter::with_config(ShellConfig::default()).unwrap();
/// assert_eq!(sh.accept("echo hello | tr a-z A-Z"), 0);
/// assert_eq!(sh.history().len(), 1);
/// ```
pub struct Interpreter {
    env: Environment,
    history: History,
    commands: Vec<Box<dyn CommandFactory>>,
    config: ShellConfig,
    stdout: Box<dyn Write>,
    stderr: Box<dyn Write>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(
        config: ShellConfig,
        commands: Vec<Box<dyn CommandFactory>>,
    ) -> Result<Self, ShellError> {
        let mut env = Environment::capture()?;
        env.default_dir = config.default_dir.clone();
        Ok(Self {
            env,
            history: History::new(config.history_capacity),
            commands,
            config,
            stdout: Box::new(io::stdout()),
            stderr: Box::new(io::stderr()),
        })
    }

    /// Create an interpreter with the default set of commands:
    /// - built-ins: `exit`, `cd`, `history`
    /// - external command launcher
    pub fn with_config(config: ShellConfig) -> Result<Self, ShellError> {
        use crate::builtin::{Cd, Exit, HistoryCommand};
        use crate::external::ExternalCommand;
        Self::new(
            config,
            vec![
                Box::new(Factory::<Exit>::default()),
                Box::new(Factory::<Cd>::default()),
                Box::new(Factory::<HistoryCommand>::default()),
                Box::new(Factory::<ExternalCommand>::default()),
            ],
        )
    }

    /// Redirect what built-ins print and where errors are reported.
    pub fn with_output(mut self, stdout: impl Write + 'static, stderr: impl Write + 'static) -> Self {
        self.stdout = Box::new(stdout);
        self.stderr = Box::new(stderr);
        self
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Whether `exit` has been run.
    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    /// Accept one input line as if typed at the prompt.
    ///
    /// Blank lines are ignored. Anything else is recorded in the history exactly
    /// once, before it runs. Failures are reported on the error stream and turned
    /// into a non-zero status; they never end the session.
    pub fn accept(&mut self, line: &str) -> ExitCode {
        if line.trim().is_empty() {
            return 0;
        }
        self.history.append(line);
        match self.dispatch(line, 0) {
            Ok(code) => code,
            Err(err) => {
                self.report(&err);
                err.exit_code()
            }
        }
    }

    /// Run the read-eval loop until `exit` or the end of `source`.
    ///
    /// Only a failure to determine the working directory for the prompt, or to
    /// read from `source`, ends the loop with an error.
    pub fn repl(&mut self, source: &mut dyn LineSource) -> Result<ExitCode, ShellError> {
        while !self.env.should_exit {
            let cwd = env::current_dir()?;
            let prompt = format!("{}> ", cwd.display());
            match source.read_line(&prompt).map_err(ShellError::Input)? {
                LineEvent::Line(line) => {
                    self.accept(&line);
                }
                LineEvent::Interrupted => continue,
                LineEvent::Eof => {
                    debug!("end of input");
                    break;
                }
            }
        }
        Ok(0)
    }

    /// Parse and run `line` without recording it. `depth` counts the history
    /// recalls that led here.
    fn dispatch(&mut self, line: &str, depth: usize) -> Result<ExitCode, ShellError> {
        let mut stages = parser::parse_line(line, self.config.limits())?;
        if stages.len() > 1 {
            let report = pipeline::run(&self.env, &stages, None)?;
            for err in report.failures() {
                self.report(err);
            }
            return Ok(report.exit_code());
        }

        let argv = stages.pop().ok_or(ParseError::EmptyCommand)?;
        match self.run_command(&argv)? {
            Outcome::Finished(code) => Ok(code),
            Outcome::Rerun(command) => {
                if depth >= self.config.max_recall_depth {
                    return Err(BuiltinError::RecallTooDeep {
                        limit: self.config.max_recall_depth,
                    }
                    .into());
                }
                debug!("re-running history entry {command:?}");
                self.dispatch(&command, depth + 1)
            }
        }
    }

    fn run_command(&mut self, argv: &[String]) -> Result<Outcome, ShellError> {
        let (name, args) = argv.split_first().ok_or(ParseError::EmptyCommand)?;
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let cmd = self
            .commands
            .iter()
            .find_map(|factory| factory.try_create(&self.env, name, &args))
            .ok_or_else(|| ShellError::Exec {
                program: name.clone(),
                reason: ExecFailure::NotFound,
            })?;

        let mut ctx = Context {
            env: &mut self.env,
            history: &mut self.history,
            stdout: self.stdout.as_mut(),
        };
        let outcome = cmd.execute(&mut ctx);
        if let Err(e) = self.stdout.flush() {
            warn!("failed to flush command output: {e}");
        }
        outcome
    }

    fn report(&mut self, err: &ShellError) {
        debug!("command failed: {err:?}");
        if let Err(e) = writeln!(self.stderr, "sish: {err}") {
            warn!("failed to report {err}: {e}");
        }
    }
}
