//! The process capability: pipe creation, spawning with optional redirection, and
//! reaping.
//!
//! Every descriptor created here is close-on-exec, so a child only ever holds the
//! pipe ends that were explicitly installed as its standard input or output. Pipe
//! ends are owned values; handing one to [`spawn`] moves it into the child and the
//! parent's copy is closed before `spawn` returns.

use crate::command::{ExitCode, Stdin, Stdout};
use crate::env::Environment;
use crate::error::{ExecFailure, ShellError};
use crate::external::find_command_path;
use crate::parser::ParseError;
use log::debug;
use std::ffi::OsStr;
use std::fs::File;
use std::os::fd::OwnedFd;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus};

/// A connected pair of pipe ends: bytes written to `writer` are read from `reader`.
#[derive(Debug)]
pub struct Pipe {
    pub reader: File,
    pub writer: File,
}

/// Create a unidirectional pipe.
pub fn pipe() -> Result<Pipe, ShellError> {
    let (reader, writer) = cloexec_pipe().map_err(ShellError::Pipe)?;
    debug!("created pipe {:?} -> {:?}", writer, reader);
    Ok(Pipe {
        reader: File::from(reader),
        writer: File::from(writer),
    })
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn cloexec_pipe() -> nix::Result<(OwnedFd, OwnedFd)> {
    nix::unistd::pipe2(nix::fcntl::OFlag::O_CLOEXEC)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn cloexec_pipe() -> nix::Result<(OwnedFd, OwnedFd)> {
    use nix::fcntl::{FcntlArg, FdFlag, fcntl};
    use std::os::fd::AsRawFd;

    let (reader, writer) = nix::unistd::pipe()?;
    for fd in [&reader, &writer] {
        fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    }
    Ok((reader, writer))
}

/// A spawned child that has not been reaped yet.
///
/// [`ProcessHandle::wait`] consumes the handle: once a child's status has been
/// collected there is nothing left to refer to.
#[derive(Debug)]
pub struct ProcessHandle {
    program: String,
    child: Child,
}

impl ProcessHandle {
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Block until the child terminates and return its exit status.
    pub fn wait(mut self) -> Result<ExitCode, ShellError> {
        let status = self.child.wait().map_err(|source| ShellError::Wait {
            program: self.program.clone(),
            source,
        })?;
        let code = status.code().unwrap_or_else(|| terminated_by_signal(status));
        debug!("{} (pid {}) exited with {}", self.program, self.child.id(), code);
        Ok(code)
    }
}

/// Start `argv[0]` with the remaining elements as arguments.
///
/// The program is resolved through the environment's search path. `stdin` and
/// `stdout` replace the inherited streams when given.
pub fn spawn(
    env: &Environment,
    argv: &[String],
    stdin: Option<Box<dyn Stdin>>,
    stdout: Option<Box<dyn Stdout>>,
) -> Result<ProcessHandle, ShellError> {
    let (name, args) = argv.split_first().ok_or(ParseError::EmptyCommand)?;
    let program = resolve(env, name)?;

    let mut cmd = Command::new(&program);
    cmd.args(args).current_dir(&env.current_dir);
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.arg0(name);
    }
    if let Some(stdin) = stdin {
        cmd.stdin(stdin.stdio());
    }
    if let Some(stdout) = stdout {
        cmd.stdout(stdout.stdio());
    }

    let child = cmd
        .spawn()
        .map_err(|source| ShellError::from_spawn(name, source))?;
    // `cmd` still owns the parent's copies of the redirected ends.
    drop(cmd);

    debug!("spawned {} as pid {}", program.display(), child.id());
    Ok(ProcessHandle {
        program: name.clone(),
        child,
    })
}

fn resolve(env: &Environment, name: &str) -> Result<PathBuf, ShellError> {
    let search_path = env.search_path.as_deref().unwrap_or(OsStr::new(""));
    find_command_path(search_path, Path::new(name))
        .map(|path| path.into_owned())
        .ok_or_else(|| ShellError::Exec {
            program: name.to_owned(),
            reason: ExecFailure::NotFound,
        })
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> ExitCode {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> ExitCode {
    -1
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::env::lock_current_dir;
    use std::io::{Read, Write};

    fn argv(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn env() -> Environment {
        Environment::capture().expect("capture environment")
    }

    #[test]
    fn pipe_transfers_bytes() {
        let Pipe {
            mut reader,
            mut writer,
        } = pipe().unwrap();
        writer.write_all(b"ping").unwrap();
        drop(writer);
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "ping");
    }

    #[test]
    fn pipe_ends_are_close_on_exec() {
        use nix::fcntl::{FcntlArg, FdFlag, fcntl};
        use std::os::fd::AsRawFd;

        let p = pipe().unwrap();
        for fd in [p.reader.as_raw_fd(), p.writer.as_raw_fd()] {
            let flags = FdFlag::from_bits_truncate(fcntl(fd, FcntlArg::F_GETFD).unwrap());
            assert!(flags.contains(FdFlag::FD_CLOEXEC));
        }
    }

    #[test]
    fn spawn_and_wait_reports_exit_status() {
        let _lock = lock_current_dir();
        let env = env();
        assert_eq!(spawn(&env, &argv(&["true"]), None, None).unwrap().wait().unwrap(), 0);
        let handle = spawn(&env, &argv(&["sh", "-c", "exit 3"]), None, None).unwrap();
        assert_eq!(handle.program(), "sh");
        assert_eq!(handle.wait().unwrap(), 3);
    }

    #[test]
    fn spawn_redirects_stdout_into_pipe() {
        let _lock = lock_current_dir();
        let Pipe { mut reader, writer } = pipe().unwrap();
        let handle = spawn(&env(), &argv(&["echo", "hello", "world"]), None, Some(Box::new(writer))).unwrap();
        assert_eq!(handle.wait().unwrap(), 0);

        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello world\n");
    }

    #[test]
    fn unresolvable_program_is_exec_error() {
        let _lock = lock_current_dir();
        let err = spawn(&env(), &argv(&["definitely-not-a-real-program-xyz"]), None, None).unwrap_err();
        assert!(matches!(
            err,
            ShellError::Exec {
                reason: ExecFailure::NotFound,
                ..
            }
        ));
    }

    /// A search path with a directory holding a non-executable `name` in front.
    fn shadowed_env(tag: &str, name: &str) -> (Environment, PathBuf) {
        use std::os::unix::fs::PermissionsExt;
        let dir = std::env::temp_dir().join(format!("sish_process_{}_{}", std::process::id(), tag));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let decoy = dir.join(name);
        std::fs::write(&decoy, "").unwrap();
        std::fs::set_permissions(&decoy, std::fs::Permissions::from_mode(0o644)).unwrap();

        let mut env = env();
        let rest = env.search_path.clone().unwrap_or_default();
        let search = std::env::join_paths(std::iter::once(dir.clone()).chain(std::env::split_paths(&rest))).unwrap();
        env.search_path = Some(search);
        (env, dir)
    }

    #[test]
    fn non_executable_file_does_not_hide_program_later_in_path() {
        let _lock = lock_current_dir();
        let (env, dir) = shadowed_env("shadow", "true");
        let res = spawn(&env, &argv(&["true"]), None, None).and_then(ProcessHandle::wait);
        let _ = std::fs::remove_dir_all(dir);
        assert_eq!(res.unwrap(), 0);
    }

    #[test]
    fn only_non_executable_match_is_permission_denied() {
        let _lock = lock_current_dir();
        let (env, dir) = shadowed_env("denied", "no-such-program-sish");
        let err = spawn(&env, &argv(&["no-such-program-sish"]), None, None).unwrap_err();
        let _ = std::fs::remove_dir_all(dir);
        assert!(matches!(
            err,
            ShellError::Exec {
                reason: ExecFailure::PermissionDenied,
                ..
            }
        ));
        assert_eq!(err.exit_code(), 126);
    }

    #[test]
    fn empty_argv_is_rejected() {
        let err = spawn(&env(), &[], None, None).unwrap_err();
        assert!(matches!(err, ShellError::Parse(ParseError::EmptyCommand)));
    }

    #[test]
    fn signal_termination_maps_above_128() {
        let _lock = lock_current_dir();
        let handle = spawn(&env(), &argv(&["sh", "-c", "kill -9 $$"]), None, None).unwrap();
        assert_eq!(handle.wait().unwrap(), 128 + 9);
    }
}
