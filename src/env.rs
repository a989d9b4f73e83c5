use crate::error::ShellError;
use nix::unistd::{Uid, User};
use std::env as stdenv;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;

/// Process-level state the shell reads and mutates while dispatching commands.
///
/// The environment contains:
/// - `current_dir`: the working directory children are started in.
/// - `search_path`: the `PATH` value used to resolve program names.
/// - `default_dir`: configured target of a bare `cd`, overriding the user's home.
/// - `should_exit`: set by `exit`, checked by the read loop.
#[derive(Debug, Clone)]
pub struct Environment {
    pub current_dir: PathBuf,
    pub search_path: Option<OsString>,
    pub default_dir: Option<PathBuf>,
    pub should_exit: bool,
}

impl Environment {
    /// Capture the working directory and `PATH` of the running process.
    pub fn capture() -> Result<Self, ShellError> {
        Ok(Self {
            current_dir: current_dir()?,
            search_path: stdenv::var_os("PATH"),
            default_dir: None,
            should_exit: false,
        })
    }

    /// Directory a bare `cd` switches to.
    ///
    /// Uses `default_dir` when configured, otherwise the home directory of the
    /// real user from the user database.
    pub fn home_dir(&self) -> Result<PathBuf, ShellError> {
        if let Some(dir) = &self.default_dir {
            return Ok(dir.clone());
        }
        let uid = Uid::current();
        match User::from_uid(uid) {
            Ok(Some(user)) => Ok(user.dir),
            Ok(None) => Err(ShellError::Environment {
                what: "error getting user",
                source: io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no user database entry for uid {uid}"),
                ),
            }),
            Err(errno) => Err(ShellError::Environment {
                what: "error getting user",
                source: errno.into(),
            }),
        }
    }
}

/// Query the working directory of the running process.
pub fn current_dir() -> Result<PathBuf, ShellError> {
    stdenv::current_dir().map_err(|source| ShellError::Environment {
        what: "cwd error",
        source,
    })
}

#[cfg(test)]
pub(crate) fn lock_current_dir() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};
    static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
    MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
