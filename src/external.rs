use crate::command::{CommandFactory, Context, ExecutableCommand, Outcome};
use crate::env::Environment;
use crate::error::ShellError;
use crate::interpreter::Factory;
use crate::process;
use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Command that is not a builtin.
///
/// Runs as a single child process with inherited standard streams; the shell
/// blocks until it terminates.
pub struct ExternalCommand {
    argv: Vec<String>,
}

impl ExternalCommand {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if name.is_empty() {
            return None;
        }
        let argv = std::iter::once(name)
            .chain(args.iter().copied())
            .map(str::to_owned)
            .collect();
        Some(Box::new(ExternalCommand::new(argv)))
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(self: Box<Self>, ctx: &mut Context<'_>) -> Result<Outcome, ShellError> {
        let handle = process::spawn(ctx.env, &self.argv, None, None)?;
        Ok(Outcome::Finished(handle.wait()?))
    }
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it exists.
/// - Relative with multiple components (e.g., `bin/sh`): returns it if it exists.
/// - `./foo` on Unix or any `./`-prefixed path on other platforms: returns it if it exists.
/// - Single path component (no separators): search each directory in `search_paths` (PATH)
///   and return the first executable match, or the first non-executable file if there is
///   no executable one.
/// - Empty path: returns `None`.
///
/// Returns either a borrowed reference to the provided `path` or an owned `PathBuf`
/// when the result is discovered via PATH lookup.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let search_in_current_dir = cfg!(not(unix)) || path.starts_with("./");
    if search_in_current_dir && path.exists() {
        return Some(Cow::Borrowed(path));
    }

    let mut components = path.components();
    match (components.next(), components.next()) {
        (None, None) => None,
        (Some(x), None) => find_in_path(search_paths, x.as_os_str()).map(Cow::Owned),
        _ => find_by_path(path).map(Cow::Borrowed),
    }
}

/// First executable match wins. A file without execute permission is only
/// returned when nothing later in the search path qualifies, so that running it
/// fails with a permission error rather than "not found".
fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    let mut not_executable = None;
    for candidate in std::env::split_paths(search_paths).map(|dir| dir.join(cmd)) {
        if !candidate.is_file() {
            continue;
        }
        if is_executable(&candidate) {
            return Some(candidate);
        }
        not_executable.get_or_insert(candidate);
    }
    not_executable
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|meta| meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.exists() { Some(path) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::lock_current_dir;
    use crate::history::History;
    use std::fs;
    use std::fs::File;

    #[cfg(unix)]
    fn osstr(s: &str) -> &OsStr {
        OsStr::new(s)
    }

    #[test]
    #[cfg(unix)]
    fn absolute_existing_true() {
        let path = Path::new("/bin/sh");
        let found = find_command_path(osstr("/bin"), path).expect("Expected to find /bin/sh");
        assert_eq!(found.as_ref(), path);
    }

    #[test]
    #[cfg(unix)]
    fn absolute_nonexisting() {
        let res = find_command_path(osstr("/bin"), Path::new("/bin/nonexisting"));
        assert!(res.is_none());
    }

    #[test]
    #[cfg(unix)]
    fn single_component_found_in_path() {
        let found = find_command_path(osstr("/nowhere:/bin"), Path::new("sh"))
            .expect("Expected to find 'sh' in /bin via PATH search");
        assert_eq!(found.as_ref(), Path::new("/bin/sh"));
    }

    #[test]
    #[cfg(unix)]
    fn single_component_not_found_in_path() {
        let res = find_command_path(osstr("/bin"), Path::new("nonexisting"));
        assert!(res.is_none());
    }

    #[test]
    #[cfg(unix)]
    fn directories_in_path_are_skipped() {
        // "/" contains a directory named "bin", which is not a program
        let res = find_command_path(osstr("/"), Path::new("bin"));
        assert!(res.is_none());
    }

    #[cfg(unix)]
    fn make_file(dir: &Path, name: &str, mode: u32) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        fs::create_dir_all(dir).expect("create temp dir");
        let path = dir.join(name);
        File::create(&path).expect("create file");
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).expect("chmod");
        path
    }

    #[test]
    #[cfg(unix)]
    fn non_executable_files_in_path_are_skipped() {
        let base = std::env::temp_dir().join(format!("sish_external_{}_noexec", std::process::id()));
        let _ = fs::remove_dir_all(&base);
        make_file(&base.join("first"), "tool", 0o644);
        let wanted = make_file(&base.join("second"), "tool", 0o755);

        let search = std::env::join_paths([base.join("first"), base.join("second")]).unwrap();
        let found = find_command_path(&search, Path::new("tool")).map(|p| p.into_owned());
        assert_eq!(found, Some(wanted));
        let _ = fs::remove_dir_all(base);
    }

    #[test]
    #[cfg(unix)]
    fn non_executable_file_is_found_when_nothing_else_matches() {
        let base = std::env::temp_dir().join(format!("sish_external_{}_onlynoexec", std::process::id()));
        let _ = fs::remove_dir_all(&base);
        let plain = make_file(&base, "tool", 0o644);

        let found = find_command_path(base.as_os_str(), Path::new("tool")).map(|p| p.into_owned());
        assert_eq!(found, Some(plain));
        let _ = fs::remove_dir_all(base);
    }

    #[test]
    #[cfg(unix)]
    fn multiple_components_relative_existing() {
        let _lock = lock_current_dir();
        let cwd_before = std::env::current_dir().expect("cwd");
        let tmp_base =
            std::env::temp_dir().join(format!("sish_external_{}_mc", std::process::id()));
        let _ = fs::remove_dir_all(&tmp_base);
        fs::create_dir_all(tmp_base.join("bin")).expect("create temp bin dir");
        File::create(tmp_base.join("bin").join("sh")).expect("touch bin/sh");

        std::env::set_current_dir(&tmp_base).expect("set cwd");
        let res = find_command_path(osstr("/does/not/matter"), Path::new("bin/sh"))
            .map(|p| p.into_owned());
        std::env::set_current_dir(&cwd_before).ok();

        let found = res.expect("Expected to find relative 'bin/sh' in current dir");
        assert!(found.ends_with("bin/sh"));
        let _ = fs::remove_dir_all(tmp_base);
    }

    #[test]
    #[cfg(unix)]
    fn current_dir_with_dot_prefix() {
        let _lock = lock_current_dir();
        let cwd_before = std::env::current_dir().expect("cwd");
        let tmp_base =
            std::env::temp_dir().join(format!("sish_external_{}_dot", std::process::id()));
        let _ = fs::remove_dir_all(&tmp_base);
        fs::create_dir_all(&tmp_base).expect("create temp dir");
        File::create(tmp_base.join("foo")).expect("touch foo");

        std::env::set_current_dir(&tmp_base).expect("set cwd");
        let res = find_command_path(osstr("/bin"), Path::new("./foo")).map(|p| p.into_owned());
        std::env::set_current_dir(&cwd_before).ok();

        assert_eq!(res.as_deref(), Some(Path::new("./foo")));
        let _ = fs::remove_dir_all(tmp_base);
    }

    #[test]
    #[cfg(unix)]
    fn empty_path_is_none() {
        assert!(find_command_path(osstr("/bin"), Path::new("")).is_none());
    }

    #[test]
    #[cfg(unix)]
    fn external_command_waits_for_child_status() {
        let _lock = lock_current_dir();
        let mut env = Environment::capture().unwrap();
        let mut history = History::default();
        let mut out = Vec::new();
        let mut ctx = Context {
            env: &mut env,
            history: &mut history,
            stdout: &mut out,
        };

        let cmd = Factory::<ExternalCommand>::default()
            .try_create(ctx.env, "sh", &["-c", "exit 4"])
            .expect("external factory accepts any name");
        assert_eq!(cmd.execute(&mut ctx).unwrap(), Outcome::Finished(4));
    }

    #[test]
    #[cfg(unix)]
    fn external_command_reports_missing_program() {
        let _lock = lock_current_dir();
        let mut env = Environment::capture().unwrap();
        let mut history = History::default();
        let mut out = Vec::new();
        let mut ctx = Context {
            env: &mut env,
            history: &mut history,
            stdout: &mut out,
        };

        let cmd = Box::new(ExternalCommand::new(vec!["no-such-program-sish".to_string()]));
        let err = cmd.execute(&mut ctx).unwrap_err();
        assert_eq!(err.to_string(), "no-such-program-sish: command not found");
    }
}
