use crate::history::DEFAULT_CAPACITY;
use crate::parser::Limits;
use log::warn;
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// Variable holding the number of history entries to keep.
pub const HISTORY_SIZE_VAR: &str = "SISH_HISTORY_SIZE";
/// Variable overriding the directory `cd` switches to without an argument.
pub const CD_HOME_VAR: &str = "SISH_CD_HOME";

/// Tunable bounds and defaults of a shell session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    /// Entries kept in the history ring before the oldest is evicted.
    pub history_capacity: NonZeroUsize,
    /// Maximum tokens in one argument vector.
    pub max_args: usize,
    /// Maximum stages in one pipeline.
    pub max_stages: usize,
    /// How many `history N` recalls may chain before dispatch gives up.
    pub max_recall_depth: usize,
    /// Target of a bare `cd`. When unset, the current user's home directory is
    /// looked up from the user database.
    pub default_dir: Option<PathBuf>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            history_capacity: NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            max_args: 20,
            max_stages: 50,
            max_recall_depth: 16,
            default_dir: None,
        }
    }
}

impl ShellConfig {
    /// Build a config from variables resolved by `lookup`, falling back to the
    /// defaults for anything missing or malformed.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(HISTORY_SIZE_VAR) {
            match raw.trim().parse::<NonZeroUsize>() {
                Ok(capacity) => config.history_capacity = capacity,
                Err(e) => warn!("ignoring {HISTORY_SIZE_VAR}={raw:?}: {e}"),
            }
        }

        if let Some(dir) = lookup(CD_HOME_VAR).filter(|d| !d.is_empty()) {
            config.default_dir = Some(PathBuf::from(dir));
        }

        config
    }

    /// Build a config from the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_args: self.max_args,
            max_stages: self.max_stages,
        }
    }
}
