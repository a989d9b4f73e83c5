//! Splitting of raw input lines into pipeline stages and argument vectors.
//!
//! The grammar is deliberately flat: stages are separated by `|`, arguments by runs
//! of whitespace. There is no quoting, escaping, expansion or redirection.

use thiserror::Error;

/// Delimiter between pipeline stages.
pub const PIPE: char = '|';

/// Ordered argument vector of one command; the first element is the program or
/// built-in name.
pub type Argv = Vec<String>;

/// Errors produced while turning a line into argument vectors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty pipeline stage")]
    EmptyStage,
    #[error("empty command")]
    EmptyCommand,
    #[error("too many arguments (limit is {limit})")]
    TooManyArgs { limit: usize },
    #[error("too many pipeline stages (limit is {limit})")]
    TooManyStages { limit: usize },
}

/// Upper bounds applied while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_args: usize,
    pub max_stages: usize,
}

/// Split `line` on the pipe delimiter, preserving stage order.
///
/// Stages are returned untrimmed. A line without delimiter yields exactly one
/// stage. When the line has more than one stage, a stage that is empty or only
/// whitespace (`a || b`, `a |`, `| a`) is rejected.
pub fn split_pipeline(line: &str) -> Result<Vec<&str>, ParseError> {
    let stages: Vec<&str> = line.split(PIPE).collect();
    if stages.len() > 1 && stages.iter().any(|s| s.trim().is_empty()) {
        return Err(ParseError::EmptyStage);
    }
    Ok(stages)
}

/// Split one stage into tokens on runs of whitespace.
pub fn tokenize(stage: &str) -> Argv {
    stage.split_whitespace().map(str::to_owned).collect()
}

/// Parse a full line into one argument vector per stage.
pub fn parse_line(line: &str, limits: Limits) -> Result<Vec<Argv>, ParseError> {
    let stages = split_pipeline(line)?;
    if stages.len() > limits.max_stages {
        return Err(ParseError::TooManyStages {
            limit: limits.max_stages,
        });
    }

    stages
        .into_iter()
        .map(|stage| {
            let argv = tokenize(stage);
            if argv.is_empty() {
                Err(ParseError::EmptyCommand)
            } else if argv.len() > limits.max_args {
                Err(ParseError::TooManyArgs {
                    limit: limits.max_args,
                })
            } else {
                Ok(argv)
            }
        })
        .collect()
}
