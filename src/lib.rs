//! A small interactive command shell.
//!
//! The crate turns a raw input line into one or more running processes. A line is
//! split into pipeline stages on `|`, each stage is split into an argument vector on
//! whitespace, and the result is routed either to one of the built-in commands
//! (`exit`, `cd`, `history`), to a single external program, or to a multi-stage
//! pipeline whose neighbours are connected by pipes.
//!
//! Every accepted line is recorded in a bounded [`History`] ring buffer before it is
//! dispatched, and `history N` re-runs a recorded line without recording it again.
//!
//! The main entry point is [`Interpreter`], which owns the shell state and runs the
//! read-eval loop over any [`io_adapters::LineSource`].

mod builtin;
pub mod command;
pub mod config;
pub mod env;
pub mod error;
mod external;
pub mod history;
mod interpreter;
pub mod io_adapters;
pub mod parser;
pub mod pipeline;
pub mod process;

pub use builtin::BuiltinError;
pub use config::ShellConfig;
pub use error::ShellError;
pub use history::History;
pub use interpreter::Interpreter;
pub use io_adapters::MemWriter;
