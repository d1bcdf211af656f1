//! CLI module for fieldgen
//!
//! Provides command-line interface for:
//! - check: load and verify a schema directory
//! - explain: per-field shapes and strategies of one struct
//! - convert: deserialize and re-serialize JSON documents

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check, convert, convert_stream, explain, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_requests, write_error, write_response};
