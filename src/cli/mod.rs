//! Command-line interface for the dispatcher server.
//!
//! Parses the server arguments and wires the reader, writer, and tracker
//! into a running HTTP server.

mod commands;

pub use commands::{parse_cli, run_with_cli, Cli};
