//! line-dispatch: line-indexed work dispatcher for fleets of ephemeral workers.
//!
//! An HTTP service that hands out the lines of a large input file to any
//! number of remote workers, accepts their results, and persists them to
//! the output file in exact input-line order, surviving worker crashes,
//! straggler latency, and process restarts.

// Core modules
pub mod cli;
pub mod client;
pub mod dispatch;
pub mod error;
pub mod linefile;
pub mod protocol;
pub mod server;

// Re-export commonly used error types
pub use error::{ClientError, DispatchError, ReaderError, WriterError};
