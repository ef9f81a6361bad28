//! Error types for dispatcher operations.
//!
//! Defines error types for the major subsystems:
//! - Input file streaming
//! - Ordered output writing
//! - The work-queue core
//! - The HTTP client library

use thiserror::Error;

/// Errors raised while streaming the input file.
///
/// All reader errors are fatal: continuing past a failed read would break
/// the line-number assignment the whole system depends on.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("failed to open input file '{path}': {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to read input line {line}: {source}")]
    Read { line: u64, source: std::io::Error },
}

/// Errors raised while maintaining the ordered output file.
///
/// All writer errors are fatal: the write frontier must never advance past
/// a line that is not durably on disk.
#[derive(Debug, Error)]
pub enum WriterError {
    #[error("failed to open output file '{path}': {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to scan output file '{path}' for resume: {source}")]
    Scan {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to truncate partial trailing line in '{path}': {source}")]
    Truncate {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to write result for work_id {work_id}: {source}")]
    Write {
        work_id: u64,
        source: std::io::Error,
    },

    #[error("failed to sync output file: {0}")]
    Sync(#[source] std::io::Error),
}

/// Errors surfaced by the work-queue core.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error(transparent)]
    Writer(#[from] WriterError),
}

/// Errors returned by the dispatch HTTP client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("server returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("failed to decode response from {url}: {source}")]
    Decode { url: String, source: reqwest::Error },
}
