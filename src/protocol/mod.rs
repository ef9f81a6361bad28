//! Wire types for the dispatch HTTP surface.
//!
//! Every endpoint consumes and produces JSON. Responses carrying a status
//! discriminator are modeled as tagged enums; requests are plain structs.
//! Work `content` and `result` values stay opaque strings end to end.

use serde::{Deserialize, Serialize};

/// A unit of work handed to a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Zero-based line index of the originating input line.
    pub work_id: u64,
    /// The line's text, trailing newline stripped.
    pub content: String,
}

/// A completed result submitted by a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultItem {
    pub work_id: u64,
    pub result: String,
}

/// Body of `POST /get_work`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetWorkRequest {
    /// Maximum number of items the caller wants; must be at least 1.
    pub batch_size: usize,
}

/// Response to `POST /get_work`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum GetWorkResponse {
    /// Work to process.
    #[serde(rename = "OK")]
    Ok { items: Vec<WorkItem> },
    /// Nothing issuable right now; ask again after `retry_in` seconds.
    #[serde(rename = "RETRY")]
    Retry { retry_in: u64 },
    /// Every input line has been persisted; workers should exit.
    #[serde(rename = "ALL_WORK_COMPLETE")]
    AllWorkComplete,
}

/// Body of `POST /submit_result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub items: Vec<ResultItem>,
}

/// Response to `POST /submit_result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub status: String,
    /// Number of items newly accepted; stale and duplicate ids are not
    /// counted.
    pub count: u64,
}

impl SubmitResponse {
    pub fn ok(count: u64) -> Self {
        Self {
            status: "OK".to_string(),
            count,
        }
    }
}

/// Body of `POST /work_timeout`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkTimeoutRequest {
    /// New timeout in seconds; must be at least 1.
    pub timeout: u64,
}

/// Response to `POST /work_timeout`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkTimeoutResponse {
    pub status: String,
    pub timeout: u64,
}

impl WorkTimeoutResponse {
    pub fn ok(timeout: u64) -> Self {
        Self {
            status: "OK".to_string(),
            timeout,
        }
    }
}

/// Response to `GET /status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Items read from the input but not currently held by any worker.
    pub pending: usize,
    /// Items currently held by workers.
    pub issued: usize,
    /// Lines written to the output file so far.
    pub completed: u64,
    /// Lines written as tombstones after exhausting their retry budget.
    pub tombstoned: u64,
    /// Whether the input file has been read to the end.
    pub input_exhausted: bool,
}
