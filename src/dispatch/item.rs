//! Per-item bookkeeping and tombstone payloads.

use serde::Serialize;

/// Bookkeeping retained for a line from first read until its result is
/// handed to the writer.
#[derive(Debug, Clone)]
pub(crate) struct TrackedItem {
    /// The input line, trailing newline stripped.
    pub content: String,
    /// Number of issuances that have timed out so far.
    pub retry_count: u32,
}

impl TrackedItem {
    pub fn new(content: String) -> Self {
        Self {
            content,
            retry_count: 0,
        }
    }
}

/// The synthetic result written in place of a real one when an input line
/// exceeds its retry budget.
///
/// Serializes to a single line:
/// `{"__ERROR__":{"error":"max_retries_exceeded","work_id":0,"original_content":"..."}}`
#[derive(Debug, Serialize)]
pub struct Tombstone<'a> {
    #[serde(rename = "__ERROR__")]
    body: TombstoneBody<'a>,
}

#[derive(Debug, Serialize)]
struct TombstoneBody<'a> {
    error: &'static str,
    work_id: u64,
    original_content: &'a str,
}

impl<'a> Tombstone<'a> {
    /// Builds the tombstone for a line whose retries ran out.
    pub fn max_retries_exceeded(work_id: u64, original_content: &'a str) -> Self {
        Self {
            body: TombstoneBody {
                error: "max_retries_exceeded",
                work_id,
                original_content,
            },
        }
    }

    /// Renders the single-line JSON payload written to the output file.
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).expect("tombstone serialization cannot fail")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tombstone_line_shape() {
        let line = Tombstone::max_retries_exceeded(7, "bad line").to_line();
        assert_eq!(
            line,
            r#"{"__ERROR__":{"error":"max_retries_exceeded","work_id":7,"original_content":"bad line"}}"#
        );
    }

    #[test]
    fn test_tombstone_escapes_content() {
        let line = Tombstone::max_retries_exceeded(0, "quote \" and backslash \\").to_line();
        assert!(!line.contains('\n'));

        let parsed: serde_json::Value = serde_json::from_str(&line).expect("parse");
        assert_eq!(
            parsed["__ERROR__"]["original_content"],
            "quote \" and backslash \\"
        );
        assert_eq!(parsed["__ERROR__"]["work_id"], 0);
    }
}
