//! Line-oriented file I/O for the dispatcher.
//!
//! Two halves of the same contract:
//!
//! - **LineReader**: streams the input file and is the sole line-number
//!   authority; every emitted line carries its dense zero-based `work_id`.
//! - **OrderedWriter**: appends results to the output file so that line
//!   *n* always holds the result for `work_id = n`, buffering anything
//!   that arrives out of order.

pub mod reader;
pub mod writer;

pub use reader::LineReader;
pub use writer::OrderedWriter;
