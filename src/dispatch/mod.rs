//! Line-ordered work-queue core.
//!
//! This module owns the authoritative dispatch state of the process:
//!
//! - **WorkTracker**: the state machine that issues, retires, and
//!   times-out line-indexed work items
//! - **TrackerConfig**: timeout and retry-budget configuration
//! - **Tombstone**: the synthetic result written when a line exhausts its
//!   retry budget
//!
//! # Architecture
//!
//! ```text
//!    input file ──▶ LineReader ──▶ pending (FIFO) ──▶ issued
//!                                      ▲                │
//!                                      │   timeout      │ submit
//!                                      └────────────────┤
//!                                                       ▼
//!    output file ◀── OrderedWriter ◀── result / tombstone
//! ```
//!
//! Re-queued items join the tail of `pending`, so a chronically slow line
//! cannot starve fresh work. An item whose retries run out is written as
//! a tombstone so the output stream can advance past it.

pub mod item;
pub mod tracker;

pub use item::Tombstone;
pub use tracker::{IssueOutcome, TrackerConfig, TrackerSnapshot, WorkTracker};
