//! The work-queue state machine.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::DispatchError;
use crate::linefile::{LineReader, OrderedWriter};
use crate::protocol::{ResultItem, WorkItem};

use super::item::{Tombstone, TrackedItem};

/// Default seconds before an issued item is considered lost.
const DEFAULT_WORK_TIMEOUT_SECS: u64 = 600;

/// Default number of timed-out issuances tolerated before tombstoning.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default retry hint (seconds) returned when nothing is issuable yet.
const DEFAULT_RETRY_BACKOFF_SECS: u64 = 30;

/// Configuration for the work-queue core.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Seconds an issuance may stay outstanding before the sweeper
    /// reclaims it.
    pub work_timeout: Duration,
    /// Timed-out issuances tolerated before a line is tombstoned.
    pub max_retries: u32,
    /// Hint returned to callers when the queue is momentarily empty.
    pub retry_backoff: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            work_timeout: Duration::from_secs(DEFAULT_WORK_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: Duration::from_secs(DEFAULT_RETRY_BACKOFF_SECS),
        }
    }
}

impl TrackerConfig {
    /// Sets the work timeout.
    pub fn with_work_timeout(mut self, timeout: Duration) -> Self {
        self.work_timeout = timeout;
        self
    }

    /// Sets the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the retry backoff hint.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }
}

/// Outcome of an issue request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueOutcome {
    /// Work for the caller to process.
    Items(Vec<WorkItem>),
    /// Nothing issuable right now, but outstanding or unread work remains;
    /// ask again after the hint.
    Retry { retry_in: u64 },
    /// The input is exhausted and every line has been persisted.
    AllWorkComplete,
}

/// Counters reported by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerSnapshot {
    pub pending: usize,
    pub issued: usize,
    pub completed: u64,
    pub tombstoned: u64,
    pub input_exhausted: bool,
}

/// The authoritative dispatch state of the process.
///
/// One `WorkTracker` exists per server, behind a single exclusive lock.
/// It owns the reader/writer pair: every state transition that touches a
/// file goes through this struct, so line-order bookkeeping and file
/// contents can never drift apart.
///
/// An item's lifecycle: read into `pending` → popped into `issued` → back
/// to the `pending` tail on timeout, or retired through the writer on
/// submit. When `retry_count` would exceed the budget, a tombstone is
/// written instead and the line is terminal.
pub struct WorkTracker {
    reader: LineReader,
    writer: OrderedWriter,
    /// FIFO of `work_id`s awaiting issuance.
    pending: VecDeque<u64>,
    /// Outstanding issuances and when they were handed out.
    issued: HashMap<u64, Instant>,
    /// Content and retry bookkeeping, retained until the line is retired.
    items: HashMap<u64, TrackedItem>,
    input_exhausted: bool,
    work_timeout: Duration,
    max_retries: u32,
    retry_backoff: Duration,
    tombstoned: u64,
    expired_reissues: u64,
}

impl WorkTracker {
    /// Builds the tracker and aligns the reader with the writer's resume
    /// position.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError` if skipping already-persisted input lines
    /// fails.
    pub fn new(
        mut reader: LineReader,
        writer: OrderedWriter,
        config: TrackerConfig,
    ) -> Result<Self, DispatchError> {
        let resume = writer.position();
        if resume > 0 {
            info!(resume, "skipping input lines already persisted");
        }
        reader.skip(resume)?;

        Ok(Self {
            reader,
            writer,
            pending: VecDeque::new(),
            issued: HashMap::new(),
            items: HashMap::new(),
            input_exhausted: false,
            work_timeout: config.work_timeout,
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff,
            tombstoned: 0,
            expired_reissues: 0,
        })
    }

    /// Issues up to `batch_size` items, reading further input if the
    /// pending queue is empty.
    ///
    /// Re-queued (timed-out) items are served before fresh lines because
    /// they already sit at the head of the FIFO. The call performs at most
    /// one batch read against the input file.
    pub fn issue(
        &mut self,
        batch_size: usize,
        now: Instant,
    ) -> Result<IssueOutcome, DispatchError> {
        if self.all_work_complete()? {
            return Ok(IssueOutcome::AllWorkComplete);
        }

        if self.pending.is_empty() {
            let batch = self.reader.next_batch(batch_size)?;
            if batch.len() < batch_size && !self.input_exhausted {
                self.input_exhausted = true;
                info!(lines = self.reader.position(), "input exhausted");
            }
            if batch.is_empty() {
                if self.all_work_complete()? {
                    return Ok(IssueOutcome::AllWorkComplete);
                }
                return Ok(IssueOutcome::Retry {
                    retry_in: self.retry_backoff.as_secs(),
                });
            }
            for (work_id, content) in batch {
                self.items.insert(work_id, TrackedItem::new(content));
                self.pending.push_back(work_id);
            }
        }

        let mut out = Vec::new();
        while out.len() < batch_size {
            let Some(work_id) = self.pending.pop_front() else {
                break;
            };
            let Some(item) = self.items.get(&work_id) else {
                continue;
            };
            self.issued.insert(work_id, now);
            out.push(WorkItem {
                work_id,
                content: item.content.clone(),
            });
        }
        debug!(
            count = out.len(),
            outstanding = self.issued.len(),
            "issued work"
        );
        Ok(IssueOutcome::Items(out))
    }

    /// Accepts results for currently-issued items and hands them to the
    /// writer; everything else is discarded silently.
    ///
    /// Returns the number of items newly accepted. A duplicate id within
    /// the same batch is accepted once; ids that are unknown, already
    /// retired, or awaiting re-issue are not counted.
    pub fn submit(&mut self, results: Vec<ResultItem>) -> Result<usize, DispatchError> {
        let mut accepted = 0;
        for ResultItem { work_id, result } in results {
            if self.issued.remove(&work_id).is_none() {
                debug!(work_id, "discarding result for work not currently issued");
                continue;
            }
            self.items.remove(&work_id);
            self.writer.accept(work_id, result)?;
            accepted += 1;
        }
        Ok(accepted)
    }

    /// Reclaims issuances older than the work timeout.
    ///
    /// Expired items re-join the tail of the pending queue with their
    /// retry count incremented; an item whose count passes the budget is
    /// written as a tombstone instead and never re-issued. Safe to run at
    /// any cadence.
    pub fn sweep_timeouts(&mut self, now: Instant) -> Result<(), DispatchError> {
        let expired: Vec<u64> = self
            .issued
            .iter()
            .filter(|(_, issued_at)| now.duration_since(**issued_at) >= self.work_timeout)
            .map(|(work_id, _)| *work_id)
            .collect();

        for work_id in expired {
            self.issued.remove(&work_id);
            let Some(mut item) = self.items.remove(&work_id) else {
                continue;
            };
            item.retry_count += 1;
            if item.retry_count > self.max_retries {
                warn!(
                    work_id,
                    timeouts = item.retry_count,
                    "retry budget exhausted, writing tombstone"
                );
                let line = Tombstone::max_retries_exceeded(work_id, &item.content).to_line();
                self.writer.accept(work_id, line)?;
                self.tombstoned += 1;
            } else {
                self.expired_reissues += 1;
                debug!(
                    work_id,
                    retry = item.retry_count,
                    total_reissues = self.expired_reissues,
                    "issuance expired, re-queueing"
                );
                self.items.insert(work_id, item);
                self.pending.push_back(work_id);
            }
        }
        Ok(())
    }

    /// Updates the work timeout at runtime.
    ///
    /// Outstanding issuances keep their original `issued_at` and are
    /// measured against the new value, so shortening the timeout can
    /// immediately make stale work re-issuable.
    pub fn set_work_timeout(&mut self, seconds: u64) -> u64 {
        self.work_timeout = Duration::from_secs(seconds);
        info!(timeout_secs = seconds, "work timeout updated");
        seconds
    }

    /// Interval at which the sweeper should run for the current timeout.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs((self.work_timeout.as_secs() / 10).max(1))
    }

    /// Returns whether the input is exhausted and every line persisted.
    ///
    /// Probes the reader for EOF when the exhausted flag has not tripped
    /// yet, so completion is detected even if no further issue call ever
    /// reads past the end.
    pub fn all_work_complete(&mut self) -> Result<bool, DispatchError> {
        if !self.pending.is_empty() || !self.issued.is_empty() || self.writer.buffered() > 0 {
            return Ok(false);
        }
        if !self.input_exhausted && self.reader.at_eof()? {
            self.input_exhausted = true;
            info!(lines = self.reader.position(), "input exhausted");
        }
        Ok(self.input_exhausted)
    }

    /// Returns the counters reported by the status endpoint.
    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            pending: self.pending.len(),
            issued: self.issued.len(),
            completed: self.writer.position(),
            tombstoned: self.tombstoned,
            input_exhausted: self.input_exhausted,
        }
    }
}
