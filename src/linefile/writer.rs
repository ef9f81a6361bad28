//! Append-only ordered output writer.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::WriterError;

/// Maintains the output file so that line *n* always holds the result for
/// `work_id = n`.
///
/// Completions that arrive ahead of the write frontier are buffered in
/// memory and drained to disk the moment the sequence becomes contiguous.
/// Each line is written at most once; the frontier (`next_write_id`) only
/// ever moves forward.
pub struct OrderedWriter {
    file: BufWriter<File>,
    /// Next `work_id` expected on disk; equals the number of complete
    /// lines already written.
    next_write_id: u64,
    /// Out-of-order completions keyed by `work_id`, all `>= next_write_id`.
    pending: BTreeMap<u64, String>,
}

impl OrderedWriter {
    /// Opens (creating if absent) the output file in append mode.
    ///
    /// Counts the complete lines already present; that count becomes the
    /// resume position. A trailing partial line, left by a crash mid-write,
    /// is truncated away so the file never holds half a result.
    ///
    /// # Errors
    ///
    /// Returns `WriterError` if the file cannot be opened, scanned, or
    /// truncated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WriterError> {
        let path_str = path.as_ref().display().to_string();

        let probe = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path.as_ref())
            .map_err(|source| WriterError::Open {
                path: path_str.clone(),
                source,
            })?;

        let (lines, complete_len) = scan_complete_lines(&probe).map_err(|source| {
            WriterError::Scan {
                path: path_str.clone(),
                source,
            }
        })?;

        let total_len = probe
            .metadata()
            .map_err(|source| WriterError::Scan {
                path: path_str.clone(),
                source,
            })?
            .len();
        if total_len > complete_len {
            warn!(
                path = %path_str,
                partial_bytes = total_len - complete_len,
                "truncating partial trailing line in output file"
            );
            probe
                .set_len(complete_len)
                .map_err(|source| WriterError::Truncate {
                    path: path_str.clone(),
                    source,
                })?;
        }
        drop(probe);

        let file = OpenOptions::new()
            .append(true)
            .open(path.as_ref())
            .map_err(|source| WriterError::Open {
                path: path_str.clone(),
                source,
            })?;

        if lines > 0 {
            info!(path = %path_str, resume_position = lines, "resuming output file");
        }

        Ok(Self {
            file: BufWriter::new(file),
            next_write_id: lines,
            pending: BTreeMap::new(),
        })
    }

    /// Buffers `result` for `work_id`, then drains every contiguous result
    /// to disk.
    ///
    /// Results behind the write frontier are discarded without error; the
    /// line they would overwrite is already on disk.
    pub fn accept(&mut self, work_id: u64, result: String) -> Result<(), WriterError> {
        if work_id < self.next_write_id {
            warn!(
                work_id,
                next_write_id = self.next_write_id,
                "discarding result behind the write frontier"
            );
            return Ok(());
        }
        self.pending.insert(work_id, result);
        self.drain()
    }

    /// Returns the next `work_id` expected to be written.
    pub fn position(&self) -> u64 {
        self.next_write_id
    }

    /// Returns the number of out-of-order results held in memory.
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    /// Writes buffered results while the one at the frontier is present,
    /// then flushes and syncs once for the whole run.
    fn drain(&mut self) -> Result<(), WriterError> {
        let mut wrote = false;
        while let Some(result) = self.pending.remove(&self.next_write_id) {
            self.file
                .write_all(result.as_bytes())
                .and_then(|()| self.file.write_all(b"\n"))
                .map_err(|source| WriterError::Write {
                    work_id: self.next_write_id,
                    source,
                })?;
            debug!(work_id = self.next_write_id, "wrote result line");
            self.next_write_id += 1;
            wrote = true;
        }
        if wrote {
            self.file.flush().map_err(|source| WriterError::Write {
                work_id: self.next_write_id,
                source,
            })?;
            self.file.get_ref().sync_data().map_err(WriterError::Sync)?;
        }
        Ok(())
    }
}

/// Counts `\n`-terminated lines and returns `(line_count, byte_offset)`
/// where `byte_offset` sits just past the final newline.
fn scan_complete_lines(file: &File) -> std::io::Result<(u64, u64)> {
    let mut reader = BufReader::new(file);
    let mut lines = 0u64;
    let mut offset = 0u64;
    let mut complete_len = 0u64;
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break;
        }
        for (i, byte) in buf.iter().enumerate() {
            if *byte == b'\n' {
                lines += 1;
                complete_len = offset + i as u64 + 1;
            }
        }
        let consumed = buf.len();
        offset += consumed as u64;
        reader.consume(consumed);
    }
    Ok((lines, complete_len))
}
