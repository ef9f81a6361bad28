//! Streaming line reader for the input file.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::ReaderError;

/// Streams the input file line by line, pairing each line with its dense
/// zero-based line index.
///
/// The reader is the sole line-number authority in the process: a
/// `work_id` is nothing more than the cursor value at the moment the line
/// was emitted. Lines are handed out exactly once per process lifetime;
/// re-issuing lost work is the queue core's job, not the reader's.
pub struct LineReader {
    inner: BufReader<File>,
    /// Number of lines already emitted or skipped.
    cursor: u64,
}

impl LineReader {
    /// Opens the input file for streaming.
    ///
    /// # Errors
    ///
    /// Returns `ReaderError::Open` if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ReaderError> {
        let file = File::open(path.as_ref()).map_err(|source| ReaderError::Open {
            path: path.as_ref().display().to_string(),
            source,
        })?;

        Ok(Self {
            inner: BufReader::new(file),
            cursor: 0,
        })
    }

    /// Returns the number of lines emitted or skipped so far.
    pub fn position(&self) -> u64 {
        self.cursor
    }

    /// Discards the first `k` lines without materializing them.
    ///
    /// Called exactly once at startup, with the writer's resume position,
    /// so the first line emitted after a restart lines up with the first
    /// output line still missing. Hitting EOF early is tolerated; the
    /// next `next_batch` call reports exhaustion.
    pub fn skip(&mut self, k: u64) -> Result<(), ReaderError> {
        let mut buf = Vec::new();
        for _ in 0..k {
            buf.clear();
            let read = self
                .inner
                .read_until(b'\n', &mut buf)
                .map_err(|source| ReaderError::Read {
                    line: self.cursor,
                    source,
                })?;
            if read == 0 {
                break;
            }
            self.cursor += 1;
        }
        Ok(())
    }

    /// Reads up to `n` further lines, each paired with its line index.
    ///
    /// A batch shorter than `n` means the input is exhausted. Each
    /// returned string has a single trailing `\n` or `\r\n` stripped;
    /// empty lines are preserved as empty strings and still consume a
    /// `work_id`.
    pub fn next_batch(&mut self, n: usize) -> Result<Vec<(u64, String)>, ReaderError> {
        let mut batch = Vec::with_capacity(n);
        for _ in 0..n {
            let mut line = String::new();
            let read = self
                .inner
                .read_line(&mut line)
                .map_err(|source| ReaderError::Read {
                    line: self.cursor,
                    source,
                })?;
            if read == 0 {
                break;
            }
            strip_newline(&mut line);
            batch.push((self.cursor, line));
            self.cursor += 1;
        }
        Ok(batch)
    }

    /// Returns whether the cursor sits at end of file, without consuming
    /// anything.
    pub fn at_eof(&mut self) -> Result<bool, ReaderError> {
        let buf = self.inner.fill_buf().map_err(|source| ReaderError::Read {
            line: self.cursor,
            source,
        })?;
        Ok(buf.is_empty())
    }
}

/// Removes one trailing `\n` or `\r\n`.
fn strip_newline(line: &mut String) {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn reader_over(content: &str) -> (LineReader, tempfile::TempDir) {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("input.txt");
        let mut file = File::create(&path).expect("create input");
        file.write_all(content.as_bytes()).expect("write input");
        (LineReader::open(&path).expect("open reader"), dir)
    }

    #[test]
    fn test_next_batch_assigns_dense_ids() {
        let (mut reader, _dir) = reader_over("alpha\nbeta\ngamma\n");

        let batch = reader.next_batch(2).expect("batch");
        assert_eq!(
            batch,
            vec![(0, "alpha".to_string()), (1, "beta".to_string())]
        );
        assert_eq!(reader.position(), 2);

        let batch = reader.next_batch(2).expect("batch");
        assert_eq!(batch, vec![(2, "gamma".to_string())]);
        assert_eq!(reader.position(), 3);
    }

    #[test]
    fn test_strips_crlf_and_preserves_empty_lines() {
        let (mut reader, _dir) = reader_over("one\r\n\nthree\n");

        let batch = reader.next_batch(10).expect("batch");
        assert_eq!(
            batch,
            vec![
                (0, "one".to_string()),
                (1, String::new()),
                (2, "three".to_string()),
            ]
        );
    }

    #[test]
    fn test_last_line_without_newline_is_a_work_item() {
        let (mut reader, _dir) = reader_over("first\nlast-without-newline");

        let batch = reader.next_batch(10).expect("batch");
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1], (1, "last-without-newline".to_string()));
    }

    #[test]
    fn test_skip_advances_cursor() {
        let (mut reader, _dir) = reader_over("a\nb\nc\nd\n");

        reader.skip(2).expect("skip");
        assert_eq!(reader.position(), 2);

        let batch = reader.next_batch(10).expect("batch");
        assert_eq!(batch, vec![(2, "c".to_string()), (3, "d".to_string())]);
    }

    #[test]
    fn test_skip_past_eof_is_tolerated() {
        let (mut reader, _dir) = reader_over("only\n");

        reader.skip(5).expect("skip");
        assert_eq!(reader.position(), 1);
        assert!(reader.at_eof().expect("eof probe"));
        assert!(reader.next_batch(1).expect("batch").is_empty());
    }

    #[test]
    fn test_at_eof_does_not_consume() {
        let (mut reader, _dir) = reader_over("line\n");

        assert!(!reader.at_eof().expect("eof probe"));
        let batch = reader.next_batch(1).expect("batch");
        assert_eq!(batch, vec![(0, "line".to_string())]);
        assert!(reader.at_eof().expect("eof probe"));
    }
}
