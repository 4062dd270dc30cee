//! Sampling file reader.
//!
//! Epistemic foundation:
//! - K_i: The first line of every split file is a header and is never emitted
//! - K_i: The integer part of the rate buys that many deterministic passes
//! - B_i: The fractional remainder is one probabilistic pass → Skip outcomes
//! - I^R: The random source is injected, so sampling is reproducible

use crate::models::{PipelineError, Result};
use rand::Rng;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Result of asking a reader for its next line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A line to process, without its terminator
    Line(String),
    /// A line was consumed but dropped by fractional-rate sampling
    Skip,
    /// The sampling budget is spent; the reader will never yield again
    Exhausted,
}

/// Reads one header-prefixed data file, looping and thinning it according
/// to a sampling rate.
///
/// A rate of 2.5 yields two full passes followed by one pass that keeps
/// each line with probability 0.5.
pub struct SamplingReader<R> {
    path: PathBuf,
    reader: BufReader<File>,
    original_rate: f64,
    current_rate: f64,
    line_number: u64,
    rng: R,
    buf: Vec<u8>,
}

impl<R: Rng> SamplingReader<R> {
    /// Open `path`, skip its header and arm the reader with `rate`.
    pub fn open(path: &Path, rate: f64, rng: R) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            PipelineError::io(format!("opening split file {}", path.display()), e)
        })?;

        let mut reader = Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            original_rate: rate,
            current_rate: rate,
            line_number: 0,
            rng,
            buf: Vec::new(),
        };
        reader.rewind()?;
        Ok(reader)
    }

    /// Seek back to the first data line. The rate is left untouched.
    pub fn rewind(&mut self) -> Result<()> {
        self.reader
            .seek(SeekFrom::Start(0))
            .map_err(|e| PipelineError::io(format!("rewinding {}", self.path.display()), e))?;
        self.line_number = 0;
        self.read_raw()?;
        Ok(())
    }

    /// Rewind and restore the original sampling budget.
    pub fn reset(&mut self) -> Result<()> {
        self.rewind()?;
        self.current_rate = self.original_rate;
        Ok(())
    }

    /// Data lines in one pass times the original rate, truncated.
    ///
    /// This is an estimate: the fractional pass is random. It scans the
    /// whole file and leaves the cursor on the first data line.
    pub fn estimated_count(&mut self) -> Result<u64> {
        self.rewind()?;
        let mut count: u64 = 0;
        while self.read_raw()? {
            count += 1;
        }
        self.rewind()?;
        Ok((count as f64 * self.original_rate) as u64)
    }

    /// A reader is active while it has budget left.
    pub fn is_active(&self) -> bool {
        self.current_rate > 0.0
    }

    /// Produce the next line, a skip, or exhaustion.
    pub fn next_line(&mut self) -> Result<ReadOutcome> {
        if !self.is_active() {
            return Ok(ReadOutcome::Exhausted);
        }

        if !self.read_raw()? {
            self.current_rate -= 1.0;
            if !self.is_active() {
                return Ok(ReadOutcome::Exhausted);
            }
            self.rewind()?;
            // An empty file yields an empty candidate here; callers drop blanks.
            self.read_raw()?;
        }

        if self.current_rate >= 1.0 || self.rng.gen::<f64>() < self.current_rate {
            Ok(ReadOutcome::Line(self.take_line()))
        } else {
            Ok(ReadOutcome::Skip)
        }
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remaining sampling budget.
    pub fn current_rate(&self) -> f64 {
        self.current_rate
    }

    /// Configured sampling rate.
    pub fn original_rate(&self) -> f64 {
        self.original_rate
    }

    /// 1-based number of the last line read; the header is line 1.
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Read one raw line into `buf`. Returns false at end of file.
    fn read_raw(&mut self) -> Result<bool> {
        self.buf.clear();
        let n = self
            .reader
            .read_until(b'\n', &mut self.buf)
            .map_err(|e| PipelineError::io(format!("reading {}", self.path.display()), e))?;
        if n == 0 {
            return Ok(false);
        }
        self.line_number += 1;
        Ok(true)
    }

    fn take_line(&mut self) -> String {
        let mut end = self.buf.len();
        while end > 0 && matches!(self.buf[end - 1], b'\n' | b'\r') {
            end -= 1;
        }
        String::from_utf8_lossy(&self.buf[..end]).into_owned()
    }
}

impl<R> std::fmt::Debug for SamplingReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplingReader")
            .field("path", &self.path)
            .field("original_rate", &self.original_rate)
            .field("current_rate", &self.current_rate)
            .field("line_number", &self.line_number)
            .finish()
    }
}
