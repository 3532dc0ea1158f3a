//! Buffered consumer over the raw pipe bytes.
//!
//! One accumulation buffer feeds every read operation: bytes enter only from
//! raw reads, leave only through consumption, and are never reordered. A
//! deadline bounds the total wall clock of an operation across however many
//! raw reads it takes; on expiry nothing already buffered is lost.

use std::time::{Duration, Instant};

use marionette_mux::InputChannel;

use crate::error::DriverError;
use crate::pipe::{RawRead, RawSource, DEFAULT_CHUNK};

enum Fill {
    Got,
    Eof,
    TimedOut,
}

/// Blocking, buffered reader over a [`RawSource`].
pub struct StreamReader<S> {
    source: S,
    buf: Vec<u8>,
    eof: bool,
}

impl<S: RawSource> StreamReader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            buf: Vec::new(),
            eof: false,
        }
    }

    /// Direct access to the underlying source, bypassing the buffer.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Unconsumed bytes, visible for inspection after a timeout.
    pub fn buffered(&self) -> &[u8] {
        &self.buf
    }

    /// True once the source reported EOF. Buffered bytes may still remain.
    pub fn at_eof(&self) -> bool {
        self.eof
    }

    fn consume(&mut self, n: usize) -> Vec<u8> {
        self.buf.drain(..n).collect()
    }

    /// One raw read, bounded by whatever remains of the deadline.
    fn fill(&mut self, deadline: Option<Instant>) -> Result<Fill, DriverError> {
        let timeout = deadline.map(|d| d.saturating_duration_since(Instant::now()));
        let mut chunk = [0u8; DEFAULT_CHUNK];
        match self.source.read_raw(&mut chunk, timeout)? {
            RawRead::Data(n) => {
                self.buf.extend_from_slice(&chunk[..n]);
                Ok(Fill::Got)
            }
            RawRead::Eof => {
                self.eof = true;
                Ok(Fill::Eof)
            }
            RawRead::TimedOut => Ok(Fill::TimedOut),
        }
    }

    /// Consume exactly `n` bytes, blocking until they are available.
    ///
    /// EOF before `n` bytes is an error; the partial bytes stay buffered.
    pub fn read(&mut self, n: usize, timeout: Option<Duration>) -> Result<Vec<u8>, DriverError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            if self.buf.len() >= n {
                return Ok(self.consume(n));
            }
            if self.eof {
                return Err(DriverError::Eof);
            }
            match self.fill(deadline)? {
                Fill::Got | Fill::Eof => {}
                Fill::TimedOut => return Err(DriverError::Timeout),
            }
        }
    }

    /// Consume up to and including the next newline.
    ///
    /// At EOF the remaining buffered bytes (without a newline) are returned
    /// once; the call after that reports [`DriverError::Eof`].
    pub fn read_line(&mut self, timeout: Option<Duration>) -> Result<Vec<u8>, DriverError> {
        match self.read_until(b"\n", timeout) {
            Ok(line) => Ok(line),
            Err(DriverError::Eof) if !self.buf.is_empty() => {
                let rest = self.buf.len();
                Ok(self.consume(rest))
            }
            Err(e) => Err(e),
        }
    }

    /// Consume through the first occurrence of `delim`, returning the bytes
    /// up to and including it.
    ///
    /// The delimiter may span raw reads; the scan resumes with a lookback of
    /// `delim.len() - 1` bytes so a split occurrence is still found.
    pub fn read_until(
        &mut self,
        delim: &[u8],
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, DriverError> {
        if delim.is_empty() {
            return Err(DriverError::InvalidInput("empty delimiter".to_string()));
        }
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut scanned = 0usize;

        loop {
            if self.buf.len() >= delim.len() {
                let start = scanned.saturating_sub(delim.len() - 1);
                if let Some(pos) = find(&self.buf[start..], delim) {
                    let end = start + pos + delim.len();
                    return Ok(self.consume(end));
                }
                scanned = self.buf.len();
            }
            if self.eof {
                return Err(DriverError::Eof);
            }
            match self.fill(deadline)? {
                Fill::Got | Fill::Eof => {}
                Fill::TimedOut => return Err(DriverError::Timeout),
            }
        }
    }

    /// Read through `delim`, then send `data` through `input`.
    ///
    /// The read must complete before anything is sent: a timeout or EOF
    /// from the read suppresses the send entirely. Returns the bytes read,
    /// up to and including the delimiter.
    pub fn send_after(
        &mut self,
        input: &InputChannel,
        delim: &[u8],
        data: &[u8],
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, DriverError> {
        let read = self.read_until(delim, timeout)?;
        input.send(data)?;
        Ok(read)
    }

    /// [`send_after`](Self::send_after) with a newline appended to `data`.
    pub fn send_line_after(
        &mut self,
        input: &InputChannel,
        delim: &[u8],
        data: &[u8],
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, DriverError> {
        let mut line = data.to_vec();
        line.push(b'\n');
        self.send_after(input, delim, &line, timeout)
    }

    /// Drain everything until EOF or the deadline, returning what was
    /// accumulated either way.
    pub fn read_all(&mut self, timeout: Option<Duration>) -> Result<Vec<u8>, DriverError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        while !self.eof {
            match self.fill(deadline)? {
                Fill::Got => {}
                Fill::Eof | Fill::TimedOut => break,
            }
        }
        let all = self.buf.len();
        Ok(self.consume(all))
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
