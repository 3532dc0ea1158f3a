//! Named-pipe output capture.
//!
//! The target command's combined output is tee'd into a fifo in a private
//! temp directory; this module owns the read side. Opening the read end is
//! an explicit synchronization point: the fifo exists before the launch line
//! is typed, and the open waits (bounded) for the tee writer to connect
//! instead of relying on platform blocking-open behavior.

use std::fs::{File, OpenOptions};
use std::io::Read;
use std::os::fd::AsFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::stat::Mode;
use tempfile::TempDir;

use crate::error::DriverError;

/// Default read chunk when the caller does not bound a raw read.
pub const DEFAULT_CHUNK: usize = 4096;

/// Poll granularity; deadlines are enforced across slices, not per syscall.
const POLL_SLICE_MS: u16 = 1000;

/// Probe window and retry pause while waiting for the tee writer.
const OPEN_PROBE_MS: u16 = 50;
const OPEN_RETRY: Duration = Duration::from_millis(50);

/// Outcome of one raw read against the pipe.
#[derive(Debug, PartialEq, Eq)]
pub enum RawRead {
    /// Bytes were read (possibly fewer than the buffer holds).
    Data(usize),
    /// The writer closed and the pipe is drained.
    Eof,
    /// The timeout elapsed with no bytes available.
    TimedOut,
}

/// Byte source for [`StreamReader`](crate::reader::StreamReader).
///
/// One suspension point: the call blocks until bytes arrive, EOF, or the
/// given timeout elapses. Tests substitute scripted in-memory sources.
pub trait RawSource {
    fn read_raw(
        &mut self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<RawRead, DriverError>;
}

/// Read side of the driver's fifo, plus the temp directory holding it.
///
/// Exactly one writer (the tee filter) and one reader (this struct) exist
/// per pipe; the directory is removed when the pipe is dropped.
pub struct OutputPipe {
    _dir: TempDir,
    path: PathBuf,
    file: Option<File>,
}

impl OutputPipe {
    /// Create the fifo in a fresh private temp directory. The read end is
    /// not opened yet; call [`open_reader`](Self::open_reader) after the
    /// launch line has been sent.
    pub fn create() -> Result<Self, DriverError> {
        let dir = TempDir::new()
            .map_err(|e| DriverError::Pipe(format!("failed to create temp dir: {e}")))?;
        let path = dir.path().join("cmd_output");

        nix::unistd::mkfifo(&path, Mode::S_IRUSR | Mode::S_IWUSR).map_err(|e| {
            DriverError::Pipe(format!("failed to create fifo at {}: {e}", path.display()))
        })?;

        Ok(Self {
            _dir: dir,
            path,
            file: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the read end, waiting up to `wait` for a writer to connect.
    ///
    /// A fifo read end with no writer reports POLLHUP; the condition clears
    /// as soon as a writer opens the other side, so the fd is opened once
    /// (non-blocking, to avoid the indefinite block a plain open-for-read
    /// would take here) and re-probed until the hangup clears or the bound
    /// is hit. Keeping the fd open the whole time also means the writer
    /// never sees a reader-less pipe once this call has started.
    pub fn open_reader(&mut self, wait: Duration) -> Result<(), DriverError> {
        let deadline = Instant::now() + wait;

        let file = OpenOptions::new()
            .read(true)
            .custom_flags(nix::libc::O_NONBLOCK)
            .open(&self.path)
            .map_err(|e| {
                DriverError::Pipe(format!("failed to open {}: {e}", self.path.display()))
            })?;

        loop {
            let no_writer = {
                let mut fds = [PollFd::new(file.as_fd(), PollFlags::POLLIN)];
                let n = match poll(&mut fds, PollTimeout::from(OPEN_PROBE_MS)) {
                    Ok(n) => n,
                    Err(Errno::EINTR) => 0,
                    Err(e) => return Err(DriverError::Pipe(format!("poll failed: {e}"))),
                };
                let revents = fds[0].revents().unwrap_or(PollFlags::empty());

                // POLLHUP without POLLIN means no writer has the fifo open
                // yet. A quiet poll (n == 0) means a writer is connected but
                // silent.
                n > 0
                    && revents.contains(PollFlags::POLLHUP)
                    && !revents.contains(PollFlags::POLLIN)
            };

            if !no_writer {
                self.file = Some(file);
                return Ok(());
            }

            if Instant::now() >= deadline {
                return Err(DriverError::Pipe(format!(
                    "no writer connected to {} within {:?}",
                    self.path.display(),
                    wait
                )));
            }
            thread::sleep(OPEN_RETRY);
        }
    }

    /// Direct passthrough read of at most `max` bytes (default chunk if
    /// unset), blocking with no deadline. Returns an empty vec at EOF.
    pub fn read_chunk(&mut self, max: Option<usize>) -> Result<Vec<u8>, DriverError> {
        let mut buf = vec![0u8; max.unwrap_or(DEFAULT_CHUNK).max(1)];
        match self.read_raw(&mut buf, None)? {
            RawRead::Data(n) => {
                buf.truncate(n);
                Ok(buf)
            }
            RawRead::Eof | RawRead::TimedOut => Ok(Vec::new()),
        }
    }

    /// Close the read handle. Idempotent; later reads report EOF.
    pub fn close(&mut self) {
        self.file = None;
    }
}

impl RawSource for OutputPipe {
    fn read_raw(
        &mut self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<RawRead, DriverError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let file = match self.file.as_mut() {
            Some(f) => f,
            None => return Ok(RawRead::Eof),
        };

        loop {
            // Drain available bytes before consulting the deadline, so a
            // zero timeout still returns data that is already there.
            match file.read(buf) {
                Ok(0) => return Ok(RawRead::Eof),
                Ok(n) => return Ok(RawRead::Data(n)),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(DriverError::Pipe(format!("read failed: {e}"))),
            }

            let slice_ms = match deadline {
                Some(d) => {
                    let remaining = d.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Ok(RawRead::TimedOut);
                    }
                    remaining.as_millis().min(u128::from(POLL_SLICE_MS)).max(1) as u16
                }
                None => POLL_SLICE_MS,
            };

            let mut fds = [PollFd::new(file.as_fd(), PollFlags::POLLIN)];
            match poll(&mut fds, PollTimeout::from(slice_ms)) {
                Ok(_) => {}
                Err(Errno::EINTR) => {}
                Err(e) => return Err(DriverError::Pipe(format!("poll failed: {e}"))),
            }
            // Loop re-reads; a hangup surfaces as a 0-byte read (EOF).
        }
    }
}
