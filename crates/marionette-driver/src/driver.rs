use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use marionette_mux::{
    session_name, AttachBridge, EnvTerminalLauncher, Geometry, InputChannel, SessionManager,
    TmuxBackend,
};

use crate::error::DriverError;
use crate::launch::launch_line;
use crate::pipe::OutputPipe;
use crate::reader::StreamReader;

/// How long to wait for the tee filter to connect to the pipe after the
/// launch line has been typed.
const PIPE_OPEN_WAIT: Duration = Duration::from_secs(10);

/// Immutable driver configuration, resolved once at construction.
///
/// Environment lookups (shell, terminal emulator, working directory) happen
/// here and nowhere else; the components below only ever see the resolved
/// values.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Target program argument vector. Immutable once the driver starts.
    pub command: Vec<String>,
    /// Requested terminal dimensions, if any.
    pub geometry: Geometry,
    /// Working directory for the session.
    pub cwd: PathBuf,
    /// Shell hosting the command inside the session.
    pub shell: String,
    /// Prefix for the derived session name.
    pub session_tag: String,
}

impl DriverConfig {
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into_iter().map(Into::into).collect(),
            geometry: Geometry::default(),
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            shell: std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string()),
            session_tag: "marionette".to_string(),
        }
    }

    pub fn geometry(mut self, width: u16, height: u16) -> Self {
        self.geometry = Geometry::new(Some(width), Some(height));
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn session_tag(mut self, tag: impl Into<String>) -> Self {
        self.session_tag = tag.into();
        self
    }
}

/// Drives one interactive program inside one detached multiplexer session,
/// exposed as a byte stream.
///
/// Construction creates the session, puts its tty into raw mode, launches
/// the command unbuffered with output tee'd into a private named pipe, and
/// opens the pipe for reading. Callers then talk only through the send*/
/// read* surface. Dropping the driver kills the session unless
/// [`close_keep_session`](Self::close_keep_session) ran first.
pub struct Marionette {
    session: SessionManager,
    input: InputChannel,
    attach: AttachBridge,
    reader: StreamReader<OutputPipe>,
    closed: bool,
}

impl Marionette {
    /// Start the target command and return a connected driver.
    ///
    /// Setup failures abort construction: a missing multiplexer is fatal
    /// before anything is created, and a pipe failure after session
    /// creation kills the session on the way out, so no partially
    /// initialized driver (or orphaned session) is ever left behind.
    pub fn spawn(config: DriverConfig) -> Result<Self, DriverError> {
        if config.command.is_empty() {
            return Err(DriverError::InvalidInput("empty command".to_string()));
        }

        let name = session_name(&config.session_tag, &config.command[0]);
        let backend = Arc::new(TmuxBackend::discover(
            name,
            config.cwd.clone(),
            config.shell.clone(),
        )?);

        let session = SessionManager::new(backend.clone());
        let input = InputChannel::new(backend);
        let attach =
            AttachBridge::new(Box::new(EnvTerminalLauncher::from_env()), session.name());

        session.create_session(config.geometry)?;

        let reader = match Self::start(&session, &input, &config) {
            Ok(reader) => reader,
            Err(e) => {
                // The session was already created; don't orphan it.
                if let Err(kill_err) = session.kill_session() {
                    log::warn!("cleanup after failed start: {kill_err}");
                }
                return Err(e);
            }
        };

        Ok(Self {
            session,
            input,
            attach,
            reader,
            closed: false,
        })
    }

    fn start(
        session: &SessionManager,
        input: &InputChannel,
        config: &DriverConfig,
    ) -> Result<StreamReader<OutputPipe>, DriverError> {
        let mut pipe = OutputPipe::create()?;

        session.apply_raw_mode()?;
        if !config.geometry.is_empty() {
            session.resize(config.geometry)?;
        }

        // The fifo exists before this line is typed, so tee's open blocks
        // until our read side connects rather than failing.
        let line = launch_line(&config.command, pipe.path());
        input.sendline(line.as_bytes())?;

        pipe.open_reader(PIPE_OPEN_WAIT)?;
        Ok(StreamReader::new(pipe))
    }

    // --- input ---

    /// Send bytes byte-exact into the target's stdin.
    pub fn send(&self, data: &[u8]) -> Result<(), DriverError> {
        Ok(self.input.send(data)?)
    }

    /// Send bytes followed by a newline.
    pub fn sendline(&self, data: &[u8]) -> Result<(), DriverError> {
        Ok(self.input.sendline(data)?)
    }

    /// Send one byte at a time with a fixed inter-byte delay.
    pub fn dramatic_send(&self, data: &[u8], delay: Duration) -> Result<(), DriverError> {
        Ok(self.input.dramatic_send(data, delay)?)
    }

    // --- output ---

    /// Consume exactly `n` bytes.
    pub fn read(&mut self, n: usize, timeout: Option<Duration>) -> Result<Vec<u8>, DriverError> {
        self.reader.read(n, timeout)
    }

    /// Consume up to and including the next newline.
    pub fn read_line(&mut self, timeout: Option<Duration>) -> Result<Vec<u8>, DriverError> {
        self.reader.read_line(timeout)
    }

    /// Consume through the first occurrence of `delim`.
    pub fn read_until(
        &mut self,
        delim: &[u8],
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, DriverError> {
        self.reader.read_until(delim, timeout)
    }

    /// Drain until EOF or deadline.
    pub fn read_all(&mut self, timeout: Option<Duration>) -> Result<Vec<u8>, DriverError> {
        self.reader.read_all(timeout)
    }

    /// Unbuffered passthrough read of at most `n` bytes straight from the
    /// pipe, bypassing the stream buffer. Short reads are returned as-is.
    pub fn raw_read(&mut self, n: Option<usize>) -> Result<Vec<u8>, DriverError> {
        self.reader.source_mut().read_chunk(n)
    }

    // --- composed ---

    /// Read through `delim`, then send `data`. The read finishes (or fails)
    /// before anything is sent; the bytes read are returned.
    pub fn send_after(
        &mut self,
        delim: &[u8],
        data: &[u8],
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, DriverError> {
        self.reader.send_after(&self.input, delim, data, timeout)
    }

    /// [`send_after`](Self::send_after) with a newline appended to `data`.
    pub fn send_line_after(
        &mut self,
        delim: &[u8],
        data: &[u8],
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, DriverError> {
        self.reader
            .send_line_after(&self.input, delim, data, timeout)
    }

    // --- session ---

    pub fn has_session(&self) -> Result<bool, DriverError> {
        Ok(self.session.has_session()?)
    }

    /// Capture the pane's visible contents over a history line range.
    pub fn capture_pane(&self, start: i32, end: i32) -> Result<String, DriverError> {
        Ok(self.session.capture_pane(start, end)?)
    }

    /// Current pane width in columns, reflecting any requested geometry.
    pub fn pane_width(&self) -> Result<u16, DriverError> {
        Ok(self.session.pane_width()?)
    }

    /// Open a human-visible terminal attached to the session. Debugging
    /// only; never required for the automated path.
    pub fn attach(&self) -> Result<(), DriverError> {
        Ok(self.attach.attach()?)
    }

    /// Kill the session and close the pipe. Idempotent.
    pub fn close(&mut self) -> Result<(), DriverError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.reader.source_mut().close();
        self.session.kill_session()?;
        Ok(())
    }

    /// Close the pipe but leave the session alive for inspection.
    pub fn close_keep_session(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.reader.source_mut().close();
    }
}

impl Drop for Marionette {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.close() {
                log::warn!("failed to close driver: {e}");
            }
        }
    }
}
