use marionette_mux::MuxError;

/// Errors from driver operations.
#[derive(Debug)]
pub enum DriverError {
    /// The multiplexer binary is missing. Raised at construction, never later.
    ToolMissing(String),
    /// A session lifecycle command failed.
    Session(String),
    /// Named-pipe creation, open, or read failure.
    Pipe(String),
    /// A read's deadline elapsed before its termination condition was met.
    /// Already-buffered bytes are retained for the next call.
    Timeout,
    /// The pipe's writer closed; the stream has ended.
    Eof,
    /// No terminal emulator configured for attach.
    AttachConfig(String),
    /// The terminal emulator failed to start.
    AttachLaunch(String),
    /// A caller-supplied argument was unusable (empty command, empty
    /// delimiter).
    InvalidInput(String),
}

impl std::fmt::Display for DriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverError::ToolMissing(msg) => write!(f, "multiplexer not available: {msg}"),
            DriverError::Session(msg) => write!(f, "session command failed: {msg}"),
            DriverError::Pipe(msg) => write!(f, "output pipe error: {msg}"),
            DriverError::Timeout => write!(f, "read timed out"),
            DriverError::Eof => write!(f, "end of stream"),
            DriverError::AttachConfig(msg) => write!(f, "attach not configured: {msg}"),
            DriverError::AttachLaunch(msg) => write!(f, "attach launch failed: {msg}"),
            DriverError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
        }
    }
}

impl std::error::Error for DriverError {}

impl From<MuxError> for DriverError {
    fn from(err: MuxError) -> Self {
        match err {
            MuxError::ToolMissing(msg) => DriverError::ToolMissing(msg),
            MuxError::Session(msg) => DriverError::Session(msg),
            MuxError::AttachConfig(msg) => DriverError::AttachConfig(msg),
            MuxError::AttachLaunch(msg) => DriverError::AttachLaunch(msg),
        }
    }
}

impl DriverError {
    /// True for the recoverable deadline case; callers may retry and the
    /// stream buffer is intact.
    pub fn is_timeout(&self) -> bool {
        matches!(self, DriverError::Timeout)
    }

    /// True when the pipe's writer has closed.
    pub fn is_eof(&self) -> bool {
        matches!(self, DriverError::Eof)
    }
}
