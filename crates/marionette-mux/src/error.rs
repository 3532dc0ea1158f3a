/// Errors from multiplexer operations.
#[derive(Debug)]
pub enum MuxError {
    /// The multiplexer binary could not be found or executed at startup.
    ToolMissing(String),
    /// A session command (create/resize/kill/send-keys/capture) failed.
    Session(String),
    /// No terminal emulator is configured for the attach bridge.
    AttachConfig(String),
    /// The configured terminal emulator failed to start.
    AttachLaunch(String),
}

impl std::fmt::Display for MuxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MuxError::ToolMissing(msg) => write!(f, "multiplexer not available: {msg}"),
            MuxError::Session(msg) => write!(f, "session command failed: {msg}"),
            MuxError::AttachConfig(msg) => write!(f, "attach not configured: {msg}"),
            MuxError::AttachLaunch(msg) => write!(f, "attach launch failed: {msg}"),
        }
    }
}

impl std::error::Error for MuxError {}
