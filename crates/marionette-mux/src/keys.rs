use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::backend::SessionBackend;
use crate::error::MuxError;

/// Encode bytes as the two-digit hex codes the multiplexer's hex send-keys
/// mode expects. Every byte gets its own code, so NUL, control characters
/// and 8-bit values pass through unmodified.
pub fn hex_codes(data: &[u8]) -> Vec<String> {
    data.iter().map(|b| format!("{b:02x}")).collect()
}

/// Write-only keystroke injection into the session.
///
/// Holds a send capability into the backend, not ownership of the session.
/// No operation here reads a response; output travels through the pipe side.
pub struct InputChannel {
    backend: Arc<dyn SessionBackend>,
}

impl InputChannel {
    pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
        Self { backend }
    }

    /// Send `data` byte-exact as a single keystroke-injection command.
    pub fn send(&self, data: &[u8]) -> Result<(), MuxError> {
        self.backend.send_keys(&hex_codes(data))
    }

    /// Send `data` followed by a newline.
    pub fn sendline(&self, data: &[u8]) -> Result<(), MuxError> {
        let mut line = data.to_vec();
        line.push(b'\n');
        self.send(&line)
    }

    /// Send one byte at a time with `delay` between keystrokes, for programs
    /// that read() in small increments or care about keystroke timing.
    pub fn dramatic_send(&self, data: &[u8], delay: Duration) -> Result<(), MuxError> {
        for b in data {
            thread::sleep(delay);
            self.backend.send_keys(&hex_codes(&[*b]))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::backend::Geometry;

    /// Records every send-keys invocation; other methods are unused here.
    struct RecordingBackend {
        sent: Mutex<Vec<Vec<String>>>,
    }

    impl RecordingBackend {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    impl SessionBackend for RecordingBackend {
        fn session_name(&self) -> &str {
            "test"
        }
        fn has_session(&self) -> Result<bool, MuxError> {
            Ok(true)
        }
        fn create_session(&self, _geometry: Geometry) -> Result<(), MuxError> {
            Ok(())
        }
        fn resize(&self, _geometry: Geometry) -> Result<(), MuxError> {
            Ok(())
        }
        fn send_keys(&self, hex_codes: &[String]) -> Result<(), MuxError> {
            self.sent.lock().unwrap().push(hex_codes.to_vec());
            Ok(())
        }
        fn kill_session(&self) -> Result<(), MuxError> {
            Ok(())
        }
        fn capture_pane(&self, _start: i32, _end: i32) -> Result<String, MuxError> {
            Ok(String::new())
        }
        fn pane_width(&self) -> Result<u16, MuxError> {
            Ok(80)
        }
    }

    #[test]
    fn test_hex_codes_control_bytes() {
        assert_eq!(
            hex_codes(&[0x00, 0x03, 0x0a, 0xff]),
            vec!["00", "03", "0a", "ff"]
        );
    }

    #[test]
    fn test_hex_codes_ascii() {
        assert_eq!(hex_codes(b"Hi"), vec!["48", "69"]);
    }

    #[test]
    fn test_send_single_invocation() {
        let backend = RecordingBackend::new();
        let input = InputChannel::new(backend.clone());

        input.send(b"\x01\x02\x03").unwrap();

        let sent = backend.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], vec!["01", "02", "03"]);
    }

    #[test]
    fn test_sendline_appends_newline() {
        let backend = RecordingBackend::new();
        let input = InputChannel::new(backend.clone());

        input.sendline(b"ls").unwrap();

        let sent = backend.sent.lock().unwrap();
        assert_eq!(sent[0], vec!["6c", "73", "0a"]);
    }

    #[test]
    fn test_dramatic_send_one_byte_per_invocation() {
        let backend = RecordingBackend::new();
        let input = InputChannel::new(backend.clone());

        input
            .dramatic_send(b"abc", Duration::from_millis(1))
            .unwrap();

        let sent = backend.sent.lock().unwrap();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0], vec!["61"]);
        assert_eq!(sent[2], vec!["63"]);
    }
}
