use std::path::Path;
use std::sync::Arc;

use crate::backend::{Geometry, SessionBackend};
use crate::error::MuxError;
use crate::keys::hex_codes;
use crate::raw_mode::RawModeSpec;

/// Derive the session name for a target command: `<tag>-<command stem>`,
/// sanitized to characters tmux target parsing treats as literal.
pub fn session_name(tag: &str, command: &str) -> String {
    let stem = Path::new(command)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| command.to_string());

    let sanitized: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();

    format!("{tag}-{sanitized}")
}

/// Session lifecycle policy on top of a [`SessionBackend`].
///
/// Owns the create/configure/destroy sequence for the one session a driver
/// uses. The backend does the tool invocations; this layer adds idempotency,
/// the interrupt-before-kill teardown, and the raw-mode setup step.
pub struct SessionManager {
    backend: Arc<dyn SessionBackend>,
}

impl SessionManager {
    pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
        Self { backend }
    }

    pub fn name(&self) -> &str {
        self.backend.session_name()
    }

    pub fn has_session(&self) -> Result<bool, MuxError> {
        self.backend.has_session()
    }

    /// Create the session if it does not already exist. Calling this twice
    /// never creates a second session.
    pub fn create_session(&self, geometry: Geometry) -> Result<(), MuxError> {
        if self.backend.has_session()? {
            return Ok(());
        }
        self.backend.create_session(geometry)
    }

    /// Re-apply geometry after creation. Creation-time geometry is not
    /// always honored for detached sessions, so this issues an explicit
    /// resize as a second step.
    pub fn resize(&self, geometry: Geometry) -> Result<(), MuxError> {
        self.backend.resize(geometry)
    }

    /// Type the fixed raw-mode stty line into the session's shell. Must run
    /// once, before the target command is launched, while the shell still
    /// owns the pane.
    pub fn apply_raw_mode(&self) -> Result<(), MuxError> {
        let mut line = RawModeSpec.command_line().into_bytes();
        line.push(b'\n');
        self.backend.send_keys(&hex_codes(&line))
    }

    /// Destroy the session. An interrupt keystroke goes in first so the
    /// foreground process gets a chance to flush before the pane dies.
    pub fn kill_session(&self) -> Result<(), MuxError> {
        if !self.backend.has_session()? {
            return Ok(());
        }
        self.backend
            .send_keys(&["03".to_string(), "0a".to_string()])?;
        self.backend.kill_session()
    }

    pub fn capture_pane(&self, start: i32, end: i32) -> Result<String, MuxError> {
        self.backend.capture_pane(start, end)
    }

    pub fn pane_width(&self) -> Result<u16, MuxError> {
        self.backend.pane_width()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeState {
        exists: bool,
        creates: usize,
        sent: Vec<Vec<String>>,
        killed: bool,
        width: u16,
    }

    /// In-memory session backend tracking lifecycle calls.
    struct FakeBackend {
        state: Mutex<FakeState>,
    }

    impl FakeBackend {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                state: Mutex::new(FakeState {
                    width: 80,
                    ..FakeState::default()
                }),
            })
        }
    }

    impl SessionBackend for FakeBackend {
        fn session_name(&self) -> &str {
            "marionette-test"
        }
        fn has_session(&self) -> Result<bool, MuxError> {
            Ok(self.state.lock().unwrap().exists)
        }
        fn create_session(&self, _geometry: Geometry) -> Result<(), MuxError> {
            let mut s = self.state.lock().unwrap();
            s.exists = true;
            s.creates += 1;
            Ok(())
        }
        fn resize(&self, geometry: Geometry) -> Result<(), MuxError> {
            let mut s = self.state.lock().unwrap();
            if let Some(w) = geometry.width {
                s.width = w;
            }
            Ok(())
        }
        fn send_keys(&self, hex_codes: &[String]) -> Result<(), MuxError> {
            self.state.lock().unwrap().sent.push(hex_codes.to_vec());
            Ok(())
        }
        fn kill_session(&self) -> Result<(), MuxError> {
            let mut s = self.state.lock().unwrap();
            s.exists = false;
            s.killed = true;
            Ok(())
        }
        fn capture_pane(&self, start: i32, end: i32) -> Result<String, MuxError> {
            Ok(format!("pane contents {start}..{end}"))
        }
        fn pane_width(&self) -> Result<u16, MuxError> {
            Ok(self.state.lock().unwrap().width)
        }
    }

    #[test]
    fn test_session_name_sanitized() {
        assert_eq!(session_name("marionette", "./bin/my app!"), "marionette-my-app-");
        assert_eq!(session_name("marionette", "/usr/bin/cat"), "marionette-cat");
    }

    #[test]
    fn test_session_name_strips_extension() {
        assert_eq!(session_name("marionette", "target/kmaze.elf"), "marionette-kmaze");
    }

    #[test]
    fn test_create_is_idempotent() {
        let backend = FakeBackend::new();
        let mgr = SessionManager::new(backend.clone());

        assert!(!mgr.has_session().unwrap());
        mgr.create_session(Geometry::default()).unwrap();
        assert!(mgr.has_session().unwrap());
        mgr.create_session(Geometry::default()).unwrap();

        assert_eq!(backend.state.lock().unwrap().creates, 1);
    }

    #[test]
    fn test_kill_lifecycle() {
        let backend = FakeBackend::new();
        let mgr = SessionManager::new(backend.clone());

        mgr.create_session(Geometry::default()).unwrap();
        mgr.kill_session().unwrap();
        assert!(!mgr.has_session().unwrap());

        // Interrupt keystroke (ETX + newline) precedes the kill.
        let state = backend.state.lock().unwrap();
        assert!(state.killed);
        assert_eq!(state.sent.last().unwrap(), &vec!["03", "0a"]);
    }

    #[test]
    fn test_kill_without_session_is_noop() {
        let backend = FakeBackend::new();
        let mgr = SessionManager::new(backend.clone());

        mgr.kill_session().unwrap();
        let state = backend.state.lock().unwrap();
        assert!(!state.killed);
        assert!(state.sent.is_empty());
    }

    #[test]
    fn test_raw_mode_goes_through_send_keys() {
        let backend = FakeBackend::new();
        let mgr = SessionManager::new(backend.clone());

        mgr.apply_raw_mode().unwrap();

        let state = backend.state.lock().unwrap();
        assert_eq!(state.sent.len(), 1);
        // "stty" in hex, terminated by a newline keystroke.
        assert_eq!(&state.sent[0][..4], &["73", "74", "74", "79"]);
        assert_eq!(state.sent[0].last().unwrap(), "0a");
    }

    #[test]
    fn test_capture_pane_passes_range_through() {
        let backend = FakeBackend::new();
        let mgr = SessionManager::new(backend);

        let text = mgr.capture_pane(0, 200).unwrap();
        assert_eq!(text, "pane contents 0..200");
    }

    #[test]
    fn test_resize_reflected_in_pane_width() {
        let backend = FakeBackend::new();
        let mgr = SessionManager::new(backend.clone());

        mgr.resize(Geometry::new(Some(120), Some(40))).unwrap();
        assert_eq!(mgr.pane_width().unwrap(), 120);
    }
}
