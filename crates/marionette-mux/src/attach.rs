use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use crate::error::MuxError;

/// How long to watch a freshly spawned emulator for an immediate failure.
const LAUNCH_GRACE: Duration = Duration::from_millis(200);

/// Capability interface for opening a human-visible terminal on a session.
pub trait TerminalLauncher: Send + Sync {
    fn launch(&self, session: &str) -> Result<(), MuxError>;
}

/// Production launcher running the emulator named by `$TERM_PROGRAM`.
///
/// The variable is resolved once at construction; a missing value becomes a
/// configuration error only when an attach is actually requested, since the
/// automated I/O path never needs it.
pub struct EnvTerminalLauncher {
    term_program: Option<String>,
}

impl EnvTerminalLauncher {
    pub fn from_env() -> Self {
        Self {
            term_program: std::env::var("TERM_PROGRAM").ok(),
        }
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            term_program: Some(program.into()),
        }
    }
}

impl TerminalLauncher for EnvTerminalLauncher {
    fn launch(&self, session: &str) -> Result<(), MuxError> {
        let program = self.term_program.as_deref().ok_or_else(|| {
            MuxError::AttachConfig(
                "set $TERM_PROGRAM to your terminal emulator to attach".to_string(),
            )
        })?;

        // Detach the emulator into its own process group so it outlives us.
        let mut child = Command::new(program)
            .args(["tmux", "attach-session", "-t", session])
            .process_group(0)
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| MuxError::AttachLaunch(format!("failed to start {program}: {e}")))?;

        // Only an immediate non-zero exit counts as a launch failure; an
        // emulator that forks and exits zero right away is fine.
        thread::sleep(LAUNCH_GRACE);
        if let Ok(Some(status)) = child.try_wait() {
            if !status.success() {
                return Err(MuxError::AttachLaunch(format!(
                    "{program} exited with {status}"
                )));
            }
        }

        log::info!("attached terminal '{program}' to session '{session}'");
        Ok(())
    }
}

/// Opens an interactive view onto the driver's session in a separate
/// terminal window. Debugging convenience only; reads and writes never go
/// through this path.
pub struct AttachBridge {
    launcher: Box<dyn TerminalLauncher>,
    session: String,
}

impl AttachBridge {
    pub fn new(launcher: Box<dyn TerminalLauncher>, session: impl Into<String>) -> Self {
        Self {
            launcher,
            session: session.into(),
        }
    }

    pub fn attach(&self) -> Result<(), MuxError> {
        self.launcher.launch(&self.session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingLauncher {
        launched: std::sync::Arc<Mutex<Vec<String>>>,
    }

    impl TerminalLauncher for RecordingLauncher {
        fn launch(&self, session: &str) -> Result<(), MuxError> {
            self.launched.lock().unwrap().push(session.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_missing_term_program_is_config_error() {
        let launcher = EnvTerminalLauncher { term_program: None };
        let err = launcher.launch("marionette-test").unwrap_err();
        assert!(matches!(err, MuxError::AttachConfig(_)));
    }

    #[test]
    fn test_unlaunchable_program_is_launch_error() {
        let launcher = EnvTerminalLauncher::with_program("/nonexistent/term-emulator");
        let err = launcher.launch("marionette-test").unwrap_err();
        assert!(matches!(err, MuxError::AttachLaunch(_)));
    }

    #[test]
    fn test_bridge_passes_session_name() {
        let launched = std::sync::Arc::new(Mutex::new(Vec::new()));
        let bridge = AttachBridge::new(
            Box::new(RecordingLauncher {
                launched: launched.clone(),
            }),
            "marionette-cat",
        );
        bridge.attach().unwrap();
        assert_eq!(launched.lock().unwrap().as_slice(), ["marionette-cat"]);
    }
}
