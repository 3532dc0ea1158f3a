use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::error::MuxError;

/// Optional terminal dimensions for session creation and resize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Geometry {
    pub width: Option<u16>,
    pub height: Option<u16>,
}

impl Geometry {
    pub fn new(width: Option<u16>, height: Option<u16>) -> Self {
        Self { width, height }
    }

    /// True if neither dimension was requested.
    pub fn is_empty(&self) -> bool {
        self.width.is_none() && self.height.is_none()
    }

    /// Render as `-x <w> -y <h>` argument pairs, omitting unset dimensions.
    fn to_args(self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(w) = self.width {
            args.push("-x".to_string());
            args.push(w.to_string());
        }
        if let Some(h) = self.height {
            args.push("-y".to_string());
            args.push(h.to_string());
        }
        args
    }
}

/// Capability interface over the terminal multiplexer CLI.
///
/// One implementation per multiplexer; the production one shells out to
/// tmux. Tests substitute an in-memory fake so no external binary is needed.
/// Every method targets the single session the backend was constructed for.
pub trait SessionBackend: Send + Sync {
    /// Name of the session this backend targets.
    fn session_name(&self) -> &str;

    /// Probe for the session. "Not found" is `Ok(false)`, never an error;
    /// only a failure to invoke the tool at all errors.
    fn has_session(&self) -> Result<bool, MuxError>;

    /// Create the session detached, hosting the given shell in `cwd`.
    fn create_session(&self, geometry: Geometry) -> Result<(), MuxError>;

    /// Resize the session's window and pane after creation.
    fn resize(&self, geometry: Geometry) -> Result<(), MuxError>;

    /// Inject keystrokes given as two-digit hex byte codes.
    fn send_keys(&self, hex_codes: &[String]) -> Result<(), MuxError>;

    /// Destroy the session.
    fn kill_session(&self) -> Result<(), MuxError>;

    /// Capture pane contents over a history line range.
    fn capture_pane(&self, start: i32, end: i32) -> Result<String, MuxError>;

    /// Current width of the session's active pane, in columns.
    fn pane_width(&self) -> Result<u16, MuxError>;
}

/// Production [`SessionBackend`] shelling out to the tmux CLI.
pub struct TmuxBackend {
    session: String,
    cwd: PathBuf,
    shell: String,
}

impl TmuxBackend {
    /// Verify tmux is reachable on PATH and build a backend for `session`.
    ///
    /// A missing binary is fatal here, at construction, so callers never get
    /// a driver that cannot talk to its multiplexer.
    pub fn discover(session: String, cwd: PathBuf, shell: String) -> Result<Self, MuxError> {
        let probe = Command::new("tmux")
            .arg("-V")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match probe {
            Ok(status) if status.success() => {}
            Ok(status) => {
                return Err(MuxError::ToolMissing(format!(
                    "tmux -V exited with {status}"
                )))
            }
            Err(e) => return Err(MuxError::ToolMissing(format!("failed to run tmux: {e}"))),
        }

        Ok(Self {
            session,
            cwd,
            shell,
        })
    }

    /// Run a tmux subcommand, surfacing a non-zero exit as a session error.
    fn run(&self, args: &[&str]) -> Result<(), MuxError> {
        log::debug!("tmux {}", args.join(" "));
        let output = Command::new("tmux")
            .args(args)
            .output()
            .map_err(|e| MuxError::Session(format!("failed to run tmux: {e}")))?;

        if !output.status.success() {
            return Err(MuxError::Session(format!(
                "tmux {} failed: {}",
                args.first().copied().unwrap_or(""),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(())
    }

    /// Run a tmux subcommand and return its stdout.
    fn run_capture(&self, args: &[&str]) -> Result<String, MuxError> {
        let output = Command::new("tmux")
            .args(args)
            .output()
            .map_err(|e| MuxError::Session(format!("failed to run tmux: {e}")))?;

        if !output.status.success() {
            return Err(MuxError::Session(format!(
                "tmux {} failed: {}",
                args.first().copied().unwrap_or(""),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl SessionBackend for TmuxBackend {
    fn session_name(&self) -> &str {
        &self.session
    }

    fn has_session(&self) -> Result<bool, MuxError> {
        let status = Command::new("tmux")
            .args(["has-session", "-t", self.session.as_str()])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| MuxError::Session(format!("failed to run tmux: {e}")))?;
        Ok(status.success())
    }

    fn create_session(&self, geometry: Geometry) -> Result<(), MuxError> {
        let cwd = self.cwd.to_string_lossy().into_owned();
        let mut args = vec![
            "new-session".to_string(),
            "-d".to_string(),
            "-c".to_string(),
            cwd,
            "-s".to_string(),
            self.session.clone(),
        ];
        args.extend(geometry.to_args());
        args.push(self.shell.clone());

        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(&argv)?;
        log::info!("created session '{}'", self.session);
        Ok(())
    }

    fn resize(&self, geometry: Geometry) -> Result<(), MuxError> {
        if geometry.is_empty() {
            return Ok(());
        }

        // Both the window and the pane are resized: without an attached
        // client tmux can leave one of them at the default size.
        for subcmd in ["resize-window", "resize-pane"] {
            let mut args = vec![subcmd.to_string(), "-t".to_string(), self.session.clone()];
            args.extend(geometry.to_args());
            let argv: Vec<&str> = args.iter().map(String::as_str).collect();
            self.run(&argv)?;
        }
        Ok(())
    }

    fn send_keys(&self, hex_codes: &[String]) -> Result<(), MuxError> {
        let mut args = vec!["send-keys", "-t", self.session.as_str(), "-H"];
        args.extend(hex_codes.iter().map(String::as_str));
        self.run(&args)
    }

    fn kill_session(&self) -> Result<(), MuxError> {
        self.run(&["kill-session", "-t", self.session.as_str()])?;
        log::info!("killed session '{}'", self.session);
        Ok(())
    }

    fn capture_pane(&self, start: i32, end: i32) -> Result<String, MuxError> {
        let start = start.to_string();
        let end = end.to_string();
        self.run_capture(&[
            "capture-pane",
            "-p",
            "-S",
            start.as_str(),
            "-E",
            end.as_str(),
            "-t",
            self.session.as_str(),
        ])
    }

    fn pane_width(&self) -> Result<u16, MuxError> {
        let out = self.run_capture(&[
            "display-message",
            "-p",
            "-t",
            self.session.as_str(),
            "#{pane_width}",
        ])?;
        out.trim()
            .parse::<u16>()
            .map_err(|e| MuxError::Session(format!("bad pane_width '{}': {e}", out.trim())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_args_both() {
        let g = Geometry::new(Some(80), Some(24));
        assert_eq!(g.to_args(), vec!["-x", "80", "-y", "24"]);
    }

    #[test]
    fn test_geometry_args_partial() {
        let g = Geometry::new(None, Some(50));
        assert_eq!(g.to_args(), vec!["-y", "50"]);
        assert!(!g.is_empty());
    }

    #[test]
    fn test_geometry_empty() {
        assert!(Geometry::default().is_empty());
        assert!(Geometry::new(None, None).to_args().is_empty());
    }
}
