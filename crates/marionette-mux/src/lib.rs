//! marionette-mux: tmux session backend for Marionette.
//!
//! This crate owns everything that talks to the terminal multiplexer: session
//! lifecycle (create, resize, kill), keystroke injection as hex byte codes,
//! the raw-mode terminal discipline applied to the session's shell, and the
//! "attach a visible terminal" debugging bridge.
//!
//! # Architecture
//!
//! - [`SessionBackend`] — Capability trait over the multiplexer CLI, with
//!   [`TmuxBackend`] as the production implementation shelling out to tmux.
//! - [`SessionManager`] — Session lifecycle policy on top of a backend.
//! - [`InputChannel`] — Write-only keystroke injection (send / sendline /
//!   dramatic_send).
//! - [`AttachBridge`] — Opens a human-visible terminal on the same session.

pub mod attach;
pub mod backend;
pub mod error;
pub mod keys;
pub mod raw_mode;
pub mod session;

pub use attach::{AttachBridge, EnvTerminalLauncher, TerminalLauncher};
pub use backend::{Geometry, SessionBackend, TmuxBackend};
pub use error::MuxError;
pub use keys::InputChannel;
pub use raw_mode::RawModeSpec;
pub use session::{session_name, SessionManager};
