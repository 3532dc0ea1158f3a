//! marionette-driver: scripted terminal I/O against a detached tmux session.
//!
//! Runs an interactive program (prompt-driven, full-screen TUI, or raw
//! binary stdin) inside a detached multiplexer session and exposes it as a
//! byte stream: keystrokes go in byte-exact via hex send-keys, output comes
//! back through a named pipe tee'd from the pane, and a buffered reader
//! offers line/delimiter/bounded/unbounded reads with deadlines.
//!
//! # Architecture
//!
//! - [`Marionette`] — The driver facade test authors use (send*/read*).
//! - [`StreamReader`] — Buffered blocking reads over the raw pipe bytes.
//! - [`OutputPipe`] — Fifo creation, writer-wait open, poll-based reads.
//! - [`launch`] — Quoted composite `stdbuf … | tee …` launch line.
//!
//! Session lifecycle and keystroke injection live in `marionette-mux`.
//!
//! # Example
//!
//! ```no_run
//! use marionette_driver::{DriverConfig, Marionette};
//! use std::time::Duration;
//!
//! let mut io = Marionette::spawn(DriverConfig::new(["./target/kmaze"]).geometry(64, 64))?;
//! io.sendline(b"w")?;
//! let prompt = io.read_until(b"> ", Some(Duration::from_secs(2)))?;
//! # Ok::<(), marionette_driver::DriverError>(())
//! ```

pub mod driver;
pub mod error;
pub mod launch;
pub mod pipe;
pub mod reader;

pub use driver::{DriverConfig, Marionette};
pub use error::DriverError;
pub use pipe::{OutputPipe, RawRead, RawSource};
pub use reader::StreamReader;
