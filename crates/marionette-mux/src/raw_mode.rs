//! Terminal discipline applied to the session's shell before launch.
//!
//! The pane's tty must pass bytes through untouched in both directions: no
//! echo, no signal generation, no special-character interpretation, so that
//! injected keystrokes reach the target program byte-exact and its output is
//! captured without translation. The discipline is expressed as named stty
//! flags, one per concern, rather than a packed mode string tied to a single
//! stty build.

/// Mode flags: enter raw mode, but keep output post-processing so the
/// program's NL handling stays normal; then disable everything raw mode
/// leaves on that could alter input.
const MODE_FLAGS: &[&str] = &[
    "raw",
    "opost",
    "-echo",
    "-isig",
    "-brkint",
    "-icrnl",
    "-imaxbel",
];

/// Special control characters to unbind, so bytes like 0x03 or 0x04 are
/// delivered to the program instead of being interpreted by the tty.
const UNBOUND_CHARS: &[&str] = &[
    "intr", "quit", "erase", "kill", "eof", "eol", "eol2", "start", "stop", "susp", "rprnt",
    "werase", "lnext", "discard",
];

/// The fixed raw-mode terminal discipline, rendered as one stty invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawModeSpec;

impl RawModeSpec {
    /// The complete stty command line to type into the session's shell.
    pub fn command_line(&self) -> String {
        let mut parts = vec!["stty"];
        parts.extend_from_slice(MODE_FLAGS);
        for name in UNBOUND_CHARS {
            parts.push(name);
            parts.push("undef");
        }
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_shape() {
        let line = RawModeSpec.command_line();
        assert!(line.starts_with("stty raw opost -echo"));
        // One `<name> undef` pair per special character.
        assert_eq!(line.matches("undef").count(), UNBOUND_CHARS.len());
    }

    #[test]
    fn test_all_special_chars_unbound() {
        let line = RawModeSpec.command_line();
        for name in ["intr", "eof", "susp", "discard", "lnext"] {
            assert!(line.contains(&format!("{name} undef")), "missing {name}");
        }
    }

    #[test]
    fn test_signals_and_echo_disabled() {
        let line = RawModeSpec.command_line();
        assert!(line.contains("-isig"));
        assert!(line.contains("-echo"));
        assert!(line.contains("-icrnl"));
    }
}
