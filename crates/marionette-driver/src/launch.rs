//! Builds the composite shell line that launches the target command.
//!
//! The line is typed into the session's shell as keystrokes, so it has to be
//! a single shell command. Every component is quoted individually instead of
//! concatenating caller strings into the line verbatim.

use std::path::Path;

/// Quote one argument for a POSIX shell. Plain words pass through, anything
/// else is single-quoted with embedded quotes escaped as `'\''`.
pub fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '/' | '-' | '_' | '=' | ':'));
    if plain {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', "'\\''"))
}

/// The full launch line: run the command with stdin/stdout/stderr unbuffered,
/// merge stderr into stdout, and duplicate the combined output into the
/// named pipe while it keeps flowing to the pane.
pub fn launch_line(command: &[String], pipe: &Path) -> String {
    let quoted: Vec<String> = command.iter().map(|a| shell_quote(a)).collect();
    format!(
        "stdbuf -i0 -o0 -e0 {} 2>&1 | tee {}",
        quoted.join(" "),
        shell_quote(&pipe.to_string_lossy())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_plain_args_unquoted() {
        assert_eq!(shell_quote("./target/kmaze"), "./target/kmaze");
        assert_eq!(shell_quote("--level=3"), "--level=3");
    }

    #[test]
    fn test_spaces_quoted() {
        assert_eq!(shell_quote("hello world"), "'hello world'");
    }

    #[test]
    fn test_embedded_single_quote() {
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
    }

    #[test]
    fn test_empty_arg_quoted() {
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_launch_line_shape() {
        let cmd = vec!["./read_bytes".to_string(), "a b".to_string()];
        let pipe = PathBuf::from("/tmp/x/cmd_output");
        let line = launch_line(&cmd, &pipe);
        assert_eq!(
            line,
            "stdbuf -i0 -o0 -e0 ./read_bytes 'a b' 2>&1 | tee /tmp/x/cmd_output"
        );
    }

    #[test]
    fn test_launch_line_quotes_hostile_arg() {
        let cmd = vec!["prog".to_string(), "; rm -rf /".to_string()];
        let line = launch_line(&cmd, &PathBuf::from("/tmp/p"));
        assert!(line.contains("'; rm -rf /'"));
    }
}
