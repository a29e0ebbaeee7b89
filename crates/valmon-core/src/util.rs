//! Helper utilities shared across collectors.

use std::io;
use std::process::Command;

/// Runs a local command and returns its stdout as UTF-8 text.
///
/// A non-zero exit status is an error carrying the (truncated) stderr,
/// so callers can log what the tool actually complained about.
pub fn run_command(program: &str, args: &[&str]) -> io::Result<String> {
    let output = Command::new(program).args(args).output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        let short: String = stderr.chars().take(200).collect();
        return Err(io::Error::other(format!(
            "{} exited with {}: {}",
            program, output.status, short
        )));
    }

    String::from_utf8(output.stdout)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "non-utf8 command output"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_command_captures_stdout() {
        let out = run_command("echo", &["hello"]).unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[test]
    fn test_run_command_missing_program() {
        assert!(run_command("definitely-not-a-real-binary-xyz", &[]).is_err());
    }

    #[test]
    fn test_run_command_nonzero_exit() {
        let err = run_command("sh", &["-c", "echo boom >&2; exit 3"]).unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
