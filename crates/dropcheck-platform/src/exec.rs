//! Blocking execution of platform CLI commands.

use std::path::Path;
use std::process::{Command, Stdio};

use dropcheck_common::error::{DropcheckError, Result};

/// Number of trailing output lines kept in error diagnostics.
const DIAGNOSTIC_LINES: usize = 20;

/// Output from a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Standard output from the command.
    pub stdout: String,
    /// Standard error from the command.
    pub stderr: String,
    /// Exit code returned by the command, `-1` if killed by a signal.
    pub exit_code: i32,
}

impl CommandOutput {
    /// Whether the command exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Tail of the most informative output stream.
    ///
    /// The `cf` client prints `FAILED` reasons on stdout and usage errors on
    /// stderr, so stderr wins only when it is non-empty.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        let text = if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        };
        let lines: Vec<&str> = text.lines().collect();
        let start = lines.len().saturating_sub(DIAGNOSTIC_LINES);
        let tail = lines[start..].join("\n");
        if tail.is_empty() {
            format!("exit code {}", self.exit_code)
        } else {
            tail
        }
    }
}

/// Runs `program` with `args` and extra environment variables, waiting for
/// it to exit. No timeout is applied.
///
/// # Errors
///
/// Returns `DropcheckError::Io` if the process cannot be spawned.
pub fn run_command(
    program: &Path,
    args: &[String],
    envs: &[(String, String)],
) -> Result<CommandOutput> {
    tracing::debug!(program = %program.display(), ?args, "running command");

    let output = Command::new(program)
        .args(args)
        .envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .output()
        .map_err(|e| DropcheckError::Io {
            path: program.to_path_buf(),
            source: e,
        })?;

    let result = CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    };
    tracing::debug!(program = %program.display(), exit_code = result.exit_code, "command finished");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(stdout: &str, stderr: &str, exit_code: i32) -> CommandOutput {
        CommandOutput {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    #[test]
    fn diagnostic_prefers_stderr() {
        let out = output("Creating app...\n", "Incorrect Usage\n", 1);
        assert_eq!(out.diagnostic(), "Incorrect Usage");
    }

    #[test]
    fn diagnostic_falls_back_to_stdout() {
        let out = output("Binding service...\nFAILED\nService not found\n", "  \n", 1);
        assert_eq!(out.diagnostic(), "Binding service...\nFAILED\nService not found");
    }

    #[test]
    fn diagnostic_keeps_only_the_tail() {
        let long: String = (0..50).map(|i| format!("line {i}\n")).collect();
        let out = output(&long, "", 1);
        let diag = out.diagnostic();
        assert_eq!(diag.lines().count(), DIAGNOSTIC_LINES);
        assert!(diag.ends_with("line 49"));
    }

    #[test]
    fn diagnostic_of_silent_failure_names_exit_code() {
        assert_eq!(output("", "", 3).diagnostic(), "exit code 3");
    }

    #[cfg(unix)]
    #[test]
    fn run_command_captures_output_and_env() {
        let out = run_command(
            Path::new("sh"),
            &["-c".into(), "echo \"$GREETING\"; echo oops >&2; exit 4".into()],
            &[("GREETING".into(), "hello".into())],
        )
        .expect("spawn");
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.stderr.trim(), "oops");
        assert_eq!(out.exit_code, 4);
        assert!(!out.success());
    }

    #[test]
    fn run_command_missing_binary_is_io_error() {
        let err = run_command(Path::new("/nonexistent/bin/cf"), &[], &[]).expect_err("fail");
        assert!(matches!(err, DropcheckError::Io { .. }));
    }
}
