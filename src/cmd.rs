use std::io::Write;
use std::process::{Command, Output, Stdio};

use crate::error::{ProviderError, ProviderResult};

/// Run a command and capture its output. Fails if the command
/// returns a non-zero exit code.
pub fn run(program: &str, args: &[&str]) -> ProviderResult<String> {
    let output = spawn(program, args)?;
    finish(program, args, &output)
}

/// Run a command that pipes its stdin from a byte slice.
pub fn run_with_stdin(program: &str, args: &[&str], stdin_data: &[u8]) -> ProviderResult<String> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| not_found_or_io(program, e))?;

    if let Some(stdin) = &mut child.stdin {
        stdin.write_all(stdin_data)?;
    }
    drop(child.stdin.take());

    let output = child.wait_with_output()?;
    finish(program, args, &output)
}

/// Check if a command exists on PATH.
#[must_use]
pub fn command_exists(program: &str) -> bool {
    Command::new("which")
        .arg(program)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

/// Render a command line for error messages, masking the value of
/// any `Authorization` header.
#[must_use]
pub fn format_command(program: &str, args: &[&str]) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(args.iter().map(|a| {
        if a.to_ascii_lowercase().starts_with("authorization:") {
            "Authorization: <redacted>".to_string()
        } else {
            (*a).to_string()
        }
    }));
    parts.join(" ")
}

fn finish(program: &str, args: &[&str], output: &Output) -> ProviderResult<String> {
    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    tracing::debug!(program, %stderr, "command exited with failure");
    Err(ProviderError::CommandFailed {
        command: format_command(program, args),
        status: output.status,
    })
}

fn spawn(program: &str, args: &[&str]) -> ProviderResult<Output> {
    Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| not_found_or_io(program, e))
}

fn not_found_or_io(program: &str, e: std::io::Error) -> ProviderError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ProviderError::CommandNotFound(program.to_string())
    } else {
        ProviderError::Io(e)
    }
}
