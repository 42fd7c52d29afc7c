//! External command execution.
//!
//! Every git interaction goes through the [`CommandRunner`] trait so workflow
//! logic can be exercised with scripted runners that never spawn a process.

use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, warn};

/// Captured result of a finished external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl Capture {
    /// A successful capture with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            code: Some(0),
        }
    }

    /// A capture that exited with `code`.
    pub fn exit(code: i32, stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            code: Some(code),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Abstraction over spawning external commands.
pub trait CommandRunner {
    /// Run `argv` in `workdir` and capture its output.
    ///
    /// A non-zero exit is reported through the returned [`Capture`], not as
    /// an error; `Err` is reserved for commands that could not be spawned at
    /// all (e.g. git is not installed).
    fn run(&self, argv: &[&str], workdir: &Path) -> Result<Capture>;
}

/// Runner that spawns real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, argv: &[&str], workdir: &Path) -> Result<Capture> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| anyhow!("empty command line"))?;
        debug!(command = %argv.join(" "), "spawning command");
        let output = Command::new(program)
            .args(args)
            .current_dir(workdir)
            .output()
            .with_context(|| format!("spawn `{}`", argv.join(" ")))?;
        let capture = Capture {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            code: output.status.code(),
        };
        debug!(exit_code = ?capture.code, "command finished");
        Ok(capture)
    }
}

/// Run a command that is expected to succeed, returning its stdout.
///
/// On a non-zero exit the error message carries the command line, the
/// captured output, and the exit code, so a failed git step can be diagnosed
/// from the message alone.
pub fn run_checked<R: CommandRunner>(runner: &R, argv: &[&str], workdir: &Path) -> Result<String> {
    let capture = runner.run(argv, workdir)?;
    if !capture.success() {
        warn!(command = %argv.join(" "), exit_code = ?capture.code, "command failed");
        let code = capture
            .code
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        let mut detail = String::new();
        if !capture.stdout.trim().is_empty() {
            detail.push('\n');
            detail.push_str(capture.stdout.trim_end());
        }
        if !capture.stderr.trim().is_empty() {
            detail.push('\n');
            detail.push_str(capture.stderr.trim_end());
        }
        return Err(anyhow!(
            "`{}` exited with code {code}{detail}",
            argv.join(" ")
        ));
    }
    Ok(capture.stdout)
}
