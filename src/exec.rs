//! Uniform invocation of external subprocesses.
//!
//! The only place the engine talks to the OS for processes. Commands are run
//! with captured stdout/stderr and exit code; a non-zero exit is never an
//! error here — callers inspect [`ExecOutput::code`] and decide.
//!
//! The [`ProcessRunner`] trait is the seam the whole engine runs through:
//! production uses [`SystemRunner`], tests substitute a scripted fake.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

// ---------------------------------------------------------------------------
// ExecOutput
// ---------------------------------------------------------------------------

/// Captured result of one subprocess invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecOutput {
    /// Captured standard output.
    pub stdout: Vec<u8>,
    /// Captured standard error.
    pub stderr: Vec<u8>,
    /// Exit code; `None` when the process was killed by a signal.
    pub code: Option<i32>,
}

impl ExecOutput {
    /// An empty, successful output (exit code 0).
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            stdout: Vec::new(),
            stderr: Vec::new(),
            code: Some(0),
        }
    }

    /// A successful output carrying stdout bytes.
    #[must_use]
    pub fn ok_with(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: Vec::new(),
            code: Some(0),
        }
    }

    /// A failing output with the given exit code and stderr.
    #[must_use]
    pub fn failed(code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: Vec::new(),
            stderr: stderr.into(),
            code: Some(code),
        }
    }

    /// Returns `true` for exit code 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Standard output decoded lossily as UTF-8.
    #[must_use]
    pub fn stdout_utf8(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    /// Standard error decoded lossily as UTF-8.
    #[must_use]
    pub fn stderr_utf8(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }
}

// ---------------------------------------------------------------------------
// ProcessRunner
// ---------------------------------------------------------------------------

/// Runs a named external command with arguments and an optional working
/// directory.
///
/// Implementations return `Err` only when the process could not be spawned
/// (missing binary, permission); a started process that exits non-zero is a
/// successful `run` whose output carries the code.
pub trait ProcessRunner: Send + Sync {
    /// Run `program` with `args`, optionally inside `cwd`.
    ///
    /// # Errors
    /// Returns an I/O error if the process could not be started.
    fn run(
        &self,
        program: &OsStr,
        args: &[&OsStr],
        cwd: Option<&Path>,
    ) -> std::io::Result<ExecOutput>;
}

/// [`ProcessRunner`] backed by [`std::process::Command`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(
        &self,
        program: &OsStr,
        args: &[&OsStr],
        cwd: Option<&Path>,
    ) -> std::io::Result<ExecOutput> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        let output = cmd.output()?;
        Ok(ExecOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            code: output.status.code(),
        })
    }
}

/// Render a program + args as a single display line for logs and errors.
#[must_use]
pub fn command_line(program: &OsStr, args: &[&OsStr]) -> String {
    let mut line = program.to_string_lossy().into_owned();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}

// ---------------------------------------------------------------------------
// Scripted runner for unit tests
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
