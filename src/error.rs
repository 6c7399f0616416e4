//! Error types for the migration engine.
//!
//! Defines [`MigrateError`], the unified error type for whole-run failures.
//! Error messages are designed to be user-actionable: each variant includes
//! a clear description of what went wrong and guidance on how to fix it.
//!
//! Per-file diff/merge failures never surface here — they degrade to
//! "take target" or are skipped (and logged) inside the pipeline.

use std::fmt;
use std::path::PathBuf;

use crate::model::types::RevisionId;

// ---------------------------------------------------------------------------
// MigrateError
// ---------------------------------------------------------------------------

/// Unified error type for migration runs.
#[derive(Debug)]
pub enum MigrateError {
    /// A prior working directory exists; the user must resolve or abandon it.
    WorkingDirExists {
        /// The working directory path that is in the way.
        path: PathBuf,
    },

    /// The project is not an app-shaped scaffold (e.g. a module or plugin).
    NotAnAppProject {
        /// Why the project shape is unsupported.
        detail: String,
    },

    /// A revision could not be materialized after the full fallback chain.
    RevisionUnavailable {
        /// The revision originally requested.
        revision: RevisionId,
    },

    /// An external command failed in a way the engine cannot recover from.
    SubprocessFailed {
        /// The command line that was run.
        command: String,
        /// The process exit code, when the process started.
        exit_code: Option<i32>,
        /// Captured stderr (may be truncated).
        stderr: String,
    },

    /// The project metadata file could not be loaded or parsed.
    MetadataError {
        /// Path to the metadata file.
        path: PathBuf,
        /// Human-readable description of the problem.
        detail: String,
    },

    /// The run was cancelled by the caller.
    Cancelled,

    /// An I/O error occurred outside the per-file degrade path.
    Io(std::io::Error),
}

impl MigrateError {
    /// Returns `true` for errors the user can recover from without retrying
    /// blindly (pre-flight conflicts, unsupported project shapes).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::WorkingDirExists { .. } | Self::NotAnAppProject { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Display — actionable error messages
// ---------------------------------------------------------------------------

impl fmt::Display for MigrateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WorkingDirExists { path } => {
                write!(
                    f,
                    "a migration working directory already exists at {}.\n  To fix: finish the in-progress migration with `uplift apply`, or discard it:\n    uplift abandon",
                    path.display()
                )
            }
            Self::NotAnAppProject { detail } => {
                write!(
                    f,
                    "this project cannot be migrated: {detail}\n  Only app-shaped scaffolds are supported (modules and plugins are not)."
                )
            }
            Self::RevisionUnavailable { revision } => {
                write!(
                    f,
                    "toolkit revision '{revision}' could not be materialized, and the fallback chain is exhausted.\n  To fix: check that the revision exists and the SDK source is reachable, or pass an explicit base revision."
                )
            }
            Self::SubprocessFailed {
                command,
                exit_code,
                stderr,
            } => {
                write!(f, "command failed: {command}")?;
                if let Some(code) = exit_code {
                    write!(f, " (exit {code})")?;
                }
                if !stderr.is_empty() {
                    write!(f, "\n  stderr: {stderr}")?;
                }
                Ok(())
            }
            Self::MetadataError { path, detail } => {
                write!(
                    f,
                    "metadata error in '{}': {}\n  To fix: edit the metadata file and correct the issue.",
                    path.display(),
                    detail
                )
            }
            Self::Cancelled => write!(f, "migration cancelled"),
            Self::Io(err) => {
                write!(
                    f,
                    "I/O error: {err}\n  To fix: check file permissions and disk space."
                )
            }
        }
    }
}

impl std::error::Error for MigrateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MigrateError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
