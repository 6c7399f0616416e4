//! The explicit engine environment.
//!
//! Everything the orchestrator needs from the outside world — the process
//! runner, the installed toolkit, and the cancellation flag — travels in a
//! [`MigrateEnv`] value passed to the orchestrator. No process-wide
//! singletons.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::exec::{ProcessRunner, SystemRunner};
use crate::model::types::RevisionId;

// ---------------------------------------------------------------------------
// ToolkitInstall
// ---------------------------------------------------------------------------

/// The host-located toolkit installation.
#[derive(Clone, Debug)]
pub struct ToolkitInstall {
    /// Root directory of the installed SDK.
    pub root: PathBuf,
    /// The currently installed framework revision.
    pub revision: RevisionId,
}

impl ToolkitInstall {
    #[must_use]
    pub const fn new(root: PathBuf, revision: RevisionId) -> Self {
        Self { root, revision }
    }

    /// Path of the toolkit executable inside an SDK root.
    #[must_use]
    pub fn bin_for(sdk_root: &Path) -> PathBuf {
        sdk_root.join("bin").join("sdk")
    }

    /// Path of this installation's toolkit executable.
    #[must_use]
    pub fn bin(&self) -> PathBuf {
        Self::bin_for(&self.root)
    }
}

// ---------------------------------------------------------------------------
// CancelFlag
// ---------------------------------------------------------------------------

/// A shared cancellation signal, checked by the orchestrator at every stage
/// boundary. Cloning shares the underlying flag.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// MigrateEnv
// ---------------------------------------------------------------------------

/// The engine environment: process runner, toolkit install, cancel flag.
#[derive(Clone)]
pub struct MigrateEnv {
    /// Subprocess seam; tests substitute a scripted runner.
    pub runner: Arc<dyn ProcessRunner>,
    /// The installed toolkit the host located.
    pub install: ToolkitInstall,
    /// Cooperative cancellation signal.
    pub cancel: CancelFlag,
}

impl MigrateEnv {
    /// A production environment using the system process runner.
    #[must_use]
    pub fn new(install: ToolkitInstall) -> Self {
        Self {
            runner: Arc::new(SystemRunner),
            install,
            cancel: CancelFlag::new(),
        }
    }

    /// Replace the process runner (used by tests).
    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }
}

impl std::fmt::Debug for MigrateEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrateEnv")
            .field("install", &self.install)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
