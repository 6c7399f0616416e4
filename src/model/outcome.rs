//! Per-file outcomes and the top-level migration result.
//!
//! Defines the data structures that flow through the materialize → diff →
//! merge pipeline and the [`MigrationResult`] handed back to the caller.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tempfile::TempDir;

use super::types::{RelativePath, RevisionId};

// ---------------------------------------------------------------------------
// DiffOutcome
// ---------------------------------------------------------------------------

/// The structured outcome of diffing an ordered pair of files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiffOutcome {
    /// Both files exist with identical content.
    Equal,
    /// Both files exist and differ; carries the textual patch for display.
    Changed(String),
    /// The first file is missing (the pair's second side introduced it).
    AddedOnly,
    /// The second file is missing (the pair's second side removed it).
    DeletedOnly,
    /// The VCS ignore rules cover the file; it is excluded from migration.
    IgnoredByVcs,
}

impl DiffOutcome {
    /// Returns `true` if the two sides are identical.
    #[must_use]
    pub const fn is_equal(&self) -> bool {
        matches!(self, Self::Equal)
    }

    /// Returns `true` for a content change (both sides present, differing).
    #[must_use]
    pub const fn is_changed(&self) -> bool {
        matches!(self, Self::Changed(_))
    }

    /// The patch text, for `Changed` outcomes.
    #[must_use]
    pub fn patch(&self) -> Option<&str> {
        match self {
            Self::Changed(patch) => Some(patch),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// MergedBody
// ---------------------------------------------------------------------------

/// The body of a merged file: textual when both inputs were valid UTF-8,
/// raw bytes otherwise.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MergedBody {
    Text(String),
    Bytes(Vec<u8>),
}

impl MergedBody {
    /// The body as bytes, regardless of representation.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(s) => s.as_bytes(),
            Self::Bytes(b) => b,
        }
    }

    /// Returns `true` for the textual representation.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

// ---------------------------------------------------------------------------
// MergeOutcome
// ---------------------------------------------------------------------------

/// The result of merging one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Path relative to the project root.
    pub local_path: RelativePath,
    /// The merged body (may contain conflict markers).
    pub body: MergedBody,
    /// Whether the VCS reported unresolved hunks.
    pub has_conflict: bool,
}

impl MergeOutcome {
    /// A clean textual merge result.
    #[must_use]
    pub const fn clean(local_path: RelativePath, body: String) -> Self {
        Self {
            local_path,
            body: MergedBody::Text(body),
            has_conflict: false,
        }
    }

    /// A "take target" outcome carrying the target file's raw bytes.
    #[must_use]
    pub const fn take_target(local_path: RelativePath, bytes: Vec<u8>) -> Self {
        Self {
            local_path,
            body: MergedBody::Bytes(bytes),
            has_conflict: false,
        }
    }
}

// ---------------------------------------------------------------------------
// FilePendingMigration
// ---------------------------------------------------------------------------

/// An added or deleted file pending commit to the working directory.
///
/// For additions `source` is the file in the target template to copy from;
/// for deletions it is the base-template copy (kept so the user can inspect
/// what is going away).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilePendingMigration {
    /// Path relative to the project root.
    pub local_path: RelativePath,
    /// Absolute path of the template file backing this entry.
    pub source: PathBuf,
}

impl FilePendingMigration {
    #[must_use]
    pub const fn new(local_path: RelativePath, source: PathBuf) -> Self {
        Self { local_path, source }
    }
}

// ---------------------------------------------------------------------------
// MigrationResult
// ---------------------------------------------------------------------------

/// The top-level output of a migration computation.
///
/// Scratch directories created during the run (SDK clones, generated
/// templates) are owned by `temp_dirs`; the caller releases them with
/// [`MigrationResult::release_temp_dirs`] once the manifest has been
/// consumed, or detaches them with [`MigrationResult::keep_temp_dirs`].
/// Caller-supplied base/target app paths are borrowed and never appear in
/// `temp_dirs`.
#[derive(Debug)]
pub struct MigrationResult {
    /// Per-file merge outcomes, sorted by path.
    pub merge_results: Vec<MergeOutcome>,
    /// Files introduced by the target template, sorted by path.
    pub added_files: Vec<FilePendingMigration>,
    /// Files removed by the target template, sorted by path.
    pub deleted_files: Vec<FilePendingMigration>,
    /// The generated (or caller-supplied) base template directory.
    pub base_template_dir: PathBuf,
    /// The generated (or caller-supplied) target template directory.
    pub target_template_dir: PathBuf,
    /// SDK clone directories keyed by the revision they materialize.
    pub sdk_dirs: BTreeMap<RevisionId, PathBuf>,
    /// Owned scratch directories; dropped (deleted) when released.
    pub temp_dirs: Vec<TempDir>,
}

impl MigrationResult {
    /// Count of merge outcomes carrying conflict markers.
    #[must_use]
    pub fn conflict_count(&self) -> usize {
        self.merge_results.iter().filter(|m| m.has_conflict).count()
    }

    /// Returns `true` if no file needs migrating.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.merge_results.is_empty()
            && self.added_files.is_empty()
            && self.deleted_files.is_empty()
    }

    /// Delete all owned scratch directories.
    ///
    /// # Errors
    /// Returns the first deletion failure; remaining directories are still
    /// dropped (best-effort removal) when the result itself is dropped.
    pub fn release_temp_dirs(&mut self) -> std::io::Result<()> {
        for dir in self.temp_dirs.drain(..) {
            dir.close()?;
        }
        Ok(())
    }

    /// Detach all owned scratch directories, leaving them on disk.
    pub fn keep_temp_dirs(&mut self) {
        for dir in self.temp_dirs.drain(..) {
            let _ = dir.keep();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
