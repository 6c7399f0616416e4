//! The working directory and its manifest index.
//!
//! The engine never mutates the user's project tree: every merged,
//! conflicted, or added file is staged under
//! `<project>/migrate_working_dir/` at its original relative path, next to a
//! `manifest.json` index. The manifest is the contract consumed by `status`
//! and `apply`. Writes are atomic (write-to-temp + fsync + rename) so a
//! crash never leaves a truncated manifest.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::MigrateError;
use crate::fsutil::{copy_creating_dirs, write_creating_dirs};
use crate::model::outcome::MigrationResult;
use crate::model::types::RelativePath;

/// Name of the staging directory under the project root.
pub const WORKING_DIR_NAME: &str = "migrate_working_dir";

/// Name of the manifest index inside the working directory.
pub const MANIFEST_FILE: &str = "manifest.json";

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// The manifest index: every staged file by classification, in stable
/// (sorted) order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Files merged without conflict.
    pub merged_files: Vec<RelativePath>,
    /// Files whose merged body carries conflict markers.
    pub conflict_files: Vec<RelativePath>,
    /// Files introduced by the target template.
    pub added_files: Vec<RelativePath>,
    /// Files removed by the target template.
    pub deleted_files: Vec<RelativePath>,
}

impl Manifest {
    /// Build a manifest from a migration result. Lists are sorted.
    #[must_use]
    pub fn from_result(result: &MigrationResult) -> Self {
        let mut merged_files = Vec::new();
        let mut conflict_files = Vec::new();
        for outcome in &result.merge_results {
            if outcome.has_conflict {
                conflict_files.push(outcome.local_path.clone());
            } else {
                merged_files.push(outcome.local_path.clone());
            }
        }
        let mut added_files: Vec<RelativePath> = result
            .added_files
            .iter()
            .map(|f| f.local_path.clone())
            .collect();
        let mut deleted_files: Vec<RelativePath> = result
            .deleted_files
            .iter()
            .map(|f| f.local_path.clone())
            .collect();

        merged_files.sort();
        conflict_files.sort();
        added_files.sort();
        deleted_files.sort();

        Self {
            merged_files,
            conflict_files,
            added_files,
            deleted_files,
        }
    }

    /// Returns `true` when no staged file carries conflicts.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.conflict_files.is_empty()
    }

    /// Total number of indexed paths.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.merged_files.len()
            + self.conflict_files.len()
            + self.added_files.len()
            + self.deleted_files.len()
    }

    /// The working directory for a project root.
    #[must_use]
    pub fn working_dir(project_root: &Path) -> PathBuf {
        project_root.join(WORKING_DIR_NAME)
    }

    /// The manifest path inside a working directory.
    #[must_use]
    pub fn path_for(working_dir: &Path) -> PathBuf {
        working_dir.join(MANIFEST_FILE)
    }

    /// Write the manifest atomically: temp file in the same directory,
    /// fsync, rename.
    ///
    /// # Errors
    /// Returns [`MigrateError::Io`] on I/O failure.
    pub fn write_atomic(&self, working_dir: &Path) -> Result<(), MigrateError> {
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            MigrateError::MetadataError {
                path: Self::path_for(working_dir),
                detail: err.to_string(),
            }
        })?;

        fs::create_dir_all(working_dir)?;
        let tmp_path = working_dir.join(".manifest.tmp");
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp_path, Self::path_for(working_dir))?;
        Ok(())
    }

    /// Read a manifest from a working directory.
    ///
    /// # Errors
    /// Returns [`MigrateError::Io`] when the file is missing or unreadable,
    /// [`MigrateError::MetadataError`] when it does not parse.
    pub fn read(working_dir: &Path) -> Result<Self, MigrateError> {
        let path = Self::path_for(working_dir);
        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|err| MigrateError::MetadataError {
            path,
            detail: err.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Working directory writer
// ---------------------------------------------------------------------------

/// Serialize a migration result as an on-disk working directory the user can
/// inspect: merge bodies, copies of added files, and the manifest index.
///
/// # Errors
/// Returns [`MigrateError::Io`] on write failure.
pub fn write_working_directory(
    result: &MigrationResult,
    project_root: &Path,
) -> Result<Manifest, MigrateError> {
    let working_dir = Manifest::working_dir(project_root);
    fs::create_dir_all(&working_dir)?;

    for outcome in &result.merge_results {
        let dst = outcome.local_path.join_under(&working_dir);
        write_creating_dirs(&dst, outcome.body.as_bytes())?;
    }

    for added in &result.added_files {
        let dst = added.local_path.join_under(&working_dir);
        copy_creating_dirs(&added.source, &dst)?;
    }

    let manifest = Manifest::from_result(result);
    manifest.write_atomic(&working_dir)?;
    Ok(manifest)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
