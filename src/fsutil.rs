//! Small filesystem helpers shared by the pipeline stages.

use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::model::types::RelativePath;

/// Recursively list the files under `root` as sorted [`RelativePath`]s.
///
/// The VCS metadata directory is excluded — the engine initializes repos in
/// template and project trees, and `.git` contents are never migration
/// inputs. Entries that cannot be expressed as valid relative paths are
/// skipped.
#[must_use]
pub fn list_files(root: &Path) -> Vec<RelativePath> {
    let mut files: Vec<RelativePath> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git")
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| RelativePath::from_base(root, e.path()).ok())
        .collect();
    files.sort();
    files
}

/// Copy `src` to `dst`, creating parent directories as needed.
///
/// # Errors
/// Returns any underlying I/O error.
pub fn copy_creating_dirs(src: &Path, dst: &Path) -> std::io::Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dst)?;
    Ok(())
}

/// Write `bytes` to `dst`, creating parent directories as needed.
///
/// # Errors
/// Returns any underlying I/O error.
pub fn write_creating_dirs(dst: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(dst, bytes)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
