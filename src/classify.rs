//! Pure predicates over project-relative paths.
//!
//! Three questions the pipeline asks about every path: is it on the static
//! always-user-owned skip list, is it a binary-ish extension that must be
//! replaced wholesale instead of text-merged, and has the user declared it
//! unmanaged in the metadata file.

use crate::model::types::RelativePath;

/// Files that are always user-owned and never overwritten, regardless of
/// configuration: the application entry file, IDE-owned project files, and
/// the README.
const SKIPPED_FILES: &[&str] = &[
    "lib/main.kt",
    "ios/Runner.xcodeproj/project.pbxproj",
    "README.md",
];

/// Directories whose entire contents are user-owned: VCS metadata, the
/// toolkit's build cache, app sources, tests, and assets.
const SKIPPED_DIRS: &[&str] = &[".git", ".build_cache", "src", "test", "assets"];

/// Extensions replaced wholesale rather than text-merged.
const SKIP_MERGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// Returns `true` if `path` is on the fixed always-skip list.
#[must_use]
pub fn is_statically_skipped(path: &RelativePath) -> bool {
    SKIPPED_FILES.iter().any(|f| path.as_str() == *f)
        || SKIPPED_DIRS.iter().any(|d| path.starts_with_dir(d))
}

/// Returns `true` for file extensions that should be replaced wholesale
/// rather than text-merged.
#[must_use]
pub fn is_skip_merge(path: &RelativePath) -> bool {
    path.extension()
        .is_some_and(|ext| SKIP_MERGE_EXTENSIONS.iter().any(|s| ext.eq_ignore_ascii_case(s)))
}

/// Returns `true` if `path` is listed in `unmanaged` directly, or lies under
/// an entry with a trailing separator (a directory designation).
#[must_use]
pub fn is_unmanaged(path: &RelativePath, unmanaged: &[RelativePath]) -> bool {
    unmanaged.iter().any(|entry| {
        if entry.as_str().ends_with('/') {
            path.starts_with_dir(entry.as_str())
        } else {
            path == entry
        }
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
