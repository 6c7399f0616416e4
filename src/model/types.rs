//! Core identifier types for the migration engine.
//!
//! Foundation types used throughout uplift: toolkit revision identifiers,
//! project-relative paths, platform tags, and merge-type selection.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RevisionId
// ---------------------------------------------------------------------------

/// An opaque toolkit revision identifier (conceptually a content hash).
///
/// Equality is identity: two revisions are the same toolkit version iff their
/// identifiers are equal. Validated to be non-empty, at most 64 characters,
/// and free of whitespace and control characters.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RevisionId(String);

impl RevisionId {
    /// The maximum length of a revision identifier.
    pub const MAX_LEN: usize = 64;

    /// Create a new `RevisionId` from a string, validating format.
    ///
    /// # Errors
    /// Returns an error if the string is empty, too long, or contains
    /// whitespace or non-printable characters.
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        Self::validate(s)?;
        Ok(Self(s.to_owned()))
    }

    /// Return the revision identifier as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), ValidationError> {
        if s.is_empty() {
            return Err(ValidationError {
                kind: ErrorKind::RevisionId,
                value: s.to_owned(),
                reason: "revision must not be empty".to_owned(),
            });
        }
        if s.len() > Self::MAX_LEN {
            return Err(ValidationError {
                kind: ErrorKind::RevisionId,
                value: s.to_owned(),
                reason: format!(
                    "revision must be at most {} characters, got {}",
                    Self::MAX_LEN,
                    s.len()
                ),
            });
        }
        if !s.chars().all(|c| c.is_ascii_graphic()) {
            return Err(ValidationError {
                kind: ErrorKind::RevisionId,
                value: s.to_owned(),
                reason: "revision must contain only printable ASCII without spaces".to_owned(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RevisionId {
    type Err = ValidationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RevisionId {
    type Error = ValidationError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::validate(&s)?;
        Ok(Self(s))
    }
}

impl From<RevisionId> for String {
    fn from(rev: RevisionId) -> Self {
        rev.0
    }
}

// ---------------------------------------------------------------------------
// RelativePath
// ---------------------------------------------------------------------------

/// A path relative to a project root, using forward slashes.
///
/// The canonical key used throughout the engine. Never absolute, never
/// contains `..`, never empty. Backslashes are normalized to forward slashes
/// at construction so Windows listings and metadata entries compare equal.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelativePath(String);

impl RelativePath {
    /// Create a new `RelativePath`, validating and normalizing separators.
    ///
    /// # Errors
    /// Returns an error if the path is empty, absolute, or contains a `..`
    /// component.
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let normalized = s.replace('\\', "/");
        Self::validate(&normalized)?;
        Ok(Self(normalized))
    }

    /// Build a `RelativePath` from a filesystem path relative to `root`.
    ///
    /// # Errors
    /// Returns an error if `path` is not under `root` or fails validation.
    pub fn from_base(root: &Path, path: &Path) -> Result<Self, ValidationError> {
        let rel = path.strip_prefix(root).map_err(|_| ValidationError {
            kind: ErrorKind::RelativePath,
            value: path.display().to_string(),
            reason: format!("path is not under {}", root.display()),
        })?;
        let joined = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        Self::new(&joined)
    }

    /// Return the path as a forward-slash string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve this relative path under a root directory.
    #[must_use]
    pub fn join_under(&self, root: &Path) -> std::path::PathBuf {
        let mut out = root.to_path_buf();
        for part in self.0.split('/') {
            out.push(part);
        }
        out
    }

    /// Returns `true` if this path equals `prefix` or lies under it.
    ///
    /// `prefix` may carry a trailing `/`; matching is component-wise, so
    /// `foo/bar` is under `foo/` but `foobar` is not.
    #[must_use]
    pub fn starts_with_dir(&self, prefix: &str) -> bool {
        let prefix = prefix.trim_end_matches('/');
        if prefix.is_empty() {
            return false;
        }
        self.0 == prefix
            || (self.0.len() > prefix.len()
                && self.0.starts_with(prefix)
                && self.0.as_bytes()[prefix.len()] == b'/')
    }

    /// Return the file extension (without the dot), if any.
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        let name = self.0.rsplit('/').next()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() {
            return None;
        }
        Some(ext)
    }

    fn validate(s: &str) -> Result<(), ValidationError> {
        if s.is_empty() {
            return Err(ValidationError {
                kind: ErrorKind::RelativePath,
                value: s.to_owned(),
                reason: "path must not be empty".to_owned(),
            });
        }
        if s.starts_with('/') || s.contains(':') {
            return Err(ValidationError {
                kind: ErrorKind::RelativePath,
                value: s.to_owned(),
                reason: "path must be relative".to_owned(),
            });
        }
        if s.split('/').any(|part| part == "..") {
            return Err(ValidationError {
                kind: ErrorKind::RelativePath,
                value: s.to_owned(),
                reason: "path must not contain '..' components".to_owned(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RelativePath {
    type Err = ValidationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RelativePath {
    type Error = ValidationError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl From<RelativePath> for String {
    fn from(p: RelativePath) -> Self {
        p.0
    }
}

// ---------------------------------------------------------------------------
// PlatformTag
// ---------------------------------------------------------------------------

/// A scaffold platform. `Root` is a pseudo-platform for the top-level,
/// platform-agnostic template files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformTag {
    /// Top-level platform-agnostic template files.
    Root,
    Android,
    Ios,
    Macos,
    Linux,
    Windows,
    Web,
}

impl PlatformTag {
    /// All platforms, root first.
    pub const ALL: [Self; 7] = [
        Self::Root,
        Self::Android,
        Self::Ios,
        Self::Macos,
        Self::Linux,
        Self::Windows,
        Self::Web,
    ];

    /// Returns `true` for the root pseudo-platform.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        matches!(self, Self::Root)
    }

    /// The tag as it appears in metadata files and `--platforms` lists.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Android => "android",
            Self::Ios => "ios",
            Self::Macos => "macos",
            Self::Linux => "linux",
            Self::Windows => "windows",
            Self::Web => "web",
        }
    }
}

impl fmt::Display for PlatformTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformTag {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "root" => Ok(Self::Root),
            "android" => Ok(Self::Android),
            "ios" => Ok(Self::Ios),
            "macos" => Ok(Self::Macos),
            "linux" => Ok(Self::Linux),
            "windows" => Ok(Self::Windows),
            "web" => Ok(Self::Web),
            _ => Err(ValidationError {
                kind: ErrorKind::PlatformTag,
                value: s.to_owned(),
                reason:
                    "unknown platform (expected one of: root, android, ios, macos, linux, windows, web)"
                        .to_owned(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// MergeType
// ---------------------------------------------------------------------------

/// How a file should be merged: with or without a common ancestor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MergeType {
    /// Merge `(current, target)` without a common ancestor.
    #[default]
    TwoWay,
    /// Merge `(base, current, target)` using the base as common ancestor.
    ThreeWay,
}

impl fmt::Display for MergeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TwoWay => write!(f, "two-way"),
            Self::ThreeWay => write!(f, "three-way"),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// The kind of value that failed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A [`RevisionId`] validation error.
    RevisionId,
    /// A [`RelativePath`] validation error.
    RelativePath,
    /// A [`PlatformTag`] validation error.
    PlatformTag,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RevisionId => write!(f, "RevisionId"),
            Self::RelativePath => write!(f, "RelativePath"),
            Self::PlatformTag => write!(f, "PlatformTag"),
        }
    }
}

/// A validation error for uplift core types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
    /// What kind of value was being validated.
    pub kind: ErrorKind,
    /// The invalid value.
    pub value: String,
    /// Human-readable explanation.
    pub reason: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid {}: {:?} — {}",
            self.kind, self.value, self.reason
        )
    }
}

impl std::error::Error for ValidationError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
