//! Per-path custom mergers.
//!
//! An ordered registry of specialized mergers consulted before the generic
//! VCS merge; first match wins. The only shipped merger handles the project
//! metadata file, whose structured content must be merged semantically —
//! user-set fields survive, new template defaults apply.

use std::fs;
use std::path::Path;

use tracing::warn;

use crate::metadata::{MigrateMetadata, METADATA_FILE};
use crate::model::outcome::{MergeOutcome, MergedBody};
use crate::model::types::RelativePath;

// ---------------------------------------------------------------------------
// CustomMerger
// ---------------------------------------------------------------------------

/// A specialized merge for one particular path.
pub trait CustomMerger: Send + Sync {
    /// Returns `true` if this merger handles `path`.
    fn matches(&self, path: &RelativePath) -> bool;

    /// Merge `current` against `target` (with `base` available for context).
    ///
    /// Returns `None` when the inputs cannot be read at all; the caller
    /// skips the file.
    fn merge(
        &self,
        local_path: &RelativePath,
        current: &Path,
        base: &Path,
        target: &Path,
    ) -> Option<MergeOutcome>;
}

/// The ordered merger registry; first match wins.
pub struct CustomMergeRegistry {
    mergers: Vec<Box<dyn CustomMerger>>,
}

impl CustomMergeRegistry {
    /// The default registry: the metadata-file merger only.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            mergers: vec![Box::new(MetadataMerger)],
        }
    }

    /// An empty registry.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            mergers: Vec::new(),
        }
    }

    /// Append a merger (consulted after the existing ones).
    pub fn push(&mut self, merger: Box<dyn CustomMerger>) {
        self.mergers.push(merger);
    }

    /// The first merger matching `path`, if any.
    #[must_use]
    pub fn find(&self, path: &RelativePath) -> Option<&dyn CustomMerger> {
        self.mergers
            .iter()
            .find(|m| m.matches(path))
            .map(Box::as_ref)
    }
}

// ---------------------------------------------------------------------------
// MetadataMerger
// ---------------------------------------------------------------------------

/// Semantic merge for the `.migrate_config` metadata file.
///
/// The user's unmanaged paths and platform entries are preserved; the
/// target's version revision and any platforms it introduces are applied.
pub struct MetadataMerger;

impl CustomMerger for MetadataMerger {
    fn matches(&self, path: &RelativePath) -> bool {
        path.as_str() == METADATA_FILE
    }

    fn merge(
        &self,
        local_path: &RelativePath,
        current: &Path,
        _base: &Path,
        target: &Path,
    ) -> Option<MergeOutcome> {
        let target_bytes = match fs::read(target) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(path = %local_path, error = %err, "cannot read target metadata; skipping");
                return None;
            }
        };

        let Some(current_meta) = parse_metadata(current, local_path) else {
            // Unparseable user metadata: take the target wholesale.
            return Some(MergeOutcome::take_target(
                local_path.clone(),
                target_bytes,
            ));
        };
        let Some(target_meta) = parse_metadata(target, local_path) else {
            return Some(MergeOutcome::take_target(
                local_path.clone(),
                target_bytes,
            ));
        };

        let mut merged = current_meta;
        merged.version_revision = target_meta.version_revision;
        for (platform, entry) in target_meta.platforms {
            merged.platforms.entry(platform).or_insert(entry);
        }

        match serde_yaml::to_string(&merged) {
            Ok(yaml) => Some(MergeOutcome {
                local_path: local_path.clone(),
                body: MergedBody::Text(yaml),
                has_conflict: false,
            }),
            Err(err) => {
                warn!(path = %local_path, error = %err, "metadata serialization failed; taking target");
                Some(MergeOutcome::take_target(local_path.clone(), target_bytes))
            }
        }
    }
}

fn parse_metadata(path: &Path, local_path: &RelativePath) -> Option<MigrateMetadata> {
    let content = fs::read_to_string(path).ok()?;
    match serde_yaml::from_str(&content) {
        Ok(meta) => Some(meta),
        Err(err) => {
            warn!(path = %local_path, error = %err, "metadata does not parse");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
