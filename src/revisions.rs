//! Revision resolution.
//!
//! Maps the project's recorded per-platform base revisions to a
//! de-duplicated, ordered list of revisions to materialize. The root
//! platform's revision always comes first so platform-specific scaffolds
//! overlay onto a consistent root; the remainder are sorted for
//! reproducibility.

use std::collections::BTreeMap;

use crate::metadata::{MigrateConfig, PlatformConfig};
use crate::model::types::RevisionId;

/// Output of revision resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedRevisions {
    /// Revisions to materialize, root-platform revision first when defined.
    pub revisions: Vec<RevisionId>,
    /// The platforms each revision must generate.
    pub revision_to_configs: BTreeMap<RevisionId, Vec<PlatformConfig>>,
}

/// Resolve the revisions to materialize for a migration run.
///
/// With `base_override` set, every configured platform maps to that single
/// revision. Otherwise each platform resolves to its recorded base revision,
/// falling back to `fallback` when absent.
#[must_use]
pub fn resolve_revisions(
    config: &MigrateConfig,
    fallback: &RevisionId,
    base_override: Option<&RevisionId>,
) -> ResolvedRevisions {
    if let Some(base) = base_override {
        let configs: Vec<PlatformConfig> = config.platform_configs.values().cloned().collect();
        let mut revision_to_configs = BTreeMap::new();
        revision_to_configs.insert(base.clone(), configs);
        return ResolvedRevisions {
            revisions: vec![base.clone()],
            revision_to_configs,
        };
    }

    let mut revision_to_configs: BTreeMap<RevisionId, Vec<PlatformConfig>> = BTreeMap::new();
    let mut root_revision: Option<RevisionId> = None;

    for pc in config.platform_configs.values() {
        let effective = pc.base_revision.clone().unwrap_or_else(|| fallback.clone());
        if pc.platform.is_root() {
            root_revision = Some(effective.clone());
        }
        revision_to_configs
            .entry(effective)
            .or_default()
            .push(pc.clone());
    }

    // BTreeMap keys are already deduplicated and sorted; pull the root
    // revision to the front.
    let mut revisions: Vec<RevisionId> = revision_to_configs
        .keys()
        .filter(|rev| Some(*rev) != root_revision.as_ref())
        .cloned()
        .collect();
    if let Some(root) = root_revision {
        revisions.insert(0, root);
    }

    ResolvedRevisions {
        revisions,
        revision_to_configs,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
