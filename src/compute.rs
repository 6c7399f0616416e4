//! The compute orchestrator.
//!
//! Drives the pipeline end-to-end: pre-flight, config + fallback resolution,
//! revision resolution, template materialization, repo initialization, file
//! classification, per-file merge decisions, and result assembly.
//!
//! Stages run sequentially; within the classification and decision stages
//! the per-file work is independent and runs on a rayon pool. Stage
//! boundaries are barriers — all diffs complete before any merge starts,
//! because the merge mode depends on the diff map. Output collections are
//! sorted by path so sequential and parallel runs produce identical results.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tempfile::TempDir;
use tracing::{debug, info};

use crate::classify::{is_skip_merge, is_statically_skipped, is_unmanaged};
use crate::custom::CustomMergeRegistry;
use crate::env::MigrateEnv;
use crate::error::MigrateError;
use crate::fsutil::list_files;
use crate::git;
use crate::manifest::Manifest;
use crate::metadata::{
    detect_platforms, MigrateConfig, MigrateMetadata, PlatformConfig, ProjectProbe,
};
use crate::model::outcome::{
    DiffOutcome, FilePendingMigration, MergeOutcome, MergedBody, MigrationResult,
};
use crate::model::types::{MergeType, PlatformTag, RelativePath, RevisionId};
use crate::revisions::resolve_revisions;
use crate::template::TemplateMaterializer;

// ---------------------------------------------------------------------------
// ComputeOptions
// ---------------------------------------------------------------------------

/// Caller-facing knobs for a migration computation.
#[derive(Debug, Default)]
pub struct ComputeOptions {
    /// Emit per-stage progress at info level.
    pub verbose: bool,
    /// Use this directory as the base template instead of generating one.
    /// Borrowed: never released by the engine.
    pub base_app_path: Option<PathBuf>,
    /// Use this directory as the target template instead of generating one.
    /// Borrowed: never released by the engine.
    pub target_app_path: Option<PathBuf>,
    /// Treat every platform as scaffolded from this revision.
    pub base_revision: Option<RevisionId>,
    /// Migrate to this revision instead of the installed one.
    pub target_revision: Option<RevisionId>,
    /// Hand scratch directories to the result for release (`true`), or
    /// detach them so they stay on disk for inspection (`false`).
    pub delete_temp_directories: bool,
    /// Restrict the run to these platforms.
    pub platforms: Option<Vec<PlatformTag>>,
    /// Force two-way merges everywhere.
    pub prefer_two_way: bool,
}

impl ComputeOptions {
    /// Options for a standard run: generate everything, release scratch
    /// space afterwards.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            delete_temp_directories: true,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// compute_migration
// ---------------------------------------------------------------------------

/// Compute a migration for the project at `project_root`.
///
/// The project tree is never mutated beyond `git init` (needed for ignore
/// queries); all output is carried in the returned [`MigrationResult`] until
/// [`crate::manifest::write_working_directory`] stages it.
///
/// # Errors
/// See [`MigrateError`]: a pre-existing working directory and an unsupported
/// project shape are recoverable; an exhausted revision fallback chain is
/// fatal; per-file diff/merge failures degrade and never abort.
pub fn compute_migration(
    env: &MigrateEnv,
    project_root: &Path,
    options: &ComputeOptions,
) -> Result<MigrationResult, MigrateError> {
    // 1. Pre-flight: refuse to trample an in-progress migration.
    let working_dir = Manifest::working_dir(project_root);
    if working_dir.exists() {
        return Err(MigrateError::WorkingDirExists { path: working_dir });
    }

    // 2. Config and fallback.
    let metadata = MigrateMetadata::load(project_root)?;
    let probe = ProjectProbe::probe(project_root)?;
    let fallback = metadata
        .version_revision
        .clone()
        .unwrap_or_else(|| env.install.revision.clone());
    let target_revision = options
        .target_revision
        .clone()
        .unwrap_or_else(|| env.install.revision.clone());
    let platforms = choose_platforms(&metadata, options, project_root);
    let config = effective_config(&metadata, &platforms);
    if options.verbose {
        info!(
            app = %probe.app_name,
            target = %target_revision,
            platforms = ?platforms,
            "computing migration"
        );
    }
    check_cancel(env)?;

    // 3. Resolve revisions.
    let resolved = resolve_revisions(&config, &fallback, options.base_revision.as_ref());
    debug!(revisions = ?resolved.revisions, "resolved base revisions");

    // 4 + 5. Materialize base and target templates.
    let mut materializer = TemplateMaterializer::new(env, &probe, target_revision.clone());
    let mut owned_dirs: Vec<TempDir> = Vec::new();

    let base_dir = match &options.base_app_path {
        Some(path) => path.clone(),
        None => {
            let scratch = TempDir::new()?;
            let dir = scratch.path().to_path_buf();
            owned_dirs.push(scratch);
            for revision in &resolved.revisions {
                check_cancel(env)?;
                let configs = &resolved.revision_to_configs[revision];
                materializer.generate_base(&dir, revision, &fallback, configs)?;
            }
            dir
        }
    };
    check_cancel(env)?;

    let target_dir = match &options.target_app_path {
        Some(path) => path.clone(),
        None => {
            let scratch = TempDir::new()?;
            let dir = scratch.path().to_path_buf();
            owned_dirs.push(scratch);
            materializer.generate_target(&dir, &platforms)?;
            dir
        }
    };
    check_cancel(env)?;

    let (merge_type_map, sdk_dirs, sdk_temp_dirs) = materializer.into_parts();
    owned_dirs.extend(sdk_temp_dirs);

    // 6. Initialize repos so diff/merge and ignore queries work.
    let runner = env.runner.as_ref();
    git::init_repo(runner, &base_dir)?;
    git::init_repo(runner, &target_dir)?;
    git::init_repo(runner, project_root)?;
    check_cancel(env)?;

    // 7. Classify template files: base ↔ target diff map + added files.
    let base_files = list_files(&base_dir);
    let target_files = list_files(&target_dir);
    let project_files = list_files(project_root);

    let diff_entries: Vec<(RelativePath, DiffOutcome)> = base_files
        .par_iter()
        .filter(|path| !is_statically_skipped(path))
        .map(|path| {
            let outcome = if git::check_ignore(runner, &base_dir, path) {
                DiffOutcome::IgnoredByVcs
            } else {
                git::diff_files(
                    runner,
                    &path.join_under(&base_dir),
                    &path.join_under(&target_dir),
                )
            };
            (path.clone(), outcome)
        })
        .collect();
    let mut diff_map: BTreeMap<RelativePath, DiffOutcome> = diff_entries.into_iter().collect();

    let mut added_files: Vec<FilePendingMigration> = Vec::new();
    for path in &target_files {
        if diff_map.contains_key(path) || is_statically_skipped(path) {
            continue;
        }
        diff_map.insert(path.clone(), DiffOutcome::AddedOnly);
        // Only record as added when the project does not already carry the
        // path; otherwise the per-file decision below owns it.
        if !path.join_under(project_root).exists() {
            added_files.push(FilePendingMigration::new(
                path.clone(),
                path.join_under(&target_dir),
            ));
        }
    }
    if options.verbose {
        info!(
            template_files = diff_map.len(),
            project_files = project_files.len(),
            "classified template trees"
        );
    }
    check_cancel(env)?;

    // 8. Per-project-file decisions.
    let registry = CustomMergeRegistry::standard();
    let decisions: Vec<Decision> = project_files
        .par_iter()
        .filter_map(|path| {
            decide_file(
                runner,
                path,
                project_root,
                &base_dir,
                &target_dir,
                &diff_map,
                &merge_type_map,
                &config,
                &registry,
                options.prefer_two_way,
            )
        })
        .collect();
    check_cancel(env)?;

    // 9. Assemble.
    let mut merge_results: Vec<MergeOutcome> = Vec::new();
    let mut deleted_files: Vec<FilePendingMigration> = Vec::new();
    for decision in decisions {
        match decision {
            Decision::Merge(outcome) => merge_results.push(outcome),
            Decision::Delete(pending) => deleted_files.push(pending),
        }
    }
    merge_results.sort_by(|a, b| a.local_path.cmp(&b.local_path));
    added_files.sort_by(|a, b| a.local_path.cmp(&b.local_path));
    deleted_files.sort_by(|a, b| a.local_path.cmp(&b.local_path));

    let mut result = MigrationResult {
        merge_results,
        added_files,
        deleted_files,
        base_template_dir: base_dir,
        target_template_dir: target_dir,
        sdk_dirs,
        temp_dirs: owned_dirs,
    };
    if !options.delete_temp_directories {
        result.keep_temp_dirs();
    }
    if options.verbose {
        info!(
            merged = result.merge_results.len(),
            conflicts = result.conflict_count(),
            added = result.added_files.len(),
            deleted = result.deleted_files.len(),
            "migration computed"
        );
    }
    Ok(result)
}

// ---------------------------------------------------------------------------
// Per-file decision
// ---------------------------------------------------------------------------

enum Decision {
    Merge(MergeOutcome),
    Delete(FilePendingMigration),
}

#[allow(clippy::too_many_arguments)]
fn decide_file(
    runner: &dyn crate::exec::ProcessRunner,
    path: &RelativePath,
    project_root: &Path,
    base_dir: &Path,
    target_dir: &Path,
    diff_map: &BTreeMap<RelativePath, DiffOutcome>,
    merge_type_map: &BTreeMap<RelativePath, MergeType>,
    config: &MigrateConfig,
    registry: &CustomMergeRegistry,
    prefer_two_way: bool,
) -> Option<Decision> {
    if is_statically_skipped(path) || is_unmanaged(path, &config.unmanaged_paths) {
        return None;
    }

    let current = path.join_under(project_root);
    let base = path.join_under(base_dir);
    let target = path.join_under(target_dir);

    // Binary-ish extensions are replaced wholesale, never text-merged.
    if is_skip_merge(path) {
        if !target.exists() {
            return None;
        }
        let current_bytes = std::fs::read(&current).ok()?;
        let target_bytes = std::fs::read(&target).ok()?;
        if current_bytes == target_bytes {
            return None;
        }
        return Some(Decision::Merge(MergeOutcome::take_target(
            path.clone(),
            target_bytes,
        )));
    }

    if git::check_ignore(runner, project_root, path) {
        return None;
    }

    let user_diff = git::diff_files(runner, &current, &base);
    let target_diff = git::diff_files(runner, &current, &target);

    // Already at target: nothing to do.
    if target_diff.is_equal() {
        return None;
    }

    if user_diff.is_equal() {
        // The user made no change; follow the template's delta.
        return match diff_map.get(path) {
            Some(DiffOutcome::DeletedOnly) => Some(Decision::Delete(
                FilePendingMigration::new(path.clone(), base),
            )),
            Some(DiffOutcome::Changed(_)) => {
                take_target_outcome(path, &target).map(Decision::Merge)
            }
            _ => None,
        };
    }

    // The user changed the file. Only act when the template moved too —
    // when base and target agree, the user's edit stands.
    let template_delta = diff_map.get(path);
    if !matches!(
        template_delta,
        Some(DiffOutcome::Changed(_) | DiffOutcome::AddedOnly | DiffOutcome::DeletedOnly)
    ) {
        return None;
    }

    if let Some(merger) = registry.find(path) {
        return merger
            .merge(path, &current, &base, &target)
            .map(Decision::Merge);
    }

    let merge_type = if matches!(template_delta, Some(DiffOutcome::DeletedOnly)) {
        // Deletion vs. user edit: merging against the empty target with the
        // base as ancestor surfaces the conflict instead of silently keeping
        // or dropping the file.
        MergeType::ThreeWay
    } else if prefer_two_way || patches_match(&user_diff, &target_diff) {
        MergeType::TwoWay
    } else {
        merge_type_map.get(path).copied().unwrap_or_default()
    };

    git::merge_files(runner, path, merge_type, &current, &base, &target).map(Decision::Merge)
}

/// Read the target file into a take-target outcome, preferring the textual
/// representation when the content is valid UTF-8.
fn take_target_outcome(path: &RelativePath, target: &Path) -> Option<MergeOutcome> {
    let bytes = std::fs::read(target).ok()?;
    let body = match String::from_utf8(bytes) {
        Ok(text) => MergedBody::Text(text),
        Err(raw) => MergedBody::Bytes(raw.into_bytes()),
    };
    Some(MergeOutcome {
        local_path: path.clone(),
        body,
        has_conflict: false,
    })
}

/// Compare two patches from their first hunk marker onward.
///
/// When the user's delta from base equals the target's delta from the
/// current file's perspective, the user already is the target's change —
/// a three-way merge would undo it, so the caller forces two-way.
fn patches_match(user_diff: &DiffOutcome, target_diff: &DiffOutcome) -> bool {
    match (user_diff.patch(), target_diff.patch()) {
        (Some(user), Some(target)) => match (patch_tail(user), patch_tail(target)) {
            (Some(u), Some(t)) => u == t,
            _ => false,
        },
        _ => false,
    }
}

/// The patch body from the first hunk marker onward, stripping the headers
/// (file names, index lines) that legitimately differ between two diffs.
fn patch_tail(patch: &str) -> Option<&str> {
    patch.find("@@").map(|idx| &patch[idx..])
}

// ---------------------------------------------------------------------------
// Config assembly
// ---------------------------------------------------------------------------

/// Platform selection priority: explicit option, then metadata, then the
/// directories present in the project.
fn choose_platforms(
    metadata: &MigrateMetadata,
    options: &ComputeOptions,
    project_root: &Path,
) -> Vec<PlatformTag> {
    if let Some(platforms) = &options.platforms {
        let mut platforms = platforms.clone();
        if !platforms.contains(&PlatformTag::Root) {
            platforms.insert(0, PlatformTag::Root);
        }
        return platforms;
    }
    if !metadata.platforms.is_empty() {
        return metadata.platforms.keys().copied().collect();
    }
    detect_platforms(project_root)
}

/// Build the engine config for the chosen platforms; platforms without a
/// metadata entry get an empty config (and thus the fallback revision).
fn effective_config(metadata: &MigrateMetadata, platforms: &[PlatformTag]) -> MigrateConfig {
    let base = metadata.to_config();
    let platform_configs = platforms
        .iter()
        .map(|platform| {
            let pc = base
                .platform_configs
                .get(platform)
                .cloned()
                .unwrap_or(PlatformConfig {
                    platform: *platform,
                    base_revision: None,
                    create_revision: None,
                });
            (*platform, pc)
        })
        .collect();
    MigrateConfig {
        platform_configs,
        unmanaged_paths: base.unmanaged_paths,
    }
}

fn check_cancel(env: &MigrateEnv) -> Result<(), MigrateError> {
    if env.cancel.is_cancelled() {
        return Err(MigrateError::Cancelled);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
