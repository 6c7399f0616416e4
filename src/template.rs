//! Template materialization.
//!
//! Acquires a toolkit SDK at a given revision (cloning into scratch space,
//! with fallback) and uses it to regenerate template projects. All base
//! revisions generate into a single shared base-template directory —
//! successive invocations overlay — and one target-template directory is
//! generated at the target revision.
//!
//! The fallback chain for an unreachable revision is: the revision itself,
//! then the fallback revision, then the target revision. Exhausting the
//! chain is fatal for the run.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::env::{MigrateEnv, ToolkitInstall};
use crate::error::MigrateError;
use crate::exec::command_line;
use crate::fsutil::list_files;
use crate::metadata::{PlatformConfig, ProjectProbe};
use crate::model::types::{MergeType, PlatformTag, RelativePath, RevisionId};

// ---------------------------------------------------------------------------
// TemplateMaterializer
// ---------------------------------------------------------------------------

/// Generates base and target templates, caching SDK clones per revision.
pub struct TemplateMaterializer<'a> {
    env: &'a MigrateEnv,
    probe: &'a ProjectProbe,
    target_revision: RevisionId,
    /// SDK roots keyed by the revision actually materialized there.
    sdk_dirs: BTreeMap<RevisionId, PathBuf>,
    /// Requested revision → revision that ended up materializing it.
    aliases: BTreeMap<RevisionId, RevisionId>,
    /// Owned scratch directories (SDK clones).
    temp_dirs: Vec<TempDir>,
    /// Default merge type per template file; first assignment wins.
    merge_type_map: BTreeMap<RelativePath, MergeType>,
}

impl<'a> TemplateMaterializer<'a> {
    #[must_use]
    pub fn new(env: &'a MigrateEnv, probe: &'a ProjectProbe, target_revision: RevisionId) -> Self {
        Self {
            env,
            probe,
            target_revision,
            sdk_dirs: BTreeMap::new(),
            aliases: BTreeMap::new(),
            temp_dirs: Vec::new(),
            merge_type_map: BTreeMap::new(),
        }
    }

    /// Generate one base revision's platforms into the shared base directory,
    /// falling back along `revision → fallback → target` when the revision
    /// cannot be materialized.
    ///
    /// # Errors
    /// Returns [`MigrateError::RevisionUnavailable`] when the whole chain is
    /// exhausted.
    pub fn generate_base(
        &mut self,
        base_dir: &Path,
        revision: &RevisionId,
        fallback: &RevisionId,
        configs: &[PlatformConfig],
    ) -> Result<(), MigrateError> {
        let platforms: Vec<PlatformTag> = configs
            .iter()
            .map(|c| c.platform)
            .filter(|p| !p.is_root())
            .collect();

        let mut chain = vec![revision.clone(), fallback.clone(), self.target_revision.clone()];
        chain.dedup();

        let before: Vec<RelativePath> = list_files(base_dir);
        for candidate in &chain {
            let effective = match self.acquire_sdk(candidate) {
                Ok(effective) => effective,
                Err(err) => {
                    warn!(revision = %candidate, error = %err, "SDK unavailable, trying next fallback");
                    continue;
                }
            };
            let sdk_root = self.sdk_dirs[&effective].clone();
            match self.run_create(&sdk_root, base_dir, &platforms) {
                Ok(()) => {
                    self.aliases.insert(revision.clone(), effective.clone());
                    self.record_merge_types(base_dir, &before, &effective);
                    return Ok(());
                }
                Err(err) => {
                    warn!(revision = %effective, error = %err, "scaffold generation failed, trying next fallback");
                }
            }
        }

        Err(MigrateError::RevisionUnavailable {
            revision: revision.clone(),
        })
    }

    /// Generate the target template. No fallback: an unreachable target
    /// revision is fatal.
    ///
    /// # Errors
    /// Returns [`MigrateError::RevisionUnavailable`] when the target revision
    /// cannot be materialized or generated.
    pub fn generate_target(
        &mut self,
        target_dir: &Path,
        platforms: &[PlatformTag],
    ) -> Result<(), MigrateError> {
        let platforms: Vec<PlatformTag> =
            platforms.iter().copied().filter(|p| !p.is_root()).collect();
        let target = self.target_revision.clone();
        let effective = self.acquire_sdk(&target).map_err(|err| {
            warn!(revision = %target, error = %err, "target SDK unavailable");
            MigrateError::RevisionUnavailable { revision: target.clone() }
        })?;
        let sdk_root = self.sdk_dirs[&effective].clone();
        self.run_create(&sdk_root, target_dir, &platforms)
            .map_err(|err| {
                warn!(revision = %effective, error = %err, "target scaffold generation failed");
                MigrateError::RevisionUnavailable { revision: target }
            })
    }

    /// The accumulated per-file merge-type defaults.
    #[must_use]
    pub fn merge_type_map(&self) -> &BTreeMap<RelativePath, MergeType> {
        &self.merge_type_map
    }

    /// Consume the materializer, handing back SDK dirs and owned scratch
    /// directories for the migration result.
    #[must_use]
    pub fn into_parts(
        self,
    ) -> (
        BTreeMap<RelativePath, MergeType>,
        BTreeMap<RevisionId, PathBuf>,
        Vec<TempDir>,
    ) {
        (self.merge_type_map, self.sdk_dirs, self.temp_dirs)
    }

    // -- internals --

    /// Ensure an SDK exists for `revision`; returns the revision whose SDK
    /// should be used (identity unless a previous call aliased it).
    fn acquire_sdk(&mut self, revision: &RevisionId) -> Result<RevisionId, MigrateError> {
        let effective = self.aliases.get(revision).cloned().unwrap_or_else(|| revision.clone());

        if self.sdk_dirs.contains_key(&effective) {
            return Ok(effective);
        }

        // The installed SDK already materializes its own revision.
        if effective == self.env.install.revision {
            self.sdk_dirs
                .insert(effective.clone(), self.env.install.root.clone());
            return Ok(effective);
        }

        let scratch = TempDir::new()?;
        let clone_dir = scratch.path().to_path_buf();
        debug!(revision = %effective, dir = %clone_dir.display(), "cloning SDK");

        let bin = self.env.install.bin();
        let args: Vec<&OsStr> = vec![
            OsStr::new("clone"),
            OsStr::new(effective.as_str()),
            clone_dir.as_os_str(),
        ];
        let out = self
            .env
            .runner
            .run(bin.as_os_str(), &args, None)
            .map_err(|err| MigrateError::SubprocessFailed {
                command: command_line(bin.as_os_str(), &args),
                exit_code: None,
                stderr: err.to_string(),
            })?;
        if !out.success() {
            return Err(MigrateError::SubprocessFailed {
                command: command_line(bin.as_os_str(), &args),
                exit_code: out.code,
                stderr: out.stderr_utf8().trim().to_owned(),
            });
        }

        self.temp_dirs.push(scratch);
        self.sdk_dirs.insert(effective.clone(), clone_dir);
        Ok(effective)
    }

    /// Run the scaffold generator of the SDK at `sdk_root` into `out_dir`.
    fn run_create(
        &self,
        sdk_root: &Path,
        out_dir: &Path,
        platforms: &[PlatformTag],
    ) -> Result<(), MigrateError> {
        std::fs::create_dir_all(out_dir)?;

        let bin = ToolkitInstall::bin_for(sdk_root);
        let project_name = OsString::from(&self.probe.app_name);
        let csv = platforms
            .iter()
            .map(PlatformTag::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let platforms_arg = OsString::from(&csv);

        let mut args: Vec<&OsStr> = vec![
            OsStr::new("create"),
            OsStr::new("--template=app"),
            OsStr::new("--org"),
            OsStr::new("com.example"),
            OsStr::new("--project-name"),
            &project_name,
            OsStr::new("--android-language"),
            OsStr::new(self.probe.android_language.as_str()),
            OsStr::new("--ios-language"),
            OsStr::new(self.probe.ios_language.as_str()),
        ];
        if !platforms.is_empty() {
            args.push(OsStr::new("--platforms"));
            args.push(&platforms_arg);
        }
        args.push(out_dir.as_os_str());

        let out = self
            .env
            .runner
            .run(bin.as_os_str(), &args, None)
            .map_err(|err| MigrateError::SubprocessFailed {
                command: command_line(bin.as_os_str(), &args),
                exit_code: None,
                stderr: err.to_string(),
            })?;
        if !out.success() {
            return Err(MigrateError::SubprocessFailed {
                command: command_line(bin.as_os_str(), &args),
                exit_code: out.code,
                stderr: out.stderr_utf8().trim().to_owned(),
            });
        }
        Ok(())
    }

    /// Record merge-type defaults for files the latest generation added to
    /// the base directory. First assignment wins.
    fn record_merge_types(
        &mut self,
        base_dir: &Path,
        before: &[RelativePath],
        generated_with: &RevisionId,
    ) {
        let default = if *generated_with == self.target_revision {
            MergeType::TwoWay
        } else {
            MergeType::ThreeWay
        };
        for path in list_files(base_dir) {
            if before.binary_search(&path).is_err() {
                self.merge_type_map.entry(path).or_insert(default);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
