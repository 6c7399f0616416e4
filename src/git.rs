//! Thin wrappers over the external VCS.
//!
//! The engine does not implement diff or merge itself: `git init`,
//! `git check-ignore`, `git diff --no-index`, and `git merge-file` do the
//! work. We use temp files + `git merge-file -p` instead of an in-process
//! diff3 implementation — this keeps behavior aligned with git's merge
//! semantics, and the rest of the pipeline already shells out to git.
//!
//! Per-file failures degrade rather than abort: an unexpected diff exit code
//! reads as `Equal`, a failed merge becomes "take target". Both are logged.

use std::ffi::OsStr;
use std::fs;
use std::io::Write as _;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::MigrateError;
use crate::exec::{command_line, ExecOutput, ProcessRunner};
use crate::model::outcome::{DiffOutcome, MergeOutcome, MergedBody};
use crate::model::types::{MergeType, RelativePath};

// ---------------------------------------------------------------------------
// init / check-ignore
// ---------------------------------------------------------------------------

/// Initialize a git repository in `dir` (idempotent).
///
/// Needed so `check-ignore` queries work against the template and project
/// trees.
///
/// # Errors
/// Returns [`MigrateError::SubprocessFailed`] if git cannot be spawned or
/// exits non-zero.
pub fn init_repo(runner: &dyn ProcessRunner, dir: &Path) -> Result<(), MigrateError> {
    let args: Vec<&OsStr> = vec![OsStr::new("init"), OsStr::new("--quiet")];
    let out = run_git(runner, &args, Some(dir))?;
    if !out.success() {
        return Err(MigrateError::SubprocessFailed {
            command: format!("git init --quiet (in {})", dir.display()),
            exit_code: out.code,
            stderr: out.stderr_utf8().trim().to_owned(),
        });
    }
    Ok(())
}

/// Returns `true` if `rel` is covered by the ignore rules of the repository
/// at `repo`.
///
/// Exit 0 means ignored, exit 1 not ignored; anything else (including "not a
/// repository") reads as not ignored.
#[must_use]
pub fn check_ignore(runner: &dyn ProcessRunner, repo: &Path, rel: &RelativePath) -> bool {
    let args: Vec<&OsStr> = vec![
        OsStr::new("check-ignore"),
        OsStr::new("--quiet"),
        OsStr::new("--"),
        OsStr::new(rel.as_str()),
    ];
    match run_git(runner, &args, Some(repo)) {
        Ok(out) => out.code == Some(0),
        Err(err) => {
            warn!(path = %rel, error = %err, "check-ignore failed; treating as not ignored");
            false
        }
    }
}

// ---------------------------------------------------------------------------
// diff
// ---------------------------------------------------------------------------

/// Diff an ordered pair of files into a [`DiffOutcome`].
///
/// Missing files short-circuit to `AddedOnly`/`DeletedOnly`; otherwise
/// `git diff --no-index` decides: exit 0 → `Equal`, exit 1 → `Changed` with
/// the patch text. Unexpected exit codes degrade to `Equal` with a warning.
#[must_use]
pub fn diff_files(runner: &dyn ProcessRunner, old: &Path, new: &Path) -> DiffOutcome {
    if !old.exists() {
        return DiffOutcome::AddedOnly;
    }
    if !new.exists() {
        return DiffOutcome::DeletedOnly;
    }

    let args: Vec<&OsStr> = vec![
        OsStr::new("diff"),
        OsStr::new("--no-index"),
        OsStr::new("--"),
        old.as_os_str(),
        new.as_os_str(),
    ];
    match run_git(runner, &args, None) {
        Ok(out) => match out.code {
            Some(0) => DiffOutcome::Equal,
            Some(1) => DiffOutcome::Changed(out.stdout_utf8().into_owned()),
            code => {
                warn!(
                    old = %old.display(),
                    new = %new.display(),
                    ?code,
                    "unexpected git diff exit; treating files as equal"
                );
                DiffOutcome::Equal
            }
        },
        Err(err) => {
            warn!(error = %err, "git diff failed to run; treating files as equal");
            DiffOutcome::Equal
        }
    }
}

// ---------------------------------------------------------------------------
// merge
// ---------------------------------------------------------------------------

/// Merge `current` and `target` (optionally against `base`) into a
/// [`MergeOutcome`] for `local_path`.
///
/// - `MergeType::ThreeWay` runs `git merge-file -p --diff3 current base
///   target`.
/// - `MergeType::TwoWay` substitutes an empty base, so content present on
///   both sides but differing surfaces as conflict markers.
/// - A missing `target` merges against an empty target file (deletion
///   surfaced as a conflict rather than a silent drop).
/// - Inputs that are not valid UTF-8 degrade to "take target" raw bytes.
///
/// Returns `None` when the file cannot be read at all; the caller skips it.
#[must_use]
pub fn merge_files(
    runner: &dyn ProcessRunner,
    local_path: &RelativePath,
    merge_type: MergeType,
    current: &Path,
    base: &Path,
    target: &Path,
) -> Option<MergeOutcome> {
    let current_bytes = read_or_skip(current, local_path)?;
    let target_bytes = if target.exists() {
        read_or_skip(target, local_path)?
    } else {
        Vec::new()
    };

    // Non-text content is replaced wholesale; git merge-file is line-based.
    if std::str::from_utf8(&current_bytes).is_err()
        || std::str::from_utf8(&target_bytes).is_err()
    {
        return Some(MergeOutcome::take_target(local_path.clone(), target_bytes));
    }

    let mut empty_base = None;
    let mut empty_target = None;

    let base_path = match merge_type {
        MergeType::ThreeWay if base.exists() => base.to_path_buf(),
        _ => match scratch_file(&mut empty_base) {
            Ok(p) => p,
            Err(err) => {
                warn!(path = %local_path, error = %err, "cannot stage merge base; taking target");
                return Some(MergeOutcome::take_target(local_path.clone(), target_bytes));
            }
        },
    };
    let target_path = if target.exists() {
        target.to_path_buf()
    } else {
        match scratch_file(&mut empty_target) {
            Ok(p) => p,
            Err(err) => {
                warn!(path = %local_path, error = %err, "cannot stage merge target; taking target");
                return Some(MergeOutcome::take_target(local_path.clone(), target_bytes));
            }
        }
    };

    let mut args: Vec<&OsStr> = vec![OsStr::new("merge-file"), OsStr::new("-p")];
    if merge_type == MergeType::ThreeWay {
        args.push(OsStr::new("--diff3"));
    }
    args.push(current.as_os_str());
    args.push(base_path.as_os_str());
    args.push(target_path.as_os_str());

    let out = match run_git(runner, &args, None) {
        Ok(out) => out,
        Err(err) => {
            warn!(path = %local_path, error = %err, "git merge-file failed to run; taking target");
            return Some(MergeOutcome::take_target(local_path.clone(), target_bytes));
        }
    };

    match out.code {
        // Exit code is the number of conflict hunks; any positive value means
        // conflict markers are embedded in stdout.
        Some(code) if code >= 0 => {
            let body = match String::from_utf8(out.stdout) {
                Ok(text) => MergedBody::Text(text),
                Err(raw) => MergedBody::Bytes(raw.into_bytes()),
            };
            Some(MergeOutcome {
                local_path: local_path.clone(),
                body,
                has_conflict: code > 0,
            })
        }
        code => {
            warn!(path = %local_path, ?code, "git merge-file errored; taking target");
            Some(MergeOutcome::take_target(local_path.clone(), target_bytes))
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn run_git(
    runner: &dyn ProcessRunner,
    args: &[&OsStr],
    cwd: Option<&Path>,
) -> Result<ExecOutput, MigrateError> {
    runner
        .run(OsStr::new("git"), args, cwd)
        .map_err(|err| MigrateError::SubprocessFailed {
            command: command_line(OsStr::new("git"), args),
            exit_code: None,
            stderr: err.to_string(),
        })
}

fn read_or_skip(path: &Path, local_path: &RelativePath) -> Option<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(err) => {
            warn!(path = %local_path, error = %err, "cannot read file; skipping");
            None
        }
    }
}

/// Create an empty named temp file, storing the handle in `slot` so it lives
/// until the merge completes.
fn scratch_file(slot: &mut Option<NamedTempFile>) -> std::io::Result<std::path::PathBuf> {
    let mut file = NamedTempFile::new()?;
    file.flush()?;
    let path = file.path().to_path_buf();
    *slot = Some(file);
    Ok(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
