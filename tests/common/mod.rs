//! Shared helpers for uplift integration tests.
//!
//! All tests run against temp directories and a scripted fake SDK — no real
//! toolkit is needed, only `git` and `sh`. The fake SDK's `clone` copies
//! itself at the requested revision; its `create` writes a deterministic
//! template whose revision-dependent files let tests construct template
//! deltas:
//!
//! - `app_config.yaml`, `android/build.gradle`, `ios/Runner/Info.plist`,
//!   `data/blob.dat` (non-UTF-8), and `.migrate_config` change per revision;
//! - `lib/app.kt`, `android/settings.gradle`, `project.yaml` are static;
//! - revisions containing `old` carry `android/legacy.properties`;
//! - revisions containing `new` carry `new_tooling.yaml`;
//! - revisions matching `missing-*` refuse to clone.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use tempfile::TempDir;

use uplift::env::{MigrateEnv, ToolkitInstall};
use uplift::exec::SystemRunner;
use uplift::model::types::RevisionId;

const FAKE_SDK: &str = r#"#!/bin/sh
# Fake toolkit SDK for integration tests.
set -eu
self_dir=$(CDPATH= cd -- "$(dirname -- "$0")/.." && pwd)
rev=$(cat "$self_dir/version")
cmd=$1
shift

case "$cmd" in
clone)
    clone_rev=$1
    dir=$2
    case "$clone_rev" in
    missing-*)
        echo "revision not found: $clone_rev" >&2
        exit 128
        ;;
    esac
    mkdir -p "$dir/bin"
    cp "$self_dir/bin/sdk" "$dir/bin/sdk"
    chmod +x "$dir/bin/sdk"
    printf '%s\n' "$clone_rev" >"$dir/version"
    ;;
create)
    name=app
    platforms=""
    outdir=""
    prev=""
    for a in "$@"; do
        case "$prev" in
        --project-name) name=$a ;;
        --platforms) platforms=$a ;;
        esac
        prev=$a
        outdir=$a
    done

    mkdir -p "$outdir/lib" "$outdir/data"
    printf 'name: %s\n' "$name" >"$outdir/project.yaml"
    printf 'fun main() {} // toolkit %s\n' "$rev" >"$outdir/lib/main.kt"
    printf 'class App\n' >"$outdir/lib/app.kt"
    printf '# %s (toolkit %s)\n' "$name" "$rev" >"$outdir/README.md"
    printf 'version_revision: %s\n' "$rev" >"$outdir/.migrate_config"
    printf 'toolkit_revision: %s\nfeature_flags: default\n' "$rev" >"$outdir/app_config.yaml"
    printf '\377\376blob %s\n' "$rev" >"$outdir/data/blob.dat"
    case "$rev" in
    *new*) printf 'tooling: modern\n' >"$outdir/new_tooling.yaml" ;;
    esac

    old_ifs=$IFS
    IFS=,
    for p in $platforms; do
        case "$p" in
        android)
            mkdir -p "$outdir/android"
            {
                printf '// toolkit %s\n' "$rev"
                printf "apply plugin: 'app'\n"
                printf 'android {\n'
                printf '    compileSdk 34\n'
                printf '}\n'
            } >"$outdir/android/build.gradle"
            printf "include ':app'\n" >"$outdir/android/settings.gradle"
            case "$rev" in
            *old*) printf 'legacy=true\n' >"$outdir/android/legacy.properties" ;;
            esac
            ;;
        ios)
            mkdir -p "$outdir/ios/Runner"
            printf '<plist><string>%s</string></plist>\n' "$rev" >"$outdir/ios/Runner/Info.plist"
            case "$rev" in
            *new*)
                mkdir -p "$outdir/ios/RunnerTests"
                printf '<plist><string>tests</string></plist>\n' >"$outdir/ios/RunnerTests/Info.plist"
                ;;
            esac
            ;;
        web)
            mkdir -p "$outdir/web"
            printf '<!-- %s --><html></html>\n' "$rev" >"$outdir/web/index.html"
            ;;
        esac
    done
    IFS=$old_ifs
    ;;
*)
    echo "unknown command: $cmd" >&2
    exit 2
    ;;
esac
"#;

/// Create a fake SDK install at the given revision.
pub fn fake_sdk(revision: &str) -> TempDir {
    let dir = TempDir::new().expect("failed to create SDK temp dir");
    let bin_dir = dir.path().join("bin");
    std::fs::create_dir_all(&bin_dir).unwrap();
    let script = bin_dir.join("sdk");
    std::fs::write(&script, FAKE_SDK).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt as _;
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
    std::fs::write(dir.path().join("version"), format!("{revision}\n")).unwrap();
    dir
}

/// An engine environment backed by the fake SDK and the system runner.
pub fn env_for(sdk: &TempDir) -> MigrateEnv {
    let revision = std::fs::read_to_string(sdk.path().join("version")).unwrap();
    let revision: RevisionId = revision.trim().parse().unwrap();
    MigrateEnv {
        runner: Arc::new(SystemRunner),
        install: ToolkitInstall::new(sdk.path().to_path_buf(), revision),
        cancel: uplift::env::CancelFlag::new(),
    }
}

/// Scaffold a project directory using the fake SDK (as `create` would).
pub fn scaffold(sdk: &TempDir, platforms: &str, out: &Path) {
    let status = Command::new(sdk.path().join("bin/sdk"))
        .args([
            "create",
            "--template=app",
            "--org",
            "com.example",
            "--project-name",
            "demo",
            "--android-language",
            "kotlin",
            "--ios-language",
            "swift",
            "--platforms",
            platforms,
        ])
        .arg(out)
        .status()
        .expect("failed to run fake sdk create");
    assert!(status.success(), "fake sdk create failed");
}

/// Write a `.migrate_config` recording `base_rev` for root plus the given
/// platforms, with optional unmanaged entries.
pub fn write_metadata(project: &Path, base_rev: &str, platforms: &[&str], unmanaged: &[&str]) {
    let mut yaml = String::new();
    yaml.push_str(&format!("version_revision: {base_rev}\n"));
    yaml.push_str("platforms:\n");
    yaml.push_str(&format!("  root:\n    base_revision: {base_rev}\n"));
    for p in platforms {
        yaml.push_str(&format!("  {p}:\n    base_revision: {base_rev}\n"));
    }
    if !unmanaged.is_empty() {
        yaml.push_str("unmanaged_files:\n");
        for u in unmanaged {
            yaml.push_str(&format!("  - {u}\n"));
        }
    }
    std::fs::write(project.join(".migrate_config"), yaml).unwrap();
}

/// A scaffolded project at `base_rev` with metadata recording that revision.
pub fn setup_project(sdk_at_base: &TempDir, platforms: &str, base_rev: &str) -> TempDir {
    let project = TempDir::new().expect("failed to create project temp dir");
    scaffold(sdk_at_base, platforms, project.path());
    let platform_list: Vec<&str> = platforms.split(',').filter(|p| !p.is_empty()).collect();
    write_metadata(project.path(), base_rev, &platform_list, &[]);
    project
}

/// Read a staged file from the working directory.
pub fn staged(project: &Path, rel: &str) -> PathBuf {
    project.join("migrate_working_dir").join(rel)
}
