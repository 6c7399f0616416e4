//! End-to-end migration scenarios against the fake SDK and real `git`.

mod common;

use common::{env_for, fake_sdk, setup_project, write_metadata};

use uplift::compute::{compute_migration, ComputeOptions};
use uplift::error::MigrateError;
use uplift::metadata::MigrateMetadata;
use uplift::model::outcome::{MergeOutcome, MigrationResult};
use uplift::model::types::{PlatformTag, RevisionId};

fn outcome<'a>(result: &'a MigrationResult, path: &str) -> Option<&'a MergeOutcome> {
    result
        .merge_results
        .iter()
        .find(|m| m.local_path.as_str() == path)
}

fn has_added(result: &MigrationResult, path: &str) -> bool {
    result
        .added_files
        .iter()
        .any(|f| f.local_path.as_str() == path)
}

fn has_deleted(result: &MigrationResult, path: &str) -> bool {
    result
        .deleted_files
        .iter()
        .any(|f| f.local_path.as_str() == path)
}

// ---------------------------------------------------------------------------
// Scenario: empty delta
// ---------------------------------------------------------------------------

#[test]
fn empty_delta_produces_nothing() {
    let sdk = fake_sdk("rev-new");
    let project = setup_project(&sdk, "android", "rev-new");
    let env = env_for(&sdk);

    let result = compute_migration(&env, project.path(), &ComputeOptions::standard()).unwrap();
    assert!(
        result.is_empty(),
        "expected no outputs, got merges={:?} added={:?} deleted={:?}",
        result.merge_results.len(),
        result.added_files.len(),
        result.deleted_files.len()
    );
}

// ---------------------------------------------------------------------------
// Scenario: user-only edit, base == target
// ---------------------------------------------------------------------------

#[test]
fn user_edit_with_identical_templates_stands() {
    let sdk = fake_sdk("rev-new");
    let project = setup_project(&sdk, "android", "rev-new");
    std::fs::write(project.path().join("lib/app.kt"), "class App // mine\n").unwrap();
    let env = env_for(&sdk);

    let result = compute_migration(&env, project.path(), &ComputeOptions::standard()).unwrap();
    assert!(outcome(&result, "lib/app.kt").is_none());
    assert!(result.is_empty());
}

// ---------------------------------------------------------------------------
// Scenario: template-only changes, user untouched
// ---------------------------------------------------------------------------

#[test]
fn template_changes_take_target_add_and_delete() {
    let sdk_old = fake_sdk("rev-old");
    let sdk_new = fake_sdk("rev-new");
    let project = setup_project(&sdk_old, "android", "rev-old");
    let env = env_for(&sdk_new);

    let result = compute_migration(&env, project.path(), &ComputeOptions::standard()).unwrap();

    // Changed template files become clean take-target outcomes.
    let gradle = outcome(&result, "android/build.gradle").expect("gradle outcome");
    assert!(!gradle.has_conflict);
    let body = String::from_utf8(gradle.body.as_bytes().to_vec()).unwrap();
    assert!(body.contains("// toolkit rev-new"));

    let config = outcome(&result, "app_config.yaml").expect("app_config outcome");
    assert!(!config.has_conflict);
    assert!(
        String::from_utf8_lossy(config.body.as_bytes()).contains("rev-new")
    );

    // Files only the old template carried are deletions.
    assert!(has_deleted(&result, "android/legacy.properties"));

    // Files only the new template carries are additions.
    assert!(has_added(&result, "new_tooling.yaml"));

    // The static skip list keeps user-owned files out of every collection.
    for skipped in ["README.md", "lib/main.kt"] {
        assert!(outcome(&result, skipped).is_none(), "{skipped} leaked");
        assert!(!has_added(&result, skipped));
        assert!(!has_deleted(&result, skipped));
    }

    // Disjointness invariants.
    for merge in &result.merge_results {
        assert!(!has_added(&result, merge.local_path.as_str()));
        assert!(!has_deleted(&result, merge.local_path.as_str()));
    }
    for added in &result.added_files {
        assert!(!has_deleted(&result, added.local_path.as_str()));
    }
}

#[test]
fn unchanged_binary_file_takes_target_bytes() {
    let sdk_old = fake_sdk("rev-old");
    let sdk_new = fake_sdk("rev-new");
    let project = setup_project(&sdk_old, "android", "rev-old");
    let env = env_for(&sdk_new);

    let result = compute_migration(&env, project.path(), &ComputeOptions::standard()).unwrap();

    let blob = outcome(&result, "data/blob.dat").expect("blob outcome");
    assert!(!blob.has_conflict);
    assert!(!blob.body.is_text());
    let expected = std::fs::read(
        result
            .target_template_dir
            .join("data")
            .join("blob.dat"),
    )
    .unwrap();
    assert_eq!(blob.body.as_bytes(), expected.as_slice());
}

// ---------------------------------------------------------------------------
// Scenario: metadata file merges semantically
// ---------------------------------------------------------------------------

#[test]
fn metadata_file_merges_user_fields_with_target_revision() {
    let sdk_old = fake_sdk("rev-old");
    let sdk_new = fake_sdk("rev-new");
    let project = setup_project(&sdk_old, "android", "rev-old");
    write_metadata(project.path(), "rev-old", &["android"], &["vendor/"]);
    let env = env_for(&sdk_new);

    let result = compute_migration(&env, project.path(), &ComputeOptions::standard()).unwrap();

    let meta_out = outcome(&result, ".migrate_config").expect("metadata outcome");
    assert!(!meta_out.has_conflict);
    let merged: MigrateMetadata =
        serde_yaml::from_slice(meta_out.body.as_bytes()).unwrap();
    assert_eq!(
        merged.version_revision,
        Some(RevisionId::new("rev-new").unwrap())
    );
    // User's platform entries and unmanaged paths survive.
    assert_eq!(
        merged.platforms[&PlatformTag::Android].base_revision,
        Some(RevisionId::new("rev-old").unwrap())
    );
    assert_eq!(merged.unmanaged_files.len(), 1);
}

// ---------------------------------------------------------------------------
// Scenario: three-way merges
// ---------------------------------------------------------------------------

#[test]
fn three_way_merge_combines_user_and_template_edits() {
    let sdk_old = fake_sdk("rev-old");
    let sdk_new = fake_sdk("rev-new");
    let project = setup_project(&sdk_old, "android", "rev-old");
    let env = env_for(&sdk_new);

    // User appends at the bottom; the template's change is at the top.
    let gradle = project.path().join("android/build.gradle");
    let mut content = std::fs::read_to_string(&gradle).unwrap();
    content.push_str("// user addition\n");
    std::fs::write(&gradle, content).unwrap();

    let result = compute_migration(&env, project.path(), &ComputeOptions::standard()).unwrap();

    let merged = outcome(&result, "android/build.gradle").expect("gradle outcome");
    assert!(!merged.has_conflict, "expected a clean three-way merge");
    let body = String::from_utf8(merged.body.as_bytes().to_vec()).unwrap();
    assert!(body.contains("// toolkit rev-new"));
    assert!(body.contains("// user addition"));
}

#[test]
fn overlapping_edits_conflict_with_markers() {
    let sdk_old = fake_sdk("rev-old");
    let sdk_new = fake_sdk("rev-new");
    let project = setup_project(&sdk_old, "android", "rev-old");
    let env = env_for(&sdk_new);

    // User rewrites the same line the template changes.
    let gradle = project.path().join("android/build.gradle");
    let content = std::fs::read_to_string(&gradle).unwrap();
    let rewritten = content.replacen("// toolkit rev-old", "// custom build", 1);
    assert_ne!(content, rewritten);
    std::fs::write(&gradle, rewritten).unwrap();

    let result = compute_migration(&env, project.path(), &ComputeOptions::standard()).unwrap();

    let merged = outcome(&result, "android/build.gradle").expect("gradle outcome");
    assert!(merged.has_conflict);
    let body = String::from_utf8(merged.body.as_bytes().to_vec()).unwrap();
    assert!(body.contains("<<<<<<<"));
    assert!(body.contains(">>>>>>>"));
    assert!(body.contains("// custom build"));
    assert!(body.contains("// toolkit rev-new"));
}

#[test]
fn prefer_two_way_forces_ancestorless_merge() {
    let sdk_old = fake_sdk("rev-old");
    let sdk_new = fake_sdk("rev-new");
    let project = setup_project(&sdk_old, "android", "rev-old");
    let env = env_for(&sdk_new);

    let gradle = project.path().join("android/build.gradle");
    let mut content = std::fs::read_to_string(&gradle).unwrap();
    content.push_str("// user addition\n");
    std::fs::write(&gradle, content).unwrap();

    let options = ComputeOptions {
        prefer_two_way: true,
        ..ComputeOptions::standard()
    };
    let result = compute_migration(&env, project.path(), &options).unwrap();

    // Without the common ancestor the top-of-file divergence cannot be
    // reconciled; the same edits merge cleanly three-way (test above).
    let merged = outcome(&result, "android/build.gradle").expect("gradle outcome");
    assert!(merged.has_conflict);
}

#[test]
fn template_deletion_of_user_modified_file_conflicts() {
    let sdk_old = fake_sdk("rev-old");
    let sdk_new = fake_sdk("rev-new");
    let project = setup_project(&sdk_old, "android", "rev-old");
    let env = env_for(&sdk_new);

    // The new template drops legacy.properties; the user has edited it.
    std::fs::write(
        project.path().join("android/legacy.properties"),
        "legacy=true\ncustom=1\n",
    )
    .unwrap();

    let result = compute_migration(&env, project.path(), &ComputeOptions::standard()).unwrap();

    let merged = outcome(&result, "android/legacy.properties").expect("legacy outcome");
    assert!(merged.has_conflict);
    let body = String::from_utf8(merged.body.as_bytes().to_vec()).unwrap();
    assert!(body.contains("custom=1"));
    // Not a silent deletion.
    assert!(!has_deleted(&result, "android/legacy.properties"));
}

// ---------------------------------------------------------------------------
// Scenario: user-modified binary file
// ---------------------------------------------------------------------------

#[test]
fn modified_binary_file_degrades_to_take_target() {
    let sdk_old = fake_sdk("rev-old");
    let sdk_new = fake_sdk("rev-new");
    let project = setup_project(&sdk_old, "android", "rev-old");
    std::fs::write(project.path().join("data/blob.dat"), [0xde, 0xad, 0xbe]).unwrap();
    let env = env_for(&sdk_new);

    let result = compute_migration(&env, project.path(), &ComputeOptions::standard()).unwrap();

    let blob = outcome(&result, "data/blob.dat").expect("blob outcome");
    assert!(!blob.has_conflict);
    let expected = std::fs::read(result.target_template_dir.join("data/blob.dat")).unwrap();
    assert_eq!(blob.body.as_bytes(), expected.as_slice());
}

// ---------------------------------------------------------------------------
// Scenario: unmanaged paths
// ---------------------------------------------------------------------------

#[test]
fn unmanaged_paths_never_surface() {
    let sdk_old = fake_sdk("rev-old");
    let sdk_new = fake_sdk("rev-new");
    let project = setup_project(&sdk_old, "android", "rev-old");
    write_metadata(
        project.path(),
        "rev-old",
        &["android"],
        &["app_config.yaml", "vendor/"],
    );
    std::fs::create_dir_all(project.path().join("vendor")).unwrap();
    std::fs::write(project.path().join("vendor/anything.txt"), "user data\n").unwrap();
    std::fs::write(
        project.path().join("app_config.yaml"),
        "toolkit_revision: hand-edited\n",
    )
    .unwrap();
    let env = env_for(&sdk_new);

    let result = compute_migration(&env, project.path(), &ComputeOptions::standard()).unwrap();

    assert!(outcome(&result, "app_config.yaml").is_none());
    assert!(outcome(&result, "vendor/anything.txt").is_none());
    assert!(!has_added(&result, "vendor/anything.txt"));
    assert!(!has_deleted(&result, "app_config.yaml"));
}

// ---------------------------------------------------------------------------
// Scenario: fallback chain
// ---------------------------------------------------------------------------

#[test]
fn unreachable_base_revision_falls_back_to_target() {
    let sdk_old = fake_sdk("rev-old");
    let sdk_new = fake_sdk("rev-new");
    let project = setup_project(&sdk_old, "android", "missing-rev");
    let env = env_for(&sdk_new);

    // missing-* revisions refuse to clone; the chain lands on the installed
    // target revision, so base == target and nothing needs migrating even
    // though the project content is older.
    let result = compute_migration(&env, project.path(), &ComputeOptions::standard()).unwrap();
    assert!(result.merge_results.is_empty());
    assert!(result.added_files.is_empty());
    assert!(result.deleted_files.is_empty());
}

#[test]
fn unreachable_target_revision_is_fatal() {
    let sdk = fake_sdk("rev-new");
    let project = setup_project(&sdk, "android", "rev-new");
    let env = env_for(&sdk);

    let options = ComputeOptions {
        target_revision: Some(RevisionId::new("missing-target").unwrap()),
        ..ComputeOptions::standard()
    };
    let err = compute_migration(&env, project.path(), &options).unwrap_err();
    assert!(matches!(err, MigrateError::RevisionUnavailable { .. }));
}

// ---------------------------------------------------------------------------
// Pre-flight and cancellation
// ---------------------------------------------------------------------------

#[test]
fn existing_working_directory_aborts_recoverably() {
    let sdk = fake_sdk("rev-new");
    let project = setup_project(&sdk, "android", "rev-new");
    std::fs::create_dir(project.path().join("migrate_working_dir")).unwrap();
    let env = env_for(&sdk);

    let err = compute_migration(&env, project.path(), &ComputeOptions::standard()).unwrap_err();
    assert!(matches!(err, MigrateError::WorkingDirExists { .. }));
    assert!(err.is_recoverable());
}

#[test]
fn cancellation_stops_the_run() {
    let sdk = fake_sdk("rev-new");
    let project = setup_project(&sdk, "android", "rev-new");
    let env = env_for(&sdk);
    env.cancel.cancel();

    let err = compute_migration(&env, project.path(), &ComputeOptions::standard()).unwrap_err();
    assert!(matches!(err, MigrateError::Cancelled));
}

// ---------------------------------------------------------------------------
// Module / plugin projects
// ---------------------------------------------------------------------------

#[test]
fn module_projects_are_rejected() {
    let sdk = fake_sdk("rev-new");
    let project = setup_project(&sdk, "android", "rev-new");
    std::fs::write(
        project.path().join("project.yaml"),
        "name: demo\nmodule:\n  hosted: true\n",
    )
    .unwrap();
    let env = env_for(&sdk);

    let err = compute_migration(&env, project.path(), &ComputeOptions::standard()).unwrap_err();
    assert!(matches!(err, MigrateError::NotAnAppProject { .. }));
}

// ---------------------------------------------------------------------------
// Scratch-directory ownership
// ---------------------------------------------------------------------------

#[test]
fn release_deletes_scratch_directories() {
    let sdk_old = fake_sdk("rev-old");
    let sdk_new = fake_sdk("rev-new");
    let project = setup_project(&sdk_old, "android", "rev-old");
    let env = env_for(&sdk_new);

    let mut result =
        compute_migration(&env, project.path(), &ComputeOptions::standard()).unwrap();
    let base_dir = result.base_template_dir.clone();
    assert!(base_dir.exists());
    assert!(!result.temp_dirs.is_empty());

    result.release_temp_dirs().unwrap();
    assert!(!base_dir.exists());
}

#[test]
fn borrowed_template_paths_are_not_owned() {
    let sdk = fake_sdk("rev-new");
    let project = setup_project(&sdk, "android", "rev-new");
    let env = env_for(&sdk);

    // Pre-generate both templates and lend them to the engine.
    let base = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    common::scaffold(&sdk, "android", base.path());
    common::scaffold(&sdk, "android", target.path());

    let options = ComputeOptions {
        base_app_path: Some(base.path().to_path_buf()),
        target_app_path: Some(target.path().to_path_buf()),
        ..ComputeOptions::standard()
    };
    let mut result = compute_migration(&env, project.path(), &options).unwrap();
    result.release_temp_dirs().unwrap();

    // Borrowed directories survive the release.
    assert!(base.path().exists());
    assert!(target.path().exists());
}
