//! Project migration metadata (`.migrate_config`).
//!
//! The metadata file records, per platform, which toolkit revision generated
//! the scaffold and which revision it was last migrated to, plus the user's
//! unmanaged paths. Missing file → all defaults (no error) so freshly
//! scaffolded projects migrate with the fallback revision.
//!
//! Also home to the project-manifest probes the materializer needs: the
//! application name and the Android/iOS scaffold languages.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::MigrateError;
use crate::model::types::{PlatformTag, RelativePath, RevisionId};

/// Name of the metadata file under the project root.
pub const METADATA_FILE: &str = ".migrate_config";

/// Name of the project manifest probed for the application name.
pub const PROJECT_MANIFEST: &str = "project.yaml";

// ---------------------------------------------------------------------------
// MigrateMetadata — the on-disk file
// ---------------------------------------------------------------------------

/// Per-platform revision entry as persisted in `.migrate_config`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformEntry {
    /// The revision that generated this platform's scaffold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_revision: Option<RevisionId>,
    /// The revision this platform was last migrated to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_revision: Option<RevisionId>,
}

/// The persisted migration metadata file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrateMetadata {
    /// The last framework revision this project was migrated to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_revision: Option<RevisionId>,

    /// Per-platform scaffold revisions.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub platforms: BTreeMap<PlatformTag, PlatformEntry>,

    /// Paths the user has declared off-limits to the engine. A trailing `/`
    /// designates a directory.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unmanaged_files: Vec<RelativePath>,
}

impl MigrateMetadata {
    /// The metadata file path for a project root.
    #[must_use]
    pub fn path_for(project_root: &Path) -> PathBuf {
        project_root.join(METADATA_FILE)
    }

    /// Load metadata from a project root. Missing file → defaults.
    ///
    /// # Errors
    /// Returns [`MigrateError::MetadataError`] when the file exists but does
    /// not parse.
    pub fn load(project_root: &Path) -> Result<Self, MigrateError> {
        let path = Self::path_for(project_root);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(MigrateError::MetadataError {
                    path,
                    detail: err.to_string(),
                });
            }
        };
        serde_yaml::from_str(&content).map_err(|err| MigrateError::MetadataError {
            path,
            detail: err.to_string(),
        })
    }

    /// Serialize to YAML and write under the project root.
    ///
    /// # Errors
    /// Returns [`MigrateError::MetadataError`] on serialization failure,
    /// [`MigrateError::Io`] on write failure.
    pub fn save(&self, project_root: &Path) -> Result<(), MigrateError> {
        let path = Self::path_for(project_root);
        let yaml = serde_yaml::to_string(self).map_err(|err| MigrateError::MetadataError {
            path: path.clone(),
            detail: err.to_string(),
        })?;
        fs::write(&path, yaml)?;
        Ok(())
    }

    /// View as the engine's [`MigrateConfig`].
    #[must_use]
    pub fn to_config(&self) -> MigrateConfig {
        let platform_configs = self
            .platforms
            .iter()
            .map(|(platform, entry)| {
                (
                    *platform,
                    PlatformConfig {
                        platform: *platform,
                        base_revision: entry.base_revision.clone(),
                        create_revision: entry.create_revision.clone(),
                    },
                )
            })
            .collect();
        MigrateConfig {
            platform_configs,
            unmanaged_paths: self.unmanaged_files.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// MigrateConfig — the in-engine view
// ---------------------------------------------------------------------------

/// Per-platform scaffold revision description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlatformConfig {
    pub platform: PlatformTag,
    /// The revision that generated this platform's scaffold; absent triggers
    /// the fallback revision.
    pub base_revision: Option<RevisionId>,
    /// The revision this platform was last migrated to.
    pub create_revision: Option<RevisionId>,
}

/// The engine's view of the migration configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MigrateConfig {
    /// Configured platforms, keyed by tag.
    pub platform_configs: BTreeMap<PlatformTag, PlatformConfig>,
    /// Unmanaged paths, in metadata-file order.
    pub unmanaged_paths: Vec<RelativePath>,
}

// ---------------------------------------------------------------------------
// Project probing
// ---------------------------------------------------------------------------

/// The Android scaffold language.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AndroidLanguage {
    #[default]
    Kotlin,
    Java,
}

impl AndroidLanguage {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Kotlin => "kotlin",
            Self::Java => "java",
        }
    }
}

/// The iOS scaffold language.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IosLanguage {
    #[default]
    Swift,
    ObjC,
}

impl IosLanguage {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Swift => "swift",
            Self::ObjC => "objc",
        }
    }
}

/// Facts about the user's project the scaffold generator needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectProbe {
    /// Application name from the project manifest (or the directory name).
    pub app_name: String,
    pub android_language: AndroidLanguage,
    pub ios_language: IosLanguage,
}

impl ProjectProbe {
    /// Probe a project directory.
    ///
    /// # Errors
    /// Returns [`MigrateError::NotAnAppProject`] when the manifest declares a
    /// module or plugin rather than an application.
    pub fn probe(project_root: &Path) -> Result<Self, MigrateError> {
        let app_name = manifest_app_name(project_root)?.unwrap_or_else(|| {
            project_root
                .file_name()
                .map_or_else(|| "app".to_owned(), |n| n.to_string_lossy().into_owned())
        });

        Ok(Self {
            app_name,
            android_language: probe_android_language(project_root),
            ios_language: probe_ios_language(project_root),
        })
    }
}

fn manifest_app_name(project_root: &Path) -> Result<Option<String>, MigrateError> {
    let path = project_root.join(PROJECT_MANIFEST);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(MigrateError::MetadataError {
                path,
                detail: err.to_string(),
            });
        }
    };
    let manifest: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(|err| MigrateError::MetadataError {
            path,
            detail: err.to_string(),
        })?;

    for kind in ["module", "plugin"] {
        if manifest.get(kind).is_some() {
            return Err(MigrateError::NotAnAppProject {
                detail: format!("the project manifest declares a {kind}"),
            });
        }
    }

    Ok(manifest
        .get("name")
        .and_then(serde_yaml::Value::as_str)
        .map(str::to_owned))
}

fn probe_android_language(project_root: &Path) -> AndroidLanguage {
    let android = project_root.join("android");
    if android.join("app").join("build.gradle.kts").exists() {
        return AndroidLanguage::Kotlin;
    }
    let has_kotlin_source = WalkDir::new(&android)
        .into_iter()
        .filter_map(Result::ok)
        .any(|e| e.path().extension().is_some_and(|ext| ext == "kt"));
    if has_kotlin_source {
        AndroidLanguage::Kotlin
    } else if android.exists() {
        AndroidLanguage::Java
    } else {
        AndroidLanguage::default()
    }
}

fn probe_ios_language(project_root: &Path) -> IosLanguage {
    let ios = project_root.join("ios");
    if ios.join("Runner").join("AppDelegate.swift").exists() {
        return IosLanguage::Swift;
    }
    if ios.join("Runner").join("AppDelegate.m").exists() {
        return IosLanguage::ObjC;
    }
    IosLanguage::default()
}

/// Detect which platforms a project carries by its top-level directories.
/// `Root` is always present.
#[must_use]
pub fn detect_platforms(project_root: &Path) -> Vec<PlatformTag> {
    let mut platforms = vec![PlatformTag::Root];
    for tag in PlatformTag::ALL {
        if tag.is_root() {
            continue;
        }
        if project_root.join(tag.as_str()).is_dir() {
            platforms.push(tag);
        }
    }
    platforms
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
