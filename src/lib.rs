//! uplift library crate — the migration computation engine.
//!
//! The primary interface is the `uplift` CLI binary; this lib.rs exposes the
//! engine modules so the binary and integration tests can access them.
//!
//! Entry points: [`compute::compute_migration`] produces a
//! [`model::MigrationResult`]; [`manifest::write_working_directory`] stages
//! it under the project root for `status`/`apply`.

pub mod classify;
pub mod compute;
pub mod custom;
pub mod env;
pub mod error;
pub mod exec;
pub mod fsutil;
pub mod git;
pub mod manifest;
pub mod metadata;
pub mod model;
pub mod revisions;
pub mod telemetry;
pub mod template;

pub use compute::{compute_migration, ComputeOptions};
pub use env::{CancelFlag, MigrateEnv, ToolkitInstall};
pub use error::MigrateError;
pub use manifest::{write_working_directory, Manifest};
pub use model::MigrationResult;
