//! uplift data model — core types and per-file outcomes.

pub mod outcome;
pub mod types;

pub use outcome::{DiffOutcome, FilePendingMigration, MergeOutcome, MergedBody, MigrationResult};
pub use types::{MergeType, PlatformTag, RelativePath, RevisionId, ValidationError};
