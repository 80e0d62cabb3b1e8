//! # muz-migrate
//!
//! Discovery and execution engine for muz migrations.
//!
//! This crate provides functionality for:
//! - Walking a migration tree with glob-based skip rules
//! - Ordering directories by priority and files by their numeric prefix
//! - Applying each directory's files at most once through a storage [`Driver`]
//! - Inspecting what has already been applied
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌────────────────┐
//! │ FileSource   │────▶│ Discovery      │────▶│ MigrationSet*  │
//! └──────────────┘     └────────────────┘     └────────────────┘
//!                              ▲                      │
//!                              │                      ▼
//!                      ┌────────────────┐     ┌────────────────┐
//!                      │ Migrator       │────▶│ Driver         │
//!                      └────────────────┘     │ start/process/ │
//!                                             │ end            │
//!                                             └────────────────┘
//! ```
//!
//! Each directory is a separate migration set with its own version sequence.
//! A driver records `(version, directory)` for every applied file and skips
//! any file at or below the directory's highest recorded version.
//!
//! ## Example
//!
//! ```rust,ignore
//! use muz_migrate::{MigrationConfig, Migrator};
//!
//! async fn run_migrations(driver: &mut impl muz_migrate::Driver) -> muz_migrate::MigrateResult<()> {
//!     let config = MigrationConfig::new()
//!         .base_path("./migrations")
//!         .order(["schema", "data"])
//!         .skip(["scratch/**"])
//!         .extension(".sql");
//!
//!     let migrator = Migrator::new(config)?;
//!     let report = migrator.run(driver).await?;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```
//!
//! ## Migration Files
//!
//! ```text
//! migrations/
//! ├── 001_extensions.sql      # directory "."
//! ├── schema/
//! │   ├── 001_users.sql       # directory "schema", version 1
//! │   └── 002_posts.sql
//! └── data/
//!     └── 001_seed.sql        # directory "data", version 1
//! ```

pub mod discover;
pub mod driver;
pub mod engine;
pub mod error;
pub mod file;
pub mod filter;
pub mod history;
pub mod source;
pub mod version;

// Re-exports
pub use discover::{Discovery, OrderingSpec, discover};
pub use driver::{Driver, SetReport, TransactionScope};
pub use engine::{
    DEFAULT_BASE_PATH, FileState, FileStatus, MigrationConfig, MigrationReport, MigrationStatus,
    Migrator, SetStatus, run_sets,
};
pub use error::{BoxError, MigrateResult, MigrationError};
pub use file::{MigrationFile, MigrationSet};
pub use filter::{Exclusion, PathFilter};
pub use history::{
    AppliedMigrationRecord, DEFAULT_TABLE_NAME, MigrationHistory, high_water_marks,
    validate_table_name,
};
pub use source::{DirSource, FileSource, MemorySource, SourceEntry};
pub use version::extract_version;

/// Re-exported so callers can build cancellation tokens without a direct dependency.
pub use tokio_util::sync::CancellationToken;
