//! # muz
//!
//! Directory-based SQL migrations for Rust.
//!
//! muz walks a tree of migration directories, orders them (priority
//! directories first, then lexically), keeps the files whose names start with
//! a version number, and applies each one at most once per directory through
//! a database driver:
//! - Glob skip rules for directories and files
//! - A per-directory high-water mark stored in a tracking table
//! - One transaction for the run, or one per directory
//! - PostgreSQL and SQLite drivers behind features
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use muz::prelude::*;
//! use muz::sqlite::{SqliteConfig, SqliteDriver, SqliteDriverConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let migrator = Migrator::new(
//!         MigrationConfig::new()
//!             .base_path("./migrations")
//!             .order(["schema", "functions"])
//!             .skip(["**/*.md"]),
//!     )?;
//!
//!     let config = SqliteConfig::from_url("sqlite://./app.db")?;
//!     let mut driver = SqliteDriver::connect(&config, SqliteDriverConfig::default()).await?;
//!
//!     let report = migrator.run(&mut driver).await?;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Discovery, ordering and the migration engine.
pub mod migrate {
    pub use muz_migrate::*;
}

/// PostgreSQL driver.
#[cfg(feature = "postgres")]
#[cfg_attr(docsrs, doc(cfg(feature = "postgres")))]
pub mod postgres {
    pub use muz_postgres::*;
}

/// SQLite driver.
#[cfg(feature = "sqlite")]
#[cfg_attr(docsrs, doc(cfg(feature = "sqlite")))]
pub mod sqlite {
    pub use muz_sqlite::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::migrate::{
        CancellationToken, Driver, MigrateResult, MigrationConfig, MigrationError,
        MigrationHistory, MigrationReport, MigrationSet, Migrator, TransactionScope,
    };
}

// Re-export key types at the crate root
pub use migrate::{MigrateResult, MigrationConfig, MigrationError, Migrator};
