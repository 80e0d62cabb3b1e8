//! SQLite migration driver for muz.
//!
//! This crate applies muz migrations to SQLite using `tokio-rusqlite` for
//! asynchronous access.
//!
//! # Features
//!
//! - In-memory and file-based databases
//! - Run-wide or per-directory transactions
//! - Applied-migration history for `muz status`
//!
//! # Example
//!
//! ```rust,ignore
//! use muz_migrate::Migrator;
//! use muz_sqlite::{SqliteConfig, SqliteDriver, SqliteDriverConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SqliteConfig::from_url("sqlite://./app.db")?;
//!     let mut driver = SqliteDriver::connect(&config, SqliteDriverConfig::default()).await?;
//!
//!     let report = Migrator::from_dir("./migrations")?.run(&mut driver).await?;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod driver;
pub mod error;

pub use config::{DatabasePath, JournalMode, SqliteConfig, SqliteDriverConfig, SynchronousMode};
pub use connection::SqliteConnection;
pub use driver::SqliteDriver;
pub use error::{SqliteError, SqliteResult};
