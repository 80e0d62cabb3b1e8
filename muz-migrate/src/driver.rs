//! The storage driver protocol.
//!
//! A run moves a driver through `start -> process* -> end`:
//!
//! ```text
//! NotStarted ──start()──▶ Started ──process(set)──▶ Started ... ──end(err)──▶ Ended
//! ```
//!
//! `end` is called exactly once whenever `start` succeeded, receiving the
//! error that stopped the run (if any). Drivers decide how their atomic scope
//! maps onto the run through [`TransactionScope`].

use serde::{Deserialize, Serialize};

use crate::error::{MigrateResult, MigrationError};
use crate::file::{MigrationFile, MigrationSet};

/// Outcome of processing one migration set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SetReport {
    /// Directory of the set.
    pub directory: String,
    /// Files executed and recorded, in order.
    pub applied: Vec<MigrationFile>,
    /// Files at or below the high-water mark that were left alone.
    pub skipped: usize,
    /// High-water mark after processing.
    pub high_water_mark: i64,
}

impl SetReport {
    /// Start a report for a directory at a given high-water mark.
    pub fn new(directory: impl Into<String>, high_water_mark: i64) -> Self {
        Self {
            directory: directory.into(),
            high_water_mark,
            ..Default::default()
        }
    }

    /// Whether `file` is newer than the current high-water mark.
    pub fn is_pending(&self, file: &MigrationFile) -> bool {
        file.version > self.high_water_mark
    }

    /// Record a successfully applied file and advance the mark.
    pub fn record_applied(&mut self, file: &MigrationFile) {
        self.high_water_mark = file.version;
        self.applied.push(file.clone());
    }

    /// Record a file left alone.
    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }
}

/// How a driver bounds its transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionScope {
    /// One transaction for the whole run; any failure rolls everything back.
    #[default]
    PerRun,
    /// One transaction per migration set; earlier sets stay committed.
    PerSet,
}

impl std::str::FromStr for TransactionScope {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "per_run" | "run" => Ok(Self::PerRun),
            "per_set" | "set" => Ok(Self::PerSet),
            other => Err(MigrationError::config(format!(
                "invalid transaction scope '{}': expected 'per_run' or 'per_set'",
                other
            ))),
        }
    }
}

/// A storage backend that records and executes migrations.
#[async_trait::async_trait]
pub trait Driver: Send {
    /// Prepare bookkeeping and open the atomic scope.
    ///
    /// Errors should be [`MigrationError::Setup`].
    async fn start(&mut self) -> MigrateResult<()>;

    /// Apply every file of `set` above the directory's high-water mark.
    ///
    /// Errors should be [`MigrationError::Apply`] naming the failing file.
    async fn process(&mut self, set: &MigrationSet) -> MigrateResult<SetReport>;

    /// Commit on `None`, roll back on `Some`.
    ///
    /// Errors should be [`MigrationError::Finalize`].
    async fn end(&mut self, error: Option<&MigrationError>) -> MigrateResult<()>;
}

#[async_trait::async_trait]
impl<D: Driver + ?Sized> Driver for Box<D> {
    async fn start(&mut self) -> MigrateResult<()> {
        (**self).start().await
    }

    async fn process(&mut self, set: &MigrationSet) -> MigrateResult<SetReport> {
        (**self).process(set).await
    }

    async fn end(&mut self, error: Option<&MigrationError>) -> MigrateResult<()> {
        (**self).end(error).await
    }
}
