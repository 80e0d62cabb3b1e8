//! Applied-migration bookkeeping.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::{MigrateResult, MigrationError};

/// Default name of the tracking table.
pub const DEFAULT_TABLE_NAME: &str = "migrations";

/// A row of the tracking table, unique on `(version, directory)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigrationRecord {
    /// Version of the applied file.
    pub version: i64,
    /// Directory of the applied file (`"."` for the root).
    pub directory: String,
    /// File name within the directory.
    pub file_name: String,
    /// When the file was applied.
    pub processed_at: DateTime<Utc>,
}

/// Read access to the tracking table.
#[async_trait::async_trait]
pub trait MigrationHistory: Send + Sync {
    /// All recorded migrations, ordered by directory then version.
    ///
    /// Returns an empty list when the tracking table does not exist yet.
    async fn applied(&self) -> MigrateResult<Vec<AppliedMigrationRecord>>;
}

/// Highest recorded version per directory.
pub fn high_water_marks(records: &[AppliedMigrationRecord]) -> HashMap<String, i64> {
    let mut marks = HashMap::new();
    for record in records {
        let mark = marks.entry(record.directory.clone()).or_insert(0);
        if record.version > *mark {
            *mark = record.version;
        }
    }
    marks
}

/// Validate a tracking table name.
///
/// Accepts a plain identifier or a `schema.table` pair made of ASCII
/// letters, digits and underscores, not starting with a digit.
pub fn validate_table_name(name: &str) -> MigrateResult<()> {
    let valid_part = |part: &str| {
        !part.is_empty()
            && !part.starts_with(|c: char| c.is_ascii_digit())
            && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    };

    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() > 2 || !parts.iter().all(|p| valid_part(p)) {
        return Err(MigrationError::config(format!(
            "invalid migration table name '{}'",
            name
        )));
    }
    Ok(())
}
