//! Error types for the migration engine.

use thiserror::Error;

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrationError>;

/// Boxed error carried as the source of driver-side failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while discovering or applying migrations.
///
/// A run either succeeds completely or stops at the first of these.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Invalid configuration (base path, skip pattern, table name).
    #[error("configuration error: {0}")]
    Config(String),

    /// File system failure while walking or listing the migration tree.
    #[error("discovery failed at '{path}': {source}")]
    Discovery {
        /// Path relative to the migration root.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The driver could not prepare its bookkeeping.
    #[error("setup failed: {0}")]
    Setup(#[source] BoxError),

    /// A migration file could not be executed or recorded.
    #[error("failed to apply migration '{file}' in '{directory}' (version {version}): {source}")]
    Apply {
        /// Directory of the migration set.
        directory: String,
        /// File name within the directory.
        file: String,
        /// Version parsed from the file name.
        version: i64,
        /// Underlying driver error.
        #[source]
        source: BoxError,
    },

    /// Commit or rollback failed while ending the run.
    #[error("finalize failed: {0}")]
    Finalize(#[source] BoxError),

    /// The tracking table could not be read.
    #[error("failed to read migration history: {0}")]
    History(#[source] BoxError),

    /// The run was cancelled between migration sets.
    #[error("migration run cancelled")]
    Cancelled,
}

impl MigrationError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a discovery error for a path.
    pub fn discovery(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Discovery {
            path: path.into(),
            source,
        }
    }

    /// Create a setup error.
    pub fn setup(source: impl Into<BoxError>) -> Self {
        Self::Setup(source.into())
    }

    /// Create an apply error for a file of a migration set.
    pub fn apply(
        directory: impl Into<String>,
        file: impl Into<String>,
        version: i64,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Apply {
            directory: directory.into(),
            file: file.into(),
            version,
            source: source.into(),
        }
    }

    /// Create a finalize error.
    pub fn finalize(source: impl Into<BoxError>) -> Self {
        Self::Finalize(source.into())
    }

    /// Create a history error.
    pub fn history(source: impl Into<BoxError>) -> Self {
        Self::History(source.into())
    }

    /// Check if this error came from cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Get the `(directory, file, version)` of the failing migration, if any.
    pub fn failed_migration(&self) -> Option<(&str, &str, i64)> {
        match self {
            Self::Apply {
                directory,
                file,
                version,
                ..
            } => Some((directory.as_str(), file.as_str(), *version)),
            _ => None,
        }
    }
}
