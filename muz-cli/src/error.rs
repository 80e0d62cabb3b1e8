//! CLI error types and result alias.

use miette::Diagnostic;
use thiserror::Error;

use muz_migrate::MigrationError;

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(muz::io))]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(muz::config),
        help("check muz.toml or the command-line overrides")
    )]
    Config(String),

    /// Migration error
    #[error("Migration error: {0}")]
    #[diagnostic(code(muz::migration))]
    Migration(#[from] MigrationError),

    /// Database error
    #[error("Database error: {0}")]
    #[diagnostic(code(muz::database))]
    Database(String),

    /// Provider not compiled into this binary
    #[error("Database provider '{0}' is not enabled in this build")]
    #[diagnostic(
        code(muz::provider),
        help("rebuild muz-cli with the matching cargo feature")
    )]
    ProviderDisabled(String),
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        CliError::Config(format!("Failed to parse TOML: {}", err))
    }
}

impl From<toml::ser::Error> for CliError {
    fn from(err: toml::ser::Error) -> Self {
        CliError::Config(format!("Failed to serialize TOML: {}", err))
    }
}

#[cfg(feature = "postgres")]
impl From<muz_postgres::PgError> for CliError {
    fn from(err: muz_postgres::PgError) -> Self {
        CliError::Database(err.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<muz_sqlite::SqliteError> for CliError {
    fn from(err: muz_sqlite::SqliteError) -> Self {
        CliError::Database(err.to_string())
    }
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Migration(MigrationError::Cancelled) => 130,
            _ => 1,
        }
    }
}
