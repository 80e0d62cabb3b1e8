//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::CONFIG_FILE_NAME;

/// muz - directory-based SQL migrations
#[derive(Parser, Debug)]
#[command(name = "muz")]
#[command(author = "Pegasus Heavy Industries LLC")]
#[command(version)]
#[command(about = "muz - directory-based SQL migrations", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a new muz project
    Init(InitArgs),

    /// Apply pending migrations
    Migrate(MigrateArgs),

    /// List discovered migrations without touching the database
    List(ListArgs),

    /// Show applied and pending migrations
    Status(StatusArgs),

    /// Display version information
    Version,
}

// =============================================================================
// Shared Arguments
// =============================================================================

/// Overrides for the `[migrations]` section of the config file
#[derive(Args, Debug, Default, Clone)]
pub struct SourceArgs {
    /// Migrations directory
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Directories to process first, in order (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub order: Vec<String>,

    /// Glob patterns of paths to skip (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,

    /// Only consider files with this extension
    #[arg(short, long)]
    pub extension: Option<String>,
}

/// Overrides for the `[database]` section of the config file
#[derive(Args, Debug, Default, Clone)]
pub struct DatabaseArgs {
    /// Database connection URL
    #[arg(long, env = "MUZ_DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Database provider (inferred from the URL when omitted)
    #[arg(short, long)]
    pub provider: Option<DatabaseProvider>,

    /// Name of the tracking table
    #[arg(long)]
    pub table: Option<String>,
}

// =============================================================================
// Init Command
// =============================================================================

/// Arguments for the `init` command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path to initialize the project (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Database provider to use
    #[arg(short, long, default_value = "postgresql")]
    pub provider: DatabaseProvider,

    /// Database connection URL
    #[arg(short, long)]
    pub url: Option<String>,

    /// Overwrite an existing configuration file
    #[arg(short, long)]
    pub force: bool,
}

// =============================================================================
// Migrate Command
// =============================================================================

/// Arguments for the `migrate` command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub database: DatabaseArgs,

    /// Transaction boundaries: per_run or per_set
    #[arg(short, long)]
    pub transaction: Option<String>,
}

// =============================================================================
// List Command
// =============================================================================

/// Arguments for the `list` command
#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

// =============================================================================
// Status Command
// =============================================================================

/// Arguments for the `status` command
#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub database: DatabaseArgs,
}

/// Supported database providers
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseProvider {
    #[default]
    #[serde(alias = "postgres")]
    Postgresql,
    Sqlite,
}

impl DatabaseProvider {
    /// Infer the provider from a connection URL scheme.
    pub fn from_url(url: &str) -> Option<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Some(Self::Postgresql)
        } else if url.starts_with("sqlite:") || url.starts_with("file:") || url == ":memory:" {
            Some(Self::Sqlite)
        } else {
            None
        }
    }
}

impl std::fmt::Display for DatabaseProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseProvider::Postgresql => write!(f, "postgresql"),
            DatabaseProvider::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl std::str::FromStr for DatabaseProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgresql" | "postgres" => Ok(Self::Postgresql),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!("unsupported database provider: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_migrate() {
        let cli = Cli::parse_from([
            "muz",
            "-vv",
            "migrate",
            "--dir",
            "db",
            "--order",
            "schema,data",
            "--skip",
            "*/drafts",
            "--database-url",
            "sqlite::memory:",
            "--transaction",
            "per_set",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Migrate(args) => {
                assert_eq!(args.source.dir, Some(PathBuf::from("db")));
                assert_eq!(args.source.order, vec!["schema", "data"]);
                assert_eq!(args.source.skip, vec!["*/drafts"]);
                assert_eq!(args.database.database_url.as_deref(), Some("sqlite::memory:"));
                assert_eq!(args.transaction.as_deref(), Some("per_set"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_provider_from_url() {
        assert_eq!(
            DatabaseProvider::from_url("postgres://localhost/db"),
            Some(DatabaseProvider::Postgresql)
        );
        assert_eq!(
            DatabaseProvider::from_url("sqlite://./dev.db"),
            Some(DatabaseProvider::Sqlite)
        );
        assert_eq!(DatabaseProvider::from_url("mysql://localhost/db"), None);
        assert_eq!(
            "Postgres".parse::<DatabaseProvider>(),
            Ok(DatabaseProvider::Postgresql)
        );
        assert!("oracle".parse::<DatabaseProvider>().is_err());
    }
}
