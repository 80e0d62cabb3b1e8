//! CLI configuration handling.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use muz_migrate::{DEFAULT_BASE_PATH, DEFAULT_TABLE_NAME, MigrationConfig, TransactionScope};

use crate::cli::{DatabaseArgs, DatabaseProvider, SourceArgs};
use crate::error::{CliError, CliResult};

/// Default config file name (lives in project root)
pub const CONFIG_FILE_NAME: &str = "muz.toml";

/// muz CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Migration configuration
    pub migrations: MigrationsConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is missing
    pub fn load_or_default(path: &Path) -> CliResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> CliResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Create a default config for a specific provider
    pub fn default_for_provider(provider: DatabaseProvider) -> Self {
        let mut config = Self::default();
        config.database.provider = Some(provider);
        config
    }

    /// Apply command-line overrides to the `[migrations]` section.
    pub fn apply_source_args(&mut self, args: &SourceArgs) {
        if let Some(ref dir) = args.dir {
            self.migrations.directory = dir.clone();
        }
        if !args.order.is_empty() {
            self.migrations.order = args.order.clone();
        }
        if !args.skip.is_empty() {
            self.migrations.skip = args.skip.clone();
        }
        if let Some(ref ext) = args.extension {
            self.migrations.extension = Some(ext.clone());
        }
    }

    /// Apply command-line overrides to the `[database]` section.
    pub fn apply_database_args(&mut self, args: &DatabaseArgs) {
        if let Some(ref url) = args.database_url {
            self.database.url = Some(url.clone());
        }
        if let Some(provider) = args.provider {
            self.database.provider = Some(provider);
        }
        if let Some(ref table) = args.table {
            self.migrations.table_name = table.clone();
        }
    }

    /// Build the engine configuration, resolving the directory against `root`.
    pub fn migration_config(&self, root: &Path) -> MigrationConfig {
        let m = &self.migrations;
        let mut config = MigrationConfig::new()
            .base_path(root.join(&m.directory))
            .order(m.order.iter().cloned())
            .skip(m.skip.iter().cloned());
        if let Some(ref ext) = m.extension {
            config = config.extension(ext.clone());
        }
        config
    }

    /// Resolve the connection target.
    pub fn database_target(&self) -> CliResult<DatabaseTarget> {
        let url = self.database.url.clone().ok_or_else(|| {
            CliError::Config(format!(
                "Database URL not found. Set MUZ_DATABASE_URL, pass --database-url, or configure [database].url in {}",
                CONFIG_FILE_NAME
            ))
        })?;

        let provider = match self.database.provider {
            Some(provider) => provider,
            None => DatabaseProvider::from_url(&url).ok_or_else(|| {
                CliError::Config(format!(
                    "Cannot infer database provider from URL '{}'. Set [database].provider",
                    url
                ))
            })?,
        };

        Ok(DatabaseTarget {
            provider,
            url,
            table_name: self.migrations.table_name.clone(),
            scope: self.migrations.transaction,
        })
    }
}

/// Database configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database provider (postgresql, sqlite); inferred from the URL when unset
    pub provider: Option<DatabaseProvider>,

    /// Database connection URL
    pub url: Option<String>,
}

/// Migration configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationsConfig {
    /// Directory for migration files, relative to the config file
    pub directory: PathBuf,

    /// Directories applied first, in this order
    pub order: Vec<String>,

    /// Glob patterns of paths to skip
    pub skip: Vec<String>,

    /// Only files with this extension are migrations
    pub extension: Option<String>,

    /// Migration table name
    pub table_name: String,

    /// Transaction boundaries
    pub transaction: TransactionScope,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_BASE_PATH),
            order: Vec::new(),
            skip: Vec::new(),
            extension: None,
            table_name: DEFAULT_TABLE_NAME.to_string(),
            transaction: TransactionScope::default(),
        }
    }
}

/// Fully resolved connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseTarget {
    pub provider: DatabaseProvider,
    pub url: String,
    pub table_name: String,
    pub scope: TransactionScope,
}

/// Directory the configured paths are relative to.
pub fn project_root(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
