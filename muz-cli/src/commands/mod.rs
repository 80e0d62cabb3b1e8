//! CLI command implementations.

pub mod init;
pub mod list;
pub mod migrate;
pub mod status;
pub mod version;

use std::path::Path;

use muz_migrate::Migrator;

use crate::cli::SourceArgs;
use crate::config::{Config, project_root};
use crate::error::CliResult;

/// Load the config file and apply the source overrides.
pub(crate) fn load_config(config_path: &Path, source: &SourceArgs) -> CliResult<Config> {
    let mut config = Config::load_or_default(config_path)?;
    config.apply_source_args(source);
    Ok(config)
}

/// Build a migrator over the configured directory.
pub(crate) fn migrator(config: &Config, config_path: &Path) -> CliResult<Migrator> {
    let root = project_root(config_path);
    Ok(Migrator::new(config.migration_config(&root))?)
}
