//! Connects to the configured provider and dispatches to its driver.

use async_trait::async_trait;
use muz_migrate::{
    AppliedMigrationRecord, Driver, MigrateResult, MigrationError, MigrationHistory, MigrationSet,
    SetReport,
};

use crate::cli::DatabaseProvider;
use crate::config::DatabaseTarget;
use crate::error::CliResult;

/// A driver for whichever provider the configuration names.
#[derive(Debug)]
pub enum AnyDriver {
    #[cfg(feature = "postgres")]
    Postgres(muz_postgres::PgDriver),
    #[cfg(feature = "sqlite")]
    Sqlite(muz_sqlite::SqliteDriver),
}

impl AnyDriver {
    /// Open a connection for `target`.
    pub async fn connect(target: &DatabaseTarget) -> CliResult<Self> {
        tracing::debug!(provider = %target.provider, table = %target.table_name, "Connecting");

        match target.provider {
            DatabaseProvider::Postgresql => connect_postgres(target).await,
            DatabaseProvider::Sqlite => connect_sqlite(target).await,
        }
    }

    /// The provider behind this driver.
    pub fn provider(&self) -> DatabaseProvider {
        match self {
            #[cfg(feature = "postgres")]
            AnyDriver::Postgres(_) => DatabaseProvider::Postgresql,
            #[cfg(feature = "sqlite")]
            AnyDriver::Sqlite(_) => DatabaseProvider::Sqlite,
        }
    }
}

#[cfg(feature = "postgres")]
async fn connect_postgres(target: &DatabaseTarget) -> CliResult<AnyDriver> {
    use muz_postgres::{PgConfig, PgDriver, PgDriverConfig};

    let config = PgConfig::from_url(&target.url)?;
    let driver = PgDriver::connect(
        &config,
        PgDriverConfig::new()
            .table_name(&target.table_name)
            .scope(target.scope),
    )
    .await?;
    Ok(AnyDriver::Postgres(driver))
}

#[cfg(not(feature = "postgres"))]
async fn connect_postgres(_target: &DatabaseTarget) -> CliResult<AnyDriver> {
    Err(crate::error::CliError::ProviderDisabled("postgresql".to_string()))
}

#[cfg(feature = "sqlite")]
async fn connect_sqlite(target: &DatabaseTarget) -> CliResult<AnyDriver> {
    use muz_sqlite::{SqliteConfig, SqliteDriver, SqliteDriverConfig};

    let config = SqliteConfig::from_url(&target.url)?;
    let driver = SqliteDriver::connect(
        &config,
        SqliteDriverConfig::new()
            .table_name(&target.table_name)
            .scope(target.scope),
    )
    .await?;
    Ok(AnyDriver::Sqlite(driver))
}

#[cfg(not(feature = "sqlite"))]
async fn connect_sqlite(_target: &DatabaseTarget) -> CliResult<AnyDriver> {
    Err(crate::error::CliError::ProviderDisabled("sqlite".to_string()))
}

#[async_trait]
impl Driver for AnyDriver {
    async fn start(&mut self) -> MigrateResult<()> {
        match self {
            #[cfg(feature = "postgres")]
            AnyDriver::Postgres(d) => d.start().await,
            #[cfg(feature = "sqlite")]
            AnyDriver::Sqlite(d) => d.start().await,
        }
    }

    async fn process(&mut self, set: &MigrationSet) -> MigrateResult<SetReport> {
        match self {
            #[cfg(feature = "postgres")]
            AnyDriver::Postgres(d) => d.process(set).await,
            #[cfg(feature = "sqlite")]
            AnyDriver::Sqlite(d) => d.process(set).await,
        }
    }

    async fn end(&mut self, error: Option<&MigrationError>) -> MigrateResult<()> {
        match self {
            #[cfg(feature = "postgres")]
            AnyDriver::Postgres(d) => d.end(error).await,
            #[cfg(feature = "sqlite")]
            AnyDriver::Sqlite(d) => d.end(error).await,
        }
    }
}

#[async_trait]
impl MigrationHistory for AnyDriver {
    async fn applied(&self) -> MigrateResult<Vec<AppliedMigrationRecord>> {
        match self {
            #[cfg(feature = "postgres")]
            AnyDriver::Postgres(d) => d.applied().await,
            #[cfg(feature = "sqlite")]
            AnyDriver::Sqlite(d) => d.applied().await,
        }
    }
}
