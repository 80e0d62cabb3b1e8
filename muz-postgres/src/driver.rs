//! PostgreSQL implementation of the migration driver.

use chrono::{DateTime, Utc};
use muz_migrate::{
    AppliedMigrationRecord, BoxError, Driver, MigrateResult, MigrationError, MigrationHistory,
    MigrationSet, SetReport, TransactionScope,
};
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error, info, warn};

use crate::config::{PgConfig, PgDriverConfig};
use crate::error::{PgError, PgResult};

/// Applies migrations to PostgreSQL and records them in a tracking table.
///
/// Each file is sent with the simple query protocol, so a file may contain
/// several statements.
pub struct PgDriver {
    client: Client,
    config: PgDriverConfig,
    in_transaction: bool,
}

impl std::fmt::Debug for PgDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgDriver")
            .field("config", &self.config)
            .field("in_transaction", &self.in_transaction)
            .finish_non_exhaustive()
    }
}

fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\
         version INTEGER NOT NULL, \
         directory TEXT NOT NULL, \
         file_name TEXT NOT NULL, \
         processed_at TIMESTAMP WITH TIME ZONE DEFAULT NOW() NOT NULL, \
         UNIQUE (version, directory))",
        table
    )
}

fn high_water_mark_sql(table: &str) -> String {
    format!(
        "SELECT COALESCE(MAX(version), 0)::BIGINT FROM {} WHERE directory = $1",
        table
    )
}

fn insert_sql(table: &str) -> String {
    format!(
        "INSERT INTO {} (version, directory, file_name) VALUES ($1::INTEGER, $2, $3)",
        table
    )
}

/// Versions are stored in an `integer` column.
fn column_version(version: i64) -> PgResult<i32> {
    i32::try_from(version).map_err(|_| PgError::VersionOutOfRange(version))
}

fn select_records_sql(table: &str) -> String {
    format!(
        "SELECT version::BIGINT, directory, file_name, processed_at FROM {} \
         ORDER BY directory, version",
        table
    )
}

impl PgDriver {
    /// Create a driver over a connected client.
    pub fn new(client: Client, config: PgDriverConfig) -> PgResult<Self> {
        config.validate()?;
        Ok(Self {
            client,
            config,
            in_transaction: false,
        })
    }

    /// Connect to the server and create a driver.
    ///
    /// The connection task is spawned onto the current Tokio runtime.
    pub async fn connect(config: &PgConfig, driver: PgDriverConfig) -> PgResult<Self> {
        driver.validate()?;

        let (client, connection) = config
            .to_pg_config()
            .connect(NoTls)
            .await
            .map_err(|e| PgError::connection(format!("failed to connect to {}: {}", config.host, e)))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "PostgreSQL connection error");
            }
        });

        info!(
            host = %config.host,
            port = %config.port,
            database = %config.database,
            "Connected to PostgreSQL"
        );

        Self::new(client, driver)
    }

    /// The underlying client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The driver settings.
    pub fn config(&self) -> &PgDriverConfig {
        &self.config
    }

    fn table(&self) -> &str {
        &self.config.table_name
    }

    async fn begin(&mut self) -> PgResult<()> {
        self.client.batch_execute("BEGIN").await?;
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> PgResult<()> {
        self.in_transaction = false;
        self.client.batch_execute("COMMIT").await?;
        Ok(())
    }

    async fn rollback(&mut self) -> PgResult<()> {
        self.in_transaction = false;
        self.client.batch_execute("ROLLBACK").await?;
        Ok(())
    }

    async fn high_water_mark(&self, directory: &str) -> PgResult<i64> {
        let sql = high_water_mark_sql(self.table());
        debug!(sql = %sql, directory = %directory, "Reading high-water mark");
        let row = self.client.query_one(&sql, &[&directory]).await?;
        Ok(row.try_get(0)?)
    }

    async fn apply_file(
        &self,
        directory: &str,
        file_name: &str,
        version: i64,
        sql: &str,
    ) -> PgResult<()> {
        let version = column_version(version)?;
        self.client.batch_execute(sql).await?;
        self.client
            .execute(&insert_sql(self.table()), &[&version, &directory, &file_name])
            .await?;
        Ok(())
    }

    async fn load_records(&self) -> PgResult<Vec<AppliedMigrationRecord>> {
        let exists: bool = self
            .client
            .query_one("SELECT to_regclass($1::text) IS NOT NULL", &[&self.table()])
            .await?
            .try_get(0)?;
        if !exists {
            return Ok(Vec::new());
        }

        let rows = self
            .client
            .query(&select_records_sql(self.table()), &[])
            .await?;

        rows.iter()
            .map(|row| {
                Ok::<_, PgError>(AppliedMigrationRecord {
                    version: row.try_get(0)?,
                    directory: row.try_get(1)?,
                    file_name: row.try_get(2)?,
                    processed_at: row.try_get::<_, DateTime<Utc>>(3)?,
                })
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl Driver for PgDriver {
    async fn start(&mut self) -> MigrateResult<()> {
        if self.config.scope == TransactionScope::PerRun {
            self.begin().await.map_err(MigrationError::setup)?;
        }

        let create = create_table_sql(self.table());
        debug!(sql = %create, "Ensuring migration table");
        if let Err(e) = self.client.batch_execute(&create).await {
            if self.in_transaction {
                if let Err(rollback_err) = self.rollback().await {
                    warn!(error = %rollback_err, "Rollback after failed setup also failed");
                }
            }
            return Err(MigrationError::setup(PgError::from(e)));
        }

        Ok(())
    }

    async fn process(&mut self, set: &MigrationSet) -> MigrateResult<SetReport> {
        let directory = set.directory();

        if self.config.scope == TransactionScope::PerSet {
            self.begin().await.map_err(MigrationError::setup)?;
        }

        let mark = self
            .high_water_mark(directory)
            .await
            .map_err(MigrationError::setup)?;
        let mut report = SetReport::new(directory, mark);

        for file in set.files() {
            if !report.is_pending(file) {
                debug!(directory = %directory, file = %file.path, "Already applied, skipping");
                report.record_skipped();
                continue;
            }

            let apply_err =
                |e: BoxError| MigrationError::apply(directory, &file.path, file.version, e);
            let sql = set
                .read_to_string(&file.path)
                .map_err(|e| apply_err(e.into()))?;
            self.apply_file(directory, &file.path, file.version, &sql)
                .await
                .map_err(|e| apply_err(e.into()))?;

            info!(directory = %directory, file = %file.path, version = file.version, "Migration executed");
            report.record_applied(file);
        }

        if self.config.scope == TransactionScope::PerSet {
            self.commit().await.map_err(MigrationError::finalize)?;
        }

        Ok(report)
    }

    async fn end(&mut self, error: Option<&MigrationError>) -> MigrateResult<()> {
        if !self.in_transaction {
            return Ok(());
        }

        match error {
            None => self.commit().await.map_err(MigrationError::finalize),
            Some(err) => {
                warn!(error = %err, "Rolling back migrations");
                self.rollback().await.map_err(MigrationError::finalize)
            }
        }
    }
}

#[async_trait::async_trait]
impl MigrationHistory for PgDriver {
    async fn applied(&self) -> MigrateResult<Vec<AppliedMigrationRecord>> {
        self.load_records().await.map_err(MigrationError::history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_table_sql() {
        let sql = create_table_sql("public.migrations");
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS public.migrations ("));
        assert!(sql.contains("version INTEGER NOT NULL"));
        assert!(sql.contains("processed_at TIMESTAMP WITH TIME ZONE DEFAULT NOW() NOT NULL"));
        assert!(sql.contains("UNIQUE (version, directory)"));
    }

    #[test]
    fn test_statement_sql() {
        assert_eq!(
            high_water_mark_sql("migrations"),
            "SELECT COALESCE(MAX(version), 0)::BIGINT FROM migrations WHERE directory = $1"
        );
        assert_eq!(
            insert_sql("migrations"),
            "INSERT INTO migrations (version, directory, file_name) VALUES ($1::INTEGER, $2, $3)"
        );
        assert_eq!(
            select_records_sql("m"),
            "SELECT version::BIGINT, directory, file_name, processed_at FROM m \
             ORDER BY directory, version"
        );
    }

    #[test]
    fn test_column_version_range() {
        assert_eq!(column_version(1).unwrap(), 1);
        assert_eq!(column_version(i32::MAX as i64).unwrap(), i32::MAX);

        let err = column_version(i32::MAX as i64 + 1).unwrap_err();
        assert!(matches!(err, PgError::VersionOutOfRange(2147483648)));
        assert!(err.to_string().contains("2147483648"));
    }
}
