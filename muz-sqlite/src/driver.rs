//! SQLite implementation of the migration driver.

use chrono::{DateTime, Utc};
use muz_migrate::{
    AppliedMigrationRecord, BoxError, Driver, MigrateResult, MigrationError, MigrationHistory,
    MigrationSet, SetReport, TransactionScope,
};
use rusqlite::types::Value;
use tracing::{debug, info, warn};

use crate::config::{SqliteConfig, SqliteDriverConfig};
use crate::connection::SqliteConnection;
use crate::error::{SqliteError, SqliteResult};

/// Applies migrations to a SQLite database and records them in a tracking table.
///
/// The tracking table holds one row per applied file and is unique on
/// `(version, directory)`.
#[derive(Debug)]
pub struct SqliteDriver {
    conn: SqliteConnection,
    config: SqliteDriverConfig,
    in_transaction: bool,
}

impl SqliteDriver {
    /// Create a driver over an open connection.
    pub fn new(conn: SqliteConnection, config: SqliteDriverConfig) -> SqliteResult<Self> {
        config.validate()?;
        Ok(Self {
            conn,
            config,
            in_transaction: false,
        })
    }

    /// Open a database and create a driver for it.
    pub async fn connect(config: &SqliteConfig, driver: SqliteDriverConfig) -> SqliteResult<Self> {
        let conn = SqliteConnection::open(config).await?;
        Self::new(conn, driver)
    }

    /// The underlying connection.
    pub fn connection(&self) -> &SqliteConnection {
        &self.conn
    }

    /// The driver settings.
    pub fn config(&self) -> &SqliteDriverConfig {
        &self.config
    }

    fn table(&self) -> &str {
        &self.config.table_name
    }

    fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\
             version INTEGER NOT NULL, \
             directory TEXT NOT NULL, \
             file_name TEXT NOT NULL, \
             processed_at TEXT NOT NULL, \
             UNIQUE (version, directory))",
            self.table()
        )
    }

    async fn begin(&mut self) -> SqliteResult<()> {
        self.conn.execute_batch("BEGIN").await?;
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> SqliteResult<()> {
        self.in_transaction = false;
        self.conn.execute_batch("COMMIT").await
    }

    async fn rollback(&mut self) -> SqliteResult<()> {
        self.in_transaction = false;
        if !self.conn.rollback().await? {
            debug!("Transaction already ended by SQLite");
        }
        Ok(())
    }

    async fn high_water_mark(&self, directory: &str) -> SqliteResult<i64> {
        let sql = format!(
            "SELECT COALESCE(MAX(version), 0) FROM {} WHERE directory = ?1",
            self.table()
        );
        self.conn
            .query_i64(&sql, vec![Value::Text(directory.to_string())])
            .await
    }

    async fn apply_file(
        &self,
        directory: &str,
        file_name: &str,
        version: i64,
        sql: String,
    ) -> SqliteResult<()> {
        self.conn.execute_batch(&sql).await?;

        let insert = format!(
            "INSERT INTO {} (version, directory, file_name, processed_at) VALUES (?1, ?2, ?3, ?4)",
            self.table()
        );
        self.conn
            .execute(
                &insert,
                vec![
                    Value::Integer(version),
                    Value::Text(directory.to_string()),
                    Value::Text(file_name.to_string()),
                    Value::Text(Utc::now().to_rfc3339()),
                ],
            )
            .await?;
        Ok(())
    }

    async fn table_exists(&self) -> SqliteResult<bool> {
        let (schema, name) = self.table().split_once('.').unwrap_or(("main", self.table()));
        let sql = format!(
            "SELECT COUNT(*) FROM {}.sqlite_master WHERE type = 'table' AND name = ?1",
            schema
        );
        let count = self
            .conn
            .query_i64(&sql, vec![Value::Text(name.to_string())])
            .await?;
        Ok(count > 0)
    }

    async fn load_records(&self) -> SqliteResult<Vec<AppliedMigrationRecord>> {
        if !self.table_exists().await? {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT version, directory, file_name, processed_at FROM {} ORDER BY directory, version",
            self.table()
        );
        let rows = self
            .conn
            .inner()
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                })?;
                let results: Result<Vec<_>, _> = rows.collect();
                Ok(results?)
            })
            .await?;

        rows.into_iter()
            .map(|(version, directory, file_name, processed_at)| -> SqliteResult<_> {
                let processed_at = DateTime::parse_from_rfc3339(&processed_at)
                    .map_err(|e| {
                        SqliteError::deserialization(format!(
                            "invalid processed_at '{}': {}",
                            processed_at, e
                        ))
                    })?
                    .with_timezone(&Utc);
                Ok(AppliedMigrationRecord {
                    version,
                    directory,
                    file_name,
                    processed_at,
                })
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl Driver for SqliteDriver {
    async fn start(&mut self) -> MigrateResult<()> {
        if self.config.scope == TransactionScope::PerRun {
            self.begin().await.map_err(MigrationError::setup)?;
        }

        let create = self.create_table_sql();
        if let Err(e) = self.conn.execute_batch(&create).await {
            if self.in_transaction {
                if let Err(rollback_err) = self.rollback().await {
                    warn!(error = %rollback_err, "Rollback after failed setup also failed");
                }
            }
            return Err(MigrationError::setup(e));
        }

        debug!(table = %self.table(), scope = ?self.config.scope, "Migration table ready");
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

            let apply_err = |e: BoxError| {
                MigrationError::apply(directory, &file.path, file.version, e)
            };
            let sql = set
                .read_to_string(&file.path)
                .map_err(|e| apply_err(e.into()))?;
            self.apply_file(directory, &file.path, file.version, sql)
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
impl MigrationHistory for SqliteDriver {
    async fn applied(&self) -> MigrateResult<Vec<AppliedMigrationRecord>> {
        self.load_records().await.map_err(MigrationError::history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn driver(config: SqliteDriverConfig) -> SqliteDriver {
        SqliteDriver::connect(&SqliteConfig::memory(), config)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_table_sql() {
        let driver = driver(SqliteDriverConfig::new().table_name("main.schema_migrations")).await;
        let sql = driver.create_table_sql();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS main.schema_migrations ("));
        assert!(sql.contains("UNIQUE (version, directory)"));
    }

    #[tokio::test]
    async fn test_rejects_invalid_table_name() {
        let err = SqliteDriver::connect(
            &SqliteConfig::memory(),
            SqliteDriverConfig::new().table_name("migrations; DROP TABLE users"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SqliteError::Config(_)));
    }

    #[tokio::test]
    async fn test_history_empty_before_start() {
        let driver = driver(SqliteDriverConfig::default()).await;
        assert!(driver.applied().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_start_end_creates_table() {
        let mut driver = driver(SqliteDriverConfig::default()).await;
        driver.start().await.unwrap();
        assert!(driver.in_transaction);
        driver.end(None).await.unwrap();
        assert!(!driver.in_transaction);
        assert!(driver.table_exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_rollback_discards_table() {
        let mut driver = driver(SqliteDriverConfig::default()).await;
        driver.start().await.unwrap();
        driver.end(Some(&MigrationError::Cancelled)).await.unwrap();
        assert!(!driver.table_exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_per_set_start_is_autocommit() {
        let mut driver =
            driver(SqliteDriverConfig::new().scope(TransactionScope::PerSet)).await;
        driver.start().await.unwrap();
        assert!(!driver.in_transaction);
        driver.end(Some(&MigrationError::Cancelled)).await.unwrap();
        assert!(driver.table_exists().await.unwrap());
    }
}
