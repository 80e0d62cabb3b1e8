//! SQLite connection wrapper.

use rusqlite::types::Value;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::config::SqliteConfig;
use crate::error::{SqliteError, SqliteResult};

/// A single SQLite connection running on its own background thread.
///
/// Clones share the same underlying connection, so an in-memory database is
/// visible through every clone.
#[derive(Clone)]
pub struct SqliteConnection {
    conn: Connection,
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection").finish_non_exhaustive()
    }
}

impl SqliteConnection {
    /// Open a connection and apply the configured pragmas.
    pub async fn open(config: &SqliteConfig) -> SqliteResult<Self> {
        let conn = match &config.path {
            crate::DatabasePath::Memory => Connection::open_in_memory().await?,
            crate::DatabasePath::File(path) => Connection::open(path).await?,
        };

        let init_sql = config.init_sql();
        conn.call(move |conn| {
            conn.execute_batch(&init_sql)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    /// Wrap an already open connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Execute multiple statements in a batch.
    pub async fn execute_batch(&self, sql: &str) -> SqliteResult<()> {
        let sql = sql.to_string();
        debug!(sql = %sql, "Executing batch");

        self.conn
            .call(move |conn| Ok(conn.execute_batch(&sql)?))
            .await
            .map_err(SqliteError::from)
    }

    /// Execute a statement with parameters and return the number of affected rows.
    pub async fn execute(&self, sql: &str, params: Vec<Value>) -> SqliteResult<usize> {
        let sql = sql.to_string();
        debug!(sql = %sql, "Executing statement");

        self.conn
            .call(move |conn| {
                let params_ref: Vec<&dyn rusqlite::ToSql> = params
                    .iter()
                    .map(|v| v as &dyn rusqlite::ToSql)
                    .collect();
                Ok(conn.execute(&sql, params_ref.as_slice())?)
            })
            .await
            .map_err(SqliteError::from)
    }

    /// Run a query returning a single integer.
    pub async fn query_i64(&self, sql: &str, params: Vec<Value>) -> SqliteResult<i64> {
        let sql = sql.to_string();
        debug!(sql = %sql, "Executing scalar query");

        self.conn
            .call(move |conn| {
                let params_ref: Vec<&dyn rusqlite::ToSql> = params
                    .iter()
                    .map(|v| v as &dyn rusqlite::ToSql)
                    .collect();
                Ok(conn.query_row(&sql, params_ref.as_slice(), |row| row.get(0))?)
            })
            .await
            .map_err(SqliteError::from)
    }

    /// Roll back the open transaction, if SQLite still has one.
    ///
    /// Returns `false` when SQLite already ended the transaction on its own.
    pub async fn rollback(&self) -> SqliteResult<bool> {
        self.conn
            .call(|conn| {
                if conn.is_autocommit() {
                    return Ok(false);
                }
                conn.execute_batch("ROLLBACK")?;
                Ok(true)
            })
            .await
            .map_err(SqliteError::from)
    }

    /// Get the inner connection.
    pub fn inner(&self) -> &Connection {
        &self.conn
    }
}
