//! End-to-end migration runs against SQLite.
//!
//! These tests drive the full pipeline: an on-disk migration tree, discovery,
//! the orchestrator and the SQLite driver with its tracking table.

use std::path::Path;

use muz_migrate::{
    CancellationToken, FileState, MigrationConfig, MigrationError, MigrationHistory, Migrator,
    TransactionScope,
};
use muz_sqlite::{SqliteConfig, SqliteDriver, SqliteDriverConfig};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, sql: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, sql).unwrap();
}

async fn driver(scope: TransactionScope) -> SqliteDriver {
    SqliteDriver::connect(&SqliteConfig::memory(), SqliteDriverConfig::new().scope(scope))
        .await
        .unwrap()
}

async fn table_exists(driver: &SqliteDriver, name: &str) -> bool {
    driver
        .connection()
        .query_i64(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            vec![rusqlite::types::Value::Text(name.to_string())],
        )
        .await
        .unwrap()
        > 0
}

async fn recorded(driver: &SqliteDriver) -> Vec<String> {
    driver
        .applied()
        .await
        .unwrap()
        .into_iter()
        .map(|r| format!("{}/{}@{}", r.directory, r.file_name, r.version))
        .collect()
}

fn tree() -> TempDir {
    tempfile::tempdir().unwrap()
}

/// Test that a second run applies nothing
#[tokio::test]
async fn test_rerun_is_idempotent() {
    let dir = tree();
    write(dir.path(), "1_create_users.sql", "CREATE TABLE users (id INTEGER PRIMARY KEY);");
    write(dir.path(), "2_create_posts.sql", "CREATE TABLE posts (id INTEGER PRIMARY KEY);");

    let migrator = Migrator::from_dir(dir.path()).unwrap();
    let mut driver = driver(TransactionScope::PerRun).await;

    let report = migrator.run(&mut driver).await.unwrap();
    assert_eq!(report.applied_count(), 2);
    assert_eq!(
        recorded(&driver).await,
        vec!["./1_create_users.sql@1", "./2_create_posts.sql@2"]
    );

    let report = migrator.run(&mut driver).await.unwrap();
    assert_eq!(report.applied_count(), 0);
    assert_eq!(report.skipped_count(), 2);
    assert_eq!(recorded(&driver).await.len(), 2);
    assert!(table_exists(&driver, "users").await);
    assert!(table_exists(&driver, "posts").await);
}

/// Test that priority directories run before dependent ones
#[tokio::test]
async fn test_priority_order_satisfies_dependencies() {
    let dir = tree();
    write(dir.path(), "schema/1_users.sql", "CREATE TABLE users (name TEXT);");
    write(dir.path(), "data/1_seed.sql", "INSERT INTO users (name) VALUES ('admin');");

    // Lexical order runs data before schema.
    let migrator = Migrator::from_dir(dir.path()).unwrap();
    let mut driver = driver(TransactionScope::PerRun).await;
    let err = migrator.run(&mut driver).await.unwrap_err();
    assert_eq!(err.failed_migration(), Some(("data", "1_seed.sql", 1)));
    assert!(recorded(&driver).await.is_empty());

    let migrator = Migrator::new(
        MigrationConfig::new()
            .base_path(dir.path())
            .order(["/schema", "data"]),
    )
    .unwrap();
    let report = migrator.run(&mut driver).await.unwrap();
    let applied: Vec<_> = report.applied().map(|(d, f)| format!("{}/{}", d, f.path)).collect();
    assert_eq!(applied, vec!["schema/1_users.sql", "data/1_seed.sql"]);

    let users = driver
        .connection()
        .query_i64("SELECT COUNT(*) FROM users", vec![])
        .await
        .unwrap();
    assert_eq!(users, 1);
}

/// Test that a failure rolls back the whole run
#[tokio::test]
async fn test_failure_rolls_back_run() {
    let dir = tree();
    write(dir.path(), "a/1_ok.sql", "CREATE TABLE ok_table (id INTEGER);");
    write(dir.path(), "b/1_bad.sql", "CREATE TABLE broken (;");
    write(dir.path(), "c/1_never.sql", "CREATE TABLE never (id INTEGER);");

    let migrator = Migrator::from_dir(dir.path()).unwrap();
    let mut driver = driver(TransactionScope::PerRun).await;

    let err = migrator.run(&mut driver).await.unwrap_err();
    assert!(matches!(err, MigrationError::Apply { .. }));
    assert_eq!(err.failed_migration(), Some(("b", "1_bad.sql", 1)));

    assert!(!table_exists(&driver, "ok_table").await);
    assert!(!table_exists(&driver, "never").await);
    assert!(recorded(&driver).await.is_empty());

    // Fix the file and run again.
    write(dir.path(), "b/1_bad.sql", "CREATE TABLE broken (id INTEGER);");
    let report = migrator.run(&mut driver).await.unwrap();
    assert_eq!(report.applied_count(), 3);
}

/// Test that per-set transactions keep earlier sets committed
#[tokio::test]
async fn test_per_set_scope_keeps_committed_sets() {
    let dir = tree();
    write(dir.path(), "a/1_ok.sql", "CREATE TABLE ok_table (id INTEGER);");
    write(dir.path(), "b/1_first.sql", "CREATE TABLE b_first (id INTEGER);");
    write(dir.path(), "b/2_bad.sql", "NOT VALID SQL;");

    let migrator = Migrator::from_dir(dir.path()).unwrap();
    let mut driver = driver(TransactionScope::PerSet).await;

    let err = migrator.run(&mut driver).await.unwrap_err();
    assert_eq!(err.failed_migration(), Some(("b", "2_bad.sql", 2)));

    assert!(table_exists(&driver, "ok_table").await);
    assert!(!table_exists(&driver, "b_first").await);
    assert_eq!(recorded(&driver).await, vec!["a/1_ok.sql@1"]);
}

/// Test that files at or below the high-water mark are never applied
#[tokio::test]
async fn test_late_lower_version_is_skipped() {
    let dir = tree();
    write(dir.path(), "1_one.sql", "CREATE TABLE one (id INTEGER);");
    write(dir.path(), "3_three.sql", "CREATE TABLE three (id INTEGER);");

    let migrator = Migrator::from_dir(dir.path()).unwrap();
    let mut driver = driver(TransactionScope::PerRun).await;
    migrator.run(&mut driver).await.unwrap();

    write(dir.path(), "2_two.sql", "CREATE TABLE two (id INTEGER);");
    let report = migrator.run(&mut driver).await.unwrap();
    assert_eq!(report.applied_count(), 0);
    assert!(!table_exists(&driver, "two").await);

    let status = migrator.status(&driver).await.unwrap();
    let states: Vec<_> = status.sets[0]
        .files
        .iter()
        .map(|f| (f.file.path.as_str(), f.state))
        .collect();
    assert_eq!(
        states,
        vec![
            ("1_one.sql", FileState::Applied),
            ("2_two.sql", FileState::Skipped),
            ("3_three.sql", FileState::Applied),
        ]
    );
}

/// Test that duplicate versions in a directory apply only the first by name
#[tokio::test]
async fn test_duplicate_version_applies_first_name() {
    let dir = tree();
    write(dir.path(), "1_alpha.sql", "CREATE TABLE alpha (id INTEGER);");
    write(dir.path(), "1_beta.sql", "CREATE TABLE beta (id INTEGER);");

    let migrator = Migrator::from_dir(dir.path()).unwrap();
    let mut driver = driver(TransactionScope::PerRun).await;
    let report = migrator.run(&mut driver).await.unwrap();

    assert_eq!(report.applied_count(), 1);
    assert_eq!(report.skipped_count(), 1);
    assert!(table_exists(&driver, "alpha").await);
    assert!(!table_exists(&driver, "beta").await);
}

/// Test that each directory keeps its own version sequence
#[tokio::test]
async fn test_versions_are_per_directory() {
    let dir = tree();
    write(dir.path(), "1_root.sql", "CREATE TABLE root_t (id INTEGER);");
    write(dir.path(), "tenant/1_tenant.sql", "CREATE TABLE tenant_t (id INTEGER);");

    let migrator = Migrator::from_dir(dir.path()).unwrap();
    let mut driver = driver(TransactionScope::PerRun).await;
    migrator.run(&mut driver).await.unwrap();

    assert_eq!(
        recorded(&driver).await,
        vec!["./1_root.sql@1", "tenant/1_tenant.sql@1"]
    );
}

/// Test skip patterns and the extension filter
#[tokio::test]
async fn test_skip_and_extension() {
    let dir = tree();
    write(dir.path(), "1_init.sql", "CREATE TABLE init (id INTEGER);");
    write(dir.path(), "2_notes.txt", "not sql");
    write(dir.path(), "README.md", "docs");
    write(dir.path(), "scratch/1_wip.sql", "CREATE TABLE wip (;");
    write(dir.path(), "seeds/1_dev.sql", "CREATE TABLE dev_only (id INTEGER);");
    write(dir.path(), "seeds/2_prod.sql", "CREATE TABLE prod (id INTEGER);");

    let migrator = Migrator::new(
        MigrationConfig::new()
            .base_path(dir.path())
            .skip(["scratch", "/seeds/1_dev.sql"])
            .extension(".SQL"),
    )
    .unwrap();
    let mut driver = driver(TransactionScope::PerRun).await;
    migrator.run(&mut driver).await.unwrap();

    assert_eq!(
        recorded(&driver).await,
        vec!["./1_init.sql@1", "seeds/2_prod.sql@2"]
    );
}

/// Test that a cancelled run applies nothing and rolls back
#[tokio::test]
async fn test_cancelled_run() {
    let dir = tree();
    write(dir.path(), "1_init.sql", "CREATE TABLE init (id INTEGER);");

    let migrator = Migrator::from_dir(dir.path()).unwrap();
    let mut driver = driver(TransactionScope::PerRun).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = migrator.run_with_cancel(&mut driver, &cancel).await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(!table_exists(&driver, "init").await);
    assert!(!table_exists(&driver, "migrations").await);
}

/// Test a custom tracking table on a file database
#[tokio::test]
async fn test_custom_table_on_file_database() {
    let dir = tree();
    write(dir.path(), "migrations/1_init.sql", "CREATE TABLE init (id INTEGER);");
    let db = dir.path().join("app.db");
    let url = format!("sqlite://{}", db.display());

    let migrator = Migrator::from_dir(dir.path().join("migrations")).unwrap();
    let driver_config = SqliteDriverConfig::new().table_name("schema_history");

    {
        let config = SqliteConfig::from_url(&url).unwrap();
        let mut driver = SqliteDriver::connect(&config, driver_config.clone()).await.unwrap();
        migrator.run(&mut driver).await.unwrap();
    }

    let config = SqliteConfig::from_url(&url).unwrap();
    let driver = SqliteDriver::connect(&config, driver_config).await.unwrap();
    assert!(table_exists(&driver, "schema_history").await);
    assert!(!table_exists(&driver, "migrations").await);
    assert_eq!(recorded(&driver).await, vec!["./1_init.sql@1"]);
}
