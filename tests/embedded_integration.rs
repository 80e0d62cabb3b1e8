//! Integration tests for the facade crate.
//!
//! These tests run the fixture tree under `tests/fixtures/migrations`
//! against in-memory SQLite, once read from disk and once embedded.

#![cfg(feature = "sqlite")]

use std::path::PathBuf;
use std::sync::Arc;

use muz::prelude::*;
use muz::migrate::{FileSource, MemorySource};
use muz::sqlite::{SqliteConfig, SqliteDriver, SqliteDriverConfig};
use pretty_assertions::assert_eq;

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/migrations")
}

fn config() -> MigrationConfig {
    MigrationConfig::new()
        .base_path(fixture_dir())
        .order(["schema"])
        .skip(["archive"])
        .extension(".sql")
}

async fn driver() -> SqliteDriver {
    SqliteDriver::connect(&SqliteConfig::memory(), SqliteDriverConfig::default())
        .await
        .unwrap()
}

async fn applied_names(driver: &SqliteDriver) -> Vec<String> {
    driver
        .applied()
        .await
        .unwrap()
        .into_iter()
        .map(|r| format!("{}/{}", r.directory, r.file_name))
        .collect()
}

/// Test that the on-disk fixture tree applies in priority order
#[tokio::test]
async fn test_fixture_tree_from_disk() {
    let migrator = Migrator::new(config()).unwrap();
    let mut driver = driver().await;

    let report = migrator.run(&mut driver).await.unwrap();
    let order: Vec<_> = report
        .applied()
        .map(|(dir, file)| format!("{}/{}", dir, file.path))
        .collect();
    assert_eq!(
        order,
        vec![
            "schema/1_create_accounts.sql",
            "schema/2_create_sessions.sql",
            "data/1_seed_accounts.sql",
        ]
    );

    let report = migrator.run(&mut driver).await.unwrap();
    assert!(!report.has_changes());
    assert_eq!(applied_names(&driver).await.len(), 3);
}

/// Test that status reflects a completed run
#[tokio::test]
async fn test_status_after_run() {
    let migrator = Migrator::new(config()).unwrap();
    let mut driver = driver().await;

    let before = migrator.status(&driver).await.unwrap();
    assert_eq!(before.total_pending(), 3);
    assert!(!before.is_up_to_date());

    migrator.run(&mut driver).await.unwrap();

    let after = migrator.status(&driver).await.unwrap();
    assert_eq!(after.total_applied(), 3);
    assert!(after.is_up_to_date());
}

/// Test that an in-memory tree behaves like the directory it mirrors
#[tokio::test]
async fn test_memory_source_matches_disk() {
    let mut source = MemorySource::new();
    for rel in [
        "schema/1_create_accounts.sql",
        "schema/2_create_sessions.sql",
        "data/1_seed_accounts.sql",
        "archive/1_legacy.sql",
    ] {
        let contents = std::fs::read(fixture_dir().join(rel)).unwrap();
        source.insert_file(rel, contents);
    }
    assert_eq!(source.read_dir(".").unwrap().len(), 3);

    let migrator = Migrator::with_source(Arc::new(source), config()).unwrap();
    let mut driver = driver().await;
    migrator.run(&mut driver).await.unwrap();

    assert_eq!(
        applied_names(&driver).await,
        vec![
            "data/1_seed_accounts.sql",
            "schema/1_create_accounts.sql",
            "schema/2_create_sessions.sql",
        ]
    );
}

#[cfg(feature = "embed")]
mod embedded {
    use std::sync::Arc;

    use muz::migrate::MemorySource;
    use muz::prelude::*;
    use pretty_assertions::assert_eq;

    use super::{config, driver};

    #[derive(rust_embed::RustEmbed)]
    #[folder = "tests/fixtures/"]
    struct Fixtures;

    /// Test that an embedded bundle re-rooted at `migrations` applies cleanly
    #[tokio::test]
    async fn test_embedded_bundle() {
        let source = MemorySource::from_embed::<Fixtures>("migrations");
        let migrator = Migrator::with_source(Arc::new(source), config()).unwrap();
        let mut driver = driver().await;

        let report = migrator.run(&mut driver).await.unwrap();
        assert_eq!(report.applied_count(), 3);

        let dirs: Vec<_> = report.sets.iter().map(|s| s.directory.as_str()).collect();
        assert_eq!(dirs, vec!["schema", ".", "data"]);
    }
}
