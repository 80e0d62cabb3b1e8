//! `muz migrate` command - Apply pending migrations.

use std::path::Path;

use muz_migrate::{CancellationToken, MigrationReport};

use crate::cli::MigrateArgs;
use crate::commands::{load_config, migrator};
use crate::database::AnyDriver;
use crate::error::{CliError, CliResult};
use crate::output::{self, success};

/// Run the migrate command
pub async fn run(args: MigrateArgs, config_path: &Path) -> CliResult<()> {
    output::header("Migrate");

    let mut config = load_config(config_path, &args.source)?;
    config.apply_database_args(&args.database);
    if let Some(ref scope) = args.transaction {
        config.migrations.transaction = scope.parse()?;
    }

    let migrator = migrator(&config, config_path)?;
    let target = config.database_target()?;

    output::kv("Provider", &target.provider.to_string());
    output::kv("Migrations", &config.migrations.directory.display().to_string());
    output::kv("Table", &target.table_name);
    output::newline();

    let mut driver = AnyDriver::connect(&target).await?;

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, stopping before the next directory");
                cancel.cancel();
            }
        })
    };

    let result = migrator.run_with_cancel(&mut driver, &cancel).await;
    interrupt.abort();

    match result {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(err) => {
            if let Some((directory, file, version)) = err.failed_migration() {
                output::error(&format!(
                    "{}/{} (version {}) failed",
                    directory, file, version
                ));
            } else if err.is_cancelled() {
                output::warn("Cancelled");
            }
            Err(CliError::from(err))
        }
    }
}

fn print_report(report: &MigrationReport) {
    if !report.has_changes() {
        success("Database is up to date");
        output::dim(&report.summary());
        return;
    }

    output::section("Applied");
    let mut current = None;
    for (directory, file) in report.applied() {
        if current != Some(directory) {
            output::list_item(directory);
            current = Some(directory);
        }
        output::sub_item(&file.to_string());
    }
    output::newline();
    success(&report.summary());
}
