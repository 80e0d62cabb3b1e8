//! `muz status` command - Compare discovered migrations with the tracking table.

use std::path::Path;

use muz_migrate::{FileState, MigrationStatus};

use crate::cli::StatusArgs;
use crate::commands::{load_config, migrator};
use crate::database::AnyDriver;
use crate::error::CliResult;
use crate::output::{self, success};

/// Run the status command
pub async fn run(args: StatusArgs, config_path: &Path) -> CliResult<()> {
    output::header("Migration Status");

    let mut config = load_config(config_path, &args.source)?;
    config.apply_database_args(&args.database);

    let migrator = migrator(&config, config_path)?;
    let target = config.database_target()?;
    let driver = AnyDriver::connect(&target).await?;

    let status = migrator.status(&driver).await?;
    print_status(&status);
    Ok(())
}

fn print_status(status: &MigrationStatus) {
    if status.sets.is_empty() {
        output::info("No migrations found.");
        return;
    }

    for set in &status.sets {
        output::section(&format!("{} (at version {})", set.directory, set.high_water_mark));
        for entry in &set.files {
            let label = match entry.state {
                FileState::Applied => output::style_success("✓ Applied"),
                FileState::Pending => output::style_pending("○ Pending"),
                FileState::Skipped => output::style_skipped("- Skipped"),
            };
            output::list_item(&format!("{} - {}", entry.file, label));
        }
        output::newline();
    }

    output::kv("Applied", &status.total_applied().to_string());
    output::kv("Pending", &status.total_pending().to_string());
    if status.total_skipped() > 0 {
        output::kv("Skipped", &status.total_skipped().to_string());
        output::warn("Skipped files are below their directory's version and will never run");
    }
    output::newline();

    if status.is_up_to_date() {
        success("Database is up to date");
    } else {
        output::info("Run `muz migrate` to apply pending migrations");
    }
}
