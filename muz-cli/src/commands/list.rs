//! `muz list` command - Show discovered migrations in application order.

use std::path::Path;

use crate::cli::ListArgs;
use crate::commands::{load_config, migrator};
use crate::error::CliResult;
use crate::output;

/// Run the list command
pub async fn run(args: ListArgs, config_path: &Path) -> CliResult<()> {
    output::header("Migrations");

    let config = load_config(config_path, &args.source)?;
    let migrator = migrator(&config, config_path)?;

    let mut sets = 0;
    let mut files = 0;
    for set in migrator.discover() {
        let set = set?;
        output::section(set.directory());
        for file in set.files() {
            output::list_item(&file.to_string());
        }
        output::newline();
        sets += 1;
        files += set.len();
    }

    if sets == 0 {
        output::info("No migrations found.");
        return Ok(());
    }

    output::kv("Directories", &sets.to_string());
    output::kv("Files", &files.to_string());
    Ok(())
}
