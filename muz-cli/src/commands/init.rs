//! `muz init` command - Initialize a new muz project.

use std::path::Path;

use crate::cli::InitArgs;
use crate::config::{CONFIG_FILE_NAME, Config};
use crate::error::CliResult;
use crate::output::{self, success};

/// Run the init command
pub async fn run(args: InitArgs) -> CliResult<()> {
    output::header("Initialize muz Project");

    std::fs::create_dir_all(&args.path)?;
    let project_path = args
        .path
        .canonicalize()
        .unwrap_or_else(|_| args.path.clone());

    let config_path = project_path.join(CONFIG_FILE_NAME);
    if config_path.exists() && !args.force {
        output::warn(&format!(
            "Project already initialized. {} exists (use --force to overwrite).",
            CONFIG_FILE_NAME
        ));
        return Ok(());
    }

    let mut config = Config::default_for_provider(args.provider);
    config.database.url = args.url;
    config.save(&config_path)?;

    let migrations_path = project_path.join(&config.migrations.directory);
    create_migrations_dir(&migrations_path)?;

    success("Project initialized successfully!");
    output::newline();

    output::section("Created files");
    output::kv(CONFIG_FILE_NAME, "muz configuration");
    output::kv(
        &format!("{}/", config.migrations.directory.display()),
        "Migration files",
    );
    output::newline();

    output::section("Next steps");
    if config.database.url.is_none() {
        output::list_item("Set MUZ_DATABASE_URL or [database].url in muz.toml");
    }
    output::list_item("Add files such as migrations/schema/1_create_users.sql");
    output::list_item("Run `muz list` to check the order, then `muz migrate`");

    Ok(())
}

fn create_migrations_dir(path: &Path) -> CliResult<()> {
    std::fs::create_dir_all(path)?;

    let gitkeep_path = path.join(".gitkeep");
    if !gitkeep_path.exists() {
        std::fs::write(gitkeep_path, "")?;
    }

    Ok(())
}
