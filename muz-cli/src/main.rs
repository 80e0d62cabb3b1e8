//! muz - command-line runner for directory-based SQL migrations.

use clap::Parser;

use muz_cli::cli::{Cli, Command};
use muz_cli::commands;
use muz_cli::error::CliResult;
use muz_cli::{logging, output};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli).await {
        output::newline();
        output::error(&e.to_string());
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config_path = cli.config;

    match cli.command {
        Command::Init(args) => commands::init::run(args).await,
        Command::Migrate(args) => commands::migrate::run(args, &config_path).await,
        Command::List(args) => commands::list::run(args, &config_path).await,
        Command::Status(args) => commands::status::run(args, &config_path).await,
        Command::Version => commands::version::run().await,
    }
}
