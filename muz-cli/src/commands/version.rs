//! `muz version` command - Display version information.

use crate::error::CliResult;
use crate::output::{self, kv};

/// Package version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name
const NAME: &str = env!("CARGO_PKG_NAME");

/// Run the version command
pub async fn run() -> CliResult<()> {
    output::logo();
    output::newline();

    kv("Version", VERSION);
    kv("Binary", NAME);

    #[cfg(debug_assertions)]
    let build_mode = "debug";
    #[cfg(not(debug_assertions))]
    let build_mode = "release";

    kv("Build", build_mode);

    let mut providers = Vec::new();

    #[cfg(feature = "postgres")]
    providers.push("postgresql");

    #[cfg(feature = "sqlite")]
    providers.push("sqlite");

    if providers.is_empty() {
        providers.push("none");
    }

    kv("Providers", &providers.join(", "));

    Ok(())
}
