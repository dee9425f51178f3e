//! Apply pending schema migrations without starting the HTTP server.

use std::env;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, eyre};
use commissioning_backend::outbound::persistence::run_pending_migrations;
use tokio::runtime::Builder;

/// `migrate-db` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "migrate-db",
    about = "Apply pending draft storage migrations",
    version
)]
struct CliArgs {
    /// Database connection URL. Falls back to `PORTAL_DATABASE_URL`.
    #[arg(long = "database-url", value_name = "url")]
    database_url: Option<String>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = CliArgs::parse();
    let database_url = resolve_database_url(args.database_url, env::var("PORTAL_DATABASE_URL").ok())?;

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to create Tokio runtime")?;
    let applied = runtime
        .block_on(run_pending_migrations(&database_url))
        .wrap_err("failed to apply migrations")?;

    if applied.is_empty() {
        eprintln!("schema already up to date");
    }
    for version in applied {
        eprintln!("applied {version}");
    }
    Ok(())
}

fn resolve_database_url(explicit: Option<String>, from_env: Option<String>) -> Result<String> {
    explicit
        .or(from_env)
        .map(|url| url.trim().to_owned())
        .filter(|url| !url.is_empty())
        .ok_or_else(|| eyre!("database URL missing: set --database-url or PORTAL_DATABASE_URL"))
}
