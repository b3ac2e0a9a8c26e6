use anyhow::Result;
use tracing_subscriber::EnvFilter;

use unialert_cli::commands::{self, Command, Report};
use unialert_cli::config::MigrateConfig;

const DEFAULT_CONFIG: &str = "config/unialert.toml";

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  unialert migrate [config.toml]   Migrate legacy dashboard alerts to unified alerting");
    eprintln!("  unialert revert [config.toml]    Delete everything a previous migration created");
    eprintln!("  unialert status [config.toml]    Show row counts of the alerting tables");
    eprintln!();
    eprintln!("Default config path: {DEFAULT_CONFIG}");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let command = match args.get(1).map(|s| s.as_str()) {
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(arg) => Command::parse(arg).ok_or_else(|| {
            print_usage();
            anyhow::anyhow!("unknown command '{arg}'")
        })?,
        None => {
            print_usage();
            anyhow::bail!("a command is required");
        }
    };

    let config_path = args.get(2).map(|s| s.as_str()).unwrap_or(DEFAULT_CONFIG);
    let config = MigrateConfig::load(config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(config.logging.default_directive.parse()?),
        )
        .init();

    tracing::info!(config = %config_path, command = ?command, "Starting");
    let report = commands::run(&config, command).await?;
    print_report(&report)
}

#[allow(clippy::print_stdout)]
fn print_report(report: &Report) -> Result<()> {
    let json = match report {
        Report::Migrated(outcome) => serde_json::to_string_pretty(outcome)?,
        Report::Status(counts) => serde_json::to_string_pretty(counts)?,
    };
    println!("{json}");
    Ok(())
}
