use anyhow::{Context, Result};
use std::sync::Arc;
use unialert_common::id::SnowflakeUids;
use unialert_migrate::{AlertMigration, Directive, Outcome};
use unialert_storage::{Store, TableCounts};

use crate::config::MigrateConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Migrate,
    Revert,
    Status,
}

impl Command {
    pub fn parse(arg: &str) -> Option<Self> {
        match arg {
            "migrate" => Some(Self::Migrate),
            "revert" => Some(Self::Revert),
            "status" => Some(Self::Status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Migrated(Outcome),
    Status(TableCounts),
}

pub async fn run(config: &MigrateConfig, command: Command) -> Result<Report> {
    if config.database.url.is_none() {
        std::fs::create_dir_all(&config.database.data_dir).with_context(|| {
            format!("failed to create data dir '{}'", config.database.data_dir)
        })?;
    }

    let store = Store::open(&config.database.connection_url(), &config.key_path()).await?;

    let directive = match command {
        Command::Migrate => Directive::Forward,
        Command::Revert => Directive::Reverse,
        Command::Status => {
            let counts = store.table_counts().await?;
            tracing::info!(
                legacy_alerts = counts.legacy_alerts,
                rules = counts.rules,
                rule_versions = counts.rule_versions,
                configurations = counts.configurations,
                migrated_folders = counts.migrated_folders,
                "Alerting tables"
            );
            return Ok(Report::Status(counts));
        }
    };

    let migration = AlertMigration::new(
        store.secrets(),
        Arc::new(SnowflakeUids::new(config.uid.machine_id, config.uid.node_id)),
    );
    let outcome = migration
        .run(store.db(), directive)
        .await
        .with_context(|| format!("{directive:?} pass failed"))?;

    Ok(Report::Migrated(outcome))
}
