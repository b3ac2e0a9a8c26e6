use chrono::Utc;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use unialert_common::id::UidSource;
use unialert_storage::SecretService;

use crate::error::{MigrationError, Result};
use crate::folder::FolderResolver;
use crate::loader::{self, LegacyAlert, LegacySnapshot};
use crate::reversal::{self, ReversalSummary};
use crate::routing::{encrypt_secure_settings, OrgRouting};
use crate::{commit, condition, rule};

type Timestamp = sea_orm::prelude::DateTimeWithTimeZone;

/// Which pass to run. Deciding between them is up to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Forward,
    Reverse,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ForwardSummary {
    pub organizations: usize,
    pub rules: usize,
    /// Rules inserted only after disambiguating their title.
    pub retried: usize,
    pub routes: usize,
    pub folders_created: usize,
    pub permissions_copied: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "direction", rename_all = "snake_case")]
pub enum Outcome {
    Forward(ForwardSummary),
    Reverse(ReversalSummary),
}

/// Converts legacy dashboard alerts into unified rules, or undoes that.
///
/// Each pass runs in a single transaction: either every write lands or none
/// does.
pub struct AlertMigration {
    secrets: Arc<dyn SecretService>,
    uids: Arc<dyn UidSource>,
}

struct PassState<'a> {
    snapshot: &'a LegacySnapshot,
    folders: FolderResolver<'a>,
    routing: BTreeMap<i64, OrgRouting>,
    summary: ForwardSummary,
    now: Timestamp,
}

impl AlertMigration {
    pub fn new(secrets: Arc<dyn SecretService>, uids: Arc<dyn UidSource>) -> Self {
        Self { secrets, uids }
    }

    pub async fn run(&self, db: &DatabaseConnection, directive: Directive) -> Result<Outcome> {
        match directive {
            Directive::Forward => self.forward(db).await.map(Outcome::Forward),
            Directive::Reverse => self.reverse(db).await.map(Outcome::Reverse),
        }
    }

    pub async fn forward(&self, db: &DatabaseConnection) -> Result<ForwardSummary> {
        let txn = db.begin().await.map_err(MigrationError::Commit)?;
        match self.forward_in(&txn).await {
            Ok(summary) => {
                txn.commit().await.map_err(MigrationError::Commit)?;
                tracing::info!(
                    organizations = summary.organizations,
                    rules = summary.rules,
                    routes = summary.routes,
                    folders_created = summary.folders_created,
                    "Alert migration committed"
                );
                Ok(summary)
            }
            Err(err) => {
                rollback(txn).await;
                tracing::error!(alert_id = ?err.alert_id(), error = %err, "Alert migration rolled back");
                Err(err)
            }
        }
    }

    pub async fn reverse(&self, db: &DatabaseConnection) -> Result<ReversalSummary> {
        let txn = db.begin().await.map_err(MigrationError::Commit)?;
        match reversal::revert(&txn).await {
            Ok(summary) => {
                txn.commit().await.map_err(MigrationError::Commit)?;
                if summary.is_empty() {
                    tracing::info!("Nothing to revert");
                } else {
                    tracing::info!(
                        rules = summary.rules,
                        rule_versions = summary.rule_versions,
                        folders = summary.folders,
                        permissions = summary.permissions,
                        configurations = summary.configurations,
                        "Alert migration reverted"
                    );
                }
                Ok(summary)
            }
            Err(err) => {
                rollback(txn).await;
                Err(err)
            }
        }
    }

    async fn forward_in(&self, txn: &DatabaseTransaction) -> Result<ForwardSummary> {
        let snapshot = loader::load(txn, self.secrets.as_ref()).await?;
        let now: Timestamp = Utc::now().into();

        let routing = snapshot
            .organizations()
            .into_iter()
            .map(|org_id| {
                let defaults = snapshot
                    .channels
                    .get(&org_id)
                    .map(|c| c.default_channels())
                    .unwrap_or_default();
                (org_id, OrgRouting::new(&defaults))
            })
            .collect();

        let mut state = PassState {
            snapshot: &snapshot,
            folders: FolderResolver::new(&snapshot, self.uids.as_ref(), now),
            routing,
            summary: ForwardSummary::default(),
            now,
        };

        for alert in &snapshot.alerts {
            self.migrate_alert(txn, &mut state, alert)
                .await
                .map_err(|err| err.for_alert(alert.id))?;
        }

        let folder_stats = state.folders.stats();
        let mut summary = state.summary;
        summary.folders_created = folder_stats.folders_created;
        summary.permissions_copied = folder_stats.permissions_copied;

        for (org_id, org_routing) in state.routing {
            summary.routes += org_routing.route_count();
            let mut config = org_routing.assemble();
            encrypt_secure_settings(&mut config, self.secrets.as_ref())?;
            commit::insert_configuration(txn, org_id, config.to_json()?, now).await?;
            summary.organizations += 1;
        }

        Ok(summary)
    }

    async fn migrate_alert(
        &self,
        txn: &DatabaseTransaction,
        state: &mut PassState<'_>,
        alert: &LegacyAlert,
    ) -> Result<()> {
        let snapshot = state.snapshot;
        let dashboard = snapshot
            .dashboard(alert.org_id, alert.dashboard_id)
            .ok_or(MigrationError::MissingDashboard {
                org_id: alert.org_id,
                dashboard_id: alert.dashboard_id,
            })?;

        let translated = condition::translate(&alert.settings, alert.org_id, &snapshot.datasources)?;
        let folder = state.folders.resolve(txn, dashboard).await?;
        let uid = self.uids.next_uid();
        let mut planned = rule::build_rule(alert, &dashboard.uid, &folder.uid, uid, translated);

        let refs = rule::panel_channel_refs(&dashboard.data, alert.panel_id);
        let channels = snapshot
            .channels
            .get(&alert.org_id)
            .map(|c| c.resolve(&refs))
            .unwrap_or_default();
        state
            .routing
            .entry(alert.org_id)
            .or_insert_with(|| OrgRouting::new(&[]))
            .add_rule(&planned.uid, &channels);

        if commit::insert_rule(txn, &mut planned, state.now).await? {
            state.summary.retried += 1;
        }
        state.summary.rules += 1;

        tracing::debug!(
            alert_id = alert.id,
            rule_uid = %planned.uid,
            folder_uid = %folder.uid,
            channels = channels.len(),
            "Migrated alert"
        );
        Ok(())
    }
}

async fn rollback(txn: DatabaseTransaction) {
    if let Err(e) = txn.rollback().await {
        tracing::warn!(error = %e, "Failed to roll back alert migration");
    }
}
