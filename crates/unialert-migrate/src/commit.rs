//! Writes of the forward pass: rules, their first version, and the routing
//! configuration of each organization.

use sea_orm::{ActiveModelTrait, DatabaseTransaction, DbErr, Set, SqlErr, TransactionTrait};
use unialert_common::types::CONFIGURATION_VERSION;
use unialert_storage::entities::{alert_configuration, alert_rule, alert_rule_version};

use crate::error::{MigrationError, Result};
use crate::rule::PlannedRule;

type Timestamp = sea_orm::prelude::DateTimeWithTimeZone;

/// Version stamped on every migrated rule.
pub const INITIAL_RULE_VERSION: i64 = 1;

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Inserts `rule` and its version snapshot.
///
/// The first attempt runs in a savepoint. When it violates a uniqueness
/// constraint the savepoint is rolled back, the rule is disambiguated and the
/// insert is tried once more; a second conflict is fatal. Returns whether the
/// retry was needed.
pub async fn insert_rule(txn: &DatabaseTransaction, rule: &mut PlannedRule, now: Timestamp) -> Result<bool> {
    let savepoint = txn.begin().await.map_err(MigrationError::Commit)?;
    let first = rule_model(rule, now)?.insert(&savepoint).await;
    let retried = match first {
        Ok(_) => {
            savepoint.commit().await.map_err(MigrationError::Commit)?;
            false
        }
        Err(err) if is_unique_violation(&err) => {
            savepoint.rollback().await.map_err(MigrationError::Commit)?;
            rule.disambiguate();
            tracing::warn!(
                uid = %rule.uid,
                title = %rule.title,
                "Rule insert conflicted, retrying with disambiguated title"
            );
            rule_model(rule, now)?.insert(txn).await.map_err(|source| {
                if is_unique_violation(&source) {
                    MigrationError::InsertConflict {
                        uid: rule.uid.clone(),
                        source,
                    }
                } else {
                    MigrationError::Commit(source)
                }
            })?;
            true
        }
        Err(err) => return Err(MigrationError::Commit(err)),
    };

    version_model(rule, now)?
        .insert(txn)
        .await
        .map_err(MigrationError::Commit)?;

    Ok(retried)
}

pub async fn insert_configuration(
    txn: &DatabaseTransaction,
    org_id: i64,
    configuration: String,
    now: Timestamp,
) -> Result<()> {
    alert_configuration::ActiveModel {
        org_id: Set(org_id),
        alertmanager_configuration: Set(configuration),
        configuration_version: Set(CONFIGURATION_VERSION.to_string()),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(txn)
    .await
    .map_err(MigrationError::Commit)?;
    Ok(())
}

fn rule_model(rule: &PlannedRule, now: Timestamp) -> Result<alert_rule::ActiveModel> {
    Ok(alert_rule::ActiveModel {
        org_id: Set(rule.org_id),
        uid: Set(rule.uid.clone()),
        namespace_uid: Set(rule.namespace_uid.clone()),
        rule_group: Set(rule.rule_group.clone()),
        title: Set(rule.title.clone()),
        condition: Set(rule.condition.clone()),
        data: Set(serde_json::to_string(&rule.data)?),
        interval_seconds: Set(rule.interval_seconds),
        for_ns: Set(rule.for_ns),
        no_data_state: Set(rule.no_data_state.to_string()),
        exec_err_state: Set(rule.exec_err_state.to_string()),
        annotations: Set(Some(serde_json::to_string(&rule.annotations)?)),
        labels: Set(Some(serde_json::to_string(&rule.labels)?)),
        version: Set(INITIAL_RULE_VERSION),
        updated: Set(now),
        ..Default::default()
    })
}

fn version_model(rule: &PlannedRule, now: Timestamp) -> Result<alert_rule_version::ActiveModel> {
    Ok(alert_rule_version::ActiveModel {
        rule_org_id: Set(rule.org_id),
        rule_uid: Set(rule.uid.clone()),
        rule_namespace_uid: Set(rule.namespace_uid.clone()),
        rule_group: Set(rule.rule_group.clone()),
        parent_version: Set(0),
        restored_from: Set(0),
        version: Set(INITIAL_RULE_VERSION),
        created: Set(now),
        title: Set(rule.title.clone()),
        condition: Set(rule.condition.clone()),
        data: Set(serde_json::to_string(&rule.data)?),
        interval_seconds: Set(rule.interval_seconds),
        for_ns: Set(rule.for_ns),
        no_data_state: Set(rule.no_data_state.to_string()),
        exec_err_state: Set(rule.exec_err_state.to_string()),
        annotations: Set(Some(serde_json::to_string(&rule.annotations)?)),
        labels: Set(Some(serde_json::to_string(&rule.labels)?)),
        ..Default::default()
    })
}
