use sea_orm::{ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QuerySelect};
use serde::Serialize;
use unialert_common::types::FOLDER_CREATED_BY;
use unialert_storage::entities::{
    alert_configuration, alert_rule, alert_rule_version, dashboard, dashboard_acl,
};

use crate::error::{MigrationError, Result};

/// Rows removed by a reversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReversalSummary {
    pub rule_versions: u64,
    pub rules: u64,
    pub permissions: u64,
    pub folders: u64,
    pub configurations: u64,
}

impl ReversalSummary {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Deletes everything the forward pass wrote. Legacy rows and folders not
/// carrying the ownership marker are left alone.
pub async fn revert(txn: &DatabaseTransaction) -> Result<ReversalSummary> {
    let rule_versions = alert_rule_version::Entity::delete_many()
        .exec(txn)
        .await
        .map_err(MigrationError::Commit)?
        .rows_affected;

    let rules = alert_rule::Entity::delete_many()
        .exec(txn)
        .await
        .map_err(MigrationError::Commit)?
        .rows_affected;

    let folder_ids: Vec<i64> = dashboard::Entity::find()
        .select_only()
        .column(dashboard::Column::Id)
        .filter(dashboard::Column::CreatedBy.eq(FOLDER_CREATED_BY))
        .into_tuple()
        .all(txn)
        .await
        .map_err(MigrationError::Commit)?;

    let permissions = dashboard_acl::Entity::delete_many()
        .filter(dashboard_acl::Column::DashboardId.is_in(folder_ids))
        .exec(txn)
        .await
        .map_err(MigrationError::Commit)?
        .rows_affected;

    let folders = dashboard::Entity::delete_many()
        .filter(dashboard::Column::CreatedBy.eq(FOLDER_CREATED_BY))
        .exec(txn)
        .await
        .map_err(MigrationError::Commit)?
        .rows_affected;

    let configurations = alert_configuration::Entity::delete_many()
        .exec(txn)
        .await
        .map_err(MigrationError::Commit)?
        .rows_affected;

    Ok(ReversalSummary {
        rule_versions,
        rules,
        permissions,
        folders,
        configurations,
    })
}
