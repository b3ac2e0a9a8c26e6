use anyhow::Result;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;
use unialert_common::types::FOLDER_CREATED_BY;

use crate::entities::{alert, alert_configuration, alert_rule, alert_rule_version, dashboard};
use crate::store::Store;

/// Row counts of the tables the alert migration reads or writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub legacy_alerts: u64,
    pub rules: u64,
    pub rule_versions: u64,
    pub configurations: u64,
    pub migrated_folders: u64,
}

impl Store {
    pub async fn table_counts(&self) -> Result<TableCounts> {
        Ok(TableCounts {
            legacy_alerts: alert::Entity::find().count(self.db()).await?,
            rules: alert_rule::Entity::find().count(self.db()).await?,
            rule_versions: alert_rule_version::Entity::find().count(self.db()).await?,
            configurations: alert_configuration::Entity::find().count(self.db()).await?,
            migrated_folders: dashboard::Entity::find()
                .filter(dashboard::Column::CreatedBy.eq(FOLDER_CREATED_BY))
                .count(self.db())
                .await?,
        })
    }
}
