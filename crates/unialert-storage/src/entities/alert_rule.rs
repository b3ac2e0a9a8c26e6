use sea_orm::entity::prelude::*;

/// Unified, folder-scoped alert rule.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "alert_rule")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub org_id: i64,
    pub uid: String,
    /// Uid of the folder the rule lives in.
    pub namespace_uid: String,
    pub rule_group: String,
    pub title: String,
    /// Ref id of the query or expression that decides firing.
    pub condition: String,
    /// JSON array of queries and expressions.
    pub data: String,
    pub interval_seconds: i64,
    #[sea_orm(column_name = "for")]
    pub for_ns: i64,
    pub no_data_state: String,
    pub exec_err_state: String,
    pub annotations: Option<String>,
    pub labels: Option<String>,
    pub version: i64,
    pub updated: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
