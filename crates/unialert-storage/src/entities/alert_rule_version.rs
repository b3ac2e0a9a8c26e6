use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "alert_rule_version")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub rule_org_id: i64,
    pub rule_uid: String,
    pub rule_namespace_uid: String,
    pub rule_group: String,
    pub parent_version: i64,
    pub restored_from: i64,
    pub version: i64,
    pub created: DateTimeWithTimeZone,
    pub title: String,
    pub condition: String,
    pub data: String,
    pub interval_seconds: i64,
    #[sea_orm(column_name = "for")]
    pub for_ns: i64,
    pub no_data_state: String,
    pub exec_err_state: String,
    pub annotations: Option<String>,
    pub labels: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
