use sea_orm::entity::prelude::*;

/// Legacy per-panel dashboard alert.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "alert")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub version: i64,
    pub org_id: i64,
    pub dashboard_id: i64,
    pub panel_id: i64,
    pub name: String,
    pub message: String,
    pub state: String,
    pub new_state_date: Option<DateTimeWithTimeZone>,
    /// Condition settings as stored by the legacy alerting UI.
    pub settings: String,
    /// Evaluation frequency in seconds.
    pub frequency: i64,
    /// Pending period in nanoseconds.
    #[sea_orm(column_name = "for")]
    pub for_ns: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
