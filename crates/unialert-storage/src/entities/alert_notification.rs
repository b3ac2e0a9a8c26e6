use sea_orm::entity::prelude::*;

/// Legacy notification channel.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "alert_notification")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub org_id: i64,
    pub uid: String,
    pub name: String,
    #[sea_orm(column_name = "type")]
    pub channel_type: String,
    pub is_default: bool,
    pub disable_resolve_message: bool,
    pub settings: String,
    /// JSON object mapping setting name to its encrypted value.
    pub secure_settings: Option<String>,
    pub created: DateTimeWithTimeZone,
    pub updated: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
