use sea_orm::entity::prelude::*;

/// A dashboard or, when `is_folder` is set, a folder.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "dashboard")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub uid: String,
    pub org_id: i64,
    pub title: String,
    /// Dashboard JSON model (panels, alert notifications, ...).
    pub data: String,
    /// Parent folder id, `0` for the root level.
    pub folder_id: i64,
    pub is_folder: bool,
    /// Set when the dashboard carries its own ACL instead of inheriting one.
    pub has_acl: bool,
    pub created_by: i64,
    pub version: i32,
    pub created: DateTimeWithTimeZone,
    pub updated: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
