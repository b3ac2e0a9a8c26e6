use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_legacy_alerting_schema"
    }
}

/// Dashboard, ACL, legacy alert, notification channel and data source tables.
///
/// Owned by the dashboard application; created here only when absent so the
/// migration can run against a fresh database.
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.get_connection().execute_unprepared(UP_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(DOWN_SQL)
            .await?;
        Ok(())
    }
}

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS dashboard (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    uid TEXT NOT NULL,
    org_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    data TEXT NOT NULL DEFAULT '{}',
    folder_id INTEGER NOT NULL DEFAULT 0,
    is_folder INTEGER NOT NULL DEFAULT 0,
    has_acl INTEGER NOT NULL DEFAULT 0,
    created_by INTEGER NOT NULL DEFAULT 0,
    version INTEGER NOT NULL DEFAULT 1,
    created TEXT NOT NULL,
    updated TEXT NOT NULL,
    UNIQUE(org_id, uid),
    UNIQUE(org_id, folder_id, title)
);
CREATE INDEX IF NOT EXISTS idx_dashboard_org_id ON dashboard(org_id);
CREATE INDEX IF NOT EXISTS idx_dashboard_created_by ON dashboard(created_by);

CREATE TABLE IF NOT EXISTS dashboard_acl (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    org_id INTEGER NOT NULL,
    dashboard_id INTEGER NOT NULL,
    user_id INTEGER,
    team_id INTEGER,
    role TEXT,
    permission INTEGER NOT NULL DEFAULT 1,
    created TEXT NOT NULL,
    updated TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_dashboard_acl_dashboard_id ON dashboard_acl(dashboard_id);

CREATE TABLE IF NOT EXISTS alert (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    version INTEGER NOT NULL DEFAULT 0,
    org_id INTEGER NOT NULL,
    dashboard_id INTEGER NOT NULL,
    panel_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    message TEXT NOT NULL DEFAULT '',
    state TEXT NOT NULL DEFAULT 'unknown',
    new_state_date TEXT,
    settings TEXT NOT NULL DEFAULT '{}',
    frequency INTEGER NOT NULL DEFAULT 60,
    "for" INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_alert_org_id ON alert(org_id);
CREATE INDEX IF NOT EXISTS idx_alert_dashboard_id ON alert(dashboard_id);

CREATE TABLE IF NOT EXISTS alert_notification (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    org_id INTEGER NOT NULL,
    uid TEXT NOT NULL,
    name TEXT NOT NULL,
    type TEXT NOT NULL,
    is_default INTEGER NOT NULL DEFAULT 0,
    disable_resolve_message INTEGER NOT NULL DEFAULT 0,
    settings TEXT NOT NULL DEFAULT '{}',
    secure_settings TEXT,
    created TEXT NOT NULL,
    updated TEXT NOT NULL,
    UNIQUE(org_id, uid)
);

CREATE TABLE IF NOT EXISTS data_source (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    org_id INTEGER NOT NULL,
    uid TEXT NOT NULL,
    name TEXT NOT NULL,
    type TEXT NOT NULL,
    UNIQUE(org_id, uid)
);
"#;

const DOWN_SQL: &str = "
DROP TABLE IF EXISTS data_source;
DROP TABLE IF EXISTS alert_notification;
DROP TABLE IF EXISTS alert;
DROP TABLE IF EXISTS dashboard_acl;
DROP TABLE IF EXISTS dashboard;
";
