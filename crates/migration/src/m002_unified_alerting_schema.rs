use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m002_unified_alerting_schema"
    }
}

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
CREATE TABLE IF NOT EXISTS alert_rule (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    org_id INTEGER NOT NULL,
    uid TEXT NOT NULL,
    namespace_uid TEXT NOT NULL,
    rule_group TEXT NOT NULL,
    title TEXT NOT NULL,
    condition TEXT NOT NULL,
    data TEXT NOT NULL,
    interval_seconds INTEGER NOT NULL DEFAULT 60,
    "for" INTEGER NOT NULL DEFAULT 0,
    no_data_state TEXT NOT NULL DEFAULT 'NoData',
    exec_err_state TEXT NOT NULL DEFAULT 'Alerting',
    annotations TEXT,
    labels TEXT,
    version INTEGER NOT NULL DEFAULT 0,
    updated TEXT NOT NULL,
    UNIQUE(org_id, uid),
    UNIQUE(org_id, namespace_uid, title)
);
CREATE INDEX IF NOT EXISTS idx_alert_rule_org_namespace_group ON alert_rule(org_id, namespace_uid, rule_group);

CREATE TABLE IF NOT EXISTS alert_rule_version (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    rule_org_id INTEGER NOT NULL,
    rule_uid TEXT NOT NULL,
    rule_namespace_uid TEXT NOT NULL,
    rule_group TEXT NOT NULL,
    parent_version INTEGER NOT NULL,
    restored_from INTEGER NOT NULL,
    version INTEGER NOT NULL,
    created TEXT NOT NULL,
    title TEXT NOT NULL,
    condition TEXT NOT NULL,
    data TEXT NOT NULL,
    interval_seconds INTEGER NOT NULL,
    "for" INTEGER NOT NULL DEFAULT 0,
    no_data_state TEXT NOT NULL,
    exec_err_state TEXT NOT NULL,
    annotations TEXT,
    labels TEXT,
    UNIQUE(rule_org_id, rule_uid, version)
);

CREATE TABLE IF NOT EXISTS alert_configuration (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    org_id INTEGER NOT NULL,
    alertmanager_configuration TEXT NOT NULL,
    configuration_version TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_alert_configuration_org_id ON alert_configuration(org_id);
"#;

const DOWN_SQL: &str = "
DROP TABLE IF EXISTS alert_configuration;
DROP TABLE IF EXISTS alert_rule_version;
DROP TABLE IF EXISTS alert_rule;
";
