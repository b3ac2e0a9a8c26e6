use crate::error::MigrationError;
use crate::migrator::{AlertMigration, Directive, Outcome};
use crate::routing::{RoutingConfiguration, DEFAULT_RECEIVER};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::TempDir;
use unialert_common::id::{SequenceUids, UidSource};
use unialert_common::types::{FOLDER_CREATED_BY, GENERAL_FOLDER, ROUTING_LABEL};
use unialert_storage::entities::{
    alert, alert_configuration, alert_notification, alert_rule, alert_rule_version, dashboard,
    dashboard_acl, data_source,
};
use unialert_storage::{AesGcmSecrets, SecretService, Store};

struct Fixture {
    _dir: TempDir,
    store: Store,
    secrets: Arc<AesGcmSecrets>,
}

impl Fixture {
    async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("grafana.db").display());
        let store = Store::open(&db_url, &dir.path().join("secret.key"))
            .await
            .unwrap();
        let secrets = Arc::new(AesGcmSecrets::from_key(vec![9u8; 32]).unwrap());
        Self {
            _dir: dir,
            store,
            secrets,
        }
    }

    fn db(&self) -> &DatabaseConnection {
        self.store.db()
    }

    fn migration(&self) -> AlertMigration {
        self.migration_with(SequenceUids::new(Vec::<String>::new()))
    }

    fn migration_with(&self, uids: impl UidSource + 'static) -> AlertMigration {
        AlertMigration::new(self.secrets.clone(), Arc::new(uids))
    }

    async fn dashboard(&self, org_id: i64, uid: &str, folder_id: i64, has_acl: bool, data: Value) -> i64 {
        self.insert_dashboard(org_id, uid, &format!("Dashboard {uid}"), folder_id, false, has_acl, data)
            .await
    }

    async fn folder(&self, org_id: i64, uid: &str, title: &str) -> i64 {
        self.insert_dashboard(org_id, uid, title, 0, true, false, json!({}))
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn insert_dashboard(
        &self,
        org_id: i64,
        uid: &str,
        title: &str,
        folder_id: i64,
        is_folder: bool,
        has_acl: bool,
        data: Value,
    ) -> i64 {
        let now = Utc::now().fixed_offset();
        dashboard::ActiveModel {
            uid: Set(uid.to_string()),
            org_id: Set(org_id),
            title: Set(title.to_string()),
            data: Set(data.to_string()),
            folder_id: Set(folder_id),
            is_folder: Set(is_folder),
            has_acl: Set(has_acl),
            created_by: Set(1),
            version: Set(1),
            created: Set(now),
            updated: Set(now),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .unwrap()
        .id
    }

    async fn acl(&self, dashboard_id: i64, user_id: Option<i64>, role: Option<&str>, permission: i32) {
        let now = Utc::now().fixed_offset();
        dashboard_acl::ActiveModel {
            org_id: Set(1),
            dashboard_id: Set(dashboard_id),
            user_id: Set(user_id),
            team_id: Set(None),
            role: Set(role.map(str::to_string)),
            permission: Set(permission),
            created: Set(now),
            updated: Set(now),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .unwrap();
    }

    async fn datasource(&self, org_id: i64, uid: &str) -> i64 {
        data_source::ActiveModel {
            org_id: Set(org_id),
            uid: Set(uid.to_string()),
            name: Set(format!("{uid} source")),
            ds_type: Set("prometheus".to_string()),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .unwrap()
        .id
    }

    async fn channel(&self, org_id: i64, uid: &str, is_default: bool, secure: &[(&str, &str)]) -> i64 {
        let encrypted: BTreeMap<&str, String> = secure
            .iter()
            .map(|(k, v)| (*k, self.secrets.encrypt(v).unwrap()))
            .collect();
        self.insert_channel(org_id, uid, is_default, serde_json::to_string(&encrypted).unwrap())
            .await
    }

    async fn insert_channel(&self, org_id: i64, uid: &str, is_default: bool, secure_settings: String) -> i64 {
        let now = Utc::now().fixed_offset();
        alert_notification::ActiveModel {
            org_id: Set(org_id),
            uid: Set(uid.to_string()),
            name: Set(format!("{uid} channel")),
            channel_type: Set("slack".to_string()),
            is_default: Set(is_default),
            disable_resolve_message: Set(false),
            settings: Set(json!({ "recipient": "#ops" }).to_string()),
            secure_settings: Set(Some(secure_settings)),
            created: Set(now),
            updated: Set(now),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .unwrap()
        .id
    }

    async fn alert(&self, org_id: i64, dashboard_id: i64, panel_id: i64, name: &str, settings: Value) -> i64 {
        self.insert_alert(org_id, dashboard_id, panel_id, name, settings.to_string())
            .await
    }

    async fn insert_alert(
        &self,
        org_id: i64,
        dashboard_id: i64,
        panel_id: i64,
        name: &str,
        settings: String,
    ) -> i64 {
        alert::ActiveModel {
            version: Set(0),
            org_id: Set(org_id),
            dashboard_id: Set(dashboard_id),
            panel_id: Set(panel_id),
            name: Set(name.to_string()),
            message: Set(format!("{name} fired")),
            state: Set("ok".to_string()),
            new_state_date: Set(None),
            settings: Set(settings),
            frequency: Set(60),
            for_ns: Set(0),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .unwrap()
        .id
    }

    async fn rules(&self) -> Vec<alert_rule::Model> {
        alert_rule::Entity::find()
            .order_by_asc(alert_rule::Column::Id)
            .all(self.db())
            .await
            .unwrap()
    }

    async fn configurations(&self) -> BTreeMap<i64, RoutingConfiguration> {
        alert_configuration::Entity::find()
            .all(self.db())
            .await
            .unwrap()
            .into_iter()
            .map(|c| {
                assert_eq!(c.configuration_version, "v1");
                (
                    c.org_id,
                    RoutingConfiguration::from_json(&c.alertmanager_configuration).unwrap(),
                )
            })
            .collect()
    }

    async fn marked_folders(&self) -> Vec<dashboard::Model> {
        dashboard::Entity::find()
            .filter(dashboard::Column::CreatedBy.eq(FOLDER_CREATED_BY))
            .order_by_asc(dashboard::Column::Id)
            .all(self.db())
            .await
            .unwrap()
    }
}

fn settings(datasource_id: i64) -> Value {
    json!({
        "conditions": [{
            "type": "query",
            "evaluator": { "params": [90.0], "type": "gt" },
            "operator": { "type": "and" },
            "query": { "params": ["A", "5m", "now"], "datasourceId": datasource_id, "model": { "expr": "cpu" } },
            "reducer": { "params": [], "type": "avg" }
        }],
        "noDataState": "no_data",
        "executionErrorState": "alerting"
    })
}

/// Dashboard model whose panels notify the given channel references.
fn panels(panels: &[(i64, Value)]) -> Value {
    let panels: Vec<Value> = panels
        .iter()
        .map(|(id, notifications)| json!({ "id": id, "alert": { "notifications": notifications } }))
        .collect();
    json!({ "panels": panels })
}

fn labels(rule: &alert_rule::Model) -> BTreeMap<String, String> {
    serde_json::from_str(rule.labels.as_deref().unwrap()).unwrap()
}

#[tokio::test]
async fn worked_example_root_dashboard_with_default_channel() {
    let fx = Fixture::new().await;
    let ds = fx.datasource(1, "ds-uid-5").await;
    let dash = fx.dashboard(1, "dash-1", 0, false, panels(&[(1, json!([]))])).await;
    fx.channel(1, "default-slack", true, &[]).await;
    fx.alert(1, dash, 1, "High CPU", settings(ds)).await;

    let summary = fx.migration().forward(fx.db()).await.unwrap();
    assert_eq!(summary.rules, 1);
    assert_eq!(summary.folders_created, 1);
    assert_eq!(summary.routes, 0);

    let folders = fx.marked_folders().await;
    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0].title, GENERAL_FOLDER);
    assert!(folders[0].is_folder);

    let rules = fx.rules().await;
    assert_eq!(rules.len(), 1);
    let rule = &rules[0];
    assert_eq!(rule.namespace_uid, folders[0].uid);
    assert_eq!(rule.title, "High CPU");
    assert_eq!(rule.rule_group, "High CPU");
    assert_eq!(rule.version, 1);
    assert!(rule.data.contains("ds-uid-5"));
    assert_eq!(labels(rule)[ROUTING_LABEL], rule.uid);

    let configs = fx.configurations().await;
    let config = &configs[&1];
    assert_eq!(config.route.receiver, DEFAULT_RECEIVER);
    assert!(config.route.routes.is_empty());
    let default = config.receiver(DEFAULT_RECEIVER).unwrap();
    assert_eq!(default.integrations.len(), 1);
    assert_eq!(default.integrations[0].uid, "default-slack");
}

#[tokio::test]
async fn custom_acl_dashboard_gets_own_folder_with_copied_permissions() {
    let fx = Fixture::new().await;
    let ds = fx.datasource(1, "prom").await;
    let parent = fx.folder(1, "team-folder", "Team").await;
    let dash = fx.dashboard(1, "secret-dash", parent, true, json!({})).await;
    fx.acl(dash, Some(7), None, 4).await;
    fx.acl(dash, None, Some("Viewer"), 1).await;
    fx.alert(1, dash, 1, "Disk", settings(ds)).await;
    fx.alert(1, dash, 2, "Memory", settings(ds)).await;

    let summary = fx.migration().forward(fx.db()).await.unwrap();
    assert_eq!(summary.folders_created, 1);
    assert_eq!(summary.permissions_copied, 2);

    let folders = fx.marked_folders().await;
    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0].title, "Migrated secret-dash");

    let copied = dashboard_acl::Entity::find()
        .filter(dashboard_acl::Column::DashboardId.eq(folders[0].id))
        .order_by_asc(dashboard_acl::Column::Id)
        .all(fx.db())
        .await
        .unwrap();
    let shape: Vec<_> = copied
        .iter()
        .map(|e| (e.user_id, e.team_id, e.role.clone(), e.permission))
        .collect();
    assert_eq!(
        shape,
        vec![(Some(7), None, None, 4), (None, None, Some("Viewer".to_string()), 1)]
    );

    for rule in fx.rules().await {
        assert_eq!(rule.namespace_uid, folders[0].uid);
    }
}

#[tokio::test]
async fn dashboard_in_folder_reuses_parent_unchanged() {
    let fx = Fixture::new().await;
    let ds = fx.datasource(1, "prom").await;
    let parent = fx.folder(1, "team-folder", "Team").await;
    let dash = fx.dashboard(1, "dash", parent, false, json!({})).await;
    fx.alert(1, dash, 1, "Latency", settings(ds)).await;

    let summary = fx.migration().forward(fx.db()).await.unwrap();
    assert_eq!(summary.folders_created, 0);

    assert!(fx.marked_folders().await.is_empty());
    assert_eq!(fx.rules().await[0].namespace_uid, "team-folder");
    assert_eq!(dashboard_acl::Entity::find().count(fx.db()).await.unwrap(), 0);
}

#[tokio::test]
async fn general_folder_created_once_per_organization() {
    let fx = Fixture::new().await;
    let ds1 = fx.datasource(1, "prom-1").await;
    let ds2 = fx.datasource(2, "prom-2").await;
    let a = fx.dashboard(1, "a", 0, false, json!({})).await;
    let b = fx.dashboard(1, "b", 0, false, json!({})).await;
    let c = fx.dashboard(2, "c", 0, false, json!({})).await;
    fx.alert(1, a, 1, "A", settings(ds1)).await;
    fx.alert(1, b, 1, "B", settings(ds1)).await;
    fx.alert(2, c, 1, "C", settings(ds2)).await;

    let summary = fx.migration().forward(fx.db()).await.unwrap();
    assert_eq!(summary.organizations, 2);

    let folders = fx.marked_folders().await;
    assert_eq!(folders.len(), 2);
    assert!(folders.iter().all(|f| f.title == GENERAL_FOLDER));

    let rules = fx.rules().await;
    assert_eq!(rules[0].namespace_uid, rules[1].namespace_uid);
    assert_ne!(rules[0].namespace_uid, rules[2].namespace_uid);
    assert_eq!(fx.configurations().await.len(), 2);
}

#[tokio::test]
async fn existing_general_folder_is_reused() {
    let fx = Fixture::new().await;
    let ds = fx.datasource(1, "prom").await;
    fx.folder(1, "existing-general", GENERAL_FOLDER).await;
    let dash = fx.dashboard(1, "dash", 0, false, json!({})).await;
    fx.alert(1, dash, 1, "Errors", settings(ds)).await;

    fx.migration().forward(fx.db()).await.unwrap();

    assert!(fx.marked_folders().await.is_empty());
    assert_eq!(fx.rules().await[0].namespace_uid, "existing-general");
}

#[tokio::test]
async fn missing_dashboard_aborts_whole_pass() {
    let fx = Fixture::new().await;
    let ds = fx.datasource(1, "prom").await;
    let dash = fx.dashboard(1, "dash", 0, false, json!({})).await;
    fx.alert(1, dash, 1, "Fine", settings(ds)).await;
    let broken = fx.alert(1, 999, 1, "Orphan", settings(ds)).await;

    let err = fx.migration().forward(fx.db()).await.unwrap_err();
    assert_eq!(err.alert_id(), Some(broken));
    assert!(matches!(
        err.root(),
        MigrationError::MissingDashboard { org_id: 1, dashboard_id: 999 }
    ));

    let counts = fx.store.table_counts().await.unwrap();
    assert_eq!(counts.rules, 0);
    assert_eq!(counts.rule_versions, 0);
    assert_eq!(counts.configurations, 0);
    assert_eq!(counts.migrated_folders, 0);
}

#[tokio::test]
async fn missing_or_invalid_parent_folder_is_reported() {
    let fx = Fixture::new().await;
    let ds = fx.datasource(1, "prom").await;
    let dash = fx.dashboard(1, "dash", 999, false, json!({})).await;
    let id = fx.alert(1, dash, 1, "Lost", settings(ds)).await;

    let err = fx.migration().forward(fx.db()).await.unwrap_err();
    assert_eq!(err.alert_id(), Some(id));
    assert!(matches!(
        err.root(),
        MigrationError::MissingFolder { folder_id: 999, .. }
    ));

    let fx = Fixture::new().await;
    let ds = fx.datasource(1, "prom").await;
    let plain = fx.dashboard(1, "plain", 0, false, json!({})).await;
    let child = fx.dashboard(1, "child", plain, false, json!({})).await;
    fx.alert(1, child, 1, "Nested", settings(ds)).await;

    let err = fx.migration().forward(fx.db()).await.unwrap_err();
    assert!(matches!(err.root(), MigrationError::NotAFolder(id) if *id == plain));
}

#[tokio::test]
async fn unknown_datasource_is_wrapped_with_alert_id() {
    let fx = Fixture::new().await;
    let dash = fx.dashboard(1, "dash", 0, false, json!({})).await;
    let id = fx.alert(1, dash, 1, "Ghost", settings(404)).await;

    let err = fx.migration().forward(fx.db()).await.unwrap_err();
    assert_eq!(err.alert_id(), Some(id));
    assert!(matches!(
        err.root(),
        MigrationError::UnknownDataSource { datasource_id: 404, .. }
    ));
    assert!(err.to_string().contains(&format!("alert {id}")));
}

#[tokio::test]
async fn unknown_condition_type_is_rejected() {
    let fx = Fixture::new().await;
    let ds = fx.datasource(1, "prom").await;
    let dash = fx.dashboard(1, "dash", 0, false, json!({})).await;
    let mut raw = settings(ds);
    raw["conditions"][0]["type"] = json!("mystery");
    fx.alert(1, dash, 1, "Odd", raw).await;

    let err = fx.migration().forward(fx.db()).await.unwrap_err();
    assert!(matches!(err.root(), MigrationError::InvalidCondition(_)));
    assert_eq!(fx.rules().await.len(), 0);
}

#[tokio::test]
async fn title_conflict_is_retried_with_uid_suffix() {
    let fx = Fixture::new().await;
    let ds = fx.datasource(1, "prom").await;
    let dash = fx.dashboard(1, "dash", 0, false, json!({})).await;
    fx.alert(1, dash, 1, "High CPU", settings(ds)).await;
    fx.alert(1, dash, 2, "High CPU", settings(ds)).await;

    let summary = fx.migration().forward(fx.db()).await.unwrap();
    assert_eq!(summary.rules, 2);
    assert_eq!(summary.retried, 1);

    let rules = fx.rules().await;
    assert_eq!(rules[0].title, "High CPU");
    assert_eq!(rules[1].title, format!("High CPU {}", rules[1].uid));
    assert_eq!(rules[1].rule_group, format!("High CPU {}", rules[1].uid));

    let version = alert_rule_version::Entity::find()
        .filter(alert_rule_version::Column::RuleUid.eq(rules[1].uid.clone()))
        .one(fx.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(version.title, rules[1].title);
}

#[tokio::test]
async fn second_uid_conflict_is_fatal() {
    let fx = Fixture::new().await;
    let ds = fx.datasource(1, "prom").await;
    let dash = fx.dashboard(1, "dash", 0, false, json!({})).await;
    fx.alert(1, dash, 1, "One", settings(ds)).await;
    let second = fx.alert(1, dash, 2, "Two", settings(ds)).await;

    let before = fx.store.table_counts().await.unwrap();
    let migration = fx.migration_with(SequenceUids::new(["gen-folder", "dup", "dup"]));
    let err = migration.forward(fx.db()).await.unwrap_err();

    assert_eq!(err.alert_id(), Some(second));
    assert!(matches!(
        err.root(),
        MigrationError::InsertConflict { uid, .. } if uid == "dup"
    ));
    assert_eq!(fx.store.table_counts().await.unwrap(), before);
}

#[tokio::test]
async fn empty_folder_uid_aborts_pass() {
    let fx = Fixture::new().await;
    let ds = fx.datasource(1, "prom").await;
    let parent = fx.folder(1, "", "Nameless").await;
    let dash = fx.dashboard(1, "dash", parent, false, json!({})).await;
    let id = fx.alert(1, dash, 1, "Orphaned", settings(ds)).await;

    let before = fx.store.table_counts().await.unwrap();
    let err = fx.migration().forward(fx.db()).await.unwrap_err();

    assert_eq!(err.alert_id(), Some(id));
    assert!(matches!(err.root(), MigrationError::EmptyFolderIdentifier));
    assert_eq!(fx.store.table_counts().await.unwrap(), before);
}

#[tokio::test]
async fn failed_permission_copy_rolls_back_folder() {
    let fx = Fixture::new().await;
    let ds = fx.datasource(1, "prom").await;
    let fine = fx.dashboard(1, "fine", 0, false, json!({})).await;
    let locked = fx.dashboard(1, "locked", 0, true, json!({})).await;
    fx.acl(locked, Some(7), None, 4).await;
    fx.alert(1, fine, 1, "Fine", settings(ds)).await;
    let id = fx.alert(1, locked, 1, "Locked", settings(ds)).await;

    fx.db()
        .execute_unprepared(
            "CREATE TRIGGER deny_acl BEFORE INSERT ON dashboard_acl \
             BEGIN SELECT RAISE(ABORT, 'acl writes denied'); END;",
        )
        .await
        .unwrap();

    let before = fx.store.table_counts().await.unwrap();
    let acl_before = dashboard_acl::Entity::find().count(fx.db()).await.unwrap();
    let err = fx.migration().forward(fx.db()).await.unwrap_err();

    assert_eq!(err.alert_id(), Some(id));
    assert!(matches!(err.root(), MigrationError::PermissionCopy { .. }));
    assert_eq!(fx.store.table_counts().await.unwrap(), before);
    assert_eq!(dashboard_acl::Entity::find().count(fx.db()).await.unwrap(), acl_before);
    assert!(fx.marked_folders().await.is_empty());
}

#[tokio::test]
async fn malformed_alert_settings_fail_load() {
    let fx = Fixture::new().await;
    let ds = fx.datasource(1, "prom").await;
    let dash = fx.dashboard(1, "dash", 0, false, json!({})).await;
    fx.alert(1, dash, 1, "Fine", settings(ds)).await;
    let id = fx
        .insert_alert(1, dash, 2, "Garbled", "{\"conditions\": [".to_string())
        .await;

    let before = fx.store.table_counts().await.unwrap();
    let err = fx.migration().forward(fx.db()).await.unwrap_err();

    assert_eq!(err.alert_id(), Some(id));
    assert!(matches!(err.root(), MigrationError::Load { table: "alert", .. }));
    assert_eq!(fx.store.table_counts().await.unwrap(), before);
}

#[tokio::test]
async fn unknown_permission_level_fails_load() {
    let fx = Fixture::new().await;
    let ds = fx.datasource(1, "prom").await;
    let locked = fx.dashboard(1, "locked", 0, true, json!({})).await;
    fx.acl(locked, Some(7), None, 3).await;
    fx.alert(1, locked, 1, "Locked", settings(ds)).await;

    let err = fx.migration().forward(fx.db()).await.unwrap_err();

    assert_eq!(err.alert_id(), None);
    assert!(matches!(err, MigrationError::Load { table: "dashboard_acl", .. }));
    assert!(err.to_string().contains("unknown permission level: 3"));
    assert!(fx.marked_folders().await.is_empty());
}

#[tokio::test]
async fn each_rule_with_channels_gets_exactly_one_route() {
    let fx = Fixture::new().await;
    let ds = fx.datasource(1, "prom").await;
    fx.channel(1, "slack", false, &[]).await;
    let email = fx.channel(1, "email", false, &[]).await;
    let dash = fx
        .dashboard(
            1,
            "dash",
            0,
            false,
            panels(&[
                (1, json!([{ "uid": "slack" }])),
                (2, json!([{ "id": email }, { "uid": "slack" }])),
                (3, json!([])),
                (4, json!([{ "uid": "deleted" }])),
            ]),
        )
        .await;
    for panel in 1..=4 {
        fx.alert(1, dash, panel, &format!("Panel {panel}"), settings(ds)).await;
    }

    let summary = fx.migration().forward(fx.db()).await.unwrap();
    assert_eq!(summary.routes, 2);

    let configs = fx.configurations().await;
    let config = &configs[&1];
    assert_eq!(config.route.routes.len(), 2);

    let rules = fx.rules().await;
    let expected: [&[&str]; 4] = [&["slack"], &["email", "slack"], &[], &[]];
    for (rule, channels) in rules.iter().zip(expected) {
        let routes = config.routes_for(&labels(rule));
        if channels.is_empty() {
            assert!(routes.is_empty(), "rule {} should fall through to the root", rule.title);
            continue;
        }
        assert_eq!(routes.len(), 1);
        let receiver = config.receiver(&routes[0].receiver).unwrap();
        let uids: Vec<&str> = receiver.integrations.iter().map(|i| i.uid.as_str()).collect();
        assert_eq!(uids, channels);
    }
}

#[tokio::test]
async fn secure_settings_are_reencrypted() {
    let fx = Fixture::new().await;
    let ds = fx.datasource(1, "prom").await;
    fx.channel(1, "hook", true, &[("url", "https://hooks.example/secret")]).await;
    let dash = fx.dashboard(1, "dash", 0, false, json!({})).await;
    fx.alert(1, dash, 1, "Hooked", settings(ds)).await;

    fx.migration().forward(fx.db()).await.unwrap();

    let raw = alert_configuration::Entity::find()
        .one(fx.db())
        .await
        .unwrap()
        .unwrap()
        .alertmanager_configuration;
    assert!(!raw.contains("hooks.example"));

    let config = RoutingConfiguration::from_json(&raw).unwrap();
    let integration = &config.receiver(DEFAULT_RECEIVER).unwrap().integrations[0];
    let plaintext = fx.secrets.decrypt(&integration.secure_settings["url"]).unwrap();
    assert_eq!(plaintext, "https://hooks.example/secret");
}

#[tokio::test]
async fn encryption_failure_aborts_pass() {
    struct EncryptFails;
    impl SecretService for EncryptFails {
        fn encrypt(&self, _plaintext: &str) -> unialert_storage::error::Result<String> {
            Err(unialert_storage::error::StorageError::Crypto("no key".into()))
        }
        fn decrypt(&self, ciphertext: &str) -> unialert_storage::error::Result<String> {
            Ok(ciphertext.to_string())
        }
    }

    let fx = Fixture::new().await;
    let ds = fx.datasource(1, "prom").await;
    fx.insert_channel(1, "hook", true, json!({ "url": "plain" }).to_string())
        .await;
    let dash = fx.dashboard(1, "dash", 0, false, json!({})).await;
    fx.alert(1, dash, 1, "Hooked", settings(ds)).await;

    let migration = AlertMigration::new(
        Arc::new(EncryptFails),
        Arc::new(SequenceUids::new(Vec::<String>::new())),
    );
    let err = migration.forward(fx.db()).await.unwrap_err();
    assert!(matches!(err, MigrationError::Encryption(_)));
    assert_eq!(fx.rules().await.len(), 0);
    assert!(fx.marked_folders().await.is_empty());
}

#[tokio::test]
async fn version_row_snapshots_rule() {
    let fx = Fixture::new().await;
    let ds = fx.datasource(1, "prom").await;
    let dash = fx.dashboard(1, "dash", 0, false, json!({})).await;
    fx.alert(1, dash, 1, "Snap", settings(ds)).await;

    fx.migration().forward(fx.db()).await.unwrap();

    let rule = fx.rules().await.remove(0);
    let versions = alert_rule_version::Entity::find().all(fx.db()).await.unwrap();
    assert_eq!(versions.len(), 1);
    let v = &versions[0];
    assert_eq!(v.rule_uid, rule.uid);
    assert_eq!(v.rule_namespace_uid, rule.namespace_uid);
    assert_eq!(v.version, 1);
    assert_eq!(v.parent_version, 0);
    assert_eq!(v.restored_from, 0);
    assert_eq!(v.condition, rule.condition);
    assert_eq!(v.data, rule.data);
    assert_eq!(v.labels, rule.labels);
    assert_eq!(v.no_data_state, "NoData");
}

#[tokio::test]
async fn reversal_undoes_forward_and_is_idempotent() {
    let fx = Fixture::new().await;
    let ds = fx.datasource(1, "prom").await;
    fx.channel(1, "slack", true, &[("token", "xoxb")]).await;
    let team = fx.folder(1, "team-folder", "Team").await;
    fx.acl(team, Some(3), None, 2).await;
    let locked = fx.dashboard(1, "locked", 0, true, json!({})).await;
    fx.acl(locked, Some(5), None, 4).await;
    let nested = fx.dashboard(1, "nested", team, false, json!({})).await;
    let root = fx.dashboard(1, "root", 0, false, panels(&[(1, json!([{ "uid": "slack" }]))])).await;
    fx.alert(1, locked, 1, "Locked", settings(ds)).await;
    fx.alert(1, nested, 1, "Nested", settings(ds)).await;
    fx.alert(1, root, 1, "Root", settings(ds)).await;

    let counts_before = fx.store.table_counts().await.unwrap();
    let dashboards_before = dashboard::Entity::find().count(fx.db()).await.unwrap();
    let acl_before = dashboard_acl::Entity::find().count(fx.db()).await.unwrap();

    let migration = fx.migration();
    let forward = migration.run(fx.db(), Directive::Forward).await.unwrap();
    assert!(matches!(forward, Outcome::Forward(s) if s.rules == 3 && s.folders_created == 2));

    let outcome = migration.run(fx.db(), Directive::Reverse).await.unwrap();
    let Outcome::Reverse(summary) = outcome else {
        panic!("expected a reversal outcome");
    };
    assert_eq!(summary.rules, 3);
    assert_eq!(summary.rule_versions, 3);
    assert_eq!(summary.folders, 2);
    assert_eq!(summary.permissions, 1);
    assert_eq!(summary.configurations, 1);

    assert_eq!(fx.store.table_counts().await.unwrap(), counts_before);
    assert_eq!(dashboard::Entity::find().count(fx.db()).await.unwrap(), dashboards_before);
    assert_eq!(dashboard_acl::Entity::find().count(fx.db()).await.unwrap(), acl_before);

    let again = migration.reverse(fx.db()).await.unwrap();
    assert!(again.is_empty());
}
