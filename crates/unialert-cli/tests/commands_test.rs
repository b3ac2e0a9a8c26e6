mod common;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, Database};
use serde_json::json;
use unialert_cli::commands::{self, Command, Report};
use unialert_cli::config::MigrateConfig;
use unialert_migrate::Outcome;
use unialert_storage::entities::{alert, dashboard, data_source};
use unialert_storage::TableCounts;

async fn status(config: &MigrateConfig) -> TableCounts {
    match commands::run(config, Command::Status).await.unwrap() {
        Report::Status(counts) => counts,
        other => panic!("expected status report, got {other:?}"),
    }
}

async fn seed_one_alert(config: &MigrateConfig) {
    let db = Database::connect(config.database.connection_url())
        .await
        .unwrap();
    let now = Utc::now().fixed_offset();

    let ds = data_source::ActiveModel {
        org_id: Set(1),
        uid: Set("prom".to_string()),
        name: Set("Prometheus".to_string()),
        ds_type: Set("prometheus".to_string()),
        ..Default::default()
    }
    .insert(&db)
    .await
    .unwrap();

    let dash = dashboard::ActiveModel {
        uid: Set("ops".to_string()),
        org_id: Set(1),
        title: Set("Ops".to_string()),
        data: Set("{}".to_string()),
        folder_id: Set(0),
        is_folder: Set(false),
        has_acl: Set(false),
        created_by: Set(1),
        version: Set(1),
        created: Set(now),
        updated: Set(now),
        ..Default::default()
    }
    .insert(&db)
    .await
    .unwrap();

    let settings = json!({
        "conditions": [{
            "type": "query",
            "evaluator": { "params": [1.0], "type": "lt" },
            "operator": { "type": "and" },
            "query": { "params": ["A", "10m", "now"], "datasourceId": ds.id, "model": {} },
            "reducer": { "params": [], "type": "last" }
        }]
    });
    alert::ActiveModel {
        version: Set(0),
        org_id: Set(1),
        dashboard_id: Set(dash.id),
        panel_id: Set(1),
        name: Set("Service down".to_string()),
        message: Set(String::new()),
        state: Set("ok".to_string()),
        new_state_date: Set(None),
        settings: Set(settings.to_string()),
        frequency: Set(30),
        for_ns: Set(0),
        ..Default::default()
    }
    .insert(&db)
    .await
    .unwrap();
}

#[tokio::test]
async fn status_on_fresh_database_is_empty() {
    let ctx = common::build_test_context();

    assert_eq!(status(&ctx.config).await, TableCounts::default());
    assert!(ctx.temp_dir.path().join("secret.key").exists());
    assert!(ctx.temp_dir.path().join("grafana.db").exists());
}

#[tokio::test]
async fn migrate_then_revert_round_trip() {
    let ctx = common::build_test_context();
    status(&ctx.config).await;
    seed_one_alert(&ctx.config).await;

    let report = commands::run(&ctx.config, Command::Migrate).await.unwrap();
    let Report::Migrated(Outcome::Forward(summary)) = report else {
        panic!("expected forward outcome, got {report:?}");
    };
    assert_eq!(summary.rules, 1);
    assert_eq!(summary.organizations, 1);

    let counts = status(&ctx.config).await;
    assert_eq!(counts.rules, 1);
    assert_eq!(counts.rule_versions, 1);
    assert_eq!(counts.configurations, 1);
    assert_eq!(counts.migrated_folders, 1);

    let report = commands::run(&ctx.config, Command::Revert).await.unwrap();
    assert!(matches!(report, Report::Migrated(Outcome::Reverse(s)) if s.rules == 1));

    let counts = status(&ctx.config).await;
    assert_eq!(counts.legacy_alerts, 1);
    assert_eq!(counts.rules, 0);
    assert_eq!(counts.migrated_folders, 0);
}

#[test]
fn parses_known_commands_only() {
    assert_eq!(Command::parse("migrate"), Some(Command::Migrate));
    assert_eq!(Command::parse("revert"), Some(Command::Revert));
    assert_eq!(Command::parse("status"), Some(Command::Status));
    assert_eq!(Command::parse("rollback"), None);
}
