//! SeaORM entities for the legacy dashboard-alerting tables and the unified
//! alerting tables.

pub mod alert;
pub mod alert_configuration;
pub mod alert_notification;
pub mod alert_rule;
pub mod alert_rule_version;
pub mod dashboard;
pub mod dashboard_acl;
pub mod data_source;
