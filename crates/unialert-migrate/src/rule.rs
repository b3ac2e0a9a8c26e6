use serde_json::Value;
use std::collections::BTreeMap;
use unialert_common::types::{ExecErrState, NoDataState, ROUTING_LABEL};

use crate::condition::{AlertQuery, TranslatedCondition};
use crate::loader::{ChannelRef, LegacyAlert};

/// Base interval of the unified scheduler, in seconds.
pub const SCHEDULER_BASE_INTERVAL: i64 = 10;

pub const ANNOTATION_DASHBOARD_UID: &str = "__dashboardUid__";
pub const ANNOTATION_PANEL_ID: &str = "__panelId__";
pub const ANNOTATION_MESSAGE: &str = "message";

/// A unified rule ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRule {
    pub org_id: i64,
    pub uid: String,
    pub namespace_uid: String,
    pub rule_group: String,
    pub title: String,
    pub condition: String,
    pub data: Vec<AlertQuery>,
    pub interval_seconds: i64,
    pub for_ns: i64,
    pub no_data_state: NoDataState,
    pub exec_err_state: ExecErrState,
    pub annotations: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
}

impl PlannedRule {
    /// Suffixes title and rule group with the uid after an insert conflict.
    pub fn disambiguate(&mut self) {
        let suffix = format!(" {}", self.uid);
        self.title.push_str(&suffix);
        self.rule_group.push_str(&suffix);
    }
}

/// Builds the unified rule for `alert`, placed in folder `namespace_uid`.
pub fn build_rule(
    alert: &LegacyAlert,
    dashboard_uid: &str,
    namespace_uid: &str,
    uid: String,
    translated: TranslatedCondition,
) -> PlannedRule {
    let mut labels = translated.labels;
    labels.insert(ROUTING_LABEL.to_string(), uid.clone());

    let annotations = BTreeMap::from([
        (ANNOTATION_DASHBOARD_UID.to_string(), dashboard_uid.to_string()),
        (ANNOTATION_PANEL_ID.to_string(), alert.panel_id.to_string()),
        (ANNOTATION_MESSAGE.to_string(), alert.message.clone()),
    ]);

    PlannedRule {
        org_id: alert.org_id,
        uid,
        namespace_uid: namespace_uid.to_string(),
        rule_group: alert.name.clone(),
        title: alert.name.clone(),
        condition: translated.condition,
        data: translated.data,
        interval_seconds: adjust_interval(alert.frequency),
        for_ns: alert.for_ns,
        no_data_state: translated.no_data_state,
        exec_err_state: translated.exec_err_state,
        annotations,
        labels,
    }
}

/// Fits a legacy frequency onto the scheduler base interval.
///
/// # Examples
///
/// ```
/// use unialert_migrate::rule::adjust_interval;
///
/// assert_eq!(adjust_interval(1), 10);
/// assert_eq!(adjust_interval(65), 60);
/// ```
pub fn adjust_interval(frequency: i64) -> i64 {
    if frequency <= SCHEDULER_BASE_INTERVAL {
        return SCHEDULER_BASE_INTERVAL;
    }
    frequency - frequency % SCHEDULER_BASE_INTERVAL
}

/// Channel references of the alert on panel `panel_id` of a dashboard model.
///
/// Looks through top-level panels, panels nested in collapsed rows, and the
/// pre-panels `rows` layout.
pub fn panel_channel_refs(dashboard: &Value, panel_id: i64) -> Vec<ChannelRef> {
    find_panel(dashboard, panel_id)
        .and_then(|panel| panel.pointer("/alert/notifications"))
        .and_then(Value::as_array)
        .map(|notifications| notifications.iter().filter_map(channel_ref).collect())
        .unwrap_or_default()
}

fn find_panel(container: &Value, panel_id: i64) -> Option<&Value> {
    let panels = container.get("panels").and_then(Value::as_array);
    for panel in panels.into_iter().flatten() {
        if panel.get("id").and_then(Value::as_i64) == Some(panel_id) {
            return Some(panel);
        }
        if let Some(nested) = find_panel(panel, panel_id) {
            return Some(nested);
        }
    }

    let rows = container.get("rows").and_then(Value::as_array);
    rows.into_iter()
        .flatten()
        .find_map(|row| find_panel(row, panel_id))
}

fn channel_ref(notification: &Value) -> Option<ChannelRef> {
    match notification.get("uid").and_then(Value::as_str) {
        Some(uid) if !uid.is_empty() => Some(ChannelRef::Uid(uid.to_string())),
        _ => notification
            .get("id")
            .and_then(Value::as_i64)
            .map(ChannelRef::Id),
    }
}
