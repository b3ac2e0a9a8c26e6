//! Translation of legacy panel alert conditions into unified rule queries.
//!
//! Legacy settings are decoded into tagged variants first; anything the
//! translator does not recognise fails with [`MigrationError::InvalidCondition`]
//! instead of being copied through.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use unialert_common::types::{ExecErrState, NoDataState};

use crate::error::{MigrationError, Result};

/// Data source uid of server-side expression queries.
pub const EXPRESSION_DATASOURCE_UID: &str = "-100";

/// Decoded `alert.settings`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashAlertSettings {
    #[serde(default)]
    pub conditions: Vec<LegacyCondition>,
    #[serde(default)]
    pub no_data_state: String,
    #[serde(default)]
    pub execution_error_state: String,
    #[serde(default)]
    pub alert_rule_tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LegacyCondition {
    Query(QueryCondition),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryCondition {
    pub evaluator: Evaluator,
    pub operator: Operator,
    pub query: ConditionQuery,
    pub reducer: Reducer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluator {
    #[serde(default)]
    pub params: Vec<f64>,
    #[serde(rename = "type")]
    pub kind: EvaluatorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluatorKind {
    Gt,
    Lt,
    WithinRange,
    OutsideRange,
    NoValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operator {
    #[serde(rename = "type")]
    pub kind: OperatorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorKind {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reducer {
    #[serde(default)]
    pub params: Vec<Value>,
    #[serde(rename = "type")]
    pub kind: ReducerKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReducerKind {
    Avg,
    Min,
    Max,
    Sum,
    Count,
    Last,
    Median,
    Diff,
    DiffAbs,
    PercentDiff,
    PercentDiffAbs,
    CountNonNull,
}

/// `params` is `[refId, from, to]`, e.g. `["A", "5m", "now"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionQuery {
    pub params: Vec<String>,
    #[serde(default)]
    pub datasource_id: i64,
    #[serde(default)]
    pub model: Value,
}

/// One query of a unified rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertQuery {
    pub ref_id: String,
    #[serde(default)]
    pub query_type: String,
    pub relative_time_range: RelativeTimeRange,
    pub datasource_uid: String,
    pub model: Value,
}

/// Offsets from now, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelativeTimeRange {
    pub from: i64,
    pub to: i64,
}

/// The rule-level fields derived from a legacy alert's settings.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedCondition {
    /// Ref id of the query whose result decides firing.
    pub condition: String,
    pub data: Vec<AlertQuery>,
    pub no_data_state: NoDataState,
    pub exec_err_state: ExecErrState,
    pub labels: BTreeMap<String, String>,
}

/// Translates the raw settings of a legacy alert in `org_id`.
pub fn translate(
    settings: &Value,
    org_id: i64,
    datasources: &HashMap<(i64, i64), String>,
) -> Result<TranslatedCondition> {
    let settings = DashAlertSettings::deserialize(settings)
        .map_err(|e| MigrationError::InvalidCondition(e.to_string()))?;

    let no_data_state =
        NoDataState::from_legacy(&settings.no_data_state).map_err(MigrationError::InvalidCondition)?;
    let exec_err_state = ExecErrState::from_legacy(&settings.execution_error_state)
        .map_err(MigrationError::InvalidCondition)?;

    let (condition, data) = translate_conditions(&settings.conditions, org_id, datasources)?;

    Ok(TranslatedCondition {
        condition,
        data,
        no_data_state,
        exec_err_state,
        labels: settings.alert_rule_tags,
    })
}

fn translate_conditions(
    conditions: &[LegacyCondition],
    org_id: i64,
    datasources: &HashMap<(i64, i64), String>,
) -> Result<(String, Vec<AlertQuery>)> {
    if conditions.is_empty() {
        return Err(MigrationError::InvalidCondition("no conditions".into()));
    }

    let queries: Vec<&QueryCondition> = conditions
        .iter()
        .map(|c| match c {
            LegacyCondition::Query(q) => q,
        })
        .collect();

    // Legacy ref ids name a panel query; the same query may be evaluated over
    // several time ranges, and each range needs its own ref id.
    let mut ranges_by_ref: BTreeMap<&str, Vec<(&str, &str)>> = BTreeMap::new();
    for q in &queries {
        let (ref_id, from, to) = query_params(&q.query)?;
        let ranges = ranges_by_ref.entry(ref_id).or_default();
        if !ranges.contains(&(from, to)) {
            ranges.push((from, to));
        }
    }

    let mut used: BTreeSet<String> = ranges_by_ref.keys().map(|r| r.to_string()).collect();
    let mut assigned: HashMap<(&str, &str, &str), String> = HashMap::new();
    for (ref_id, ranges) in &ranges_by_ref {
        if let [(from, to)] = ranges.as_slice() {
            assigned.insert((*ref_id, *from, *to), ref_id.to_string());
            continue;
        }
        for &(from, to) in ranges {
            let fresh = next_ref_id(&used)?;
            used.insert(fresh.clone());
            assigned.insert((*ref_id, from, to), fresh);
        }
    }

    let mut data = Vec::new();
    let mut emitted = BTreeSet::new();
    let mut classic = Vec::with_capacity(queries.len());
    for q in &queries {
        let (ref_id, from, to) = query_params(&q.query)?;
        let new_ref = assigned
            .get(&(ref_id, from, to))
            .cloned()
            .ok_or_else(|| MigrationError::InvalidCondition(format!("unassigned ref id {ref_id}")))?;

        if emitted.insert(new_ref.clone()) {
            let datasource_uid = datasources
                .get(&(org_id, q.query.datasource_id))
                .cloned()
                .ok_or(MigrationError::UnknownDataSource {
                    org_id,
                    datasource_id: q.query.datasource_id,
                })?;
            data.push(AlertQuery {
                ref_id: new_ref.clone(),
                query_type: String::new(),
                relative_time_range: RelativeTimeRange {
                    from: relative_seconds(from)?,
                    to: relative_seconds(to)?,
                },
                datasource_uid,
                model: with_ref_id(&q.query.model, &new_ref),
            });
        }

        classic.push(serde_json::json!({
            "evaluator": q.evaluator,
            "operator": q.operator,
            "query": { "params": [new_ref] },
            "reducer": q.reducer,
        }));
    }

    let condition = next_ref_id(&used)?;
    data.push(AlertQuery {
        ref_id: condition.clone(),
        query_type: String::new(),
        relative_time_range: RelativeTimeRange::default(),
        datasource_uid: EXPRESSION_DATASOURCE_UID.to_string(),
        model: serde_json::json!({
            "refId": condition,
            "type": "classic_conditions",
            "datasource": { "uid": EXPRESSION_DATASOURCE_UID, "type": "__expr__" },
            "conditions": classic,
        }),
    });

    Ok((condition, data))
}

fn query_params(query: &ConditionQuery) -> Result<(&str, &str, &str)> {
    match query.params.as_slice() {
        [ref_id, from, to, ..] => Ok((ref_id.as_str(), from.as_str(), to.as_str())),
        [ref_id, from] => Ok((ref_id.as_str(), from.as_str(), "now")),
        _ => Err(MigrationError::InvalidCondition(format!(
            "query params must be [refId, from, to], got {:?}",
            query.params
        ))),
    }
}

fn next_ref_id(used: &BTreeSet<String>) -> Result<String> {
    ('A'..='Z')
        .map(String::from)
        .find(|candidate| !used.contains(candidate))
        .ok_or_else(|| MigrationError::InvalidCondition("ran out of ref ids".into()))
}

fn with_ref_id(model: &Value, ref_id: &str) -> Value {
    let mut object = match model {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    object.insert("refId".into(), Value::String(ref_id.to_string()));
    Value::Object(object)
}

/// Parses `now`, `now-5m` or `5m` into seconds before now.
pub fn relative_seconds(raw: &str) -> Result<i64> {
    let raw = raw.trim();
    if raw == "now" {
        return Ok(0);
    }
    let span = raw.strip_prefix("now-").unwrap_or(raw);
    let invalid = || MigrationError::InvalidCondition(format!("invalid relative time: {raw}"));

    let split = span
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(span.len());
    let (digits, unit) = span.split_at(split);
    let amount: i64 = digits.parse().map_err(|_| invalid())?;
    let multiplier = match unit {
        "ms" => return Ok(amount / 1000),
        "" | "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86_400,
        "w" => 604_800,
        _ => return Err(invalid()),
    };
    amount.checked_mul(multiplier).ok_or_else(invalid)
}
