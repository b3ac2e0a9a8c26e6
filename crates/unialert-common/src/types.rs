use serde::{Deserialize, Serialize};

/// Label key carrying a migrated rule's uid; each generated route matches on it.
pub const ROUTING_LABEL: &str = "rule_uid";

/// `created_by` value stamped on folders created by the migration.
pub const FOLDER_CREATED_BY: i64 = -8;

/// Title of the shared per-organization folder for dashboards without a parent.
pub const GENERAL_FOLDER: &str = "General Alerting";

/// Configuration format written for every migrated organization.
pub const CONFIGURATION_VERSION: &str = "v1";

/// What a unified rule reports when its queries return no data.
///
/// # Examples
///
/// ```
/// use unialert_common::types::NoDataState;
///
/// assert_eq!(NoDataState::from_legacy("keep_state").unwrap(), NoDataState::NoData);
/// assert_eq!(NoDataState::from_legacy("ok").unwrap().to_string(), "OK");
/// assert!(NoDataState::from_legacy("explode").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoDataState {
    Alerting,
    NoData,
    #[serde(rename = "OK")]
    Ok,
}

impl NoDataState {
    /// Maps the legacy `noDataState` setting. `keep_state` has no unified
    /// counterpart and becomes `NoData`.
    pub fn from_legacy(value: &str) -> Result<Self, String> {
        match value {
            "ok" => Ok(Self::Ok),
            "" | "no_data" | "keep_state" => Ok(Self::NoData),
            "alerting" => Ok(Self::Alerting),
            other => Err(format!("unrecognized no data setting: {other}")),
        }
    }
}

impl std::fmt::Display for NoDataState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoDataState::Alerting => write!(f, "Alerting"),
            NoDataState::NoData => write!(f, "NoData"),
            NoDataState::Ok => write!(f, "OK"),
        }
    }
}

/// What a unified rule reports when evaluation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecErrState {
    Alerting,
}

impl ExecErrState {
    pub fn from_legacy(value: &str) -> Result<Self, String> {
        match value {
            "" | "alerting" | "keep_state" => Ok(Self::Alerting),
            other => Err(format!("unrecognized execution error setting: {other}")),
        }
    }
}

impl std::fmt::Display for ExecErrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecErrState::Alerting => write!(f, "Alerting"),
        }
    }
}

/// Permission level stored on `dashboard_acl` rows.
///
/// # Examples
///
/// ```
/// use unialert_common::types::PermissionLevel;
///
/// assert_eq!(PermissionLevel::try_from(2), Ok(PermissionLevel::Edit));
/// assert_eq!(i32::from(PermissionLevel::Admin), 4);
/// assert!(PermissionLevel::try_from(3).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PermissionLevel {
    View,
    Edit,
    Admin,
}

impl TryFrom<i32> for PermissionLevel {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::View),
            2 => Ok(Self::Edit),
            4 => Ok(Self::Admin),
            other => Err(format!("unknown permission level: {other}")),
        }
    }
}

impl From<PermissionLevel> for i32 {
    fn from(level: PermissionLevel) -> Self {
        match level {
            PermissionLevel::View => 1,
            PermissionLevel::Edit => 2,
            PermissionLevel::Admin => 4,
        }
    }
}
