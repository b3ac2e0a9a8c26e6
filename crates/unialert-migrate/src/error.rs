use sea_orm::DbErr;
use unialert_storage::error::StorageError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by the forward migration or the reversal.
///
/// Every variant aborts the running pass; the only recovered failure is the
/// single disambiguating retry on a rule insert conflict, which never
/// surfaces here unless the retry fails too.
///
/// # Examples
///
/// ```rust
/// use unialert_migrate::error::MigrationError;
///
/// let err = MigrationError::MissingDashboard { org_id: 1, dashboard_id: 7 }.for_alert(42);
/// assert_eq!(err.alert_id(), Some(42));
/// assert!(err.to_string().contains("alert 42"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Reading the legacy tables failed or a row could not be decoded.
    #[error("failed to load {table}: {source}")]
    Load {
        table: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("dashboard {dashboard_id} not found in organisation {org_id}")]
    MissingDashboard { org_id: i64, dashboard_id: i64 },

    #[error("folder {folder_id} not found in organisation {org_id}")]
    MissingFolder { org_id: i64, folder_id: i64 },

    #[error("id {0} is a dashboard, not a folder")]
    NotAFolder(i64),

    #[error("empty folder identifier")]
    EmptyFolderIdentifier,

    #[error("data source {datasource_id} not found in organisation {org_id}")]
    UnknownDataSource { org_id: i64, datasource_id: i64 },

    /// The legacy condition settings have a shape the translator does not know.
    #[error("invalid alert condition: {0}")]
    InvalidCondition(String),

    #[error("failed to copy permissions onto folder {folder_id}: {source}")]
    PermissionCopy {
        folder_id: i64,
        #[source]
        source: DbErr,
    },

    #[error("secret encryption failed: {0}")]
    Encryption(#[source] StorageError),

    #[error("failed to serialize: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A rule insert still violated a uniqueness constraint after the retry.
    #[error("rule {uid} conflicts with an existing rule: {source}")]
    InsertConflict {
        uid: String,
        #[source]
        source: DbErr,
    },

    #[error("database write failed: {0}")]
    Commit(#[source] DbErr),

    /// Wraps a failure with the legacy alert being migrated.
    #[error("failed to migrate alert {alert_id}: {source}")]
    Alert {
        alert_id: i64,
        #[source]
        source: Box<MigrationError>,
    },
}

impl MigrationError {
    pub(crate) fn load<E>(table: &'static str, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Load {
            table,
            source: Box::new(err),
        }
    }

    /// Attaches the legacy alert id, unless one is already attached.
    pub fn for_alert(self, alert_id: i64) -> Self {
        match self {
            Self::Alert { .. } => self,
            other => Self::Alert {
                alert_id,
                source: Box::new(other),
            },
        }
    }

    pub fn alert_id(&self) -> Option<i64> {
        match self {
            Self::Alert { alert_id, .. } => Some(*alert_id),
            _ => None,
        }
    }

    /// The error with any alert wrapper removed.
    pub fn root(&self) -> &MigrationError {
        match self {
            Self::Alert { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Convenience `Result` alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrationError>;
