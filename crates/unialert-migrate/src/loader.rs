//! Bulk reads of the legacy alerting tables.

use sea_orm::{ConnectionTrait, EntityTrait, QueryOrder};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use unialert_common::types::PermissionLevel;
use unialert_storage::entities::{alert, alert_notification, dashboard, dashboard_acl, data_source};
use unialert_storage::SecretService;

use crate::error::{MigrationError, Result};

/// Permission entry attached to a dashboard or folder. Exactly one of
/// `user_id`, `team_id` and `role` names the grantee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessEntry {
    pub user_id: Option<i64>,
    pub team_id: Option<i64>,
    pub role: Option<String>,
    pub level: PermissionLevel,
}

impl TryFrom<dashboard_acl::Model> for AccessEntry {
    type Error = MigrationError;

    fn try_from(m: dashboard_acl::Model) -> Result<Self> {
        let level = PermissionLevel::try_from(m.permission).map_err(|msg| MigrationError::Load {
            table: "dashboard_acl",
            source: format!("row {}: {msg}", m.id).into(),
        })?;
        Ok(Self {
            user_id: m.user_id,
            team_id: m.team_id,
            role: m.role,
            level,
        })
    }
}

#[derive(Debug, Clone)]
pub struct LegacyAlert {
    pub id: i64,
    pub org_id: i64,
    pub dashboard_id: i64,
    pub panel_id: i64,
    pub name: String,
    pub message: String,
    /// Evaluation frequency in seconds.
    pub frequency: i64,
    /// Pending period in nanoseconds.
    pub for_ns: i64,
    /// Raw condition settings; decoded by [`crate::condition`].
    pub settings: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub id: i64,
    pub uid: String,
    pub org_id: i64,
    pub title: String,
    pub folder_id: i64,
    pub is_folder: bool,
    pub has_acl: bool,
    pub data: Value,
}

/// A legacy notification channel with its secure settings decrypted.
#[derive(Debug, Clone)]
pub struct Channel {
    pub id: i64,
    pub uid: String,
    pub name: String,
    pub channel_type: String,
    pub is_default: bool,
    pub disable_resolve_message: bool,
    pub settings: Value,
    pub secure_settings: BTreeMap<String, String>,
}

/// Reference to a channel as stored in a dashboard panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRef {
    Uid(String),
    /// Panels saved before channels had uids refer to them by numeric id.
    Id(i64),
}

/// Channels of one organization.
#[derive(Debug, Clone, Default)]
pub struct OrgChannels {
    pub by_uid: HashMap<String, Channel>,
    pub uid_by_id: HashMap<i64, String>,
    /// Uids of the default channels, in id order.
    pub defaults: Vec<String>,
}

impl OrgChannels {
    fn add(&mut self, channel: Channel) {
        self.uid_by_id.insert(channel.id, channel.uid.clone());
        if channel.is_default {
            self.defaults.push(channel.uid.clone());
        }
        self.by_uid.insert(channel.uid.clone(), channel);
    }

    /// Resolves panel references to channels, dropping duplicates and
    /// unknown references while keeping the panel's order.
    pub fn resolve(&self, refs: &[ChannelRef]) -> Vec<&Channel> {
        let mut seen = BTreeSet::new();
        let mut resolved = Vec::new();
        for r in refs {
            let uid = match r {
                ChannelRef::Uid(uid) => Some(uid.as_str()),
                ChannelRef::Id(id) => self.uid_by_id.get(id).map(String::as_str),
            };
            match uid.and_then(|uid| self.by_uid.get(uid)) {
                Some(channel) => {
                    if seen.insert(channel.uid.as_str()) {
                        resolved.push(channel);
                    }
                }
                None => tracing::warn!(reference = ?r, "Skipping unknown notification channel"),
            }
        }
        resolved
    }

    pub fn default_channels(&self) -> Vec<&Channel> {
        self.defaults
            .iter()
            .filter_map(|uid| self.by_uid.get(uid))
            .collect()
    }
}

/// Everything the forward pass reads, taken before any write.
#[derive(Debug, Clone, Default)]
pub struct LegacySnapshot {
    /// Ordered by id.
    pub alerts: Vec<LegacyAlert>,
    /// `(org id, data source id)` to data source uid.
    pub datasources: HashMap<(i64, i64), String>,
    /// `(org id, dashboard id)` to dashboard or folder.
    pub dashboards: HashMap<(i64, i64), Dashboard>,
    /// Dashboard id to its permission entries, in id order.
    pub acl: HashMap<i64, Vec<AccessEntry>>,
    pub channels: BTreeMap<i64, OrgChannels>,
}

impl LegacySnapshot {
    pub fn dashboard(&self, org_id: i64, dashboard_id: i64) -> Option<&Dashboard> {
        self.dashboards.get(&(org_id, dashboard_id))
    }

    pub fn permissions(&self, dashboard_id: i64) -> &[AccessEntry] {
        self.acl.get(&dashboard_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Organizations that get a routing configuration: those with legacy
    /// alerts or notification channels.
    pub fn organizations(&self) -> BTreeSet<i64> {
        self.alerts
            .iter()
            .map(|a| a.org_id)
            .chain(self.channels.keys().copied())
            .collect()
    }
}

/// Reads all legacy alerting state.
///
/// Channel secure settings are decrypted here so the routing tree can be
/// re-encrypted as a whole later on.
pub async fn load<C>(conn: &C, secrets: &dyn SecretService) -> Result<LegacySnapshot>
where
    C: ConnectionTrait,
{
    let mut snapshot = LegacySnapshot::default();

    for m in alert::Entity::find()
        .order_by_asc(alert::Column::Id)
        .all(conn)
        .await
        .map_err(|e| MigrationError::load("alert", e))?
    {
        let settings = serde_json::from_str(&m.settings)
            .map_err(|e| MigrationError::load("alert", e).for_alert(m.id))?;
        snapshot.alerts.push(LegacyAlert {
            id: m.id,
            org_id: m.org_id,
            dashboard_id: m.dashboard_id,
            panel_id: m.panel_id,
            name: m.name,
            message: m.message,
            frequency: m.frequency,
            for_ns: m.for_ns,
            settings,
        });
    }

    for ds in data_source::Entity::find()
        .all(conn)
        .await
        .map_err(|e| MigrationError::load("data_source", e))?
    {
        snapshot.datasources.insert((ds.org_id, ds.id), ds.uid);
    }

    for d in dashboard::Entity::find()
        .all(conn)
        .await
        .map_err(|e| MigrationError::load("dashboard", e))?
    {
        let data = if d.data.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&d.data).map_err(|e| MigrationError::load("dashboard", e))?
        };
        snapshot.dashboards.insert(
            (d.org_id, d.id),
            Dashboard {
                id: d.id,
                uid: d.uid,
                org_id: d.org_id,
                title: d.title,
                folder_id: d.folder_id,
                is_folder: d.is_folder,
                has_acl: d.has_acl,
                data,
            },
        );
    }

    for entry in dashboard_acl::Entity::find()
        .order_by_asc(dashboard_acl::Column::Id)
        .all(conn)
        .await
        .map_err(|e| MigrationError::load("dashboard_acl", e))?
    {
        let dashboard_id = entry.dashboard_id;
        let entry = AccessEntry::try_from(entry)?;
        snapshot.acl.entry(dashboard_id).or_default().push(entry);
    }

    for n in alert_notification::Entity::find()
        .order_by_asc(alert_notification::Column::Id)
        .all(conn)
        .await
        .map_err(|e| MigrationError::load("alert_notification", e))?
    {
        let org_id = n.org_id;
        let channel = decode_channel(n, secrets)?;
        snapshot.channels.entry(org_id).or_default().add(channel);
    }

    tracing::info!(
        alerts = snapshot.alerts.len(),
        dashboards = snapshot.dashboards.len(),
        datasources = snapshot.datasources.len(),
        organizations = snapshot.organizations().len(),
        "Loaded legacy alerting data"
    );

    Ok(snapshot)
}

fn decode_channel(n: alert_notification::Model, secrets: &dyn SecretService) -> Result<Channel> {
    let settings = if n.settings.trim().is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_str(&n.settings)
            .map_err(|e| MigrationError::load("alert_notification", e))?
    };

    let mut secure_settings = BTreeMap::new();
    if let Some(raw) = n.secure_settings.as_deref().filter(|s| !s.trim().is_empty()) {
        let encrypted: BTreeMap<String, String> = serde_json::from_str(raw)
            .map_err(|e| MigrationError::load("alert_notification", e))?;
        for (key, ciphertext) in encrypted {
            let plaintext = secrets.decrypt(&ciphertext).map_err(MigrationError::Encryption)?;
            secure_settings.insert(key, plaintext);
        }
    }

    Ok(Channel {
        id: n.id,
        uid: n.uid,
        name: n.name,
        channel_type: n.channel_type,
        is_default: n.is_default,
        disable_resolve_message: n.disable_resolve_message,
        settings,
        secure_settings,
    })
}
