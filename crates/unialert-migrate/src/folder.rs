//! Folder placement of migrated rules.
//!
//! Every rule lives in a folder. A dashboard is classified once and the
//! classification alone decides where its rules go:
//!
//! * [`Placement::CustomAcl`]: a new `Migrated <dashboard uid>` folder
//!   receiving a copy of the dashboard's ACL.
//! * [`Placement::InFolder`]: the dashboard's parent folder, untouched.
//! * [`Placement::Root`]: the organization's shared `General Alerting`
//!   folder, created on first use and left without ACL entries.

use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use std::collections::HashMap;
use unialert_common::id::UidSource;
use unialert_common::types::{FOLDER_CREATED_BY, GENERAL_FOLDER};
use unialert_storage::entities::{dashboard, dashboard_acl};

use crate::error::{MigrationError, Result};
use crate::loader::{Dashboard, LegacySnapshot};

type Timestamp = sea_orm::prelude::DateTimeWithTimeZone;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement<'a> {
    CustomAcl,
    InFolder(&'a Dashboard),
    Root,
}

/// Decides where rules of `dashboard` go. `parent` is its already validated
/// parent folder, if any.
pub fn classify<'a>(dashboard: &Dashboard, parent: Option<&'a Dashboard>) -> Placement<'a> {
    match (dashboard.has_acl, parent) {
        (true, _) => Placement::CustomAcl,
        (false, Some(folder)) => Placement::InFolder(folder),
        (false, None) => Placement::Root,
    }
}

/// Title of the folder created for a dashboard with its own ACL.
pub fn migrated_folder_title(dashboard_uid: &str) -> String {
    format!("Migrated {dashboard_uid}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFolder {
    pub id: i64,
    pub uid: String,
}

impl From<&Dashboard> for ResolvedFolder {
    fn from(d: &Dashboard) -> Self {
        Self {
            id: d.id,
            uid: d.uid.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderStats {
    pub folders_created: usize,
    pub permissions_copied: usize,
}

/// Resolves folders for one forward pass, creating them inside the pass
/// transaction and remembering what it created.
pub struct FolderResolver<'a> {
    snapshot: &'a LegacySnapshot,
    uids: &'a dyn UidSource,
    now: Timestamp,
    general: HashMap<i64, ResolvedFolder>,
    migrated: HashMap<(i64, i64), ResolvedFolder>,
    stats: FolderStats,
}

impl<'a> FolderResolver<'a> {
    pub fn new(snapshot: &'a LegacySnapshot, uids: &'a dyn UidSource, now: Timestamp) -> Self {
        Self {
            snapshot,
            uids,
            now,
            general: HashMap::new(),
            migrated: HashMap::new(),
            stats: FolderStats::default(),
        }
    }

    pub fn stats(&self) -> FolderStats {
        self.stats
    }

    /// Returns the folder that rules of `dashboard` belong in.
    pub async fn resolve<C>(&mut self, conn: &C, dashboard: &Dashboard) -> Result<ResolvedFolder>
    where
        C: ConnectionTrait,
    {
        let parent = self.parent_of(dashboard)?;

        let folder = match classify(dashboard, parent) {
            Placement::CustomAcl => self.migrated_folder(conn, dashboard).await?,
            Placement::InFolder(folder) => ResolvedFolder::from(folder),
            Placement::Root => self.general_folder(conn, dashboard.org_id).await?,
        };

        if folder.uid.is_empty() {
            return Err(MigrationError::EmptyFolderIdentifier);
        }
        Ok(folder)
    }

    fn parent_of(&self, dashboard: &Dashboard) -> Result<Option<&'a Dashboard>> {
        if dashboard.folder_id <= 0 {
            return Ok(None);
        }
        let snapshot: &'a LegacySnapshot = self.snapshot;
        let folder = snapshot
            .dashboard(dashboard.org_id, dashboard.folder_id)
            .ok_or(MigrationError::MissingFolder {
                org_id: dashboard.org_id,
                folder_id: dashboard.folder_id,
            })?;
        if !folder.is_folder {
            return Err(MigrationError::NotAFolder(folder.id));
        }
        Ok(Some(folder))
    }

    async fn migrated_folder<C>(&mut self, conn: &C, dashboard: &Dashboard) -> Result<ResolvedFolder>
    where
        C: ConnectionTrait,
    {
        let key = (dashboard.org_id, dashboard.id);
        if let Some(folder) = self.migrated.get(&key) {
            return Ok(folder.clone());
        }

        let snapshot: &'a LegacySnapshot = self.snapshot;
        let permissions = snapshot.permissions(dashboard.id);
        let folder = self
            .create_folder(
                conn,
                dashboard.org_id,
                &migrated_folder_title(&dashboard.uid),
                !permissions.is_empty(),
            )
            .await?;

        for entry in permissions {
            dashboard_acl::ActiveModel {
                org_id: Set(dashboard.org_id),
                dashboard_id: Set(folder.id),
                user_id: Set(entry.user_id),
                team_id: Set(entry.team_id),
                role: Set(entry.role.clone()),
                permission: Set(i32::from(entry.level)),
                created: Set(self.now),
                updated: Set(self.now),
                ..Default::default()
            }
            .insert(conn)
            .await
            .map_err(|source| MigrationError::PermissionCopy {
                folder_id: folder.id,
                source,
            })?;
            self.stats.permissions_copied += 1;
        }

        tracing::debug!(
            dashboard_uid = %dashboard.uid,
            folder_uid = %folder.uid,
            permissions = permissions.len(),
            "Created folder for dashboard with custom permissions"
        );
        self.migrated.insert(key, folder.clone());
        Ok(folder)
    }

    async fn general_folder<C>(&mut self, conn: &C, org_id: i64) -> Result<ResolvedFolder>
    where
        C: ConnectionTrait,
    {
        if let Some(folder) = self.general.get(&org_id) {
            return Ok(folder.clone());
        }

        let snapshot: &'a LegacySnapshot = self.snapshot;
        let existing = snapshot.dashboards.values().find(|d| {
            d.org_id == org_id && d.is_folder && d.folder_id == 0 && d.title == GENERAL_FOLDER
        });
        let folder = match existing {
            Some(d) => ResolvedFolder::from(d),
            None => self.create_folder(conn, org_id, GENERAL_FOLDER, false).await?,
        };

        self.general.insert(org_id, folder.clone());
        Ok(folder)
    }

    async fn create_folder<C>(
        &mut self,
        conn: &C,
        org_id: i64,
        title: &str,
        has_acl: bool,
    ) -> Result<ResolvedFolder>
    where
        C: ConnectionTrait,
    {
        let uid = self.uids.next_uid();
        let data = serde_json::json!({ "title": title, "uid": uid }).to_string();

        let model = dashboard::ActiveModel {
            uid: Set(uid),
            org_id: Set(org_id),
            title: Set(title.to_string()),
            data: Set(data),
            folder_id: Set(0),
            is_folder: Set(true),
            has_acl: Set(has_acl),
            created_by: Set(FOLDER_CREATED_BY),
            version: Set(1),
            created: Set(self.now),
            updated: Set(self.now),
            ..Default::default()
        }
        .insert(conn)
        .await
        .map_err(MigrationError::Commit)?;

        self.stats.folders_created += 1;
        tracing::info!(org_id, folder_uid = %model.uid, title, "Created folder");

        Ok(ResolvedFolder {
            id: model.id,
            uid: model.uid,
        })
    }
}
