use anyhow::{Context, Result};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};
use std::path::Path;
use std::sync::Arc;

use crate::crypto::AesGcmSecrets;

pub mod summary;

pub use summary::TableCounts;

/// 告警迁移所操作的仪表盘数据库的统一访问层。
///
/// 底层使用 SeaORM + SQLite，打开时自动运行 Schema 迁移。
pub struct Store {
    pub(crate) db: DatabaseConnection,
    secrets: Arc<AesGcmSecrets>,
}

impl Store {
    /// 连接并初始化数据库。
    ///
    /// - `db_url`：完整的数据库连接 URL。
    ///   SQLite 示例：`sqlite://data/grafana.db?mode=rwc`
    /// - `key_path`：密钥文件路径，不存在时自动生成。
    pub async fn open(db_url: &str, key_path: &Path) -> Result<Self> {
        let db = Database::connect(db_url)
            .await
            .with_context(|| format!("failed to connect to {db_url}"))?;

        // WAL 模式仅对 SQLite 有效
        if db_url.starts_with("sqlite://") {
            db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;
        }

        // 运行所有待执行迁移
        Migrator::up(&db, None)
            .await
            .context("failed to apply schema migrations")?;

        let secrets = Arc::new(AesGcmSecrets::load_or_create(key_path)?);
        tracing::info!(db_url = %db_url, "Opened alerting store");

        Ok(Self { db, secrets })
    }

    /// 返回底层数据库连接引用。
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn secrets(&self) -> Arc<AesGcmSecrets> {
        Arc::clone(&self.secrets)
    }
}
