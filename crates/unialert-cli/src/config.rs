use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrateConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub secrets: SecretsConfig,
    #[serde(default)]
    pub uid: UidConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection URL; when set, `data_dir` and `file_name` only locate
    /// the secret key.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            data_dir: default_data_dir(),
            file_name: default_file_name(),
        }
    }
}

impl DatabaseConfig {
    pub fn connection_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "sqlite://{}?mode=rwc",
                Path::new(&self.data_dir).join(&self.file_name).display()
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsConfig {
    /// Relative paths resolve against `database.data_dir`.
    #[serde(default = "default_key_file")]
    pub key_file: String,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            key_file: default_key_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UidConfig {
    #[serde(default = "default_snowflake_id")]
    pub machine_id: i32,
    #[serde(default = "default_snowflake_id")]
    pub node_id: i32,
}

impl Default for UidConfig {
    fn default() -> Self {
        Self {
            machine_id: default_snowflake_id(),
            node_id: default_snowflake_id(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_directive")]
    pub default_directive: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_directive: default_directive(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_file_name() -> String {
    "grafana.db".to_string()
}

fn default_key_file() -> String {
    "secret.key".to_string()
}

fn default_snowflake_id() -> i32 {
    1
}

fn default_directive() -> String {
    "unialert=info".to_string()
}

impl MigrateConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{path}'"))?;
        Self::parse(&content).with_context(|| format!("invalid config file '{path}'"))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [("machine_id", self.uid.machine_id), ("node_id", self.uid.node_id)] {
            if !(0..32).contains(&value) {
                anyhow::bail!("uid.{name} must be in 0..32, got {value}");
            }
        }
        if self.database.url.is_none() && self.database.file_name.trim().is_empty() {
            anyhow::bail!("database.file_name must not be empty");
        }
        Ok(())
    }

    pub fn key_path(&self) -> PathBuf {
        let key_file = Path::new(&self.secrets.key_file);
        if key_file.is_absolute() {
            key_file.to_path_buf()
        } else {
            Path::new(&self.database.data_dir).join(key_file)
        }
    }
}
