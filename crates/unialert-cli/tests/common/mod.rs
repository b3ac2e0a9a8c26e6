#![allow(dead_code)]

use std::path::Path;
use tempfile::TempDir;
use unialert_cli::config::MigrateConfig;

pub struct TestContext {
    pub temp_dir: TempDir,
    pub config: MigrateConfig,
}

/// Config whose database and key live in a fresh temporary directory.
pub fn build_test_context() -> TestContext {
    let temp_dir = TempDir::new().unwrap();
    let toml = format!(
        r#"
[database]
data_dir = '{}'
file_name = "grafana.db"

[logging]
default_directive = "unialert=debug"
"#,
        temp_dir.path().display()
    );
    let config = MigrateConfig::parse(&toml).unwrap();
    TestContext { temp_dir, config }
}

pub fn write_config(dir: &Path, content: &str) -> String {
    let path = dir.join("unialert.toml");
    std::fs::write(&path, content).unwrap();
    path.display().to_string()
}
