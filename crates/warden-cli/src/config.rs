//! `warden.toml` loading.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration.

use serde::Deserialize;
use std::path::Path;
use warden_channels::NotificationConfig;
use warden_orchestrator::ExecutionConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Deserialize)]
pub struct WardenConfig {
    #[serde(default)]
    pub log_format: LogFormat,
    /// Load the sample agents and predefined playbooks at startup.
    #[serde(default = "default_seed")]
    pub seed: bool,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            seed: default_seed(),
            server: ServerConfig::default(),
            execution: ExecutionConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }
}

fn default_seed() -> bool {
    true
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}

impl WardenConfig {
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let config: WardenConfig = toml::from_str(text)?;
        config.execution.validate()?;
        Ok(config)
    }

    /// Read and validate `path`. Returns `None` when the file does not exist.
    pub async fn load(path: &Path) -> anyhow::Result<Option<Self>> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Failed to read config file '{}': {}",
                    path.display(),
                    e
                ))
            }
        };
        Self::from_toml(&text)
            .map(Some)
            .map_err(|e| anyhow::anyhow!("Invalid config file '{}': {}", path.display(), e))
    }
}
