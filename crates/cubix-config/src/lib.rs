//! Cubix Configuration
//!
//! TOML configuration loading with environment variable overrides for the
//! Evolution API credentials

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub core: CoreConfig,
    #[serde(default)]
    pub evolution: EvolutionConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CoreConfig {
    pub data_dir: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvolutionConfig {
    /// Base URL of the Evolution API gateway.
    #[serde(default)]
    pub api_url: String,
    /// Optional `apikey` header value.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Gateway instance name, part of every endpoint path.
    #[serde(default)]
    pub instance: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_algorithms_file")]
    pub algorithms_file: String,
    #[serde(default = "default_images_dir")]
    pub images_dir: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            algorithms_file: default_algorithms_file(),
            images_dir: default_images_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_algorithms_file() -> String {
    "algs.json".to_string()
}

fn default_images_dir() -> String {
    "imagens_algoritmos".to_string()
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Configuration built purely from the environment, for deployments
    /// that never write a config file.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Config::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn default_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|dir| dir.join("cubix").join("config.toml"))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("EVOLUTION_API_URL") {
            if !value.trim().is_empty() {
                self.evolution.api_url = value.trim().to_string();
            }
        }
        if let Ok(value) = std::env::var("EVOLUTION_API_KEY") {
            if !value.trim().is_empty() {
                self.evolution.api_key = Some(value.trim().to_string());
            }
        }
        if let Ok(value) = std::env::var("INSTANCE_NAME") {
            if !value.trim().is_empty() {
                self.evolution.instance = value.trim().to_string();
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.evolution.api_url.trim().is_empty() {
            anyhow::bail!("evolution.api_url (or EVOLUTION_API_URL) is required");
        }
        if self.evolution.instance.trim().is_empty() {
            anyhow::bail!("evolution.instance (or INSTANCE_NAME) is required");
        }
        let normalized = self.dashboard_url();
        url::Url::parse(&normalized)
            .map_err(|e| anyhow::anyhow!("evolution.api_url '{}' is not a valid URL: {}", normalized, e))?;
        if self.server.bind.trim().is_empty() {
            anyhow::bail!("server.bind cannot be empty");
        }
        Ok(())
    }

    /// Gateway URL with a scheme, for the operator dashboard redirect.
    pub fn dashboard_url(&self) -> String {
        let raw = self.evolution.api_url.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            raw.to_string()
        } else {
            format!("https://{}", raw)
        }
    }
}
