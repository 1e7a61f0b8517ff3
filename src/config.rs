// ⚙️ Configuration - file + environment
//
// Resolution order (later wins):
//   1. built-in defaults
//   2. TOML file (--config, or <config_dir>/dispatch/config.toml if present)
//   3. environment: GEMINI_API_KEY / API_KEY, DISPATCH_DB, DISPATCH_BIND,
//      DISPATCH_MODEL

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_BIND: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Service credential; absent means AI features degrade
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            endpoint: default_endpoint(),
        }
    }
}

impl AiConfig {
    /// Trimmed credential, `None` when missing or blank
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn is_configured(&self) -> bool {
        self.credential().is_some()
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

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dispatch")
        .join("shipments.db")
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// `<config_dir>/dispatch/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dispatch").join("config.toml"))
}

impl AppConfig {
    /// Load file (explicit path must exist; default path is optional) + env
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => AppConfig::default(),
            },
        };

        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply environment overrides through a lookup function (testable)
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("GEMINI_API_KEY").or_else(|| non_empty("API_KEY")) {
            self.ai.api_key = Some(key);
        }
        if let Some(model) = non_empty("DISPATCH_MODEL") {
            self.ai.model = model;
        }
        if let Some(path) = non_empty("DISPATCH_DB") {
            self.storage.path = PathBuf::from(path);
        }
        if let Some(bind) = non_empty("DISPATCH_BIND") {
            self.server.bind = bind;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.ai.model, "gemini-2.5-flash");
        assert_eq!(config.server.bind, "0.0.0.0:3000");
        assert!(!config.ai.is_configured());
        assert!(config.storage.path.ends_with("dispatch/shipments.db"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [ai]
            api_key = "abc"

            [storage]
            path = "/tmp/x.db"
            "#,
        )
        .unwrap();

        assert!(config.ai.is_configured());
        assert_eq!(config.ai.model, DEFAULT_MODEL);
        assert_eq!(config.storage.path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.server.bind, DEFAULT_BIND);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("API_KEY", "from-api-key"),
            ("DISPATCH_DB", "/data/s.db"),
            ("DISPATCH_BIND", "127.0.0.1:8080"),
            ("DISPATCH_MODEL", "   "),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.ai.api_key.as_deref(), Some("from-api-key"));
        assert_eq!(config.storage.path, PathBuf::from("/data/s.db"));
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        // Blank values are ignored
        assert_eq!(config.ai.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_gemini_key_wins_over_api_key() {
        let mut config = AppConfig::default();
        config.apply_env(|k| match k {
            "GEMINI_API_KEY" => Some("gemini".to_string()),
            "API_KEY" => Some("generic".to_string()),
            _ => None,
        });
        assert_eq!(config.ai.api_key.as_deref(), Some("gemini"));
    }

    #[test]
    fn test_blank_key_is_not_configured() {
        let mut config = AppConfig::default();
        config.ai.api_key = Some("  ".to_string());
        assert!(!config.ai.is_configured());
        assert_eq!(config.ai.credential(), None);

        config.ai.api_key = Some(" key \n".to_string());
        assert_eq!(config.ai.credential(), Some("key"));
    }
}
