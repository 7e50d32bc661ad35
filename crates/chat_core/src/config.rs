use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::conversation::DEFAULT_TOKEN_LIMIT;

const CONFIG_FILE_PATH: &str = "config.toml";

const DEFAULT_API_BASE: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Service configuration, loaded from `config.toml` with environment
/// overrides applied on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Provider API key. Requests fail with an auth error when unset.
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible completion API.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Model used when the caller does not pick one.
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Token ceiling for newly created conversations.
    #[serde(default = "default_token_limit")]
    pub default_token_limit: u32,
    /// Sent as the HTTP referer header on provider requests.
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
    /// Directory for conversation storage.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_token_limit() -> u32 {
    DEFAULT_TOKEN_LIMIT
}

fn default_frontend_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_api_base(),
            default_model: default_model(),
            default_token_limit: default_token_limit(),
            frontend_url: default_frontend_url(),
            data_dir: default_data_dir(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Load `config.toml` from the working directory (if present), then apply
    /// environment variable overrides.
    pub fn load() -> Self {
        let mut config = Config::default();

        if std::path::Path::new(CONFIG_FILE_PATH).exists() {
            if let Ok(content) = std::fs::read_to_string(CONFIG_FILE_PATH) {
                if let Ok(file_config) = toml::from_str::<Config>(&content) {
                    config = file_config;
                }
            }
        }

        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("OPENROUTER_API_KEY") {
            if !key.trim().is_empty() {
                self.api_key = Some(key);
            }
        }
        if let Ok(base) = std::env::var("API_BASE") {
            self.api_base = base;
        }
        if let Ok(model) = std::env::var("DEFAULT_MODEL") {
            self.default_model = model;
        }
        if let Ok(limit) = std::env::var("DEFAULT_TOKEN_LIMIT") {
            if let Ok(limit) = limit.parse() {
                self.default_token_limit = limit;
            }
        }
        if let Ok(url) = std::env::var("FRONTEND_URL") {
            self.frontend_url = url;
        }
        if let Ok(dir) = std::env::var("DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(port) = std::env::var("APP_PORT") {
            if let Ok(port) = port.parse() {
                self.port = port;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = Config::default();
        assert!(config.api_key.is_none());
        assert_eq!(config.default_token_limit, DEFAULT_TOKEN_LIMIT);
        assert!(config.api_base.starts_with("https://"));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str("api_key = \"sk-test\"").unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.default_model, DEFAULT_MODEL);
        assert_eq!(config.port, 8080);
    }
}
