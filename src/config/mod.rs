//! Application configuration

mod loader;

use serde::{Deserialize, Serialize};
use std::path::Path;

pub use loader::load_config;

/// Environment variable holding the upstream API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

/// Relay server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

/// Upstream Gemini API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// API base URL (e.g. "https://generativelanguage.googleapis.com")
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model identifier (e.g. "gemini-2.5-flash")
    #[serde(default = "default_model")]
    pub model: String,
    /// Timeout for initiating a generation call, in seconds.
    /// Does not bound the lifetime of an already-open stream.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Content-safety thresholds, fixed at process start
    #[serde(default)]
    pub safety: SafetyConfig,
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_seconds: default_timeout(),
            safety: SafetyConfig::default(),
        }
    }
}

impl UpstreamConfig {
    /// Returns the base URL with trailing slash stripped
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Block thresholds per harm category
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SafetyConfig {
    #[serde(default = "default_threshold")]
    pub harassment: BlockThreshold,
    #[serde(default = "default_threshold")]
    pub hate_speech: BlockThreshold,
    #[serde(default = "default_threshold")]
    pub sexually_explicit: BlockThreshold,
    #[serde(default = "default_threshold")]
    pub dangerous_content: BlockThreshold,
}

fn default_threshold() -> BlockThreshold {
    BlockThreshold::BlockMediumAndAbove
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            harassment: default_threshold(),
            hate_speech: default_threshold(),
            sexually_explicit: default_threshold(),
            dangerous_content: default_threshold(),
        }
    }
}

/// Safety block threshold, serialized in the upstream's wire format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockThreshold {
    BlockNone,
    BlockOnlyHigh,
    BlockMediumAndAbove,
    BlockLowAndAbove,
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        load_config(path)
    }

    /// Load configuration from an explicit path, or fall back to default
    /// locations. The relay runs fine with no config file at all, so a
    /// missing default file yields the built-in defaults.
    pub fn load_or_default(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        match config_path {
            Some(path) => Self::from_file(path),
            None => {
                let default_paths = ["config.yaml", "config.yml"];
                for p in default_paths {
                    let path = Path::new(p);
                    if path.exists() {
                        return Self::from_file(path);
                    }
                }
                Ok(Self::default())
            }
        }
    }

    /// Read the upstream API key from the environment.
    /// The process must not start without one.
    pub fn resolve_api_key() -> Result<String, ConfigError> {
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ConfigError::MissingApiKey),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(String),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("GEMINI_API_KEY is not set; the relay cannot reach the model without it")]
    MissingApiKey,
}
