//! Configuration management for Civicast

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};
use crate::types::Platform;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub scheduling: SchedulingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "~/.local/share/civicast/posts.db".to_string(),
        }
    }
}

/// OpenAI-compatible chat completion provider used by the copy generator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub posts_per_platform: usize,
    /// Source text beyond this many characters is truncated before prompting
    pub max_source_chars: usize,
    pub max_variations: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.8,
            max_tokens: 2500,
            timeout_secs: 60,
            posts_per_platform: 5,
            max_source_chars: 100_000,
            max_variations: 40,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    pub base_url: String,
    pub api_key_env: String,
    /// Zone attached to every scheduled timestamp sent to the provider
    pub timezone: String,
    pub timeout_secs: u64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://getlate.dev/api/v1".to_string(),
            api_key_env: "LATE_API_KEY".to_string(),
            timezone: "America/New_York".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub page_size: usize,
    pub max_page_size: usize,
    /// Open curation sessions kept in memory; the oldest is evicted beyond this
    pub max_sessions: usize,
    /// Curation sessions older than this are discarded
    pub session_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            page_size: 20,
            max_page_size: 100,
            max_sessions: 200,
            session_ttl_secs: 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub dir: String,
    /// Prefix for returned URLs; files are served from here by an external host
    pub public_base_url: String,
    pub max_bytes: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            dir: "~/.local/share/civicast/media".to_string(),
            public_base_url: "http://127.0.0.1:8080/media".to_string(),
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    pub platforms: Vec<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            platforms: Platform::ALL.iter().map(|p| p.as_str().to_string()).collect(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    /// Load configuration from the default location
    ///
    /// A missing file is not an error: the defaults are used instead.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        let mut config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            tracing::debug!("No config file at {}, using defaults", config_path.display());
            Self::default_config()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            database: DatabaseConfig::default(),
            generation: GenerationConfig::default(),
            scheduling: SchedulingConfig::default(),
            server: ServerConfig::default(),
            media: MediaConfig::default(),
            defaults: DefaultsConfig::default(),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("CIVICAST_DB_PATH") {
            self.database.path = path;
        }
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        for name in &self.defaults.platforms {
            name.parse::<Platform>().map_err(|_| {
                ConfigError::InvalidValue(format!("defaults.platforms: unknown platform '{}'", name))
            })?;
        }
        if self.generation.posts_per_platform == 0 {
            return Err(ConfigError::InvalidValue(
                "generation.posts_per_platform must be at least 1".to_string(),
            )
            .into());
        }
        if self.server.page_size == 0 || self.server.page_size > self.server.max_page_size {
            return Err(ConfigError::InvalidValue(format!(
                "server.page_size must be between 1 and {}",
                self.server.max_page_size
            ))
            .into());
        }
        if self.server.max_sessions == 0 {
            return Err(ConfigError::InvalidValue(
                "server.max_sessions must be at least 1".to_string(),
            )
            .into());
        }
        Ok(())
    }

    /// Platforms used when a request names none
    pub fn default_platforms(&self) -> Vec<Platform> {
        let platforms: Vec<Platform> = self
            .defaults
            .platforms
            .iter()
            .filter_map(|p| p.parse().ok())
            .collect();
        if platforms.is_empty() {
            Platform::ALL.to_vec()
        } else {
            platforms
        }
    }
}

/// Read an API key from the named environment variable
pub fn read_api_key(env_var: &str) -> Result<SecretString> {
    match std::env::var(env_var) {
        Ok(value) if !value.trim().is_empty() => Ok(SecretString::from(value)),
        _ => Err(ConfigError::MissingField(format!(
            "API key environment variable {} is not set",
            env_var
        ))
        .into()),
    }
}

/// Resolve the configuration file path following the XDG base directory layout
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("CIVICAST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("civicast").join("config.toml"))
}

/// Resolve the data directory path following the XDG base directory layout
pub fn resolve_data_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| ConfigError::MissingField("data directory".to_string()))?;

    Ok(data_dir.join("civicast"))
}
