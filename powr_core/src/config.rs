//! Configuration file support for POWR.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/powr/config.toml`.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub nostr: NostrConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Active workout configuration
#[derive(Clone, Debug, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_rest_seconds")]
    pub default_rest_seconds: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_rest_seconds: default_rest_seconds(),
        }
    }
}

/// Optional publication to the decentralized network
#[derive(Clone, Debug, Deserialize, Default)]
pub struct NostrConfig {
    /// Publish completed workouts by default
    #[serde(default)]
    pub publish: bool,

    /// Hex public key used in exercise references (`33401:<pubkey>:<id>`)
    #[serde(default)]
    pub pubkey: Option<String>,

    /// When set, events are appended to this JSONL file instead of a relay
    #[serde(default)]
    pub events_file: Option<PathBuf>,
}

impl NostrConfig {
    /// Author key for event references; empty when no key is configured
    pub fn author(&self) -> &str {
        self.pubkey.as_deref().unwrap_or("")
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        PathBuf::from(home).join(".local/share")
    });
    base.join("powr")
}

fn default_rest_seconds() -> u32 {
    90
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
            PathBuf::from(home).join(".config")
        });
        base.join("powr").join("config.toml")
    }

    pub fn validate(&self) -> Result<()> {
        if self.session.default_rest_seconds == 0 {
            return Err(Error::Config(
                "session.default_rest_seconds must be positive".into(),
            ));
        }
        if let Some(pubkey) = &self.nostr.pubkey {
            if pubkey.len() != 64 || !pubkey.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(Error::Config(format!(
                    "nostr.pubkey must be 64 hex characters, got '{}'",
                    pubkey
                )));
            }
        }
        Ok(())
    }
}
