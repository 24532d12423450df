//! docscale.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DaemonConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub registration: RegistrationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Route prefix, e.g. "/prod" to mirror a gateway stage.
    #[serde(default)]
    pub base_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// tracing-subscriber filter directive, e.g. "info,docscale=debug".
    pub level: Option<String>,
}

/// Parameters of the one-time scalable target registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistrationConfig {
    #[serde(default = "default_min_capacity")]
    pub min_capacity: u32,
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u32,
    #[serde(default = "default_target_value")]
    pub target_value: f64,
    #[serde(default = "default_cooldown")]
    pub scale_out_cooldown: u32,
    #[serde(default = "default_cooldown")]
    pub scale_in_cooldown: u32,
    #[serde(default = "default_policy_name")]
    pub policy_name: String,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8443
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("/var/lib/docscale")
}

fn default_min_capacity() -> u32 {
    2
}

fn default_max_capacity() -> u32 {
    15
}

fn default_target_value() -> f64 {
    5.0
}

fn default_cooldown() -> u32 {
    600
}

fn default_policy_name() -> String {
    "docdbscalingpolicy".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            base_path: String::new(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            min_capacity: default_min_capacity(),
            max_capacity: default_max_capacity(),
            target_value: default_target_value(),
            scale_out_cooldown: default_cooldown(),
            scale_in_cooldown: default_cooldown(),
            policy_name: default_policy_name(),
        }
    }
}

impl DaemonConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DaemonConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// A config with every default spelled out, for `docscaled init`.
    pub fn scaffold(data_dir: &Path) -> Self {
        DaemonConfig {
            store: StoreConfig {
                data_dir: data_dir.to_path_buf(),
            },
            logging: LoggingConfig {
                level: Some("info,docscale=debug".to_string()),
            },
            ..Default::default()
        }
    }
}
