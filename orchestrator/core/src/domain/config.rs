// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

// Fellowship Configuration Types
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) describing:
// - where the agent registry lives
// - planning thresholds
// - contract lifetimes
// - where hop signing keys come from
// - logging

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::contract::DEFAULT_EXPIRY_HOURS;
use crate::domain::selection::DEFAULT_MIN_TRUST_SCORE;

pub const CONFIG_API_VERSION: &str = "fellowship/v1";
pub const CONFIG_KIND: &str = "FellowshipConfig";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid apiVersion: '{0}'. Must be 'fellowship/v1'")]
    ApiVersion(String),

    #[error("Invalid kind: '{0}'. Must be 'FellowshipConfig'")]
    Kind(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Top-level configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FellowshipConfig {
    /// API version (must be "fellowship/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "FellowshipConfig")
    pub kind: String,

    #[serde(default)]
    pub metadata: ConfigMetadata,

    #[serde(default)]
    pub spec: FellowshipSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Default for ConfigMetadata {
    fn default() -> Self {
        Self {
            name: "fellowship".to_string(),
            version: Some("1.0.0".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FellowshipSpec {
    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub planning: PlanningConfig,

    #[serde(default)]
    pub contracts: ContractConfig,

    #[serde(default)]
    pub signing: SigningConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Path to the agent registry JSON file
    #[serde(default = "default_registry_path")]
    pub path: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { path: default_registry_path() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningConfig {
    /// Minimum trust score for a strict match
    #[serde(default = "default_min_trust_score")]
    pub min_trust_score: f64,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            min_trust_score: DEFAULT_MIN_TRUST_SCORE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractConfig {
    #[serde(default = "default_expiry_hours")]
    pub expiry_hours: u32,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self { expiry_hours: DEFAULT_EXPIRY_HOURS }
    }
}

/// Where hop signing keys come from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "key_source", rename_all = "lowercase")]
pub enum SigningConfig {
    /// A fresh P-256 key per agent per build session
    #[default]
    Ephemeral,
    /// Externally supplied keys: agent id -> hex-encoded private scalar
    Static {
        #[serde(default)]
        keys: BTreeMap<String, String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: default_log_level() }
    }
}

fn default_registry_path() -> PathBuf {
    PathBuf::from("registry/agent_registry.json")
}

fn default_min_trust_score() -> f64 {
    DEFAULT_MIN_TRUST_SCORE
}

fn default_expiry_hours() -> u32 {
    DEFAULT_EXPIRY_HOURS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for FellowshipConfig {
    fn default() -> Self {
        Self {
            api_version: CONFIG_API_VERSION.to_string(),
            kind: CONFIG_KIND.to_string(),
            metadata: ConfigMetadata::default(),
            spec: FellowshipSpec::default(),
        }
    }
}

impl FellowshipConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. FELLOWSHIP_CONFIG_PATH environment variable
    /// 2. ./fellowship-config.yaml (working directory)
    /// 3. ~/.fellowship/config.yaml (user home)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("FELLOWSHIP_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./fellowship-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".fellowship").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let mut config = if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            Self::from_yaml_file(config_path)?
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("FELLOWSHIP_REGISTRY_PATH") {
            tracing::info!("Environment override: FELLOWSHIP_REGISTRY_PATH={}", val);
            self.spec.registry.path = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("FELLOWSHIP_MIN_TRUST_SCORE") {
            match val.parse::<f64>() {
                Ok(score) if (0.0..=1.0).contains(&score) => {
                    tracing::info!("Environment override: FELLOWSHIP_MIN_TRUST_SCORE={}", score);
                    self.spec.planning.min_trust_score = score;
                }
                _ => tracing::warn!(
                    "Invalid value for FELLOWSHIP_MIN_TRUST_SCORE: '{}'. Expected a number in [0, 1]. Ignoring.",
                    val
                ),
            }
        }

        if let Ok(val) = std::env::var("FELLOWSHIP_CONTRACT_EXPIRY_HOURS") {
            match val.parse::<u32>() {
                Ok(hours) if hours > 0 => {
                    tracing::info!("Environment override: FELLOWSHIP_CONTRACT_EXPIRY_HOURS={}", hours);
                    self.spec.contracts.expiry_hours = hours;
                }
                _ => tracing::warn!(
                    "Invalid value for FELLOWSHIP_CONTRACT_EXPIRY_HOURS: '{}'. Expected a positive integer. Ignoring.",
                    val
                ),
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_version != CONFIG_API_VERSION {
            return Err(ConfigError::ApiVersion(self.api_version.clone()));
        }
        if self.kind != CONFIG_KIND {
            return Err(ConfigError::Kind(self.kind.clone()));
        }

        let planning = &self.spec.planning;
        if !(0.0..=1.0).contains(&planning.min_trust_score) {
            return Err(ConfigError::InvalidValue {
                field: "spec.planning.min_trust_score",
                reason: format!("{} is outside [0, 1]", planning.min_trust_score),
            });
        }
        if self.spec.contracts.expiry_hours == 0 {
            return Err(ConfigError::InvalidValue {
                field: "spec.contracts.expiry_hours",
                reason: "must be at least 1".to_string(),
            });
        }
        if let SigningConfig::Static { keys } = &self.spec.signing {
            if let Some((agent, _)) = keys.iter().find(|(_, key)| key.trim().is_empty()) {
                return Err(ConfigError::InvalidValue {
                    field: "spec.signing.keys",
                    reason: format!("empty key for agent '{}'", agent),
                });
            }
        }
        Ok(())
    }
}
