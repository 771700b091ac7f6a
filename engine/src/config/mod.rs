//! Configuration management
//!
//! This module handles loading, validation, and management of the MedMeter
//! configuration. Configuration is stored in TOML format at
//! ~/.medmeter/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level
//! - **prompts**: Prompt template directory, seeded with the bundled
//!   templates when the default config is first written
//! - **billing**: Currency and the tier list
//! - **orchestrator**: Enabled capabilities, document workspace, fetch timeout
//! - **api**: HTTP listener settings
//!
//! # Path Expansion
//!
//! The configuration system automatically:
//! - Expands ~ to the user's home directory
//! - Canonicalizes the document workspace, creating it if missing
//! - Leaves the prompt directory alone (a missing one yields an empty store)
//!
//! # Examples
//!
//! ```no_run
//! use medmeter_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//!
//! println!("Prompts: {:?}", config.prompts.dir);
//! println!("Tiers: {}", config.billing.tiers.len());
//! # Ok(())
//! # }
//! ```

use crate::billing::TierRegistry;
use crate::prompts;
use rust_decimal::Decimal;
use sdk::billing::{Tier, CURRENCY};
use sdk::errors::EngineError;
use sdk::guidance::Capability;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Main configuration structure
///
/// Only `core` is required in the file; every other section falls back to
/// its defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    pub core: CoreConfig,

    /// Prompt template settings
    #[serde(default)]
    pub prompts: PromptsConfig,

    /// Billing tiers
    #[serde(default)]
    pub billing: BillingConfig,

    /// Orchestrator capability set and runtime settings
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// HTTP API settings
    #[serde(default)]
    pub api: ApiConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Prompt template configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptsConfig {
    /// Directory scanned for `.prompt` files at startup (supports ~ expansion)
    #[serde(default = "default_prompts_dir")]
    pub dir: PathBuf,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            dir: default_prompts_dir(),
        }
    }
}

/// Billing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Currency every tier is priced in
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Tier list, in display order
    #[serde(default = "default_tiers")]
    pub tiers: Vec<TierConfig>,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            tiers: default_tiers(),
        }
    }
}

/// One `[[billing.tiers]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierConfig {
    pub name: String,
    pub unit_price: Decimal,
    #[serde(default)]
    pub description: String,
}

impl From<&Tier> for TierConfig {
    fn from(tier: &Tier) -> Self {
        TierConfig {
            name: tier.name.clone(),
            unit_price: tier.unit_price,
            description: tier.description.clone(),
        }
    }
}

impl From<&TierConfig> for Tier {
    fn from(tier: &TierConfig) -> Self {
        Tier {
            name: tier.name.clone(),
            unit_price: tier.unit_price,
            description: tier.description.clone(),
        }
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Capabilities the orchestrator may invoke
    #[serde(default = "default_capabilities")]
    pub capabilities: Vec<Capability>,

    /// Root directory the filesystem capability is confined to
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,

    /// Timeout for the fetch capability (seconds)
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            capabilities: default_capabilities(),
            workspace: default_workspace(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

/// HTTP API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Bind address
    #[serde(default = "default_api_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_api_port")]
    pub port: u16,

    /// Queries shorter than this many characters are analyzed inline
    #[serde(default = "default_sync_query_limit")]
    pub sync_query_limit: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            sync_query_limit: default_sync_query_limit(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_prompts_dir() -> PathBuf {
    PathBuf::from("~/.medmeter/prompts")
}

fn default_currency() -> String {
    CURRENCY.to_string()
}

fn default_tiers() -> Vec<TierConfig> {
    TierRegistry::reference()
        .tiers()
        .iter()
        .map(TierConfig::from)
        .collect()
}

fn default_capabilities() -> Vec<Capability> {
    Capability::ALL.to_vec()
}

fn default_workspace() -> PathBuf {
    PathBuf::from("~/.medmeter/workspace")
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_api_host() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    8000
}

fn default_sync_query_limit() -> usize {
    500
}

impl Config {
    /// Load configuration from the default location (~/.medmeter/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails (including unknown capability names)
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        // Serialize before processing so the file keeps the portable ~ paths
        let config = Self::default_config();
        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        let mut config = config;
        config.validate_and_process()?;

        match prompts::seed_bundled(&config.prompts.dir) {
            Ok(written) => info!(
                "Seeded {} bundled prompt(s) into {}",
                written,
                config.prompts.dir.display()
            ),
            Err(e) => warn!(
                "Failed to seed prompts into {}: {}",
                config.prompts.dir.display(),
                e
            ),
        }

        Ok(config)
    }

    /// Get the default configuration file path (~/.medmeter/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".medmeter").join("config.toml"))
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            core: CoreConfig {
                log_level: default_log_level(),
            },
            prompts: PromptsConfig::default(),
            billing: BillingConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            api: ApiConfig::default(),
        }
    }

    /// Billing tiers as registry values
    pub fn tiers(&self) -> Vec<Tier> {
        self.billing.tiers.iter().map(Tier::from).collect()
    }

    /// Validate and process configuration
    ///
    /// This method:
    /// - Validates the log level, currency and tier list
    /// - Rejects duplicate capabilities
    /// - Expands ~ in paths
    /// - Canonicalizes the workspace, creating it if missing
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.billing.currency != CURRENCY {
            return Err(EngineError::Config(format!(
                "Unsupported currency '{}'. Only {} is supported",
                self.billing.currency, CURRENCY
            )));
        }

        if self.billing.tiers.is_empty() {
            return Err(EngineError::Config(
                "At least one billing tier must be configured".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for tier in &self.billing.tiers {
            if tier.name.trim().is_empty() {
                return Err(EngineError::Config("Tier name must not be empty".to_string()));
            }
            if !seen.insert(tier.name.as_str()) {
                return Err(EngineError::Config(format!(
                    "Duplicate billing tier '{}'",
                    tier.name
                )));
            }
            if tier.unit_price.is_sign_negative() {
                return Err(EngineError::Config(format!(
                    "Tier '{}' has a negative unit price",
                    tier.name
                )));
            }
        }

        let mut caps = HashSet::new();
        for cap in &self.orchestrator.capabilities {
            if !caps.insert(*cap) {
                return Err(EngineError::Config(format!(
                    "Capability '{}' listed more than once",
                    cap
                )));
            }
        }

        if self.api.sync_query_limit == 0 {
            return Err(EngineError::Config(
                "sync_query_limit must be greater than 0".to_string(),
            ));
        }

        self.prompts.dir = expand_path(&self.prompts.dir)?;

        self.orchestrator.workspace = expand_path(&self.orchestrator.workspace)?;
        self.orchestrator.workspace = canonicalize_or_create(&self.orchestrator.workspace)?;

        if !self.orchestrator.workspace.is_dir() {
            return Err(EngineError::Config(format!(
                "Workspace path is not a directory: {:?}",
                self.orchestrator.workspace
            )));
        }

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
pub fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

/// Canonicalize path, creating it if it doesn't exist
fn canonicalize_or_create(path: &Path) -> Result<PathBuf, EngineError> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| {
            EngineError::Config(format!("Failed to create directory {:?}: {}", path, e))
        })?;
    }

    path.canonicalize()
        .map_err(|e| EngineError::Config(format!("Failed to canonicalize {:?}: {}", path, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config_creation() {
        let config = Config::default_config();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.billing.currency, "USD");
        assert_eq!(config.billing.tiers.len(), 3);
        assert_eq!(config.orchestrator.capabilities.len(), 3);
        assert_eq!(config.api.sync_query_limit, 500);
    }

    #[test]
    fn test_default_tier_prices() {
        let tiers = Config::default_config().tiers();
        let price = |name: &str| tiers.iter().find(|t| t.name == name).map(|t| t.unit_price);

        assert_eq!(price("basic"), Some(dec!(0.10)));
        assert_eq!(price("comprehensive"), Some(dec!(0.50)));
        assert_eq!(price("batch"), Some(dec!(0.05)));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test");
        let expanded = expand_path(&path).unwrap();

        let home = dirs::home_dir().unwrap();
        assert_eq!(expanded, home.join("test"));
    }

    #[test]
    fn test_expand_path_without_tilde() {
        let path = PathBuf::from("/absolute/path");
        let expanded = expand_path(&path).unwrap();

        assert_eq!(expanded, path);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default_config();
        let toml_string = toml::to_string(&config).unwrap();

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(config.core.log_level, deserialized.core.log_level);
        assert_eq!(
            config.orchestrator.capabilities,
            deserialized.orchestrator.capabilities
        );
        assert_eq!(deserialized.tiers()[1].unit_price, dec!(0.5));
    }
}
