use crate::core::axis::DEFAULT_GAP_THRESHOLD;
use crate::core::chart::Theme;
use crate::core::export::DelimitedProfile;
use crate::core::table::Aggregator;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SgsProviderConfig {
    pub base_url: String,
    /// Extra attempts after a failed request.
    pub retries: usize,
    pub retry_delay_ms: u64,
}

impl Default for SgsProviderConfig {
    fn default() -> Self {
        SgsProviderConfig {
            base_url: "https://api.bcb.gov.br".to_string(),
            retries: 3,
            retry_delay_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub sgs: SgsProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig { ttl_secs: 3600 }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    pub aggregator: Aggregator,
    /// Magnitude gap, in orders of magnitude, above which a second axis is used.
    pub axis_threshold: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            aggregator: Aggregator::Last,
            axis_threshold: DEFAULT_GAP_THRESHOLD,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub providers: ProvidersConfig,
    pub cache: CacheConfig,
    pub analysis: AnalysisConfig,
    pub export: DelimitedProfile,
    pub theme: Theme,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "tslab", "tslab")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        if config_str.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .export
            .validate()
            .with_context(|| format!("Invalid export settings in {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
