//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Status store connection settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Poll and buffering behavior
    #[serde(default)]
    pub poller: PollerConfig,

    /// Settings owned by the orchestration layer
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.store.path.as_os_str().is_empty() {
            return Err(AppError::validation("store.path is empty"));
        }
        if self.poller.max_results_per_poll == 0 {
            return Err(AppError::validation(
                "poller.max_results_per_poll must be > 0",
            ));
        }
        if self.poller.metadata_prefix.trim().is_empty() {
            return Err(AppError::validation("poller.metadata_prefix is empty"));
        }
        if self.runtime.instances != 1 {
            return Err(AppError::config(format!(
                "runtime.instances is {}, but only a single poller instance may run",
                self.runtime.instances
            )));
        }
        Ok(())
    }
}

/// Where the status documents live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON file holding the status documents
    #[serde(default = "defaults::store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: defaults::store_path(),
        }
    }
}

/// How the diversity bucket size evolves across polls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketDecay {
    /// Shrink by one after every poll that collapses.
    #[default]
    Shrink,
    /// Keep the configured size for every poll.
    Fixed,
}

/// Poll and buffering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Field to collapse results on (e.g. host); unset disables diversity
    #[serde(default)]
    pub bucket_field: Option<String>,

    /// Maximum documents retrieved per bucket
    #[serde(default = "defaults::bucket_max_size")]
    pub bucket_max_size: usize,

    /// Bucket size evolution across polls
    #[serde(default)]
    pub bucket_decay: BucketDecay,

    /// Prefix of document fields copied into item metadata
    #[serde(default = "defaults::metadata_prefix")]
    pub metadata_prefix: String,

    /// Page size of each status query
    #[serde(default = "defaults::max_results_per_poll")]
    pub max_results_per_poll: usize,

    /// Minimum delay between two queries in milliseconds (0 disables)
    #[serde(default)]
    pub min_query_interval_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            bucket_field: None,
            bucket_max_size: defaults::bucket_max_size(),
            bucket_decay: BucketDecay::default(),
            metadata_prefix: defaults::metadata_prefix(),
            max_results_per_poll: defaults::max_results_per_poll(),
            min_query_interval_ms: 0,
        }
    }
}

/// Orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Number of poller instances the runtime will start
    #[serde(default = "defaults::instances")]
    pub instances: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            instances: defaults::instances(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn store_path() -> PathBuf {
        PathBuf::from("data/status.json")
    }
    pub fn bucket_max_size() -> usize {
        5
    }
    pub fn metadata_prefix() -> String {
        "metadata".into()
    }
    pub fn max_results_per_poll() -> usize {
        10
    }
    pub fn instances() -> usize {
        1
    }
}
