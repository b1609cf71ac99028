//! Configuration types for asset-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::PathBuf, time::Duration};

/// Complete configuration for one fetch run
///
/// A `FetchConfig` is constructed once, validated, and then shared immutably
/// by every component for the duration of the run. Deriving a configuration
/// from a pasted browser URL goes through [`crate::url_config::ConfigDelta`]
/// and [`FetchConfig::with_delta`], which produce a new value rather than
/// mutating this one.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Base URL of the upstream catalog API, with a trailing slash
    /// (e.g. `https://maplestory.io/api/CMS/202/item/`)
    pub base_url: String,

    /// Query parameters sent with the catalog listing request
    /// (e.g. `overallCategoryFilter=Equip`)
    #[serde(default)]
    pub query_params: HashMap<String, String>,

    /// Tri-state premium-shop filter: `Some(true)` keeps only cash items,
    /// `Some(false)` keeps only non-cash items, `None` processes everything
    #[serde(default)]
    pub cash_filter: Option<bool>,

    /// Directory where icon images are written (default: "./images")
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,

    /// Path of the JSON result log (default: "./results.json")
    #[serde(default = "default_results_path")]
    pub results_path: PathBuf,

    /// HTTP request behavior (retries, timeout, backoff)
    #[serde(default)]
    pub request: RequestConfig,

    /// Maximum concurrent in-flight item downloads (default: 5)
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// What to do when a target filename already exists
    #[serde(default)]
    pub file_collision: FileCollisionAction,

    /// Rename pattern used by [`FileCollisionAction::Rename`], with
    /// `{name}`, `{index}` and `{ext}` placeholders
    /// (default: `{name}_{index}{ext}`)
    #[serde(default = "default_rename_pattern")]
    pub rename_pattern: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            query_params: HashMap::new(),
            cash_filter: None,
            images_dir: default_images_dir(),
            results_path: default_results_path(),
            request: RequestConfig::default(),
            max_workers: default_max_workers(),
            file_collision: FileCollisionAction::default(),
            rename_pattern: default_rename_pattern(),
        }
    }
}

impl FetchConfig {
    /// Validate the configuration, returning the first problem found
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the offending key when:
    /// - `base_url` is empty
    /// - `max_workers` is zero
    /// - `rename_pattern` lacks the `{index}` placeholder (renaming could
    ///   never produce a new name)
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(Error::config("base_url must not be empty", "base_url"));
        }
        if self.max_workers == 0 {
            return Err(Error::config("max_workers must be at least 1", "max_workers"));
        }
        if !self.rename_pattern.contains("{index}") {
            return Err(Error::config(
                "rename_pattern must contain the {index} placeholder",
                "rename_pattern",
            ));
        }
        Ok(())
    }
}

/// HTTP request behavior configuration
///
/// Two independent retry tiers are configured here. The attempt-level tier
/// (`max_retries` / `retry_delay`) re-issues a request after transport
/// failures with a fixed pause. The [`BackoffConfig`] tier retries a fixed
/// set of server-error / rate-limit status codes with exponential backoff
/// before a response is handed back at all.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Maximum request attempts on transport failure, including the first
    /// (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed pause between transport-failure attempts (default: 2 seconds)
    #[serde(default = "default_retry_delay", with = "duration_serde")]
    pub retry_delay: Duration,

    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Exponential backoff for retryable status codes (500, 502, 503, 504,
    /// 408, 429)
    #[serde(default)]
    pub backoff: BackoffConfig,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
            timeout: default_timeout(),
            backoff: BackoffConfig::default(),
        }
    }
}

/// Exponential backoff configuration for the status-code retry tier
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Maximum attempts for a retryable status, including the first
    /// (default: 5)
    #[serde(default = "default_backoff_attempts")]
    pub max_attempts: u32,

    /// Initial delay before the first backoff retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Upper bound on any backoff delay (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_backoff_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            multiplier: default_backoff_multiplier(),
            jitter: default_true(),
        }
    }
}

/// File collision handling strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCollisionAction {
    /// Probe the rename pattern for the first free index (default)
    #[default]
    Rename,
    /// Overwrite the existing file
    Overwrite,
    /// Keep the existing file, report the item as skipped
    Skip,
}

fn default_images_dir() -> PathBuf {
    PathBuf::from("./images")
}

fn default_results_path() -> PathBuf {
    PathBuf::from("./results.json")
}

fn default_max_workers() -> usize {
    5
}

fn default_rename_pattern() -> String {
    "{name}_{index}{ext}".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_attempts() -> u32 {
    5
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
