use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `CHANNEL_ATTRIBUTION__`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_conv_type_id")]
    pub conv_type_id: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl ScoringConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// What to do when a conversion's credit weights do not sum to one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPolicy {
    #[default]
    LogOnly,
    FailFast,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    #[serde(default)]
    pub policy: ValidationPolicy,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_output_path")]
    pub output_path: String,
}

// Default functions
fn default_db_path() -> String {
    "../challenge.db".to_string()
}
fn default_endpoint() -> String {
    "https://api.ihc-attribution.com/v1/compute_ihc".to_string()
}
fn default_conv_type_id() -> String {
    "coding_challenge".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_batch_size() -> usize {
    100
}
fn default_retry_backoff_ms() -> u64 {
    500
}
fn default_tolerance() -> f64 {
    1e-6
}
fn default_output_path() -> String {
    "channel_reporting.csv".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            conv_type_id: default_conv_type_id(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
            batch_size: default_batch_size(),
            max_retries: 0,
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            policy: ValidationPolicy::default(),
            tolerance: default_tolerance(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional config file and environment variables.
    /// Environment values take precedence over the file.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("CHANNEL_ATTRIBUTION")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_service_contract() {
        let config = AppConfig::default();
        assert_eq!(config.scoring.batch_size, 100);
        assert_eq!(config.scoring.max_retries, 0);
        assert_eq!(config.scoring.timeout(), Duration::from_secs(10));
        assert_eq!(config.validation.policy, ValidationPolicy::LogOnly);
        assert!((config.validation.tolerance - 1e-6).abs() < f64::EPSILON);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[scoring]\nbatch_size = 25\nmax_retries = 2\n\n[validation]\npolicy = \"fail_fast\""
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.scoring.batch_size, 25);
        assert_eq!(config.scoring.max_retries, 2);
        assert_eq!(config.validation.policy, ValidationPolicy::FailFast);
        assert_eq!(config.storage.db_path, "../challenge.db");
    }
}
