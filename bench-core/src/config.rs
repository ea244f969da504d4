//! Configuration loading for svc-bench.
//!
//! Configuration is loaded from a TOML file (default: `svc-bench.toml`).
//! Every key has a default, so an empty file is a valid configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use svcbench_types::NAME_PLACEHOLDER;

/// Root configuration for svc-bench.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Discovery registry configuration.
    pub registry: RegistryConfig,
    /// Service tree and lifecycle configuration.
    pub services: ServicesConfig,
    /// Readiness cycle configuration.
    pub readiness: ReadinessConfig,
    /// Trial sequencing configuration.
    pub trials: TrialsConfig,
    /// Load test configuration.
    pub load: LoadConfig,
    /// Report output configuration.
    pub report: ReportConfig,
}

/// Discovery registry configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Base URL of the registry HTTP API (default: http://localhost:8500).
    #[serde(default = "default_registry_url")]
    pub base_url: String,
    /// Timeout for a single registry request in milliseconds (default: 2000).
    #[serde(default = "default_registry_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Service tree and lifecycle configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServicesConfig {
    /// Root of the service directory tree (default: ../../services).
    #[serde(default = "default_services_root")]
    pub root: PathBuf,
    /// Health URL template; `{name}` is replaced with the service name.
    #[serde(default = "default_health_url_template")]
    pub health_url_template: String,
    /// Orchestration program (default: docker-compose).
    #[serde(default = "default_compose_program")]
    pub compose_program: String,
    /// Arguments placed before every subcommand, e.g. `["compose"]` for `docker compose`.
    #[serde(default)]
    pub compose_args: Vec<String>,
    /// Timeout for one lifecycle command in seconds (default: 180).
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    /// Replica count used by the scaled restart (default: 1).
    #[serde(default = "default_replicas")]
    pub replicas: u32,
}

/// Readiness cycle configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadinessConfig {
    /// Polling tick in milliseconds (default: 1000).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Give up after this many seconds (default: 120).
    #[serde(default = "default_readiness_timeout_secs")]
    pub timeout_secs: u64,
    /// Health probe request timeout in milliseconds; must be shorter than the
    /// polling tick (default: 800).
    #[serde(default = "default_health_timeout_ms")]
    pub health_timeout_ms: u64,
}

/// Trial sequencing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TrialsConfig {
    /// Number of trials (default: 5).
    #[serde(default = "default_trial_count")]
    pub count: u32,
    /// Pause between trials in seconds, skipped after the last (default: 15).
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    /// Pause between bringing a service up and restarting it in the
    /// failure-recovery mode, in seconds (default: 5).
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,
}

/// Load test configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoadConfig {
    /// Concurrent requests per endpoint, one batch per level (default: 10, 50, 100, 200, 500).
    #[serde(default = "default_stress_levels")]
    pub stress_levels: Vec<usize>,
    /// Per-request timeout in milliseconds (default: 10000).
    #[serde(default = "default_load_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Pause after starting the services before the first batch, in seconds (default: 10).
    #[serde(default = "default_warmup_secs")]
    pub warmup_secs: u64,
    /// Explicit endpoints; when empty the resolved services' health URLs are used.
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

/// An explicitly configured load-test endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EndpointConfig {
    /// Name written to the report.
    pub name: String,
    /// URL to GET.
    pub url: String,
}

/// Report output configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Directory report files are written to (default: current directory).
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

// Default value functions
fn default_registry_url() -> String {
    "http://localhost:8500".to_string()
}

fn default_registry_timeout_ms() -> u64 {
    2000
}

fn default_services_root() -> PathBuf {
    PathBuf::from("../../services")
}

fn default_health_url_template() -> String {
    "http://{name}.localhost/health".to_string()
}

fn default_compose_program() -> String {
    "docker-compose".to_string()
}

fn default_command_timeout_secs() -> u64 {
    180
}

fn default_replicas() -> u32 {
    1
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_readiness_timeout_secs() -> u64 {
    120 // 2 minutes
}

fn default_health_timeout_ms() -> u64 {
    800
}

fn default_trial_count() -> u32 {
    5
}

fn default_cooldown_secs() -> u64 {
    15
}

fn default_settle_secs() -> u64 {
    5
}

fn default_stress_levels() -> Vec<usize> {
    vec![10, 50, 100, 200, 500]
}

fn default_load_timeout_ms() -> u64 {
    10_000
}

fn default_warmup_secs() -> u64 {
    10
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: default_registry_url(),
            request_timeout_ms: default_registry_timeout_ms(),
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            root: default_services_root(),
            health_url_template: default_health_url_template(),
            compose_program: default_compose_program(),
            compose_args: Vec::new(),
            command_timeout_secs: default_command_timeout_secs(),
            replicas: default_replicas(),
        }
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_secs: default_readiness_timeout_secs(),
            health_timeout_ms: default_health_timeout_ms(),
        }
    }
}

impl Default for TrialsConfig {
    fn default() -> Self {
        Self {
            count: default_trial_count(),
            cooldown_secs: default_cooldown_secs(),
            settle_secs: default_settle_secs(),
        }
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            stress_levels: default_stress_levels(),
            request_timeout_ms: default_load_timeout_ms(),
            warmup_secs: default_warmup_secs(),
            endpoints: Vec::new(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

impl RegistryConfig {
    /// Registry request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl ServicesConfig {
    /// Lifecycle command timeout.
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

impl ReadinessConfig {
    /// Polling tick.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Readiness deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Health probe request timeout.
    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }
}

impl TrialsConfig {
    /// Pause between trials.
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    /// Pause before the scaled restart.
    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }
}

impl LoadConfig {
    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Pause before the first batch.
    pub fn warmup(&self) -> Duration {
        Duration::from_secs(self.warmup_secs)
    }
}

impl HarnessConfig {
    /// Load configuration from a TOML file and validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or fails validation.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trials.count == 0 {
            return Err(ConfigError::invalid("trials.count must be at least 1"));
        }
        if self.readiness.poll_interval_ms == 0 {
            return Err(ConfigError::invalid(
                "readiness.poll_interval_ms must be positive",
            ));
        }
        if self.readiness.health_timeout_ms == 0
            || self.readiness.health_timeout_ms >= self.readiness.poll_interval_ms
        {
            return Err(ConfigError::invalid(
                "readiness.health_timeout_ms must be positive and shorter than readiness.poll_interval_ms",
            ));
        }
        if self.readiness.timeout() < self.readiness.poll_interval() {
            return Err(ConfigError::invalid(
                "readiness.timeout_secs must cover at least one poll interval",
            ));
        }
        if self.load.stress_levels.is_empty() || self.load.stress_levels.contains(&0) {
            return Err(ConfigError::invalid(
                "load.stress_levels must be non-empty and positive",
            ));
        }
        if self.load.request_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "load.request_timeout_ms must be positive",
            ));
        }
        if self.services.replicas == 0 {
            return Err(ConfigError::invalid("services.replicas must be at least 1"));
        }
        if !self.services.health_url_template.contains(NAME_PLACEHOLDER) {
            return Err(ConfigError::invalid(
                "services.health_url_template must contain {name}",
            ));
        }
        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// Configuration parsed but is not usable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    fn invalid(reason: &str) -> Self {
        ConfigError::Invalid(reason.to_string())
    }
}
