use crate::error::{Result, WorkPulseError};
use log::warn;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure for WorkPulse
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Idle, inactivity and overtime thresholds
    pub tracking: TrackingConfig,

    /// Optimistic update configuration
    pub concurrency: ConcurrencyConfig,

    /// Retry configuration
    pub retry: RetryConfig,

    /// Periodic job cadence
    pub scheduler: SchedulerConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to database file (relative to data directory unless absolute)
    pub path: String,

    /// Maximum connection pool size
    pub max_connections: u32,

    /// Busy timeout in milliseconds
    pub busy_timeout_ms: u32,
}

/// Thresholds used by ingestion and the detectors
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Accumulated idle seconds that raise an idle alert
    pub idle_threshold_seconds: u64,

    /// Trailing window the idle detector inspects
    pub idle_window_seconds: u64,

    /// Silence after which a session is considered inactive
    pub inactivity_timeout_seconds: u64,

    /// Worked hours after which an overtime alert is raised
    pub overtime_threshold_hours: f64,

    /// Largest accepted bulk upload
    pub max_bulk_activities: usize,
}

/// Bounds for the optimistic compare-and-swap loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Attempts before a version conflict surfaces as an error
    pub max_attempts: u32,

    /// Base delay between attempts in milliseconds
    pub retry_delay_ms: u64,

    /// Random extra delay added on top of the base, in milliseconds
    pub jitter_ms: u64,
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Database operation retry configuration
    pub db_ops: RetrySettings,

    /// Background job retry configuration
    pub jobs: RetrySettings,
}

/// Individual retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Maximum number of retry attempts
    pub max_attempts: u32,

    /// Initial delay in milliseconds
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    pub max_delay_ms: u64,

    /// Backoff factor (multiplier for each retry)
    pub backoff_factor: f32,
}

/// Periodic job intervals
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub idle_detection_interval_seconds: u64,
    pub overtime_check_interval_seconds: u64,
    pub daily_summary_interval_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: "workpulse.db".to_string(),
            max_connections: 8,
            busy_timeout_ms: 10000,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        TrackingConfig {
            idle_threshold_seconds: 300,
            idle_window_seconds: 600,
            inactivity_timeout_seconds: 1800,
            overtime_threshold_hours: 9.0,
            max_bulk_activities: 1000,
        }
    }
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        ConcurrencyConfig {
            max_attempts: 3,
            retry_delay_ms: 25,
            jitter_ms: 25,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            db_ops: RetrySettings {
                max_attempts: 5,
                initial_delay_ms: 50,
                max_delay_ms: 2000,
                backoff_factor: 1.5,
            },
            jobs: RetrySettings {
                max_attempts: 3,
                initial_delay_ms: 1000,
                max_delay_ms: 30000,
                backoff_factor: 2.0,
            },
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            backoff_factor: 2.0,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            idle_detection_interval_seconds: 60,
            overtime_check_interval_seconds: 900,
            daily_summary_interval_seconds: 3600,
        }
    }
}

impl DatabaseConfig {
    /// Resolve the configured path against the data directory
    pub fn resolved_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.path);
        if path.is_absolute() {
            path
        } else {
            crate::common::get_data_dir().join(path)
        }
    }
}

// Configuration loading
impl Config {
    /// Load configuration from file, or use defaults
    pub fn load() -> Result<Self> {
        let mut config = if let Some(config_path) = Self::find_config_file() {
            Self::load_from_file(&config_path)?
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| WorkPulseError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| WorkPulseError::Config(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    /// Apply `WORKPULSE_*` environment overrides on top of file values.
    /// Unparseable values are ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = env::var("WORKPULSE_DB_PATH") {
            self.database.path = path;
        }
        if let Some(value) = env_number("WORKPULSE_IDLE_THRESHOLD_SECONDS") {
            self.tracking.idle_threshold_seconds = value;
        }
        if let Some(value) = env_number("WORKPULSE_INACTIVITY_TIMEOUT_SECONDS") {
            self.tracking.inactivity_timeout_seconds = value;
        }
        if let Some(value) = env_number("WORKPULSE_OVERTIME_THRESHOLD_HOURS") {
            self.tracking.overtime_threshold_hours = value;
        }
        if let Some(value) = env_number("WORKPULSE_MAX_BULK_ACTIVITIES") {
            self.tracking.max_bulk_activities = value;
        }
    }

    /// Find config file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        // 1. Environment variable
        if let Ok(path) = env::var("WORKPULSE_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("workpulse").join("config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 3. Home directory
        if let Some(home_dir) = dirs::home_dir() {
            let path = home_dir.join(".workpulse.toml");
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    /// Get default config file path (for creating new config)
    pub fn default_config_path() -> Result<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Ok(config_dir.join("workpulse").join("config.toml"))
        } else {
            Err(WorkPulseError::Config(
                "Could not determine config directory".into(),
            ))
        }
    }

    /// Generate example config file content
    pub fn example_toml() -> &'static str {
        r#"# WorkPulse Configuration File
#
# All values shown are the defaults - you can override only what you need.

[database]
path = "workpulse.db"   # Relative to the data directory
max_connections = 8
busy_timeout_ms = 10000

[tracking]
idle_threshold_seconds = 300       # Idle seconds in the window that raise an idle alert
idle_window_seconds = 600          # Trailing window inspected by the idle detector
inactivity_timeout_seconds = 1800  # Silence that raises an inactivity alert
overtime_threshold_hours = 9.0
max_bulk_activities = 1000

[concurrency]
# Optimistic session total updates
max_attempts = 3
retry_delay_ms = 25
jitter_ms = 25

[retry.db_ops]
max_attempts = 5
initial_delay_ms = 50
max_delay_ms = 2000
backoff_factor = 1.5

[retry.jobs]
# Background job retries (exponential backoff)
max_attempts = 3
initial_delay_ms = 1000
max_delay_ms = 30000
backoff_factor = 2.0

[scheduler]
idle_detection_interval_seconds = 60
overtime_check_interval_seconds = 900
daily_summary_interval_seconds = 3600
"#
    }
}

fn env_number<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}: '{}' is not a valid number", name, raw);
            None
        }
    }
}

// Global configuration instance
use std::sync::OnceLock;

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration instance
pub fn get_config() -> &'static Config {
    CONFIG.get_or_init(|| {
        Config::load().unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        })
    })
}
