//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::constants::{endpoints, playlist, reconciler, timeouts};
use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Backend API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Playlist playback configuration
    #[serde(default)]
    pub playlist: PlaylistConfig,

    /// Task status polling configuration
    #[serde(default)]
    pub reconciler: ReconcilerConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.api.base_url.as_str();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "api.base_url".to_string(),
                message: format!("expected an absolute http(s) URL, got '{}'", base),
            });
        }

        if !(self.playlist.prefetch_threshold > 0.0 && self.playlist.prefetch_threshold <= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "playlist.prefetch_threshold".to_string(),
                message: "must be in (0, 1]".to_string(),
            });
        }

        if self.playlist.retry_max_ms < self.playlist.retry_base_ms {
            return Err(ConfigError::InvalidValue {
                field: "playlist.retry_max_ms".to_string(),
                message: "must not be lower than playlist.retry_base_ms".to_string(),
            });
        }

        if self.reconciler.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "reconciler.poll_interval_ms".to_string(),
                message: "must be positive".to_string(),
            });
        }

        if !self.api.static_prefix.starts_with('/') {
            tracing::warn!(
                prefix = %self.api.static_prefix,
                "Static prefix is not rooted; generated audio URLs will be relative"
            );
        }

        Ok(())
    }
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Backend origin, e.g. `http://localhost:8080`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Public path prefix of generated audio files
    #[serde(default = "default_static_prefix")]
    pub static_prefix: String,
}

fn default_base_url() -> String {
    endpoints::BASE_URL_DEFAULT.to_string()
}
fn default_request_timeout() -> u64 {
    timeouts::API_REQUEST_SECS
}
fn default_static_prefix() -> String {
    endpoints::STATIC_PREFIX.to_string()
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            static_prefix: default_static_prefix(),
        }
    }
}

/// Playlist engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistConfig {
    /// Retries per track before skipping it
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,

    #[serde(default = "default_retry_step_ms")]
    pub retry_step_ms: u64,

    #[serde(default = "default_retry_max_ms")]
    pub retry_max_ms: u64,

    /// Play position ratio after which the next track is prefetched
    #[serde(default = "default_prefetch_threshold")]
    pub prefetch_threshold: f64,

    /// Distance kept from the end of a track when seeking
    #[serde(default = "default_seek_epsilon")]
    pub seek_end_epsilon_secs: f64,

    /// Query parameter used for cache busting on retry
    #[serde(default = "default_cache_bust_param")]
    pub cache_bust_param: String,
}

fn default_max_retries() -> u32 {
    playlist::MAX_RETRIES
}
fn default_retry_base_ms() -> u64 {
    playlist::RETRY_BASE_MS
}
fn default_retry_step_ms() -> u64 {
    playlist::RETRY_STEP_MS
}
fn default_retry_max_ms() -> u64 {
    playlist::RETRY_MAX_MS
}
fn default_prefetch_threshold() -> f64 {
    playlist::PREFETCH_THRESHOLD
}
fn default_seek_epsilon() -> f64 {
    playlist::SEEK_END_EPSILON_SECS
}
fn default_cache_bust_param() -> String {
    playlist::CACHE_BUST_PARAM.to_string()
}

impl Default for PlaylistConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_base_ms: default_retry_base_ms(),
            retry_step_ms: default_retry_step_ms(),
            retry_max_ms: default_retry_max_ms(),
            prefetch_threshold: default_prefetch_threshold(),
            seek_end_epsilon_secs: default_seek_epsilon(),
            cache_bust_param: default_cache_bust_param(),
        }
    }
}

/// Task status reconciler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Interval between poll cycles
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval() -> u64 {
    reconciler::POLL_INTERVAL_MS
}

impl ReconcilerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

/// Load settings from `config/` relative to the working directory
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from(Path::new("config"), env)
}

/// Load settings from files under `dir`, then environment variables
///
/// Values are not validated here; call [`Settings::validate`] once any
/// command line overrides have been applied.
pub fn load_settings_from(dir: &Path, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    // Load default config
    builder = builder.add_source(File::from(dir.join("default")).required(false));

    // Load environment-specific config
    if let Some(env_name) = env {
        builder = builder.add_source(File::from(dir.join(env_name)).required(false));
    }

    // Load from environment variables
    builder = builder.add_source(
        Environment::with_prefix("ONDU")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;
    Ok(settings)
}
