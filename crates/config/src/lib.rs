//! Configuration loading, validation, and management for Steward.
//!
//! Loads configuration from `~/.steward/config.toml` with environment
//! variable overrides. Validates all settings at startup. No knob used
//! by the agent loop is hidden in code; everything below is externally
//! supplied.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.steward/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Reasoning-service API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model to use.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Hard caps on the reasoning loop.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Per-tool cooldown settings.
    #[serde(default)]
    pub cooldowns: CooldownConfig,

    /// Destructive-operation confirmation settings.
    #[serde(default)]
    pub confirmation: ConfirmationConfig,

    /// Retry policy for throttled reasoning-service calls.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Identity configuration.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// How many turns of history a host keeps between runs.
    #[serde(default = "default_max_history_turns")]
    pub max_history_turns: usize,
}

fn default_model() -> String {
    "gemini-2.5-flash-lite".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_history_turns() -> usize {
    20
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("limits", &self.limits)
            .field("cooldowns", &self.cooldowns)
            .field("confirmation", &self.confirmation)
            .field("retry", &self.retry)
            .field("identity", &self.identity)
            .field("max_history_turns", &self.max_history_turns)
            .finish()
    }
}

/// Hard caps that bound one agent run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum reasoning-service round trips per run.
    #[serde(default = "default_max_loop_iterations")]
    pub max_loop_iterations: u32,

    /// Maximum tool executions per run, cumulative across iterations.
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls_per_request: u32,
}

fn default_max_loop_iterations() -> u32 {
    25
}
fn default_max_tool_calls() -> u32 {
    25
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_loop_iterations: default_max_loop_iterations(),
            max_tool_calls_per_request: default_max_tool_calls(),
        }
    }
}

/// Per-tool cooldown settings for the rate limiter.
///
/// `moderation_tools` get the longer cooldown. This set is configured
/// independently from the destructive flag that drives confirmation,
/// even though the two lists often coincide in practice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CooldownConfig {
    /// Default cooldown between calls to the same tool, in seconds.
    #[serde(default = "default_cooldown_secs")]
    pub default_secs: f64,

    /// Cooldown for moderation tools, in seconds.
    #[serde(default = "default_moderation_cooldown_secs")]
    pub moderation_secs: f64,

    /// Tool names that get the moderation cooldown.
    #[serde(default = "default_moderation_tools")]
    pub moderation_tools: Vec<String>,
}

fn default_cooldown_secs() -> f64 {
    1.0
}
fn default_moderation_cooldown_secs() -> f64 {
    2.0
}
fn default_moderation_tools() -> Vec<String> {
    [
        "ban_user",
        "unban_user",
        "kick_user",
        "timeout_user",
        "remove_timeout",
        "purge_messages",
        "delete_channel",
        "delete_category",
        "delete_role",
        "set_server_name",
        "delete_invite",
        "delete_emoji",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl CooldownConfig {
    /// Default cooldown as a Duration.
    pub fn default_cooldown(&self) -> Duration {
        Duration::from_secs_f64(self.default_secs)
    }

    /// Moderation cooldown as a Duration.
    pub fn moderation_cooldown(&self) -> Duration {
        Duration::from_secs_f64(self.moderation_secs)
    }
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            default_secs: default_cooldown_secs(),
            moderation_secs: default_moderation_cooldown_secs(),
            moderation_tools: default_moderation_tools(),
        }
    }
}

/// Destructive-operation confirmation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationConfig {
    /// How long to wait for an approve/reject decision before the
    /// operation is treated as rejected, in seconds.
    #[serde(default = "default_confirmation_timeout_secs")]
    pub timeout_secs: f64,
}

fn default_confirmation_timeout_secs() -> f64 {
    60.0
}

impl ConfirmationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_confirmation_timeout_secs(),
        }
    }
}

/// Retry policy for throttled reasoning-service calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per exchange (first try included).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay when the service suggests none, in seconds.
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: f64,
}

fn default_max_retries() -> u32 {
    3
}
fn default_base_delay_secs() -> f64 {
    30.0
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_secs_f64(self.base_delay_secs)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_secs: default_base_delay_secs(),
        }
    }
}

/// Identity configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Override the built-in system instruction entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            system_prompt_override: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.steward/config.toml).
    ///
    /// Also checks environment variables:
    /// - `STEWARD_API_KEY` (highest priority)
    /// - `GEMINI_API_KEY`
    /// - `STEWARD_MODEL` overrides the model
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        // Environment variable overrides (highest priority)
        if config.api_key.is_none() {
            config.api_key = std::env::var("STEWARD_API_KEY")
                .ok()
                .or_else(|| std::env::var("GEMINI_API_KEY").ok());
        }

        if let Ok(model) = std::env::var("STEWARD_MODEL") {
            config.model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".steward")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.limits.max_loop_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_loop_iterations must be at least 1".into(),
            ));
        }
        if self.retry.max_retries == 0 {
            return Err(ConfigError::ValidationError(
                "retry.max_retries must be at least 1".into(),
            ));
        }
        if self.cooldowns.default_secs < 0.0 || self.cooldowns.moderation_secs < 0.0 {
            return Err(ConfigError::ValidationError(
                "cooldown durations must be non-negative".into(),
            ));
        }
        if self.confirmation.timeout_secs <= 0.0 {
            return Err(ConfigError::ValidationError(
                "confirmation.timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `steward init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            limits: LimitsConfig::default(),
            cooldowns: CooldownConfig::default(),
            confirmation: ConfirmationConfig::default(),
            retry: RetryConfig::default(),
            identity: IdentityConfig::default(),
            max_history_turns: default_max_history_turns(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
