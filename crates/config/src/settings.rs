//! Layered runtime configuration for the conversation engine (§6).
//!
//! Loaded the way the teacher's `voice-agent-config::settings` does:
//! defaults -> optional `config/{env}.yaml` -> `PREGNANCY_`-prefixed
//! environment overrides, then validated.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;

/// The nine engine knobs enumerated in §6, plus the ambient connection
/// settings (`server`, `llm`, `persistence`) a complete binary needs to
/// boot. `ai_timeout`/`cooldown`/`session_reset_idle` are modeled as
/// millisecond integers in the serialized form (so plain YAML/env values
/// work) and exposed as `std::time::Duration` via accessor methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_ai_timeout_ms")]
    pub ai_timeout_ms: u64,

    #[serde(default = "default_failure_threshold")]
    pub circuit_failure_threshold: u32,

    #[serde(default = "default_cooldown_ms")]
    pub circuit_cooldown_ms: u64,

    #[serde(default = "default_short_term_window")]
    pub short_term_window: usize,

    #[serde(default = "default_session_reset_idle_ms")]
    pub session_reset_idle_ms: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_supported_languages")]
    pub supported_languages: Vec<String>,

    #[serde(default = "default_rate_limit")]
    pub rate_limit: RateLimitConfig,
}

impl EngineConfig {
    pub fn ai_timeout(&self) -> Duration {
        Duration::from_millis(self.ai_timeout_ms)
    }

    pub fn circuit_cooldown(&self) -> Duration {
        Duration::from_millis(self.circuit_cooldown_ms)
    }

    pub fn session_reset_idle(&self) -> Duration {
        Duration::from_millis(self.session_reset_idle_ms)
    }
}

fn default_ai_timeout_ms() -> u64 {
    30_000
}
fn default_failure_threshold() -> u32 {
    5
}
fn default_cooldown_ms() -> u64 {
    5 * 60 * 1000
}
fn default_short_term_window() -> usize {
    10
}
fn default_session_reset_idle_ms() -> u64 {
    60 * 60 * 1000
}
fn default_max_tokens() -> u32 {
    200
}
fn default_temperature() -> f32 {
    0.7
}
fn default_supported_languages() -> Vec<String> {
    vec!["en".to_string(), "es".to_string(), "fr".to_string()]
}
fn default_rate_limit() -> RateLimitConfig {
    RateLimitConfig::default()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ai_timeout_ms: default_ai_timeout_ms(),
            circuit_failure_threshold: default_failure_threshold(),
            circuit_cooldown_ms: default_cooldown_ms(),
            short_term_window: default_short_term_window(),
            session_reset_idle_ms: default_session_reset_idle_ms(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            supported_languages: default_supported_languages(),
            rate_limit: default_rate_limit(),
        }
    }
}

/// §4.6 rate-limiter defaults; each flavour (ip/user/connection) gets its
/// own bucket shape but shares this config shape.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_per_ip_per_min")]
    pub per_ip_per_min: u32,
    #[serde(default = "default_per_ip_burst")]
    pub per_ip_burst: u32,

    #[serde(default = "default_per_user_per_hour")]
    pub per_user_per_hour: u32,
    #[serde(default = "default_per_user_burst")]
    pub per_user_burst: u32,

    /// §9 open question 2: the "10 msg/min per connection" figure from the
    /// docs is a configurable default, not a hardcoded constant.
    #[serde(default = "default_per_connection_per_min")]
    pub per_connection_per_min: u32,

    #[serde(default = "default_bucket_ttl_secs")]
    pub bucket_ttl_secs: u64,
}

fn default_true() -> bool {
    true
}
fn default_per_ip_per_min() -> u32 {
    100
}
fn default_per_ip_burst() -> u32 {
    200
}
fn default_per_user_per_hour() -> u32 {
    500
}
fn default_per_user_burst() -> u32 {
    100
}
fn default_per_connection_per_min() -> u32 {
    10
}
fn default_bucket_ttl_secs() -> u64 {
    5 * 60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            per_ip_per_min: default_per_ip_per_min(),
            per_ip_burst: default_per_ip_burst(),
            per_user_per_hour: default_per_user_per_hour(),
            per_user_burst: default_per_user_burst(),
            per_connection_per_min: default_per_connection_per_min(),
            bucket_ttl_secs: default_bucket_ttl_secs(),
        }
    }
}

/// Bind address and pool sizing (§5: "connection pool sized for fan-out").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// LLM provider connection settings (§6 "Engine -> LLM provider").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_idle_pool_size")]
    pub idle_pool_size: usize,
}

fn default_llm_base_url() -> String {
    "https://api.openai.com".to_string()
}
fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_idle_pool_size() -> usize {
    32
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            api_key: std::env::var("LLM_API_KEY").unwrap_or_default(),
            model: default_llm_model(),
            idle_pool_size: default_idle_pool_size(),
        }
    }
}

/// §5 "Database connection pool sized for fan-out (default: 50 total, 25
/// idle, 5 min lifetime)".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_scylla_hosts")]
    pub scylla_hosts: Vec<String>,
    #[serde(default = "default_scylla_keyspace")]
    pub keyspace: String,
    #[serde(default = "default_pool_total")]
    pub pool_total: u32,
    #[serde(default = "default_pool_idle")]
    pub pool_idle: u32,
    #[serde(default = "default_pool_lifetime_secs")]
    pub pool_lifetime_secs: u64,
    /// `false` keeps the in-memory repository, used for development and
    /// the test suite.
    #[serde(default)]
    pub enabled: bool,
}

fn default_scylla_hosts() -> Vec<String> {
    std::env::var("SCYLLA_HOSTS")
        .map(|s| s.split(',').map(|h| h.trim().to_string()).collect())
        .unwrap_or_else(|_| vec!["127.0.0.1:9042".to_string()])
}
fn default_scylla_keyspace() -> String {
    std::env::var("SCYLLA_KEYSPACE").unwrap_or_else(|_| "pregnancy_agent".to_string())
}
fn default_pool_total() -> u32 {
    50
}
fn default_pool_idle() -> u32 {
    25
}
fn default_pool_lifetime_secs() -> u64 {
    5 * 60
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            scylla_hosts: default_scylla_hosts(),
            keyspace: default_scylla_keyspace(),
            pool_total: default_pool_total(),
            pool_idle: default_pool_idle(),
            pool_lifetime_secs: default_pool_lifetime_secs(),
            enabled: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.short_term_window == 0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.short_term_window".to_string(),
                message: "must keep at least one turn".to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.engine.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "engine.temperature".to_string(),
                message: "must be between 0.0 and 2.0".to_string(),
            });
        }
        if self.engine.circuit_failure_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.circuit_failure_threshold".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        let has_min_languages = ["en", "es", "fr"]
            .iter()
            .all(|code| self.engine.supported_languages.iter().any(|l| l == code));
        if !has_min_languages {
            return Err(ConfigError::InvalidValue {
                field: "engine.supported_languages".to_string(),
                message: "must include at least {en, es, fr}".to_string(),
            });
        }
        Ok(())
    }
}

/// Defaults -> `config/{env}.yaml` -> `PREGNANCY_`-prefixed env vars,
/// mirroring the teacher's `load_settings`.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));
    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }
    builder = builder.add_source(
        Environment::with_prefix("PREGNANCY")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}
