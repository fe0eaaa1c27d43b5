//! Layered configuration for the conversation engine: defaults, optional
//! `config/{env}.yaml` files, and `PREGNANCY_`-prefixed environment
//! overrides (§6).

mod error;
mod settings;

pub use error::ConfigError;
pub use settings::{
    load_settings, EngineConfig, LlmConfig, PersistenceConfig, RateLimitConfig, ServerConfig,
    Settings,
};
