//! Configuration loading from disk and environment.

use std::fs;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable naming an optional TOML config file.
pub const CONFIG_PATH_ENV: &str = "GATEWAY_CONFIG";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid environment variable {name}: {message}")]
    Env { name: &'static str, message: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Load configuration for the running process.
///
/// Starts from the file named by `GATEWAY_CONFIG` (or defaults), applies the
/// recognized environment variables on top, then validates the result.
pub fn load_from_env() -> Result<GatewayConfig, ConfigError> {
    let base = match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) => {
            let content = fs::read_to_string(&path)?;
            toml::from_str(&content)?
        }
        Err(_) => GatewayConfig::default(),
    };

    let config = apply_env_overrides(base, |name| std::env::var(name).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply environment overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(mut config: GatewayConfig, lookup: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT") {
        config.listener.port = port.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Env {
            name: "PORT",
            message: e.to_string(),
        })?;
    }
    if let Some(key) = lookup("API_KEY").filter(|k| !k.is_empty()) {
        config.upstream.api_key = Some(key);
    }
    if let Some(url) = lookup("FASTAPI_URL") {
        config.upstream.base_url = url;
    }
    if let Some(env) = lookup("NODE_ENV") {
        config.observability.environment = env;
    }
    if let Some(level) = lookup("LOG_LEVEL") {
        config.observability.log_level = level;
    }
    if let Some(endpoint) = lookup("JAEGER_ENDPOINT") {
        config.observability.jaeger_endpoint = endpoint;
    }
    Ok(config)
}
