use crate::app_config::{AppConfig, Endpoints, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let extract_url = require("BXSS_EXTRACT_URL")?;
    let slack_token_secret_name = require("BXSS_SECRET_SLACK_TOKEN_NAME")?;
    let slack_channel_secret_name = require("BXSS_SECRET_SLACK_CHANNEL_NAME")?;
    let storage_bucket = require("BXSS_STORAGE_BUCKET")?;
    let hmac_access_id = require("BXSS_GCS_HMAC_ACCESS_ID")?;
    let hmac_secret = require("BXSS_GCS_HMAC_SECRET")?;
    let gcp_access_token = lookup("BXSS_GCP_ACCESS_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty());

    let env = parse_environment(&or_default("BXSS_ENV", "development"));
    let bind_addr = parse_addr("BXSS_BIND_ADDR", "0.0.0.0:8080")?;
    let log_level = or_default("BXSS_LOG_LEVEL", "info");
    let http_timeout_secs = parse_u64("BXSS_HTTP_TIMEOUT_SECS", "30")?;

    let defaults = Endpoints::default();
    let endpoints = Endpoints {
        secret_manager_url: or_default("BXSS_SECRET_MANAGER_URL", &defaults.secret_manager_url),
        storage_url: or_default("BXSS_STORAGE_URL", &defaults.storage_url),
        signing_host: or_default("BXSS_SIGNING_HOST", &defaults.signing_host),
        metadata_url: or_default("BXSS_METADATA_URL", &defaults.metadata_url),
        slack_api_url: or_default("BXSS_SLACK_API_URL", &defaults.slack_api_url),
    };

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        extract_url: extract_url.trim_end_matches('/').to_string(),
        slack_token_secret_name,
        slack_channel_secret_name,
        storage_bucket,
        hmac_access_id,
        hmac_secret,
        gcp_access_token,
        http_timeout_secs,
        endpoints,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
