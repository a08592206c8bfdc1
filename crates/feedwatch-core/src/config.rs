use crate::app_config::{AppConfig, Environment};
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
/// Decoupled from the real environment so tests can feed a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let access_token = require("FEEDWATCH_ACCESS_TOKEN")?;
    if access_token.trim().is_empty() {
        return Err(invalid(
            "FEEDWATCH_ACCESS_TOKEN",
            "must be non-empty".to_string(),
        ));
    }

    let env = parse_environment(&or_default("FEEDWATCH_ENV", "development"))?;
    let log_level = or_default("FEEDWATCH_LOG_LEVEL", "info");

    let api_base_url = or_default("FEEDWATCH_API_BASE_URL", "https://graph.facebook.com");
    let api_version = or_default("FEEDWATCH_API_VERSION", "2.5");
    let request_timeout_secs = parse_u64("FEEDWATCH_REQUEST_TIMEOUT_SECS", "30")?;

    let post_limit = parse_u32("FEEDWATCH_POST_LIMIT", "25")?;
    let comment_limit = parse_u32("FEEDWATCH_COMMENT_LIMIT", "500")?;

    let refresh_interval_secs = parse_u64("FEEDWATCH_REFRESH_INTERVAL_SECS", "60")?;
    let backup_interval_secs = parse_u64("FEEDWATCH_BACKUP_INTERVAL_SECS", "600")?;
    let export_interval_secs = parse_u64("FEEDWATCH_EXPORT_INTERVAL_SECS", "21600")?;
    for (var, value) in [
        ("FEEDWATCH_REFRESH_INTERVAL_SECS", refresh_interval_secs),
        ("FEEDWATCH_BACKUP_INTERVAL_SECS", backup_interval_secs),
        ("FEEDWATCH_EXPORT_INTERVAL_SECS", export_interval_secs),
    ] {
        if value == 0 {
            return Err(invalid(var, "interval must be at least 1 second".to_string()));
        }
    }

    let alive_age_secs = parse_u64("FEEDWATCH_ALIVE_AGE_SECS", "86400")?;
    if i64::try_from(alive_age_secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .is_none()
    {
        return Err(invalid(
            "FEEDWATCH_ALIVE_AGE_SECS",
            format!("{alive_age_secs} seconds is out of range"),
        ));
    }
    let max_concurrent_fetches = parse_usize("FEEDWATCH_MAX_CONCURRENT_FETCHES", "4")?.max(1);

    let max_transient_retries = match lookup("FEEDWATCH_MAX_TRANSIENT_RETRIES") {
        Ok(raw) => Some(
            raw.parse::<u32>()
                .map_err(|e| invalid("FEEDWATCH_MAX_TRANSIENT_RETRIES", e.to_string()))?,
        ),
        Err(_) => None,
    };

    let state_file = PathBuf::from(or_default("FEEDWATCH_STATE_FILE", "./monitor.backup"));
    let post_export_file = PathBuf::from(or_default(
        "FEEDWATCH_POST_EXPORT_FILE",
        "./monitor_posts.csv",
    ));
    let comment_export_file = PathBuf::from(or_default(
        "FEEDWATCH_COMMENT_EXPORT_FILE",
        "./monitor_comments.csv",
    ));
    let sources_path = PathBuf::from(or_default(
        "FEEDWATCH_SOURCES_PATH",
        "./config/sources.yaml",
    ));

    let strict = parse_bool("FEEDWATCH_STRICT", &or_default("FEEDWATCH_STRICT", "false"))?;

    Ok(AppConfig {
        env,
        log_level,
        access_token,
        api_base_url,
        api_version,
        request_timeout_secs,
        post_limit,
        comment_limit,
        refresh_interval_secs,
        backup_interval_secs,
        export_interval_secs,
        alive_age_secs,
        max_concurrent_fetches,
        max_transient_retries,
        state_file,
        post_export_file,
        comment_export_file,
        sources_path,
        strict,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "FEEDWATCH_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
