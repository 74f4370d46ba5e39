use crate::app_config::{AppConfig, Environment};
use crate::category::FilterRule;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
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
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation live here, decoupled from the process environment,
/// so tests can drive it with a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
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

    let database_url = optional("DATABASE_URL");
    let env = parse_environment(&or_default("LABCAT_ENV", "development"))?;
    let log_level = or_default("LABCAT_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("LABCAT_DB_MAX_CONNECTIONS", "1")?;
    let db_min_connections = parse_u32("LABCAT_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("LABCAT_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    if db_max_connections == 0 {
        return Err(invalid(
            "LABCAT_DB_MAX_CONNECTIONS",
            "must be at least 1".to_string(),
        ));
    }
    if db_min_connections > db_max_connections {
        return Err(invalid(
            "LABCAT_DB_MIN_CONNECTIONS",
            format!("must not exceed LABCAT_DB_MAX_CONNECTIONS ({db_max_connections})"),
        ));
    }

    let output_dir = PathBuf::from(or_default("LABCAT_OUTPUT_DIR", "./reconcile-output"));
    let columns_path = optional("LABCAT_COLUMNS_PATH").map(PathBuf::from);

    let filter_rule = or_default("LABCAT_FILTER_RULE", "permissive")
        .parse::<FilterRule>()
        .map_err(|reason| invalid("LABCAT_FILTER_RULE", reason))?;

    let fail_on_errors = parse_bool(&or_default("LABCAT_FAIL_ON_ERRORS", "false"))
        .ok_or_else(|| {
            invalid(
                "LABCAT_FAIL_ON_ERRORS",
                "expected true/false, 1/0 or yes/no".to_string(),
            )
        })?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        output_dir,
        columns_path,
        filter_rule,
        fail_on_errors,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "LABCAT_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
