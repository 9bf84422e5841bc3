use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

pub const DEFAULT_EXCHANGE_RATE_URL: &str = "https://rate.bot.com.tw/xrt?Lang=en-US";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
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
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
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

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        let raw = or_default(var, default);
        match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            other => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("expected a boolean, got '{other}'"),
            }),
        }
    };

    let env = parse_environment(&or_default("ARBI_ENV", "development"))?;
    let log_level = or_default("ARBI_LOG_LEVEL", "info");
    let stores_path = PathBuf::from(or_default("ARBI_STORES_PATH", "./config/stores.yaml"));
    let output_dir = PathBuf::from(or_default("ARBI_OUTPUT_DIR", "./output"));

    let request_timeout_secs = parse_u64("ARBI_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("ARBI_USER_AGENT", DEFAULT_USER_AGENT);
    let max_concurrent_traversals = parse_usize("ARBI_MAX_CONCURRENT_TRAVERSALS", "2")?;
    let inter_request_delay_ms = parse_u64("ARBI_INTER_REQUEST_DELAY_MS", "500")?;
    let max_retries = parse_u32("ARBI_MAX_RETRIES", "3")?;
    let retry_delay_ms = parse_u64("ARBI_RETRY_DELAY_MS", "3000")?;
    let retry_exponential = parse_bool("ARBI_RETRY_EXPONENTIAL", "false")?;
    let max_pages = parse_u32("ARBI_MAX_PAGES", "200")?;
    let exchange_rate_url = or_default("ARBI_EXCHANGE_RATE_URL", DEFAULT_EXCHANGE_RATE_URL);

    if max_concurrent_traversals == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "ARBI_MAX_CONCURRENT_TRAVERSALS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    if max_pages == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "ARBI_MAX_PAGES".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    Ok(AppConfig {
        env,
        log_level,
        stores_path,
        output_dir,
        request_timeout_secs,
        user_agent,
        max_concurrent_traversals,
        inter_request_delay_ms,
        max_retries,
        retry_delay_ms,
        retry_exponential,
        max_pages,
        exchange_rate_url,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "ARBI_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
