use crate::app_config::AppConfig;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if any value fails to parse. Every variable has a
/// default, so a bare environment is valid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the
/// process, without touching `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if any value fails to parse.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// The core parsing/validation logic is decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup, without any
/// `set_var`/`remove_var`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

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

    let database_url = or_default("DATABASE_URL", "sqlite://birdwatch.db");
    let log_level = or_default("BIRDWATCH_LOG_LEVEL", "info");
    let bind_addr = parse_addr("BIRDWATCH_BIND_ADDR", "0.0.0.0:3400")?;

    let browser_url = or_default("BIRDWATCH_BROWSER_URL", "http://localhost:3000");
    let browser_token = lookup("BIRDWATCH_BROWSER_TOKEN").ok();
    // Timeline collection scrolls the live page with generous settle waits,
    // so the evaluate call runs far longer than an ordinary request.
    let browser_timeout_secs = parse_u64("BIRDWATCH_BROWSER_TIMEOUT_SECS", "600")?;
    let timeline_url = or_default("BIRDWATCH_TIMELINE_URL", "https://x.com/home");
    let capture_target = parse_usize("BIRDWATCH_CAPTURE_TARGET", "200")?;
    let screenshots_dir = PathBuf::from(or_default("BIRDWATCH_SCREENSHOTS_DIR", "./screenshots"));

    let model_url = or_default("BIRDWATCH_MODEL_URL", "https://api.openai.com/v1");
    let model_name = or_default("BIRDWATCH_MODEL_NAME", "gpt-4o-mini");
    let api_key_file = PathBuf::from(or_default("BIRDWATCH_API_KEY_FILE", "./openai_key.txt"));

    let model_timeout_secs = parse_u64("BIRDWATCH_MODEL_TIMEOUT_SECS", "120")?;

    let dashboard_bin = or_default("BIRDWATCH_DASHBOARD_BIN", "birdwatch-dashboard");

    let db_max_connections = parse_u32("BIRDWATCH_DB_MAX_CONNECTIONS", "5")?;
    let db_acquire_timeout_secs = parse_u64("BIRDWATCH_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    Ok(AppConfig {
        database_url,
        log_level,
        bind_addr,
        browser_url,
        browser_token,
        browser_timeout_secs,
        timeline_url,
        capture_target,
        screenshots_dir,
        model_url,
        model_name,
        api_key_file,
        model_timeout_secs,
        dashboard_bin,
        db_max_connections,
        db_acquire_timeout_secs,
    })
}
