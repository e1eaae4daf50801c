use std::net::SocketAddr;
use std::path::PathBuf;

/// Process-wide configuration, built once at startup and passed by
/// reference into each component. Read-only after construction; the
/// model credential lives in its own file (see `birdwatch-model`) so
/// that credential replacement never mutates this struct.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub log_level: String,
    pub bind_addr: SocketAddr,
    pub browser_url: String,
    pub browser_token: Option<String>,
    pub browser_timeout_secs: u64,
    pub timeline_url: String,
    pub capture_target: usize,
    pub screenshots_dir: PathBuf,
    pub model_url: String,
    pub model_name: String,
    pub api_key_file: PathBuf,
    pub model_timeout_secs: u64,
    pub dashboard_bin: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &self.database_url)
            .field("log_level", &self.log_level)
            .field("bind_addr", &self.bind_addr)
            .field("browser_url", &self.browser_url)
            .field(
                "browser_token",
                &self.browser_token.as_ref().map(|_| "[redacted]"),
            )
            .field("browser_timeout_secs", &self.browser_timeout_secs)
            .field("timeline_url", &self.timeline_url)
            .field("capture_target", &self.capture_target)
            .field("screenshots_dir", &self.screenshots_dir)
            .field("model_url", &self.model_url)
            .field("model_name", &self.model_name)
            .field("api_key_file", &self.api_key_file)
            .field("model_timeout_secs", &self.model_timeout_secs)
            .field("dashboard_bin", &self.dashboard_bin)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}
