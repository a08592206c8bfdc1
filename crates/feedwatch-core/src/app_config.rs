use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub access_token: String,
    pub api_base_url: String,
    pub api_version: String,
    pub request_timeout_secs: u64,
    pub post_limit: u32,
    pub comment_limit: u32,
    pub refresh_interval_secs: u64,
    pub backup_interval_secs: u64,
    pub export_interval_secs: u64,
    pub alive_age_secs: u64,
    pub max_concurrent_fetches: usize,
    /// `None` retries transient API errors until they clear.
    pub max_transient_retries: Option<u32>,
    pub state_file: PathBuf,
    pub post_export_file: PathBuf,
    pub comment_export_file: PathBuf,
    pub sources_path: PathBuf,
    /// Escalates malformed responses and other unexpected errors to a fatal abort.
    pub strict: bool,
}

impl AppConfig {
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    #[must_use]
    pub fn backup_interval(&self) -> Duration {
        Duration::from_secs(self.backup_interval_secs)
    }

    #[must_use]
    pub fn export_interval(&self) -> Duration {
        Duration::from_secs(self.export_interval_secs)
    }

    /// Age past which a live post is considered dormant.
    #[must_use]
    pub fn alive_age(&self) -> chrono::Duration {
        i64::try_from(self.alive_age_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("access_token", &"[redacted]")
            .field("api_base_url", &self.api_base_url)
            .field("api_version", &self.api_version)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("post_limit", &self.post_limit)
            .field("comment_limit", &self.comment_limit)
            .field("refresh_interval_secs", &self.refresh_interval_secs)
            .field("backup_interval_secs", &self.backup_interval_secs)
            .field("export_interval_secs", &self.export_interval_secs)
            .field("alive_age_secs", &self.alive_age_secs)
            .field("max_concurrent_fetches", &self.max_concurrent_fetches)
            .field("max_transient_retries", &self.max_transient_retries)
            .field("state_file", &self.state_file)
            .field("post_export_file", &self.post_export_file)
            .field("comment_export_file", &self.comment_export_file)
            .field("sources_path", &self.sources_path)
            .field("strict", &self.strict)
            .finish()
    }
}
