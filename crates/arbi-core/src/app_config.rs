use std::path::PathBuf;

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

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub stores_path: PathBuf,
    pub output_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Upper bound on catalog traversals running at the same time.
    pub max_concurrent_traversals: usize,
    /// Politeness delay between two page fetches of one traversal.
    pub inter_request_delay_ms: u64,
    /// Additional attempts after the first failed page fetch.
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    /// When `false` every retry waits exactly `retry_delay_ms`.
    pub retry_exponential: bool,
    /// Hard stop for runaway pagination.
    pub max_pages: u32,
    pub exchange_rate_url: String,
}
