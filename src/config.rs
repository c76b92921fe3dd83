use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Recommendation (matching) service base URL
    #[serde(default = "default_matching_api_url")]
    pub matching_api_url: String,

    /// Movie catalog base URL (random fallback feed + movie lookups)
    #[serde(default = "default_catalog_api_url")]
    pub catalog_api_url: String,

    /// Redis connection URL for the real-time session store
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Timeout for recommendation/catalog service calls, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Interval between stats/preferences polls, in seconds
    #[serde(default = "default_stats_poll_interval_secs")]
    pub stats_poll_interval_secs: u64,

    /// Number of candidates requested per queue refill
    #[serde(default = "default_queue_batch_size")]
    pub queue_batch_size: usize,
}

fn default_matching_api_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_catalog_api_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_stats_poll_interval_secs() -> u64 {
    30
}

fn default_queue_batch_size() -> usize {
    10
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            matching_api_url: default_matching_api_url(),
            catalog_api_url: default_catalog_api_url(),
            redis_url: default_redis_url(),
            request_timeout_secs: default_request_timeout_secs(),
            stats_poll_interval_secs: default_stats_poll_interval_secs(),
            queue_batch_size: default_queue_batch_size(),
        }
    }
}
