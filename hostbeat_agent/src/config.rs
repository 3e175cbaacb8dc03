//! Environment-sourced agent configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_API_TOKEN: &str = "telemetry-secret-token";
const DEFAULT_HMAC_SECRET: &str = "telemetry-hmac-secret";
const DEFAULT_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Ingest service base URL (`API_URL`).
    pub base_url: String,
    /// Static API token attached to every request (`API_TOKEN`).
    pub api_token: String,
    /// Identifier reported in every batch (`AGENT_ID`, default: hostname).
    pub agent_id: String,
    /// Shared secret for request signing (`HMAC_SECRET`).
    pub hmac_secret: String,
    /// Directory holding undelivered batches (`QUEUE_PATH`).
    pub queue_dir: PathBuf,
    /// Steady-state tick interval (`INTERVAL_SECONDS`).
    pub interval: Duration,
}

impl AgentConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env::var("API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            api_token: env::var("API_TOKEN").unwrap_or_else(|_| DEFAULT_API_TOKEN.to_string()),
            agent_id: env::var("AGENT_ID").unwrap_or_else(|_| default_agent_id()),
            hmac_secret: env::var("HMAC_SECRET")
                .unwrap_or_else(|_| DEFAULT_HMAC_SECRET.to_string()),
            queue_dir: env::var("QUEUE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_queue_dir()),
            interval: parse_interval(env::var("INTERVAL_SECONDS").ok().as_deref()),
        }
    }
}

fn default_agent_id() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_lowercase())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// `queue/` next to the executable, falling back to the working directory.
fn default_queue_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("queue")
}

/// Invalid or non-positive values fall back to the default rather than
/// failing startup.
fn parse_interval(raw: Option<&str>) -> Duration {
    let secs = raw
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_INTERVAL_SECS);
    Duration::from_secs(secs)
}
