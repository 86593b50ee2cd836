use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";

/// Client configuration loaded from environment variables.
/// Every variable has a default; malformed numbers fail at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub arrival_window: Duration,
    pub settings_path: PathBuf,
    pub download_dir: PathBuf,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = Config::default();

        Ok(Config {
            api_base_url: std::env::var("API_BASE_URL").unwrap_or(defaults.api_base_url),
            request_timeout: secs_env("REQUEST_TIMEOUT_SECS", defaults.request_timeout)?,
            poll_interval: secs_env("POLL_INTERVAL_SECS", defaults.poll_interval)?,
            arrival_window: secs_env("ARRIVAL_WINDOW_SECS", defaults.arrival_window)?,
            settings_path: std::env::var("SETTINGS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.settings_path),
            download_dir: std::env::var("DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.download_dir),
            rust_log: std::env::var("RUST_LOG").unwrap_or(defaults.rust_log),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: crate::api_client::DEFAULT_TIMEOUT,
            poll_interval: Duration::from_secs(60),
            arrival_window: Duration::from_secs(5),
            settings_path: PathBuf::from(".resume-client/settings.json"),
            download_dir: PathBuf::from("downloads"),
            rust_log: "info".to_string(),
        }
    }
}

fn secs_env(key: &str, default: Duration) -> Result<Duration> {
    match std::env::var(key) {
        Ok(raw) => parse_secs(key, &raw),
        Err(_) => Ok(default),
    }
}

/// Timeouts and intervals of zero would disable the timeout or spin the poller.
fn parse_secs(key: &str, raw: &str) -> Result<Duration> {
    let secs = raw
        .trim()
        .parse::<u64>()
        .with_context(|| format!("{key} must be a whole number of seconds"))?;
    if secs == 0 {
        bail!("{key} must be at least 1 second");
    }
    Ok(Duration::from_secs(secs))
}
