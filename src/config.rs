//! Client configuration: backend location, endpoint paths, transport timeouts
//! and where the session is persisted. Defaults can be overridden from the
//! environment (`ADMINKIT_*`) and, in the binary, from command-line flags.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::error::{ClientError, ClientResult};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";
pub const DEFAULT_PROFILE_PATH: &str = "/users/me";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub login_path: String,
    /// "Who am I" endpoint queried after login. `None` disables the lookup.
    pub profile_path: Option<String>,
    pub connect_timeout: Duration,
    pub send_timeout: Duration,
    pub receive_timeout: Duration,
    /// Session file for the file backend; `None` keeps the session in memory.
    pub store_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            profile_path: Some(DEFAULT_PROFILE_PATH.to_string()),
            connect_timeout: DEFAULT_TIMEOUT,
            send_timeout: DEFAULT_TIMEOUT,
            receive_timeout: DEFAULT_TIMEOUT,
            store_path: None,
        }
    }
}

/// Whole seconds, strictly positive. A zero timeout would fail every request at once.
pub fn parse_timeout_secs(raw: &str) -> ClientResult<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ClientError::Config("timeout must be at least 1 second".into())),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(ClientError::Config(format!("invalid timeout '{}': {}", raw.trim(), e))),
    }
}

fn parse_timeout_env(name: &str) -> Option<Duration> {
    let raw = env::var(name).ok()?;
    match parse_timeout_secs(&raw) {
        Ok(d) => Some(d),
        Err(e) => {
            warn!(var = name, error = %e, "config_env_ignored");
            None
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }
    }

    /// Defaults overlaid with `ADMINKIT_BASE_URL`, `ADMINKIT_STORE`,
    /// `ADMINKIT_TIMEOUT_SECS` and `ADMINKIT_PROFILE_PATH` (empty disables the lookup).
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(url) = env::var("ADMINKIT_BASE_URL") {
            if !url.trim().is_empty() { cfg.base_url = url.trim().to_string(); }
        }
        if let Ok(p) = env::var("ADMINKIT_STORE") {
            if !p.trim().is_empty() { cfg.store_path = Some(PathBuf::from(p.trim())); }
        }
        if let Some(d) = parse_timeout_env("ADMINKIT_TIMEOUT_SECS") {
            cfg = cfg.with_timeouts(d);
        }
        if let Ok(p) = env::var("ADMINKIT_PROFILE_PATH") {
            cfg.profile_path = if p.trim().is_empty() { None } else { Some(p.trim().to_string()) };
        }
        cfg
    }

    pub fn with_timeouts(mut self, d: Duration) -> Self {
        self.connect_timeout = d;
        self.send_timeout = d;
        self.receive_timeout = d;
        self
    }

    pub fn with_store_path(mut self, p: impl Into<PathBuf>) -> Self {
        self.store_path = Some(p.into());
        self
    }

    pub fn with_profile_path(mut self, p: Option<&str>) -> Self {
        self.profile_path = p.map(|s| s.to_string());
        self
    }

    /// Join an endpoint path onto the base URL, keeping any path prefix the base carries.
    pub fn endpoint(&self, path: &str) -> ClientResult<reqwest::Url> {
        let joined = format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'));
        reqwest::Url::parse(&joined).map_err(|e| ClientError::Config(format!("invalid URL '{}': {}", joined, e)))
    }

    /// Build the shared HTTP client. reqwest has no separate send timeout, so the
    /// overall request deadline is send + receive.
    pub fn http_client(&self) -> ClientResult<reqwest::Client> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .read_timeout(self.receive_timeout)
            .timeout(self.send_timeout + self.receive_timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("http client: {}", e)))
    }
}
