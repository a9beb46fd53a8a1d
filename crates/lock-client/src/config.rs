use std::time::Duration;

use crm_core::locking::{DEFAULT_LOCK_DURATION_MINS, LOCK_POLL_INTERVAL_SECS};

use crate::error::LockClientError;

/// Default per-request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Lock client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the backend, e.g. `https://crm.example.com`. The lock
    /// procedures live under `{backend_url}/rest/v1/rpc/`.
    pub backend_url: String,
    /// Bearer credential attached to every call.
    pub access_token: String,
    /// How often a [`LockWatcher`](crate::LockWatcher) re-checks status.
    pub poll_interval: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Duration used by [`LockClient::acquire_default`](crate::LockClient::acquire_default).
    pub default_lock_duration_mins: i64,
}

impl ClientConfig {
    /// Build a config with default intervals.
    pub fn new(backend_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            backend_url: backend_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            poll_interval: Duration::from_secs(LOCK_POLL_INTERVAL_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            default_lock_duration_mins: DEFAULT_LOCK_DURATION_MINS,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// | Env Var                    | Required | Default |
    /// |----------------------------|----------|---------|
    /// | `CRM_BACKEND_URL`          | **yes**  | --      |
    /// | `CRM_ACCESS_TOKEN`         | **yes**  | --      |
    /// | `CRM_LOCK_POLL_SECS`       | no       | `30`    |
    /// | `CRM_REQUEST_TIMEOUT_SECS` | no       | `10`    |
    pub fn from_env() -> Result<Self, LockClientError> {
        let backend_url = required_var("CRM_BACKEND_URL")?;
        let access_token = required_var("CRM_ACCESS_TOKEN")?;

        let mut config = Self::new(backend_url, access_token);
        config.poll_interval = Duration::from_secs(secs_var(
            "CRM_LOCK_POLL_SECS",
            LOCK_POLL_INTERVAL_SECS,
        )?);
        config.request_timeout = Duration::from_secs(secs_var(
            "CRM_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);
        Ok(config)
    }
}

fn required_var(name: &str) -> Result<String, LockClientError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(LockClientError::Validation(format!("{name} must be set"))),
    }
}

fn secs_var(name: &str, default: u64) -> Result<u64, LockClientError> {
    let Ok(raw) = std::env::var(name) else {
        return Ok(default);
    };
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(LockClientError::Validation(format!(
            "{name} must be a positive integer, got '{raw}'"
        ))),
    }
}
