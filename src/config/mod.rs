//! Client configuration: endpoint, key file location, retry budget,
//! proxies, TLS verification and timeouts.
//!
//! A [`ClientConfig`] is built once (defaults plus `with_*` overrides) and is
//! read-only for the lifetime of the client.

pub mod ini;

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::LabsError;

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://labs.inquest.net/api";

/// Name of the key file in the user's home directory.
pub const DEFAULT_CONFIG_FILE_NAME: &str = ".iqlabskey";

/// Default number of attempts per request (including the first).
pub const DEFAULT_RETRY_BUDGET: u32 = 3;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default per-attempt request timeout (5 minutes, downloads can be large).
pub const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Environment variable holding the API key.
pub const API_KEY_ENV_VAR: &str = "IQLABS_APIKEY";

/// Proxy schemes accepted in [`ClientConfig::proxies`].
pub const PROXY_SCHEMES: [&str; 3] = ["http", "https", "all"];

/// Immutable client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API endpoint; operation paths are appended verbatim.
    pub base_url: String,
    /// Key file consulted when no explicit or environment key is present.
    pub config_file_path: PathBuf,
    /// Attempts per request, at least 1.
    pub retry_budget: u32,
    /// Proxy URL per scheme (`http`, `https` or `all`).
    pub proxies: BTreeMap<String, String>,
    /// Verify the server's TLS certificate.
    pub verify_tls: bool,
    /// Connect timeout applied to every attempt.
    pub connect_timeout: Duration,
    /// Total timeout applied to every attempt.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            config_file_path: default_config_path(),
            retry_budget: DEFAULT_RETRY_BUDGET,
            proxies: BTreeMap::new(),
            verify_tls: true,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Overrides the base URL. A trailing slash is dropped so paths join cleanly.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Overrides the key file path.
    #[must_use]
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file_path = path.into();
        self
    }

    /// Overrides the retry budget (clamped to at least 1).
    #[must_use]
    pub fn with_retry_budget(mut self, retry_budget: u32) -> Self {
        self.retry_budget = retry_budget.max(1);
        self
    }

    /// Adds a proxy for `scheme`.
    #[must_use]
    pub fn with_proxy(mut self, scheme: impl Into<String>, url: impl Into<String>) -> Self {
        self.proxies.insert(scheme.into().to_lowercase(), url.into());
        self
    }

    /// Toggles TLS certificate verification.
    #[must_use]
    pub fn with_verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }

    /// Overrides connect and request timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, connect_timeout: Duration, request_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self.request_timeout = request_timeout;
        self
    }

    /// Checks values that can't be enforced by the builders alone.
    ///
    /// # Errors
    ///
    /// Returns [`LabsError::Config`] for an unparseable base URL, an unknown
    /// proxy scheme, an unparseable proxy URL, or a zero timeout.
    pub fn validate(&self) -> Result<(), LabsError> {
        url::Url::parse(&self.base_url).map_err(|e| {
            LabsError::config(format!("invalid base URL '{}': {e}", self.base_url))
        })?;

        for (scheme, proxy) in &self.proxies {
            if !PROXY_SCHEMES.contains(&scheme.as_str()) {
                return Err(LabsError::config(format!(
                    "invalid proxy scheme '{scheme}'. valid schemes include: {}",
                    PROXY_SCHEMES.join(", ")
                )));
            }
            url::Url::parse(proxy).map_err(|e| {
                LabsError::config(format!("invalid proxy URL '{proxy}' for {scheme}: {e}"))
            })?;
        }

        if self.connect_timeout.is_zero() || self.request_timeout.is_zero() {
            return Err(LabsError::config("timeouts must be greater than zero"));
        }

        Ok(())
    }
}

/// Resolves the default key file path, `~/.iqlabskey`.
///
/// Falls back to the current directory when no home directory is known.
#[must_use]
pub fn default_config_path() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_CONFIG_FILE_NAME)
}

/// Expands a leading `~` to the home directory. Other paths are returned
/// unchanged, as is `~` itself when no home directory is known.
#[must_use]
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

fn home_dir() -> Option<PathBuf> {
    ["HOME", "USERPROFILE"]
        .iter()
        .find_map(|name| env_var_non_empty_os(name))
        .map(PathBuf::from)
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}
