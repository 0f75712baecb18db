//! API key resolution.
//!
//! The key comes from, in priority order: an explicit value, the
//! `IQLABS_APIKEY` environment variable, or the `apikey` entry of the
//! `[inquestlabs]` section of the key file:
//!
//! ```text
//! $ cat ~/.iqlabskey
//! [inquestlabs]
//! apikey: deadbeefdeadbeefdeadbeefdeadbeefdeadbeef
//! ```
//!
//! No key at all is fine; the API then serves requests with anonymous rate
//! limits.
//!
//! [`resolve`] is pure over already-read inputs. [`load_sources`] performs
//! the environment and file reads once, at the boundary.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{API_KEY_ENV_VAR, ini};
use crate::error::LabsError;

/// Section holding the key in the key file.
pub const CONFIG_SECTION: &str = "inquestlabs";

/// Key name within [`CONFIG_SECTION`].
pub const CONFIG_KEY: &str = "apikey";

/// State of the key file at the time sources were loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigFileSource {
    /// No regular file exists at the path.
    Missing,
    /// The file exists; `contents` is its text.
    Present { path: PathBuf, contents: String },
}

/// Every place a key may come from, already read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSources {
    pub explicit: Option<String>,
    pub environment: Option<String>,
    pub config_file: ConfigFileSource,
}

/// Picks the API key from `sources`.
///
/// # Errors
///
/// Only when neither the explicit value nor the environment supplies a key
/// and the key file exists:
/// - [`LabsError::Config`] "invalid configuration file" when it does not parse;
/// - [`LabsError::Config`] "unable to find inquestlabs.apikey" when the
///   section or key is absent.
pub fn resolve(sources: &CredentialSources) -> Result<Option<String>, LabsError> {
    if let Some(explicit) = non_empty(sources.explicit.as_deref()) {
        debug!(source = "explicit", "API key resolved");
        return Ok(Some(explicit.to_string()));
    }

    if let Some(environment) = non_empty(sources.environment.as_deref()) {
        debug!(source = "environment", "API key resolved");
        return Ok(Some(environment.to_string()));
    }

    let ConfigFileSource::Present { path, contents } = &sources.config_file else {
        debug!("no API key configured; using anonymous access");
        return Ok(None);
    };

    let doc = ini::parse(contents).map_err(|e| {
        debug!(line = e.line, reason = e.reason, "key file failed to parse");
        LabsError::config(format!("invalid configuration file: {}", path.display()))
    })?;

    match doc.get(CONFIG_SECTION, CONFIG_KEY) {
        Some(key) => {
            debug!(source = "config_file", path = %path.display(), "API key resolved");
            Ok(Some(key.to_string()))
        }
        None => Err(LabsError::config(format!(
            "unable to find {CONFIG_SECTION}.{CONFIG_KEY} in: {}",
            path.display()
        ))),
    }
}

/// Reads the environment variable and the key file.
///
/// The file is only read when no earlier source supplies a key, so a broken
/// key file never blocks an explicit or environment key.
///
/// # Errors
///
/// Returns [`LabsError::Config`] when the file exists but cannot be read.
pub fn load_sources(
    explicit: Option<String>,
    config_path: &Path,
) -> Result<CredentialSources, LabsError> {
    let environment = std::env::var(API_KEY_ENV_VAR).ok();

    let needs_file =
        non_empty(explicit.as_deref()).is_none() && non_empty(environment.as_deref()).is_none();
    let config_file = if needs_file && config_path.is_file() {
        let contents = fs::read_to_string(config_path).map_err(|e| {
            LabsError::config(format!(
                "invalid configuration file: {} ({e})",
                config_path.display()
            ))
        })?;
        ConfigFileSource::Present {
            path: config_path.to_path_buf(),
            contents,
        }
    } else {
        ConfigFileSource::Missing
    };

    Ok(CredentialSources {
        explicit,
        environment,
        config_file,
    })
}

/// Convenience wrapper: [`load_sources`] then [`resolve`].
///
/// # Errors
///
/// See [`load_sources`] and [`resolve`].
pub fn resolve_api_key(
    explicit: Option<String>,
    config_path: &Path,
) -> Result<Option<String>, LabsError> {
    resolve(&load_sources(explicit, config_path)?)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
