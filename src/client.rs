//! High-level InQuest Labs client.
//!
//! [`LabsClient`] exposes one method per remote operation. Each validates its
//! input, builds the request via [`crate::api::operations`], runs it through
//! the [`Executor`] and post-processes the payload. Retry and classification
//! live entirely in the executor.
//!
//! # Example
//!
//! ```no_run
//! use inquestlabs_core::{ClientConfig, LabsClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = LabsClient::from_config(ClientConfig::default(), None)?;
//! let hits = client.dfi_search("ioc", "domain", "example.com").await?;
//! println!("{hits}");
//! # Ok(())
//! # }
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::api::{Executor, operations};
use crate::config::ClientConfig;
use crate::credentials;
use crate::error::LabsError;
use crate::hash::{self, HashAlgorithm, HashInput};
use crate::validate::{self, Endian};

/// Client for the InQuest Labs API.
#[derive(Debug, Clone)]
pub struct LabsClient {
    executor: Executor,
}

impl LabsClient {
    /// Creates a client with an already-resolved API key.
    ///
    /// # Errors
    ///
    /// Returns [`LabsError::Config`] for an invalid config or when the HTTP
    /// client cannot be built.
    pub fn new(config: &ClientConfig, api_key: Option<String>) -> Result<Self, LabsError> {
        config.validate()?;
        Ok(Self {
            executor: Executor::from_config(config, api_key)?,
        })
    }

    /// Creates a client, resolving the API key from `explicit_key`, the
    /// environment and the config file, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`LabsError::Config`] from key resolution or client construction.
    pub fn from_config(config: ClientConfig, explicit_key: Option<String>) -> Result<Self, LabsError> {
        let api_key = credentials::resolve_api_key(explicit_key, &config.config_file_path)?;
        if api_key.is_none() {
            info!("no API key found; requests are subject to anonymous rate limits");
        }
        Self::new(&config, api_key)
    }

    /// Creates a client over a prepared executor.
    #[must_use]
    pub fn with_executor(executor: Executor) -> Self {
        Self { executor }
    }

    #[must_use]
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.executor.is_authenticated()
    }

    // ==================== DFI ====================

    /// Most recent DFI entries.
    ///
    /// # Errors
    ///
    /// Any [`LabsError`] from the executor.
    pub async fn dfi_list(&self) -> Result<Value, LabsError> {
        self.json(&operations::dfi_list()).await
    }

    /// Details of a sample; with `attributes`, its attributes are fetched in a
    /// second request and added under the `attributes` key.
    ///
    /// # Errors
    ///
    /// Any [`LabsError`] from either request.
    #[instrument(skip(self))]
    pub async fn dfi_details(&self, sha256: &str, attributes: bool) -> Result<Value, LabsError> {
        let mut details = self.json(&operations::dfi_details(sha256)).await?;

        if attributes {
            let attrs = self.dfi_attributes(sha256, None).await?;
            match details.as_object_mut() {
                Some(map) => {
                    map.insert("attributes".to_string(), attrs);
                }
                None => debug!("details payload is not an object; attributes not attached"),
            }
        }

        Ok(details)
    }

    /// Attributes of a sample, optionally limited to one IOC kind.
    ///
    /// # Errors
    ///
    /// [`LabsError::InvalidInput`] for an unknown filter (before any request),
    /// or any executor error.
    #[instrument(skip(self))]
    pub async fn dfi_attributes(
        &self,
        sha256: &str,
        filter_by: Option<&str>,
    ) -> Result<Value, LabsError> {
        let filter = filter_by.map(validate::validate_attribute_filter).transpose()?;

        let attributes = self.json(&operations::dfi_attributes(sha256)).await?;

        Ok(match (filter, attributes) {
            (Some(filter), Value::Array(items)) => Value::Array(
                items
                    .into_iter()
                    .filter(|item| item.get("attribute").and_then(Value::as_str) == Some(filter.as_str()))
                    .collect(),
            ),
            (_, attributes) => attributes,
        })
    }

    /// Downloads a sample, verifies its SHA-256 and writes it to `path`.
    ///
    /// Nothing is written when verification fails. Returns the number of bytes
    /// written.
    ///
    /// # Errors
    ///
    /// [`LabsError::Integrity`] on hash mismatch, [`LabsError::Io`] when the
    /// file cannot be written, or any executor error.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn dfi_download(&self, sha256: &str, path: &Path) -> Result<usize, LabsError> {
        // Samples are small; the whole body is held in memory for verification.
        let data = self
            .executor
            .execute(&operations::dfi_download(sha256), true)
            .await?
            .into_bytes();

        validate::verify_download(sha256, &data)?;

        let partial = partial_path(path);
        if let Err(e) = tokio::fs::write(&partial, &data).await {
            debug!(path = %partial.display(), "cleaning up partial file after error");
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(LabsError::io(path, e));
        }
        if let Err(e) = tokio::fs::rename(&partial, path).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(LabsError::io(path, e));
        }
        debug!(bytes = data.len(), "sample written");
        Ok(data.len())
    }

    /// DFI search by category, subcategory and term.
    ///
    /// # Errors
    ///
    /// [`LabsError::InvalidInput`] for bad category/subcategory (before any
    /// request), or any executor error.
    pub async fn dfi_search(
        &self,
        category: &str,
        subcategory: &str,
        term: &str,
    ) -> Result<Value, LabsError> {
        let spec = operations::dfi_search(category, subcategory, term)?;
        self.json(&spec).await
    }

    /// YARA hunt rules feeding the DFI corpus.
    ///
    /// # Errors
    ///
    /// Any [`LabsError`] from the executor.
    pub async fn dfi_sources(&self) -> Result<Value, LabsError> {
        self.json(&operations::dfi_sources()).await
    }

    /// Uploads an Office document (OLE or OOXML) for inspection.
    ///
    /// # Errors
    ///
    /// [`LabsError::InvalidInput`] for a missing or unsupported file (before
    /// any request), or any executor error.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn dfi_upload(&self, path: &Path) -> Result<Value, LabsError> {
        let spec = operations::dfi_upload(path)?;
        self.json(&spec).await
    }

    // ==================== IOCDB / REPDB ====================

    /// Most recent IOC database entries.
    ///
    /// # Errors
    ///
    /// Any [`LabsError`] from the executor.
    pub async fn iocdb_list(&self) -> Result<Value, LabsError> {
        self.json(&operations::iocdb_list()).await
    }

    /// IOC database keyword search.
    ///
    /// # Errors
    ///
    /// Any [`LabsError`] from the executor.
    pub async fn iocdb_search(&self, keyword: &str) -> Result<Value, LabsError> {
        self.json(&operations::iocdb_search(keyword)).await
    }

    /// IOC database sources.
    ///
    /// # Errors
    ///
    /// Any [`LabsError`] from the executor.
    pub async fn iocdb_sources(&self) -> Result<Value, LabsError> {
        self.json(&operations::iocdb_sources()).await
    }

    /// Most recent reputation database entries.
    ///
    /// # Errors
    ///
    /// Any [`LabsError`] from the executor.
    pub async fn repdb_list(&self) -> Result<Value, LabsError> {
        self.json(&operations::repdb_list()).await
    }

    /// Reputation database keyword search.
    ///
    /// # Errors
    ///
    /// Any [`LabsError`] from the executor.
    pub async fn repdb_search(&self, keyword: &str) -> Result<Value, LabsError> {
        self.json(&operations::repdb_search(keyword)).await
    }

    /// Reputation database sources.
    ///
    /// # Errors
    ///
    /// Any [`LabsError`] from the executor.
    pub async fn repdb_sources(&self) -> Result<Value, LabsError> {
        self.json(&operations::repdb_sources()).await
    }

    /// Service statistics.
    ///
    /// # Errors
    ///
    /// Any [`LabsError`] from the executor.
    pub async fn stats(&self) -> Result<Value, LabsError> {
        self.json(&operations::stats()).await
    }

    // ==================== YARA ====================

    /// Converts a plain regex into its base64-matching form.
    ///
    /// # Errors
    ///
    /// Any [`LabsError`] from the executor.
    pub async fn yara_b64re(&self, regex: &str, endian: Option<Endian>) -> Result<String, LabsError> {
        self.text(&operations::yara_b64re(regex, endian)).await
    }

    /// Converts a hex string into a case-agnostic regex.
    ///
    /// # Errors
    ///
    /// Any [`LabsError`] from the executor.
    pub async fn yara_hexcase(&self, instring: &str) -> Result<String, LabsError> {
        self.text(&operations::yara_hexcase(instring)).await
    }

    /// Converts an ASCII regex into its wide-character form.
    ///
    /// # Errors
    ///
    /// Any [`LabsError`] from the executor.
    pub async fn yara_widere(&self, regex: &str, endian: Option<Endian>) -> Result<String, LabsError> {
        self.text(&operations::yara_widere(regex, endian)).await
    }

    /// Converts a magic string into a `uint()` condition at `offset`.
    ///
    /// # Errors
    ///
    /// [`LabsError::InvalidInput`] for a malformed offset, or any executor error.
    pub async fn yara_uint(&self, magic: &str, offset: &str, is_hex: bool) -> Result<String, LabsError> {
        let spec = operations::yara_uint(magic, offset, is_hex)?;
        self.text(&spec).await
    }

    // ==================== Hashing ====================

    /// MD5 hex digest of a file or buffer.
    ///
    /// # Errors
    ///
    /// See [`hash::digest`].
    pub fn md5(&self, input: HashInput<'_>) -> Result<String, LabsError> {
        Ok(hash::digest(input, HashAlgorithm::Md5)?.to_hex())
    }

    /// SHA-1 hex digest of a file or buffer.
    ///
    /// # Errors
    ///
    /// See [`hash::digest`].
    pub fn sha1(&self, input: HashInput<'_>) -> Result<String, LabsError> {
        Ok(hash::digest(input, HashAlgorithm::Sha1)?.to_hex())
    }

    /// SHA-256 hex digest of a file or buffer.
    ///
    /// # Errors
    ///
    /// See [`hash::digest`].
    pub fn sha256(&self, input: HashInput<'_>) -> Result<String, LabsError> {
        Ok(hash::digest(input, HashAlgorithm::Sha256)?.to_hex())
    }

    /// SHA-512 hex digest of a file or buffer.
    ///
    /// # Errors
    ///
    /// See [`hash::digest`].
    pub fn sha512(&self, input: HashInput<'_>) -> Result<String, LabsError> {
        Ok(hash::digest(input, HashAlgorithm::Sha512)?.to_hex())
    }

    async fn json(&self, spec: &crate::api::RequestSpec) -> Result<Value, LabsError> {
        Ok(self.executor.execute(spec, false).await?.into_json())
    }

    async fn text(&self, spec: &crate::api::RequestSpec) -> Result<String, LabsError> {
        Ok(match self.json(spec).await? {
            Value::String(text) => text,
            other => other.to_string(),
        })
    }
}

/// Sibling of `path` the sample is staged in before it is renamed into place.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}
