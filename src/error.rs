//! Error types shared by every InQuest Labs operation.
//!
//! All failures surface as a single [`LabsError`]. The variant carries the
//! context needed for a useful message (endpoint, status, path), and
//! [`LabsError::kind`] collapses it into the coarse [`ErrorKind`] callers
//! branch on.

use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification of a [`LabsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller error: bad method, enum value, upload type or missing input.
    InvalidInput,
    /// Configuration file could not be used.
    Config,
    /// Every attempt hit a transport failure.
    ExhaustedRetries,
    /// HTTP 200 with `success: false` in the envelope.
    ApiLevel,
    /// Any non-200 HTTP status.
    HttpLevel,
    /// Downloaded content did not hash to the requested value.
    Integrity,
    /// Local file system failure.
    Io,
    /// The request could not be built or sent at all.
    Request,
    /// A 200 response body was not a valid envelope.
    Decode,
}

/// Errors returned by the client, the executor and the validators.
#[derive(Debug, Error)]
pub enum LabsError {
    /// Input rejected before any network activity.
    #[error("{message}")]
    InvalidInput {
        /// Human-readable reason, naming the accepted values where relevant.
        message: String,
    },

    /// Config file unparseable or missing the API key.
    #[error("{message}")]
    Config {
        /// Human-readable reason including the file path.
        message: String,
    },

    /// Transport failures on every attempt of the retry budget.
    #[error("exceeded {attempts} attempts to communicate with InQuest Labs API endpoint {endpoint}: {last_error}")]
    ExhaustedRetries {
        /// Full endpoint URL.
        endpoint: String,
        /// Number of attempts made.
        attempts: u32,
        /// Message of the final transport failure.
        last_error: String,
    },

    /// The API answered 200 but reported failure in its envelope.
    #[error("status=200 but error communicating with {endpoint}: {message}")]
    ApiLevel {
        /// Full endpoint URL.
        endpoint: String,
        /// Envelope `error` field, or `n/a`.
        message: String,
    },

    /// The API answered with a non-200 status.
    #[error("status={status} error communicating with {endpoint}: {message}")]
    HttpLevel {
        /// HTTP status code.
        status: u16,
        /// Full endpoint URL.
        endpoint: String,
        /// Envelope `error` field, or `n/a`.
        message: String,
    },

    /// Downloaded bytes did not match the requested SHA-256.
    #[error("failed downloading file! expected sha256={expected} calculated sha256={calculated}")]
    Integrity {
        /// Hash the caller asked for.
        expected: String,
        /// Hash of the bytes actually received.
        calculated: String,
    },

    /// File system error (read for hashing/upload, write for download).
    #[error("IO error on {}: {source}", path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The request could not be constructed; never retried.
    #[error("unable to build request for {endpoint}: {message}")]
    Request {
        /// Endpoint URL or suffix being requested.
        endpoint: String,
        /// Reason the request could not be built.
        message: String,
    },

    /// Status 200 but the body was not a JSON envelope.
    #[error("invalid JSON response from {endpoint}: {source}")]
    Decode {
        /// Full endpoint URL.
        endpoint: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl LabsError {
    /// Creates an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an exhausted-retries error.
    pub fn exhausted_retries(
        endpoint: impl Into<String>,
        attempts: u32,
        last_error: impl Into<String>,
    ) -> Self {
        Self::ExhaustedRetries {
            endpoint: endpoint.into(),
            attempts,
            last_error: last_error.into(),
        }
    }

    /// Creates an API-level (envelope) error.
    pub fn api_level(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ApiLevel {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Creates an HTTP-level (status) error.
    pub fn http_level(status: u16, endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HttpLevel {
            status,
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Creates an integrity mismatch error.
    pub fn integrity(expected: impl Into<String>, calculated: impl Into<String>) -> Self {
        Self::Integrity {
            expected: expected.into(),
            calculated: calculated.into(),
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a request construction error.
    pub fn request(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Request {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Creates an envelope decode error.
    pub fn decode(endpoint: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            endpoint: endpoint.into(),
            source,
        }
    }

    /// Returns the coarse kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Config { .. } => ErrorKind::Config,
            Self::ExhaustedRetries { .. } => ErrorKind::ExhaustedRetries,
            Self::ApiLevel { .. } => ErrorKind::ApiLevel,
            Self::HttpLevel { .. } => ErrorKind::HttpLevel,
            Self::Integrity { .. } => ErrorKind::Integrity,
            Self::Io { .. } => ErrorKind::Io,
            Self::Request { .. } => ErrorKind::Request,
            Self::Decode { .. } => ErrorKind::Decode,
        }
    }
}

// No `From<std::io::Error>` or `From<reqwest::Error>`: every variant needs
// context (path, endpoint) the source error doesn't carry.
