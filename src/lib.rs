//! InQuest Labs Core Library
//!
//! Client for the InQuest Labs threat-intelligence API: deep file inspection
//! (DFI), the IOC and reputation databases, and the YARA helper utilities.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`api`] - Request construction, retrying executor, response classification
//! - [`client`] - [`LabsClient`], one method per remote operation
//! - [`config`] - Client configuration and the INI key file format
//! - [`credentials`] - API key resolution (explicit, environment, config file)
//! - [`hash`] - Streaming MD5/SHA-1/SHA-256/SHA-512 over files or buffers
//! - [`validate`] - Local input checks that run before any network call
//! - [`error`] - Error taxonomy shared by all of the above

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod hash;
pub mod validate;

// Re-export commonly used types
pub use api::{ApiPayload, BackoffPolicy, Executor, RequestSpec, RetryDecision};
pub use client::LabsClient;
pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_RETRY_BUDGET};
pub use error::{ErrorKind, LabsError};
pub use hash::{HashAlgorithm, HashDigest, HashInput, OutputFormat};
pub use validate::{Endian, SearchCategory};
