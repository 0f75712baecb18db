//! Cryptographic digests of files and in-memory buffers.
//!
//! Files are folded into the hash in [`BLOCK_SIZE`] blocks so memory stays
//! bounded regardless of file size. Buffers are folded in a single call.
//!
//! # Example
//!
//! ```
//! use inquestlabs_core::hash::{HashAlgorithm, digest_bytes};
//!
//! let digest = digest_bytes(b"abc", HashAlgorithm::Md5);
//! assert_eq!(digest.to_hex(), "900150983cd24fb0d6963f7d28e17f72");
//! ```

use std::fmt;
use std::fs::File;
use std::io::{ErrorKind as IoErrorKind, Read};
use std::path::Path;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use crate::error::LabsError;

/// Size of each block read from disk while hashing a file (16 KiB).
pub const BLOCK_SIZE: usize = 16 * 1024;

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// MD5 (16 bytes).
    Md5,
    /// SHA-1 (20 bytes).
    Sha1,
    /// SHA-256 (32 bytes).
    Sha256,
    /// SHA-512 (64 bytes).
    Sha512,
}

impl HashAlgorithm {
    /// Every supported algorithm, in the order the API lists them.
    pub const ALL: [Self; 4] = [Self::Md5, Self::Sha1, Self::Sha256, Self::Sha512];

    /// Returns the lowercase algorithm name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Returns the digest length in bytes.
    #[must_use]
    pub fn digest_length(self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha512 => 64,
        }
    }

    /// Parses an algorithm name case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`LabsError::InvalidInput`] for unknown names.
    pub fn parse(name: &str) -> Result<Self, LabsError> {
        let normalized = name.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|algorithm| algorithm.as_str() == normalized)
            .ok_or_else(|| {
                LabsError::invalid_input(format!(
                    "unsupported hash algorithm '{normalized}'. valid algorithms include: md5, sha1, sha256, sha512"
                ))
            })
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Incremental hash state, the "raw" output of [`hash`].
///
/// Can be fed more data and finalized later.
#[derive(Clone)]
pub enum HashState {
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
    Sha512(Sha512),
}

impl HashState {
    /// Creates an empty state for the algorithm.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Md5 => Self::Md5(Md5::new()),
            HashAlgorithm::Sha1 => Self::Sha1(Sha1::new()),
            HashAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            HashAlgorithm::Sha512 => Self::Sha512(Sha512::new()),
        }
    }

    /// Returns the algorithm of this state.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        match self {
            Self::Md5(_) => HashAlgorithm::Md5,
            Self::Sha1(_) => HashAlgorithm::Sha1,
            Self::Sha256(_) => HashAlgorithm::Sha256,
            Self::Sha512(_) => HashAlgorithm::Sha512,
        }
    }

    /// Folds more data into the state.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(h) => h.update(data),
            Self::Sha1(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
        }
    }

    /// Consumes the state and returns the digest.
    #[must_use]
    pub fn finalize(self) -> HashDigest {
        let algorithm = self.algorithm();
        let bytes = match self {
            Self::Md5(h) => h.finalize().to_vec(),
            Self::Sha1(h) => h.finalize().to_vec(),
            Self::Sha256(h) => h.finalize().to_vec(),
            Self::Sha512(h) => h.finalize().to_vec(),
        };
        HashDigest { algorithm, bytes }
    }
}

impl fmt::Debug for HashState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashState")
            .field("algorithm", &self.algorithm())
            .finish_non_exhaustive()
    }
}

/// A finished digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashDigest {
    algorithm: HashAlgorithm,
    bytes: Vec<u8>,
}

impl HashDigest {
    /// Algorithm that produced this digest.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lowercase hex rendering.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// The hex digest split into 8-character groups, each read as a
    /// hexadecimal integer.
    ///
    /// Every 8 hex characters are exactly 4 digest bytes, so the groups are
    /// read straight from the bytes in big-endian order.
    #[must_use]
    pub fn parts(&self) -> Vec<u32> {
        self.bytes
            .chunks(4)
            .map(|chunk| chunk.iter().fold(0u32, |acc, byte| (acc << 8) | u32::from(*byte)))
            .collect()
    }
}

impl fmt::Display for HashDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// What to hash: a file path or a byte buffer.
///
/// Both are optional so callers forwarding user input can pass what they
/// have; [`hash`] rejects the empty case. When both are set the path wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashInput<'a> {
    pub path: Option<&'a Path>,
    pub bytes: Option<&'a [u8]>,
}

impl<'a> HashInput<'a> {
    /// Hash the file at `path`.
    #[must_use]
    pub fn path(path: &'a Path) -> Self {
        Self {
            path: Some(path),
            bytes: None,
        }
    }

    /// Hash an in-memory buffer.
    #[must_use]
    pub fn bytes(bytes: &'a [u8]) -> Self {
        Self {
            path: None,
            bytes: Some(bytes),
        }
    }
}

/// Requested shape of a [`hash`] result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Lowercase hex string.
    #[default]
    Digest,
    /// The unfinalized [`HashState`].
    Raw,
    /// See [`HashDigest::parts`].
    Parts,
}

/// Result of [`hash`], shaped by [`OutputFormat`].
#[derive(Debug, Clone)]
pub enum HashOutput {
    Digest(String),
    Raw(HashState),
    Parts(Vec<u32>),
}

/// Hashes a file or buffer and returns the requested output format.
///
/// # Errors
///
/// - [`LabsError::InvalidInput`] when neither a path nor bytes are supplied.
/// - [`LabsError::Io`] when the file cannot be opened or read.
pub fn hash(
    input: HashInput<'_>,
    algorithm: HashAlgorithm,
    format: OutputFormat,
) -> Result<HashOutput, LabsError> {
    let state = fold_input(input, algorithm)?;
    Ok(match format {
        OutputFormat::Raw => HashOutput::Raw(state),
        OutputFormat::Parts => HashOutput::Parts(state.finalize().parts()),
        OutputFormat::Digest => HashOutput::Digest(state.finalize().to_hex()),
    })
}

/// Hashes a file or buffer into a finished digest.
///
/// # Errors
///
/// Same as [`hash`].
pub fn digest(input: HashInput<'_>, algorithm: HashAlgorithm) -> Result<HashDigest, LabsError> {
    Ok(fold_input(input, algorithm)?.finalize())
}

/// Hashes a byte buffer.
#[must_use]
pub fn digest_bytes(bytes: &[u8], algorithm: HashAlgorithm) -> HashDigest {
    let mut state = HashState::new(algorithm);
    state.update(bytes);
    state.finalize()
}

/// Hashes the file at `path` in [`BLOCK_SIZE`] blocks.
///
/// # Errors
///
/// Returns [`LabsError::Io`] when the file cannot be opened or read.
pub fn digest_file(path: &Path, algorithm: HashAlgorithm) -> Result<HashDigest, LabsError> {
    let mut state = HashState::new(algorithm);
    fold_file(path, &mut state)?;
    Ok(state.finalize())
}

fn fold_input(input: HashInput<'_>, algorithm: HashAlgorithm) -> Result<HashState, LabsError> {
    let mut state = HashState::new(algorithm);
    match input {
        HashInput {
            path: Some(path), ..
        } => fold_file(path, &mut state)?,
        HashInput {
            bytes: Some(bytes),
            ..
        } => state.update(bytes),
        HashInput {
            path: None,
            bytes: None,
        } => {
            return Err(LabsError::invalid_input(
                "hash expects either 'path' or 'bytes'.",
            ));
        }
    }
    Ok(state)
}

fn fold_file(path: &Path, state: &mut HashState) -> Result<(), LabsError> {
    let mut file = File::open(path).map_err(|e| LabsError::io(path, e))?;
    let mut block = vec![0u8; BLOCK_SIZE];
    loop {
        let read = match file.read(&mut block) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == IoErrorKind::Interrupted => continue,
            Err(e) => return Err(LabsError::io(path, e)),
        };
        state.update(&block[..read]);
    }
    Ok(())
}
