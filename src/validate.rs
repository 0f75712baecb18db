//! Input validation performed before any request is sent.
//!
//! - search category/subcategory whitelists
//! - attribute filter and YARA option checks
//! - upload magic-byte sniffing
//! - download integrity verification

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::LabsError;
use crate::hash::{HashAlgorithm, HashDigest, digest_bytes};

/// Search categories.
pub const VALID_CATEGORIES: [&str; 3] = ["ext", "hash", "ioc"];

/// Subcategories of `ext` (extracted content searches).
pub const VALID_EXT: [&str; 4] = ["code", "context", "metadata", "ocr"];

/// Subcategories of `hash`.
pub const VALID_HASH: [&str; 4] = ["md5", "sha1", "sha256", "sha512"];

/// Subcategories of `ioc`, also the valid attribute filters.
pub const VALID_IOC: [&str; 6] = ["domain", "email", "filename", "ip", "url", "xmpid"];

/// Extensions accepted for DFI upload.
pub const VALID_UPLOAD_TYPES: [&str; 6] = ["doc", "docx", "ppt", "pptx", "xls", "xlsx"];

/// Leading bytes of an OLE compound document (pre-2007 Office).
pub const OLE_MAGIC: [u8; 2] = [0xD0, 0xCF];

/// Leading bytes of a zip archive (Office Open XML).
pub const ZIP_MAGIC: [u8; 2] = *b"PK";

/// A DFI search category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchCategory {
    Ext,
    Hash,
    Ioc,
}

impl SearchCategory {
    pub const ALL: [Self; 3] = [Self::Ext, Self::Hash, Self::Ioc];

    /// Parses a category name case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`LabsError::InvalidInput`] naming the valid categories.
    pub fn parse(name: &str) -> Result<Self, LabsError> {
        let normalized = name.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or_else(|| {
                LabsError::invalid_input(format!(
                    "invalid category '{normalized}'. valid categories include: {}",
                    VALID_CATEGORIES.join(", ")
                ))
            })
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ext => "ext",
            Self::Hash => "hash",
            Self::Ioc => "ioc",
        }
    }

    /// Subcategories valid under this category.
    #[must_use]
    pub fn subcategories(self) -> &'static [&'static str] {
        match self {
            Self::Ext => &VALID_EXT,
            Self::Hash => &VALID_HASH,
            Self::Ioc => &VALID_IOC,
        }
    }

    /// Finds the category a subcategory belongs to. Subcategory names are
    /// unique across categories.
    #[must_use]
    pub fn for_subcategory(subcategory: &str) -> Option<Self> {
        let normalized = subcategory.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.subcategories().contains(&normalized.as_str()))
    }
}

impl fmt::Display for SearchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated, lowercased category/subcategory pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTarget {
    pub category: SearchCategory,
    pub subcategory: String,
}

/// Validates a search category and subcategory (case-insensitive).
///
/// # Errors
///
/// Returns [`LabsError::InvalidInput`] naming the valid categories or the
/// valid subcategories of the given category.
pub fn validate_search(category: &str, subcategory: &str) -> Result<SearchTarget, LabsError> {
    let category = SearchCategory::parse(category)?;
    let subcategory = subcategory.to_lowercase();
    if !category.subcategories().contains(&subcategory.as_str()) {
        return Err(LabsError::invalid_input(format!(
            "invalid subcategory '{subcategory}' for category '{category}'. valid subcategories include: {}",
            category.subcategories().join(", ")
        )));
    }
    Ok(SearchTarget {
        category,
        subcategory,
    })
}

/// Validates an attribute filter and returns it lowercased.
///
/// # Errors
///
/// Returns [`LabsError::InvalidInput`] naming the valid filters.
pub fn validate_attribute_filter(filter: &str) -> Result<String, LabsError> {
    let normalized = filter.to_lowercase();
    if VALID_IOC.contains(&normalized.as_str()) {
        Ok(normalized)
    } else {
        Err(LabsError::invalid_input(format!(
            "invalid attribute filter '{normalized}'. valid filters include: {}",
            VALID_IOC.join(", ")
        )))
    }
}

/// Byte order option of the YARA widening transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

impl Endian {
    /// Parses `big` or `little`, any case.
    ///
    /// # Errors
    ///
    /// Returns [`LabsError::InvalidInput`] for anything else.
    pub fn parse(name: &str) -> Result<Self, LabsError> {
        match name.to_uppercase().as_str() {
            "BIG" => Ok(Self::Big),
            "LITTLE" => Ok(Self::Little),
            other => Err(LabsError::invalid_input(format!(
                "invalid endianess '{other}'. valid values include: BIG, LITTLE"
            ))),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Big => "BIG",
            Self::Little => "LITTLE",
        }
    }
}

/// Validates a YARA `uint` offset, given in decimal (`222`) or hex (`0xde`).
///
/// # Errors
///
/// Returns [`LabsError::InvalidInput`] when the text is neither.
pub fn validate_offset(offset: &str) -> Result<u64, LabsError> {
    let trimmed = offset.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed.map_err(|_| {
        LabsError::invalid_input(format!(
            "invalid offset '{offset}'. expected decimal (222) or hex (0xde)"
        ))
    })
}

/// Checks that `path` is a regular file starting with OLE or zip magic bytes.
///
/// The existence check happens before the file is opened.
///
/// # Errors
///
/// - [`LabsError::InvalidInput`] for a missing path, a non-file path or an
///   unsupported file type.
/// - [`LabsError::Io`] when the file cannot be read.
pub fn sniff_upload(path: &Path) -> Result<(), LabsError> {
    if !path.is_file() {
        return Err(LabsError::invalid_input(format!(
            "invalid file path specified for upload: {}",
            path.display()
        )));
    }

    let mut magic = Vec::with_capacity(2);
    File::open(path)
        .and_then(|file| file.take(2).read_to_end(&mut magic))
        .map_err(|e| LabsError::io(path, e))?;

    if magic == OLE_MAGIC || magic == ZIP_MAGIC {
        Ok(())
    } else {
        Err(LabsError::invalid_input(format!(
            "unsupported file type for upload, valid files include: {}",
            VALID_UPLOAD_TYPES.join(", ")
        )))
    }
}

/// Recomputes the SHA-256 of downloaded bytes and compares it with the
/// requested hash (case-insensitive).
///
/// # Errors
///
/// Returns [`LabsError::Integrity`] with both hashes on mismatch.
pub fn verify_download(expected_sha256: &str, bytes: &[u8]) -> Result<HashDigest, LabsError> {
    let calculated = digest_bytes(bytes, HashAlgorithm::Sha256);
    if calculated.to_hex().eq_ignore_ascii_case(expected_sha256.trim()) {
        Ok(calculated)
    } else {
        Err(LabsError::integrity(expected_sha256, calculated.to_hex()))
    }
}
