//! Request builders, one per remote operation.
//!
//! Each builder validates its inputs and returns the [`RequestSpec`] the
//! client hands to the executor. Nothing here touches the network, so request
//! shapes can be checked directly.

use std::path::Path;

use super::request::RequestSpec;
use crate::error::LabsError;
use crate::validate::{self, Endian, SearchCategory};

pub fn dfi_list() -> RequestSpec {
    RequestSpec::get("/dfi/list")
}

pub fn dfi_details(sha256: &str) -> RequestSpec {
    RequestSpec::get("/dfi/details").field("sha256", sha256)
}

pub fn dfi_attributes(sha256: &str) -> RequestSpec {
    RequestSpec::get("/dfi/details/attributes").field("sha256", sha256)
}

pub fn dfi_download(sha256: &str) -> RequestSpec {
    RequestSpec::get("/dfi/download").field("sha256", sha256)
}

/// Builds a DFI search.
///
/// Hash searches send the term as `hash`, every other category as `keyword`.
/// Extracted-content subcategories are addressed as `ext_<name>`.
///
/// # Errors
///
/// Returns [`LabsError::InvalidInput`] for an unknown category or a
/// subcategory that does not belong to it.
pub fn dfi_search(category: &str, subcategory: &str, term: &str) -> Result<RequestSpec, LabsError> {
    let target = validate::validate_search(category, subcategory)?;

    let path_subcategory = match target.category {
        SearchCategory::Ext => format!("ext_{}", target.subcategory),
        SearchCategory::Hash | SearchCategory::Ioc => target.subcategory.clone(),
    };
    let field = match target.category {
        SearchCategory::Hash => "hash",
        SearchCategory::Ext | SearchCategory::Ioc => "keyword",
    };

    Ok(
        RequestSpec::get(format!("/dfi/search/{}/{path_subcategory}", target.category))
            .field(field, term),
    )
}

pub fn dfi_sources() -> RequestSpec {
    RequestSpec::get("/dfi/sources")
}

/// Builds a DFI upload after sniffing the file type.
///
/// # Errors
///
/// See [`validate::sniff_upload`].
pub fn dfi_upload(path: &Path) -> Result<RequestSpec, LabsError> {
    validate::sniff_upload(path)?;
    Ok(RequestSpec::post("/dfi/upload").attach_file("file", path))
}

pub fn iocdb_list() -> RequestSpec {
    RequestSpec::get("/iocdb/list")
}

pub fn iocdb_search(keyword: &str) -> RequestSpec {
    RequestSpec::get("/iocdb/search").field("keyword", keyword)
}

pub fn iocdb_sources() -> RequestSpec {
    RequestSpec::get("/iocdb/sources")
}

pub fn repdb_list() -> RequestSpec {
    RequestSpec::get("/repdb/list")
}

pub fn repdb_search(keyword: &str) -> RequestSpec {
    RequestSpec::get("/repdb/search").field("keyword", keyword)
}

pub fn repdb_sources() -> RequestSpec {
    RequestSpec::get("/repdb/sources")
}

pub fn stats() -> RequestSpec {
    RequestSpec::get("/stats")
}

/// Plain-text regex to base64-matching regex.
pub fn yara_b64re(regex: &str, endian: Option<Endian>) -> RequestSpec {
    let spec = RequestSpec::get("/yara/base64re").field("instring", regex);
    match endian {
        Some(Endian::Big) => spec.field("option", "widen_big"),
        Some(Endian::Little) => spec.field("option", "widen_little"),
        None => spec,
    }
}

/// Hex string to a mixed-case-agnostic regex.
pub fn yara_hexcase(instring: &str) -> RequestSpec {
    RequestSpec::get("/yara/mixcase").field("instring", instring)
}

/// ASCII regex to its wide-character form.
pub fn yara_widere(regex: &str, endian: Option<Endian>) -> RequestSpec {
    let spec = RequestSpec::get("/yara/widere").field("instring", regex);
    match endian {
        Some(endian) => spec.field("kind", endian.as_str()),
        None => spec,
    }
}

/// String comparison to a `uint()` condition at `offset`.
///
/// The offset is sent as given once it validates as decimal or `0x` hex.
///
/// # Errors
///
/// See [`validate::validate_offset`].
pub fn yara_uint(magic: &str, offset: &str, is_hex: bool) -> Result<RequestSpec, LabsError> {
    validate::validate_offset(offset)?;
    Ok(RequestSpec::get("/yara/trigger")
        .field("trigger", magic)
        .field("offset", offset.trim())
        .field("is_hex", is_hex))
}
