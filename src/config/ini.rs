//! Minimal INI parser for the API key file.
//!
//! Accepts the usual key file syntax:
//! `[section]` headers, `key = value` or `key: value` pairs, full-line `#`
//! and `;` comments, and blank lines. Keys are case-insensitive, section
//! names are not. Lines indented deeper than the key that precedes them
//! continue its value.

use std::collections::BTreeMap;

/// Parsed INI document: section name → (lowercased key → value).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

/// Syntax error with the 1-based line it was found on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IniError {
    pub line: usize,
    pub reason: &'static str,
}

impl IniDocument {
    /// Looks up `key` under `section`.
    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)?
            .get(&key.to_lowercase())
            .map(String::as_str)
    }

    /// Returns true when the section header was present.
    #[must_use]
    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }
}

/// Parses INI text.
///
/// # Errors
///
/// Returns [`IniError`] for a key/value pair outside any section, a line that
/// is neither a header nor a pair, an unterminated header, or a duplicate
/// section or key.
pub fn parse(raw: &str) -> Result<IniDocument, IniError> {
    let mut doc = IniDocument::default();
    let mut current: Option<String> = None;
    let mut last_key: Option<String> = None;
    let mut last_key_indent = 0;

    for (index, raw_line) in raw.lines().enumerate() {
        let line_no = index + 1;
        let trimmed = raw_line.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        let indent = raw_line.len() - raw_line.trim_start().len();

        // Continuation of a multi-line value.
        if indent > last_key_indent
            && let (Some(section), Some(key)) = (current.as_ref(), last_key.as_ref())
            && let Some(value) = doc
                .sections
                .get_mut(section)
                .and_then(|entries| entries.get_mut(key))
        {
            if !value.is_empty() {
                value.push('\n');
            }
            value.push_str(trimmed);
            continue;
        }

        if let Some(header) = trimmed.strip_prefix('[') {
            let Some(name) = header.strip_suffix(']') else {
                return Err(IniError {
                    line: line_no,
                    reason: "unterminated section header",
                });
            };
            let name = name.trim().to_string();
            if doc.sections.contains_key(&name) {
                return Err(IniError {
                    line: line_no,
                    reason: "duplicate section",
                });
            }
            doc.sections.insert(name.clone(), BTreeMap::new());
            current = Some(name);
            last_key = None;
            continue;
        }

        let Some(split_at) = trimmed.find(['=', ':']) else {
            return Err(IniError {
                line: line_no,
                reason: "expected key = value",
            });
        };
        let key = trimmed[..split_at].trim().to_lowercase();
        let value = trimmed[split_at + 1..].trim().to_string();
        if key.is_empty() {
            return Err(IniError {
                line: line_no,
                reason: "empty key",
            });
        }

        let Some(section) = current.as_ref() else {
            return Err(IniError {
                line: line_no,
                reason: "key outside of any section",
            });
        };
        let entries = doc.sections.entry(section.clone()).or_default();
        if entries.contains_key(&key) {
            return Err(IniError {
                line: line_no,
                reason: "duplicate key",
            });
        }
        entries.insert(key.clone(), value);
        last_key = Some(key);
        last_key_indent = indent;
    }

    Ok(doc)
}
