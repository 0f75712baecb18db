//! Request shapes built by the operation layer and consumed by the executor.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::LabsError;

/// HTTP methods the API accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    /// Parses a method name. Only `GET` and `POST` (any case) are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`LabsError::InvalidInput`] for any other method.
    pub fn parse(name: &str) -> Result<Self, LabsError> {
        match name.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            _ => Err(LabsError::invalid_input(format!(
                "invalid method '{name}'. valid methods include: GET, POST"
            ))),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single form field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    Int(i64),
    Bool(bool),
}

impl FormValue {
    /// Renders the value as sent on the wire.
    ///
    /// Booleans render as `True`/`False`, the spelling the API expects.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Int(value) => value.to_string(),
            Self::Bool(true) => "True".to_string(),
            Self::Bool(false) => "False".to_string(),
        }
    }
}

impl From<&str> for FormValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FormValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FormValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for FormValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// A file sent as a multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    /// Multipart field name.
    pub field: String,
    /// File to read immediately before sending.
    pub path: PathBuf,
}

/// One API call: endpoint suffix, method, form fields and optional file.
///
/// A spec carrying a file attachment is always POST; [`RequestSpec::attach_file`]
/// switches the method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    endpoint: String,
    method: Method,
    form_fields: Vec<(String, FormValue)>,
    file_attachment: Option<FileAttachment>,
}

impl RequestSpec {
    /// Creates a GET request for `endpoint` (appended to the base URL).
    #[must_use]
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::with_method(endpoint, Method::Get)
    }

    /// Creates a POST request for `endpoint`.
    #[must_use]
    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::with_method(endpoint, Method::Post)
    }

    /// Creates a request from a method name.
    ///
    /// # Errors
    ///
    /// Returns [`LabsError::InvalidInput`] when the method is not GET or POST.
    pub fn new(endpoint: impl Into<String>, method: &str) -> Result<Self, LabsError> {
        Ok(Self::with_method(endpoint, Method::parse(method)?))
    }

    fn with_method(endpoint: impl Into<String>, method: Method) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            form_fields: Vec::new(),
            file_attachment: None,
        }
    }

    /// Appends a form field. Field order is preserved on the wire.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<FormValue>) -> Self {
        self.form_fields.push((name.into(), value.into()));
        self
    }

    /// Attaches a file and forces the method to POST.
    #[must_use]
    pub fn attach_file(mut self, field: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.method = Method::Post;
        self.file_attachment = Some(FileAttachment {
            field: field.into(),
            path: path.into(),
        });
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    #[must_use]
    pub fn form_fields(&self) -> &[(String, FormValue)] {
        &self.form_fields
    }

    /// Looks up the first field named `name`.
    #[must_use]
    pub fn form_field(&self, name: &str) -> Option<&FormValue> {
        self.form_fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    #[must_use]
    pub fn file_attachment(&self) -> Option<&FileAttachment> {
        self.file_attachment.as_ref()
    }

    /// Path of the attached file, if any.
    #[must_use]
    pub fn file_path(&self) -> Option<&Path> {
        self.file_attachment.as_ref().map(|a| a.path.as_path())
    }

    /// Form fields rendered to wire strings.
    #[must_use]
    pub fn rendered_fields(&self) -> Vec<(String, String)> {
        self.form_fields
            .iter()
            .map(|(name, value)| (name.clone(), value.render()))
            .collect()
    }
}
