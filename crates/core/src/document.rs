use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Row identifier assigned by the relational store.
pub type DocumentId = i64;

/// Format of the `upload_date` column. Fixed width so lexical order is time order.
pub const UPLOAD_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Separator that replaces whitespace runs in a normalized document type.
pub const TYPE_SEPARATOR: char = '_';

/// Normalized document-type key ("Drivers  License" -> "drivers_license").
///
/// Only constructible through [`DocumentType::parse`] (deserialization included),
/// so every value held by the registry is already trimmed, lowercased and
/// non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentType(String);

impl DocumentType {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let sep = TYPE_SEPARATOR.to_string();
        let normalized = raw
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(&sep)
            .to_lowercase();
        if normalized.is_empty() {
            return Err(CoreError::EmptyDocumentType);
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable label: `radio_permit` -> `Radio Permit`.
    pub fn display_label(&self) -> String {
        self.0
            .split(TYPE_SEPARATOR)
            .filter(|w| !w.is_empty())
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl TryFrom<String> for DocumentType {
    type Error = CoreError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<DocumentType> for String {
    fn from(t: DocumentType) -> Self {
        t.0
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// A stored document: the current file for one document type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub document_type: DocumentType,
    /// Path relative to the application root, always inside the upload dir.
    pub file_path: String,
    pub original_filename: String,
    pub upload_timestamp: DateTime<Utc>,
}

impl DocumentRecord {
    pub fn display_label(&self) -> String {
        self.document_type.display_label()
    }

    /// Timestamp in the persisted `upload_date` column format.
    pub fn upload_date(&self) -> String {
        format_upload_date(&self.upload_timestamp)
    }
}

/// Ordering for the two read-only projections of the record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListOrder {
    /// By type ascending, newest upload first within a type.
    #[default]
    Catalog,
    /// Newest upload first.
    History,
}

pub fn format_upload_date(ts: &DateTime<Utc>) -> String {
    ts.format(UPLOAD_DATE_FORMAT).to_string()
}

pub fn parse_upload_date(raw: &str) -> Result<DateTime<Utc>, CoreError> {
    NaiveDateTime::parse_from_str(raw, UPLOAD_DATE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| CoreError::InvalidRecord(format!("bad upload_date '{raw}': {e}")))
}

/// Last path component of an uploader-supplied filename.
///
/// Both separators are honored since browsers on Windows send full paths.
pub fn file_basename(name: &str) -> &str {
    name.rsplit(&['/', '\\'][..]).next().unwrap_or(name)
}

/// Substring after the last `.` of the basename, if any.
pub fn file_extension(name: &str) -> Option<&str> {
    let base = file_basename(name);
    base.rfind('.').map(|idx| &base[idx + 1..]).filter(|ext| !ext.is_empty())
}
