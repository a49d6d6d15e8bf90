//! Data model for scraped news segments.
//!
//! Every pipeline stage reads and writes flat JSON arrays of [`NewsRecord`].
//! A record starts life in the scraper, is filtered and annotated by the
//! cleaner, and has its text fields replaced by the translator. Fields that
//! are absent in the JSON deserialize to empty strings so that the cleaning
//! passes can treat "missing" and "empty" uniformly.
//!
//! The record's identity for deduplication purposes is `audio_link`: NPR
//! serves exactly one downloadable audio file per segment, so the link is
//! unique across the archive.

use serde::{Deserialize, Serialize};

/// Field names that must be present and non-empty for a record to count
/// as complete.
pub const REQUIRED_FIELDS: [&str; 5] =
    ["date", "formatted_date", "summary", "content", "audio_link"];

/// Default field set re-checked by the cleaner's missing-field annotation
/// pass. Note this deliberately differs from [`REQUIRED_FIELDS`]: the
/// annotation pass never looks at `formatted_date`, and the set is
/// overridable through configuration (`MISSING_FIELD_CHECK`).
pub const DEFAULT_MISSING_FIELD_CHECK: [&str; 4] =
    ["date", "summary", "content", "audio_link"];

/// One radio-news segment.
///
/// * `date` - The human-readable publication date as shown on the page,
///   e.g. `"August 7, 2023"`.
/// * `formatted_date` - The same date normalized to `YYYYMMDD`.
/// * `summary` - The first story paragraph.
/// * `content` - The full segment transcript.
/// * `audio_link` - URL of the downloadable MP3; the record's identity key.
/// * `missing_fields` - Filled in by the cleaner when a record survives the
///   pipeline with fields still absent; omitted from the JSON otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsRecord {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub formatted_date: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub audio_link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_fields: Option<Vec<String>>,
}

impl NewsRecord {
    /// Look up a field's value by name.
    ///
    /// Returns `None` for names that don't map to any record attribute.
    /// The missing-field check set is configuration, so an unknown name is
    /// not an error here; a field that doesn't exist is simply never
    /// present.
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "date" => Some(&self.date),
            "formatted_date" => Some(&self.formatted_date),
            "summary" => Some(&self.summary),
            "content" => Some(&self.content),
            "audio_link" => Some(&self.audio_link),
            _ => None,
        }
    }

    /// True when the named field exists and is non-empty.
    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some_and(|v| !v.is_empty())
    }

    /// The year-month prefix (`YYYYMM`) of `formatted_date`, used to route
    /// records into monthly archive files.
    pub fn month_key(&self) -> Option<&str> {
        if self.formatted_date.len() >= 6 && self.formatted_date.is_ascii() {
            Some(&self.formatted_date[..6])
        } else {
            None
        }
    }
}
