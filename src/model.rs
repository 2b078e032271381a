//! Canonical data model handed to the host application.
//!
//! Every source produces these shapes regardless of how its site lays out markup.

use serde::{Deserialize, Serialize};

/// Publication status of a work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkStatus {
    #[default]
    Unknown,
    Ongoing,
    Completed,
    Cancelled,
}

/// Full metadata for one work, built from a details page.
///
/// Fields that could not be found are empty (or [`WorkStatus::Unknown`]); a work is
/// never rejected because one field is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Work {
    /// Site-relative path, e.g. `/book/shadow-slave`.
    pub url: String,
    pub title: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    pub genres: Vec<String>,
    pub status: WorkStatus,
    pub description: String,
    /// Absolute URL, or empty when the page has no cover.
    pub thumbnail_url: String,
}

/// Partial work as it appears in listing and search results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkEntry {
    pub url: String,
    pub title: String,
    pub thumbnail_url: String,
}

/// One page of listing or search results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPage {
    pub entries: Vec<WorkEntry>,
    pub has_next_page: bool,
}

/// One chapter of a work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    /// Site-relative path of the chapter page.
    pub url: String,
    pub name: String,
    /// Upload time in epoch milliseconds (UTC). `0` means unknown.
    pub date_upload: i64,
    /// 1-based position in oldest-first order. `0` until the list is ordered.
    pub index: u32,
}

/// Sanitized chapter body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterContent {
    pub url: String,
    pub html: String,
}
