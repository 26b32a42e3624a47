//! Content items handed over by the external item source.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A short government-related text item (feed entry, register notice, report).
///
/// Produced by an external fetcher and never modified afterwards. Items flagged
/// with `is_error` or `is_warning` are placeholders for failed or degraded
/// fetches and are excluded from matching and from evidence coverage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default, alias = "pubDate")]
    pub published: Option<DateTime<Utc>>,
    /// Agency or source string, e.g. "Government Accountability Office".
    #[serde(default)]
    pub agency: Option<String>,
    /// Declared structural type, e.g. "Presidential Document" or "Rule".
    #[serde(default, alias = "type")]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub is_warning: bool,
}

impl ContentItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_agency(mut self, agency: impl Into<String>) -> Self {
        self.agency = Some(agency.into());
        self
    }

    pub fn with_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = Some(doc_type.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_published(mut self, published: DateTime<Utc>) -> Self {
        self.published = Some(published);
        self
    }

    /// Whether the item carries usable content.
    pub fn is_valid(&self) -> bool {
        !self.is_error && !self.is_warning
    }

    /// Stable identifier: the link when present, otherwise the title.
    pub fn id(&self) -> &str {
        self.link.as_deref().unwrap_or(&self.title)
    }

    /// Title and summary joined with a single space.
    pub fn searchable_text(&self) -> String {
        match self.summary.as_deref() {
            Some(summary) if !summary.is_empty() => format!("{} {}", self.title, summary),
            _ => self.title.clone(),
        }
    }

    pub fn published_date(&self) -> Option<NaiveDate> {
        self.published.map(|ts| ts.date_naive())
    }
}
