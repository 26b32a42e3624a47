//! Keyword-only assessment output.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::scoring::TierCounts;
use crate::status::{Status, Tier};

/// Why a surviving match carries extra weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchProvenance {
    Plain,
    /// Found in an item from GAO, an inspector general, or a court.
    Authoritative,
    /// Found in two or more distinct items of the batch.
    RepeatedPattern,
}

impl MatchProvenance {
    fn annotation(&self) -> Option<&'static str> {
        match self {
            Self::Plain => None,
            Self::Authoritative => Some("authoritative source"),
            Self::RepeatedPattern => Some("systematic pattern"),
        }
    }
}

/// A deduplicated keyword hit within one category's batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordMatch {
    pub keyword: String,
    /// Effective tier after any downweighting.
    pub tier: Tier,
    pub provenance: MatchProvenance,
    /// Distinct items in which the keyword survived suppression.
    pub item_count: usize,
    /// Title of the first item the keyword was found in.
    pub source_title: String,
    #[serde(default)]
    pub source_link: Option<String>,
}

impl fmt::Display for KeywordMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.provenance.annotation() {
            Some(note) => write!(f, "{} ({note})", self.keyword),
            None => f.write_str(&self.keyword),
        }
    }
}

/// Numbers behind a keyword assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentDetail {
    pub keywords: Vec<KeywordMatch>,
    pub dominant_tier: Option<Tier>,
    pub authority_weight: f64,
    pub pattern_multiplier: f64,
    pub counts: TierCounts,
    /// Occurrences dropped by suppression rules or negation phrases.
    pub suppressed: usize,
    pub items_scanned: usize,
    /// Batch severity: tier severity times authority and pattern weights.
    pub severity: f64,
}

/// Keyword-derived judgment for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub category: String,
    pub status: Status,
    pub reason: String,
    /// Display strings of surviving matches, annotated with provenance.
    pub matches: Vec<String>,
    #[serde(default)]
    pub detail: Option<AssessmentDetail>,
}

impl AssessmentResult {
    /// Result without keyword detail (unmonitored category, forced status, no data).
    pub fn bare(category: &str, status: Status, reason: impl Into<String>) -> Self {
        Self {
            category: category.to_string(),
            status,
            reason: reason.into(),
            matches: Vec::new(),
            detail: None,
        }
    }

    pub fn keyword_matches(&self) -> &[KeywordMatch] {
        self.detail.as_ref().map(|d| d.keywords.as_slice()).unwrap_or_default()
    }
}
