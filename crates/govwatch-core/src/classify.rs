//! Document classification from structural hints.
//!
//! Precedence, highest first:
//!
//! 1. Declared structural type (`ContentItem::doc_type`) via a fixed table.
//! 2. Agency and link patterns (judiciary, oversight bodies, press offices).
//! 3. Title heuristics.
//! 4. [`DocumentClass::Unknown`].
//!
//! A declared type always wins: a "Notice" whose title mentions an executive
//! order is still a notice.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::item::ContentItem;

/// Kind of government instrument an item represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentClass {
    ExecutiveOrder,
    PresidentialMemorandum,
    FinalRule,
    ProposedRule,
    CourtOpinion,
    Report,
    PressRelease,
    Notice,
    Unknown,
}

impl DocumentClass {
    pub const ALL: [DocumentClass; 9] = [
        Self::ExecutiveOrder,
        Self::PresidentialMemorandum,
        Self::FinalRule,
        Self::ProposedRule,
        Self::CourtOpinion,
        Self::Report,
        Self::PressRelease,
        Self::Notice,
        Self::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExecutiveOrder => "executive_order",
            Self::PresidentialMemorandum => "presidential_memorandum",
            Self::FinalRule => "final_rule",
            Self::ProposedRule => "proposed_rule",
            Self::CourtOpinion => "court_opinion",
            Self::Report => "report",
            Self::PressRelease => "press_release",
            Self::Notice => "notice",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }

    /// Court opinions and oversight reports carry findings rather than claims.
    pub fn is_authoritative(&self) -> bool {
        matches!(self, Self::CourtOpinion | Self::Report)
    }
}

impl fmt::Display for DocumentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Lookup tables ──

const STRUCTURAL_TYPES: &[(&str, DocumentClass)] = &[
    ("presidential document", DocumentClass::ExecutiveOrder),
    ("executive order", DocumentClass::ExecutiveOrder),
    ("presidential memorandum", DocumentClass::PresidentialMemorandum),
    ("memorandum", DocumentClass::PresidentialMemorandum),
    ("rule", DocumentClass::FinalRule),
    ("final rule", DocumentClass::FinalRule),
    ("proposed rule", DocumentClass::ProposedRule),
    ("notice", DocumentClass::Notice),
    ("opinion", DocumentClass::CourtOpinion),
    ("court opinion", DocumentClass::CourtOpinion),
    ("report", DocumentClass::Report),
    ("press release", DocumentClass::PressRelease),
];

const JUDICIARY_LINKS: &[&str] = &["uscourts.gov", "supremecourt.gov", "courtlistener.com"];
const JUDICIARY_AGENCY_WORDS: &[&str] = &["court", "courts", "judiciary"];

const OVERSIGHT_LINKS: &[&str] = &["gao.gov", "oversight.gov", "cbo.gov", "crsreports.congress.gov"];
const OVERSIGHT_AGENCY_WORDS: &[&str] = &["gao", "oig", "cbo", "crs"];
const OVERSIGHT_AGENCY_PHRASES: &[&str] = &[
    "government accountability office",
    "inspector general",
    "congressional budget office",
    "congressional research service",
];

const PRESS_LINKS: &[&str] = &["whitehouse.gov/briefing-room", "/press-releases", "/newsroom"];
const PRESS_AGENCY_PHRASES: &[&str] = &["white house", "press office", "press secretary"];

/// Classify one item. Pure; no side effects.
pub fn classify(item: &ContentItem) -> DocumentClass {
    if let Some(declared) = item.doc_type.as_deref()
        && let Some(class) = from_structural_type(declared)
    {
        return class;
    }

    if let Some(class) = from_source(item.agency.as_deref(), item.link.as_deref()) {
        return class;
    }

    from_title(&item.title).unwrap_or(DocumentClass::Unknown)
}

fn from_structural_type(declared: &str) -> Option<DocumentClass> {
    let key = declared.trim().to_lowercase();
    STRUCTURAL_TYPES
        .iter()
        .find(|(name, _)| *name == key)
        .map(|&(_, class)| class)
}

fn from_source(agency: Option<&str>, link: Option<&str>) -> Option<DocumentClass> {
    let agency = agency.map(str::to_lowercase).unwrap_or_default();
    let link = link.map(str::to_lowercase).unwrap_or_default();

    let judiciary = JUDICIARY_LINKS.iter().any(|p| link.contains(p))
        || JUDICIARY_AGENCY_WORDS.iter().any(|w| has_word(&agency, w));
    if judiciary {
        return Some(DocumentClass::CourtOpinion);
    }

    let oversight = OVERSIGHT_LINKS.iter().any(|p| link.contains(p))
        || OVERSIGHT_AGENCY_WORDS.iter().any(|w| has_word(&agency, w))
        || OVERSIGHT_AGENCY_PHRASES.iter().any(|p| agency.contains(p));
    if oversight {
        return Some(DocumentClass::Report);
    }

    let press = PRESS_LINKS.iter().any(|p| link.contains(p))
        || PRESS_AGENCY_PHRASES.iter().any(|p| agency.contains(p));
    if press {
        return Some(DocumentClass::PressRelease);
    }

    None
}

fn from_title(title: &str) -> Option<DocumentClass> {
    let title = title.to_lowercase();
    if title.contains("executive order") {
        Some(DocumentClass::ExecutiveOrder)
    } else if title.contains("presidential memorandum") {
        Some(DocumentClass::PresidentialMemorandum)
    } else {
        None
    }
}

/// Whole-word test on an already lowercased string.
fn has_word(haystack: &str, word: &str) -> bool {
    haystack
        .split(|c: char| !c.is_alphanumeric())
        .any(|token| token == word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_type_table() {
        let eo = ContentItem::new("Protecting the Nation").with_type("Presidential Document");
        assert_eq!(classify(&eo), DocumentClass::ExecutiveOrder);

        let rule = ContentItem::new("Amendments to reporting").with_type("Rule");
        assert_eq!(classify(&rule), DocumentClass::FinalRule);

        let proposed = ContentItem::new("Request for comment").with_type("Proposed Rule");
        assert_eq!(classify(&proposed), DocumentClass::ProposedRule);
    }

    #[test]
    fn structural_type_beats_title() {
        let item = ContentItem::new("Implementing Executive Order 14000").with_type("Notice");
        assert_eq!(classify(&item), DocumentClass::Notice);
    }

    #[test]
    fn structural_type_beats_agency() {
        let item = ContentItem::new("Schedule of hearings")
            .with_type("Notice")
            .with_agency("U.S. Courts");
        assert_eq!(classify(&item), DocumentClass::Notice);
    }

    #[test]
    fn unknown_structural_type_falls_through() {
        let item = ContentItem::new("Executive Order on Ballots").with_type("Bulletin");
        assert_eq!(classify(&item), DocumentClass::ExecutiveOrder);
    }

    #[test]
    fn agency_patterns() {
        let court = ContentItem::new("Order granting injunction")
            .with_link("https://www.uscourts.gov/opinions/123");
        assert_eq!(classify(&court), DocumentClass::CourtOpinion);

        let gao = ContentItem::new("Agency lacks controls").with_agency("GAO");
        assert_eq!(classify(&gao), DocumentClass::Report);

        let ig = ContentItem::new("Audit of grants").with_agency("Office of Inspector General");
        assert_eq!(classify(&ig), DocumentClass::Report);

        let press = ContentItem::new("Statement on the budget").with_agency("The White House");
        assert_eq!(classify(&press), DocumentClass::PressRelease);
    }

    #[test]
    fn acronyms_need_whole_words() {
        // "cbo" inside another word is not the Congressional Budget Office.
        let item = ContentItem::new("Quarterly update").with_agency("Acbot Holdings");
        assert_eq!(classify(&item), DocumentClass::Unknown);
    }

    #[test]
    fn title_heuristics() {
        let memo = ContentItem::new("Presidential Memorandum on Federal Hiring");
        assert_eq!(classify(&memo), DocumentClass::PresidentialMemorandum);
        assert_eq!(classify(&ContentItem::new("Weekly digest")), DocumentClass::Unknown);
    }

    #[test]
    fn parse_round_trips_names() {
        for class in DocumentClass::ALL {
            assert_eq!(DocumentClass::parse_str(class.as_str()), Some(class));
        }
        assert!(DocumentClass::Report.is_authoritative());
        assert!(!DocumentClass::Notice.is_authoritative());
    }
}
