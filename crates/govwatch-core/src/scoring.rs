//! Severity and data-coverage confidence.
//!
//! # Severity
//!
//! ```text
//! severity = W.capture * log2(capture + 1)
//!          + drift   * W.drift
//!          + warning * W.warning
//! final    = severity * CLASS_MULTIPLIER[class]
//! ```
//!
//! The logarithm on the capture term gives diminishing returns: at the
//! default weight of 4, one capture match scores 4.0, two 6.34, three 8.0.
//!
//! # Confidence
//!
//! A weighted sum of five factors, each in [0, 1]: source diversity,
//! authority, evidence coverage, keyword density and AI agreement.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::classify::DocumentClass;
use crate::config::{ClassMultipliers, CoverageConfig, TierWeights};
use crate::item::ContentItem;
use crate::rules::RuleSet;
use crate::status::{Status, Tier};

/// AI agreement factor when no AI opinion is available.
pub const AI_AGREEMENT_UNKNOWN: f64 = 0.5;

/// AI agreement factor by ordinal distance 0..=3.
const AI_AGREEMENT_STEPS: [f64; 4] = [1.0, 0.7, 0.4, 0.2];

/// Distinct surviving matches per tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    pub capture: usize,
    pub drift: usize,
    pub warning: usize,
}

impl TierCounts {
    pub fn new(capture: usize, drift: usize, warning: usize) -> Self {
        Self {
            capture,
            drift,
            warning,
        }
    }

    pub fn get(&self, tier: Tier) -> usize {
        match tier {
            Tier::Capture => self.capture,
            Tier::Drift => self.drift,
            Tier::Warning => self.warning,
        }
    }

    pub fn add(&mut self, tier: Tier) {
        match tier {
            Tier::Capture => self.capture += 1,
            Tier::Drift => self.drift += 1,
            Tier::Warning => self.warning += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.capture + self.drift + self.warning
    }

    /// Highest tier with at least one match.
    pub fn dominant(&self) -> Option<Tier> {
        Tier::DESCENDING.into_iter().find(|&t| self.get(t) > 0)
    }
}

/// Raw severity from tier counts, before the class multiplier.
pub fn severity_score(counts: TierCounts, weights: &TierWeights) -> f64 {
    weights.capture * ((counts.capture as f64) + 1.0).log2()
        + counts.drift as f64 * weights.drift
        + counts.warning as f64 * weights.warning
}

/// Severity of one document: raw severity times its class multiplier.
pub fn document_severity(
    counts: TierCounts,
    class: DocumentClass,
    weights: &TierWeights,
    multipliers: &ClassMultipliers,
) -> f64 {
    severity_score(counts, weights) * multipliers.get(class)
}

/// Per-factor breakdown of the data-coverage confidence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageFactors {
    pub source_diversity: f64,
    pub authority: f64,
    pub evidence_coverage: f64,
    pub keyword_density: f64,
    pub ai_agreement: f64,
}

/// Data-coverage confidence in [0, 1] with its five-factor breakdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DataCoverage {
    pub confidence: f64,
    pub factors: CoverageFactors,
}

/// AI agreement factor: 1.0 on agreement, stepping down 0.7 / 0.4 / 0.2 per
/// level of disagreement, 0.5 with no AI opinion.
pub fn ai_agreement(keyword_status: Status, ai_status: Option<Status>) -> f64 {
    match ai_status {
        None => AI_AGREEMENT_UNKNOWN,
        Some(ai) => AI_AGREEMENT_STEPS[keyword_status.distance(ai) as usize],
    }
}

fn ratio(value: f64, max: f64) -> f64 {
    if max <= 0.0 || !value.is_finite() {
        return 0.0;
    }
    (value / max).clamp(0.0, 1.0)
}

/// Compute data coverage for one category's batch.
///
/// Error and warning items are ignored. A batch with no valid items yields
/// zero confidence with every factor zero.
pub fn data_coverage(
    rules: &RuleSet,
    items: &[ContentItem],
    match_count: usize,
    keyword_status: Status,
    ai_status: Option<Status>,
) -> DataCoverage {
    let valid: Vec<&ContentItem> = items.iter().filter(|i| i.is_valid()).collect();
    if valid.is_empty() {
        return DataCoverage::default();
    }

    let cfg: &CoverageConfig = &rules.config().coverage;

    let mut sources = HashSet::new();
    let mut authoritative = HashSet::new();
    for item in &valid {
        let Some(agency) = item.agency.as_deref().map(|a| a.trim().to_lowercase()) else {
            continue;
        };
        if agency.is_empty() {
            continue;
        }
        if rules.is_authoritative_item(item) {
            authoritative.insert(agency.clone());
        }
        sources.insert(agency);
    }

    let density = match_count as f64 / valid.len() as f64;
    let factors = CoverageFactors {
        source_diversity: ratio(sources.len() as f64, cfg.max_sources as f64),
        authority: ratio(authoritative.len() as f64, cfg.max_authoritative as f64),
        evidence_coverage: ratio(valid.len() as f64, cfg.max_items as f64),
        keyword_density: ratio(density, cfg.density_cap),
        ai_agreement: ai_agreement(keyword_status, ai_status),
    };

    let w = &cfg.weights;
    let confidence = factors.source_diversity * w.source_diversity
        + factors.authority * w.authority
        + factors.evidence_coverage * w.evidence_coverage
        + factors.keyword_density * w.keyword_density
        + factors.ai_agreement * w.ai_agreement;

    DataCoverage {
        confidence: if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        },
        factors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn weights() -> TierWeights {
        TierWeights::default()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn capture_term_has_diminishing_returns() {
        let s = |c| severity_score(TierCounts::new(c, 0, 0), &weights());
        assert_eq!(s(0), 0.0);
        assert!(close(s(1), 4.0));
        assert!(close(s(2), 6.34));
        assert!(close(s(3), 8.0));
        assert!(close(s(4), 9.29));
        assert!(s(2) - s(1) < s(1) - s(0));
    }

    #[test]
    fn drift_and_warning_are_linear() {
        let s = severity_score(TierCounts::new(0, 3, 2), &weights());
        assert!(close(s, 3.0 * 2.0 + 2.0));
    }

    #[test]
    fn class_multiplier_applies() {
        let counts = TierCounts::new(1, 0, 0);
        let m = ClassMultipliers::default();
        let eo = document_severity(counts, DocumentClass::ExecutiveOrder, &weights(), &m);
        let notice = document_severity(counts, DocumentClass::Notice, &weights(), &m);
        assert!(close(eo, 6.0));
        assert!(close(notice, 2.0));
    }

    #[test]
    fn dominant_tier() {
        assert_eq!(TierCounts::default().dominant(), None);
        assert_eq!(TierCounts::new(0, 1, 4).dominant(), Some(Tier::Drift));
        assert_eq!(TierCounts::new(1, 0, 0).dominant(), Some(Tier::Capture));
    }

    #[test]
    fn ai_agreement_steps() {
        assert_eq!(ai_agreement(Status::Drift, None), 0.5);
        assert_eq!(ai_agreement(Status::Drift, Some(Status::Drift)), 1.0);
        assert_eq!(ai_agreement(Status::Drift, Some(Status::Warning)), 0.7);
        assert_eq!(ai_agreement(Status::Capture, Some(Status::Warning)), 0.4);
        assert_eq!(ai_agreement(Status::Capture, Some(Status::Stable)), 0.2);
    }

    #[test]
    fn empty_batch_has_zero_confidence() {
        let rules = RuleSet::embedded().unwrap();
        let cov = data_coverage(&rules, &[], 0, Status::Stable, None);
        assert_eq!(cov.confidence, 0.0);
        assert_eq!(cov.factors, CoverageFactors::default());
    }

    #[test]
    fn error_items_do_not_count_as_evidence() {
        let rules = RuleSet::embedded().unwrap();
        let mut broken = ContentItem::new("feed unavailable").with_agency("GAO");
        broken.is_error = true;
        let cov = data_coverage(&rules, &[broken], 3, Status::Warning, None);
        assert_eq!(cov.confidence, 0.0);
    }

    #[test]
    fn factors_saturate() {
        let rules = RuleSet::embedded().unwrap();
        let agencies = [
            "GAO",
            "Office of Inspector General",
            "Supreme Court",
            "Department of Labor",
            "Department of State",
            "Department of Energy",
        ];
        let items: Vec<ContentItem> = (0..30)
            .map(|i| ContentItem::new(format!("item {i}")).with_agency(agencies[i % agencies.len()]))
            .collect();
        let cov = data_coverage(&rules, &items, 30, Status::Drift, Some(Status::Drift));
        assert_eq!(cov.factors.source_diversity, 1.0);
        assert_eq!(cov.factors.authority, 1.0);
        assert_eq!(cov.factors.evidence_coverage, 1.0);
        assert_eq!(cov.factors.keyword_density, 1.0);
        assert_eq!(cov.factors.ai_agreement, 1.0);
        assert!((cov.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn partial_coverage_is_weighted() {
        let rules = RuleSet::embedded().unwrap();
        let items = vec![
            ContentItem::new("a").with_agency("Department of Labor"),
            ContentItem::new("b").with_agency("GAO"),
        ];
        let cov = data_coverage(&rules, &items, 1, Status::Warning, None);
        // 2/5 sources, 1/3 authoritative, 2/20 items, (1/2)/0.5 density, 0.5 AI.
        let expected = 0.4 * 0.20 + (1.0 / 3.0) * 0.20 + 0.1 * 0.25 + 1.0 * 0.15 + 0.5 * 0.20;
        assert!((cov.confidence - expected).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_severity_strictly_increasing_and_concave(c in 0usize..500) {
            let s = |n: usize| severity_score(TierCounts::new(n, 0, 0), &weights());
            prop_assert!(s(c + 1) > s(c));
            prop_assert!(s(c + 2) - s(c + 1) < s(c + 1) - s(c));
        }

        #[test]
        fn prop_confidence_within_unit_interval(
            n in 0usize..40,
            errors in proptest::collection::vec(any::<bool>(), 40),
            matches in 0usize..200,
            ks in 0u8..4,
            ai in proptest::option::of(0u8..4),
        ) {
            let rules = RuleSet::embedded().unwrap();
            let items: Vec<ContentItem> = (0..n)
                .map(|i| {
                    let mut item = ContentItem::new(format!("t{i}")).with_agency(format!("agency {}", i % 7));
                    item.is_error = errors[i];
                    item
                })
                .collect();
            let cov = data_coverage(
                &rules,
                &items,
                matches,
                Status::from_ordinal(ks).unwrap(),
                ai.and_then(Status::from_ordinal),
            );
            prop_assert!((0.0..=1.0).contains(&cov.confidence));
            for f in [
                cov.factors.source_diversity,
                cov.factors.authority,
                cov.factors.evidence_coverage,
                cov.factors.keyword_density,
                cov.factors.ai_agreement,
            ] {
                prop_assert!((0.0..=1.0).contains(&f));
            }
        }
    }
}
