//! Keyword tier and suppression engine.
//!
//! Scans a category's batch against its capture, drift and warning
//! dictionaries, drops suppressed and negated occurrences, demotes
//! downweighted ones, and derives a status under the corroboration policy:
//!
//! | Evidence                                   | Status                               |
//! |--------------------------------------------|--------------------------------------|
//! | nothing                                    | Stable                               |
//! | ≥ capture threshold distinct capture       | Capture                              |
//! | capture below threshold, authoritative     | Capture                              |
//! | capture below threshold                    | Drift, "needs corroboration"         |
//! | ≥ drift threshold distinct drift           | Drift                                |
//! | one drift, repeated across items           | Drift (systematic pattern)           |
//! | one drift                                  | Warning                              |
//! | ≥ escalation threshold warning             | Drift                                |
//! | any warning                                | Warning                              |
//!
//! Repetition across items corroborates within a tier but never crosses into
//! Capture; only distinct capture matches or an authoritative source do.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::assessment::{AssessmentDetail, AssessmentResult, KeywordMatch, MatchProvenance};
use crate::classify::{self, DocumentClass};
use crate::config::VolumeThresholds;
use crate::item::ContentItem;
use crate::rules::{CategoryMatcher, RuleSet};
use crate::scoring::{self, TierCounts};
use crate::status::{Status, Tier};
use crate::temporal::{self, DocumentScore};

/// Weight applied to batch severity when any match is authoritative.
pub const AUTHORITY_BOOST: f64 = 1.5;
/// Weight applied to batch severity when any match repeats across items.
pub const PATTERN_BOOST: f64 = 1.25;

/// Surviving matches for one batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TierScan {
    /// In dictionary order: capture keywords first.
    pub matches: Vec<KeywordMatch>,
    pub counts: TierCounts,
    pub suppressed: usize,
    pub items_scanned: usize,
}

impl TierScan {
    pub fn has_authoritative(&self, tier: Tier) -> bool {
        self.matches
            .iter()
            .any(|m| m.tier == tier && m.provenance == MatchProvenance::Authoritative)
    }

    pub fn has_pattern(&self, tier: Tier) -> bool {
        self.matches.iter().any(|m| m.tier == tier && m.item_count >= 2)
    }

    fn tier_keywords(&self, tier: Tier) -> String {
        self.matches
            .iter()
            .filter(|m| m.tier == tier)
            .map(|m| m.keyword.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

struct Hit<'a> {
    tier: Tier,
    items: usize,
    authoritative: bool,
    first: &'a ContentItem,
}

/// Runs a [`RuleSet`] against batches of items.
#[derive(Debug, Clone, Copy)]
pub struct TierEngine<'r> {
    rules: &'r RuleSet,
}

impl<'r> TierEngine<'r> {
    pub fn new(rules: &'r RuleSet) -> Self {
        Self { rules }
    }

    /// Scan `items` for one category. Error and warning items are skipped.
    pub fn scan(&self, category: &CategoryMatcher, items: &[ContentItem]) -> TierScan {
        let negations = self.rules.negations();
        let window = self.rules.context_window();
        let mut hits: Vec<Option<Hit<'_>>> = category.keywords.iter().map(|_| None).collect();
        let mut suppressed = 0;
        let mut items_scanned = 0;

        for item in items.iter().filter(|i| i.is_valid()) {
            items_scanned += 1;
            let text = item.searchable_text();
            let authoritative = self.rules.is_authoritative_item(item);

            for (slot, kw) in hits.iter_mut().zip(&category.keywords) {
                let occ = kw.pattern.scan(&text, negations, window);
                suppressed += occ.suppressed;

                let tier = if occ.kept > 0 {
                    Some(kw.tier)
                } else if occ.demoted > 0 {
                    let demoted = kw.tier.demote();
                    if demoted.is_none() {
                        suppressed += occ.demoted;
                    }
                    demoted
                } else {
                    None
                };
                let Some(tier) = tier else { continue };

                match slot {
                    Some(hit) => {
                        hit.tier = hit.tier.max(tier);
                        hit.items += 1;
                        hit.authoritative |= authoritative;
                    }
                    None => {
                        *slot = Some(Hit {
                            tier,
                            items: 1,
                            authoritative,
                            first: item,
                        })
                    }
                }
            }
        }

        let mut scan = TierScan {
            suppressed,
            items_scanned,
            ..Default::default()
        };
        for (hit, kw) in hits.into_iter().zip(&category.keywords) {
            let Some(hit) = hit else { continue };
            let provenance = if hit.authoritative {
                MatchProvenance::Authoritative
            } else if hit.items >= 2 {
                MatchProvenance::RepeatedPattern
            } else {
                MatchProvenance::Plain
            };
            scan.counts.add(hit.tier);
            scan.matches.push(KeywordMatch {
                keyword: kw.pattern.keyword().to_string(),
                tier: hit.tier,
                provenance,
                item_count: hit.items,
                source_title: hit.first.title.clone(),
                source_link: hit.first.link.clone(),
            });
        }
        // Demotion can reorder tiers; keep capture first.
        scan.matches.sort_by(|a, b| b.tier.cmp(&a.tier));
        scan
    }

    /// Keyword-only assessment of one category's batch.
    ///
    /// Never fails: an unknown category yields Warning, a batch with no valid
    /// items yields Stable.
    pub fn assess(&self, category_key: &str, items: &[ContentItem]) -> AssessmentResult {
        let Some(category) = self.rules.category(category_key) else {
            debug!(category = category_key, "no rules for category");
            return AssessmentResult::bare(
                category_key,
                Status::Warning,
                format!("No assessment rules for category {category_key}"),
            );
        };

        if let Some(outage) = &category.site_outage {
            let marker = outage.source.to_lowercase();
            let down = items.iter().filter(|i| i.is_error).any(|i| {
                [i.agency.as_deref(), i.link.as_deref(), Some(i.title.as_str())]
                    .into_iter()
                    .flatten()
                    .any(|s| s.to_lowercase().contains(&marker))
            });
            if down {
                info!(category = category_key, source = %outage.source, "site outage override");
                return AssessmentResult::bare(category_key, outage.status, outage.reason.clone());
            }
        }

        if !items.iter().any(ContentItem::is_valid) {
            return AssessmentResult::bare(category_key, Status::Stable, "No valid items to assess");
        }

        let scan = self.scan(category, items);
        let (status, reason) = derive_status(&scan, &category.volume);

        let authority_weight = if scan.matches.iter().any(|m| m.provenance == MatchProvenance::Authoritative) {
            AUTHORITY_BOOST
        } else {
            1.0
        };
        let pattern_multiplier = if scan.matches.iter().any(|m| m.item_count >= 2) {
            PATTERN_BOOST
        } else {
            1.0
        };
        let severity = scoring::severity_score(scan.counts, &self.rules.config().tier_weights)
            * authority_weight
            * pattern_multiplier;

        info!(
            category = category_key,
            %status,
            capture = scan.counts.capture,
            drift = scan.counts.drift,
            warning = scan.counts.warning,
            suppressed = scan.suppressed,
            "keyword assessment"
        );

        AssessmentResult {
            category: category_key.to_string(),
            status,
            reason,
            matches: scan.matches.iter().map(ToString::to_string).collect(),
            detail: Some(AssessmentDetail {
                dominant_tier: scan.counts.dominant(),
                authority_weight,
                pattern_multiplier,
                counts: scan.counts,
                suppressed: scan.suppressed,
                items_scanned: scan.items_scanned,
                severity,
                keywords: scan.matches,
            }),
        }
    }

    /// Score each valid item on its own for the temporal aggregator.
    ///
    /// Items without a publish date are filed under `fallback_date`'s week.
    pub fn score_documents(
        &self,
        category_key: &str,
        items: &[ContentItem],
        fallback_date: NaiveDate,
    ) -> Vec<DocumentScore> {
        let Some(category) = self.rules.category(category_key) else {
            return Vec::new();
        };
        let config = self.rules.config();

        items
            .iter()
            .filter(|i| i.is_valid())
            .map(|item| {
                let scan = self.scan(category, std::slice::from_ref(item));
                let class: DocumentClass = classify::classify(item);
                DocumentScore {
                    category: category_key.to_string(),
                    document_id: item.id().to_string(),
                    title: item.title.clone(),
                    week_of: temporal::week_start(item.published_date().unwrap_or(fallback_date)),
                    document_class: class,
                    counts: scan.counts,
                    severity: scoring::document_severity(
                        scan.counts,
                        class,
                        &config.tier_weights,
                        &config.class_multipliers,
                    ),
                    keywords: scan.matches.into_iter().map(|m| m.keyword).collect(),
                }
            })
            .collect()
    }
}

/// Apply the corroboration policy to a scan.
pub fn derive_status(scan: &TierScan, volume: &VolumeThresholds) -> (Status, String) {
    let c = scan.counts;

    if c.capture >= volume.capture {
        return (
            Status::Capture,
            format!(
                "{} corroborated capture-tier indicators: {}",
                c.capture,
                scan.tier_keywords(Tier::Capture)
            ),
        );
    }
    if c.capture > 0 {
        if scan.has_authoritative(Tier::Capture) {
            return (
                Status::Capture,
                format!(
                    "Capture-tier indicator confirmed by authoritative source: {}",
                    scan.tier_keywords(Tier::Capture)
                ),
            );
        }
        let noun = if c.capture == 1 { "indicator" } else { "indicators" };
        return (
            Status::Drift,
            format!(
                "Capture-tier {noun} ({}) needs corroboration",
                scan.tier_keywords(Tier::Capture)
            ),
        );
    }

    if c.drift >= volume.drift {
        return (
            Status::Drift,
            format!("{} drift-tier indicators: {}", c.drift, scan.tier_keywords(Tier::Drift)),
        );
    }
    if c.drift > 0 {
        if scan.has_pattern(Tier::Drift) {
            return (
                Status::Drift,
                format!(
                    "Drift-tier indicator repeated across items (systematic pattern): {}",
                    scan.tier_keywords(Tier::Drift)
                ),
            );
        }
        return (
            Status::Warning,
            format!("Single drift-tier indicator: {}", scan.tier_keywords(Tier::Drift)),
        );
    }

    if c.warning >= volume.warning_escalation {
        return (
            Status::Drift,
            format!(
                "{} warning-tier indicators reach escalation threshold: {}",
                c.warning,
                scan.tier_keywords(Tier::Warning)
            ),
        );
    }
    if c.warning > 0 {
        return (
            Status::Warning,
            format!("{} warning-tier indicators: {}", c.warning, scan.tier_keywords(Tier::Warning)),
        );
    }

    (Status::Stable, "No concerning keywords detected".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RulesConfig;
    use chrono::{TimeZone, Utc};

    const RULES: &str = r#"{
        "negation_patterns": ["no evidence of", "rejected", "did not"],
        "authoritative_sources": ["GAO", "Inspector General"],
        "tier_weights": { "capture": 4.0, "drift": 2.0, "warning": 1.0 },
        "context_window": 60,
        "categories": {
            "civil_service": {
                "keywords": {
                    "capture": ["schedule f", "mass firing", "loyalty test"],
                    "drift": ["reclassification", "reduction in force"],
                    "warning": ["hiring freeze", "reorganization", "telework ended"]
                },
                "suppression": {
                    "mass firing": { "suppress_if_any": ["private sector"], "downweight_if_any": ["historical"] },
                    "reorganization": { "downweight_if_any": ["routine"] }
                },
                "volume_thresholds": { "warning_escalation": 3, "drift": 2, "capture": 2 }
            },
            "detention": {
                "keywords": { "warning": ["mass"], "drift": ["classification"] }
            },
            "igs": {
                "keywords": { "warning": ["acting inspector general"] },
                "site_outage": {
                    "source": "oversight.gov",
                    "status": "Capture",
                    "reason": "Oversight.gov is offline"
                }
            }
        }
    }"#;

    fn rules() -> RuleSet {
        RuleSet::compile(RulesConfig::from_json_str(RULES).unwrap()).unwrap()
    }

    fn assess(items: &[ContentItem]) -> AssessmentResult {
        TierEngine::new(&rules()).assess("civil_service", items)
    }

    #[test]
    fn no_matches_is_stable() {
        let r = assess(&[ContentItem::new("Agency publishes annual budget")]);
        assert_eq!(r.status, Status::Stable);
        assert!(r.matches.is_empty());
    }

    #[test]
    fn substring_of_longer_word_never_matches() {
        let r = TierEngine::new(&rules()).assess(
            "detention",
            &[ContentItem::new("Massachusetts delegation meets on reclassification")],
        );
        assert_eq!(r.status, Status::Stable);
        assert!(r.matches.is_empty());
    }

    #[test]
    fn reclassification_is_its_own_keyword() {
        let r = assess(&[ContentItem::new("OPM announces reclassification of analysts")]);
        assert_eq!(r.matches, vec!["reclassification"]);
        assert_eq!(r.status, Status::Warning);
    }

    #[test]
    fn single_capture_needs_corroboration() {
        let r = assess(&[ContentItem::new("Agencies ordered to implement Schedule F")]);
        assert_eq!(r.status, Status::Drift);
        assert!(r.reason.contains("needs corroboration"), "{}", r.reason);
    }

    #[test]
    fn two_distinct_captures_is_capture() {
        let r = assess(&[
            ContentItem::new("Agencies implement Schedule F"),
            ContentItem::new("Mass firing of career staff at agency"),
        ]);
        assert_eq!(r.status, Status::Capture);
        let detail = r.detail.unwrap();
        assert_eq!(detail.counts.capture, 2);
        assert_eq!(detail.dominant_tier, Some(Tier::Capture));
    }

    #[test]
    fn same_capture_keyword_twice_is_not_corroboration() {
        let r = assess(&[
            ContentItem::new("Schedule F rollout begins"),
            ContentItem::new("Schedule F rollout continues"),
        ]);
        assert_eq!(r.status, Status::Drift);
        assert_eq!(r.matches, vec!["schedule f (systematic pattern)"]);
    }

    #[test]
    fn authoritative_single_capture_is_capture() {
        let r = assess(&[ContentItem::new("Report documents loyalty test for hires").with_agency("GAO")]);
        assert_eq!(r.status, Status::Capture);
        assert_eq!(r.matches, vec!["loyalty test (authoritative source)"]);
        assert_eq!(r.detail.unwrap().authority_weight, AUTHORITY_BOOST);
    }

    #[test]
    fn suppression_rule_drops_match() {
        let r = assess(&[ContentItem::new("Private sector mass firing at retailer")]);
        assert_eq!(r.status, Status::Stable);
        assert_eq!(r.detail.unwrap().suppressed, 1);
    }

    #[test]
    fn downweight_demotes_one_tier() {
        let r = assess(&[ContentItem::new("A historical review of the mass firing of 1953")]);
        let detail = r.detail.unwrap();
        assert_eq!(detail.counts, TierCounts::new(0, 1, 0));
        assert_eq!(r.status, Status::Warning);
    }

    #[test]
    fn demoted_warning_is_dropped() {
        let r = assess(&[ContentItem::new("Routine reorganization of regional offices")]);
        assert_eq!(r.status, Status::Stable);
        assert_eq!(r.detail.unwrap().suppressed, 1);
    }

    #[test]
    fn negation_drops_match() {
        let r = assess(&[ContentItem::new("Inquiry found no evidence of loyalty test")]);
        assert_eq!(r.status, Status::Stable);
    }

    #[test]
    fn single_drift_is_warning_two_is_drift() {
        let one = assess(&[ContentItem::new("Reduction in force notices issued")]);
        assert_eq!(one.status, Status::Warning);

        let two = assess(&[
            ContentItem::new("Reduction in force notices issued"),
            ContentItem::new("Reclassification memo circulated"),
        ]);
        assert_eq!(two.status, Status::Drift);
    }

    #[test]
    fn repeated_drift_is_systematic_pattern() {
        let r = assess(&[
            ContentItem::new("Reduction in force at Interior"),
            ContentItem::new("Reduction in force at Energy"),
        ]);
        assert_eq!(r.status, Status::Drift);
        assert!(r.reason.contains("systematic pattern"));
        assert_eq!(r.detail.unwrap().pattern_multiplier, PATTERN_BOOST);
    }

    #[test]
    fn warning_volume_escalates() {
        let one = assess(&[ContentItem::new("Hiring freeze extended")]);
        assert_eq!(one.status, Status::Warning);

        let many = assess(&[
            ContentItem::new("Hiring freeze extended"),
            ContentItem::new("Reorganization plan filed"),
            ContentItem::new("Telework ended for most staff"),
        ]);
        assert_eq!(many.status, Status::Drift);
    }

    #[test]
    fn error_and_warning_items_are_excluded() {
        let mut broken = ContentItem::new("Schedule F and mass firing");
        broken.is_error = true;
        let mut degraded = ContentItem::new("Loyalty test");
        degraded.is_warning = true;
        let r = assess(&[broken, degraded]);
        assert_eq!(r.status, Status::Stable);
        assert_eq!(r.reason, "No valid items to assess");
    }

    #[test]
    fn empty_batch_is_stable() {
        assert_eq!(assess(&[]).status, Status::Stable);
    }

    #[test]
    fn unknown_category_is_warning() {
        let r = TierEngine::new(&rules()).assess("weather", &[ContentItem::new("Storm")]);
        assert_eq!(r.status, Status::Warning);
        assert_eq!(r.reason, "No assessment rules for category weather");
        assert!(r.detail.is_none());
    }

    #[test]
    fn site_outage_forces_status() {
        let mut down = ContentItem::new("Fetch failed").with_link("https://www.oversight.gov/reports");
        down.is_error = true;
        let r = TierEngine::new(&rules()).assess("igs", &[down, ContentItem::new("Quiet week")]);
        assert_eq!(r.status, Status::Capture);
        assert_eq!(r.reason, "Oversight.gov is offline");
    }

    #[test]
    fn site_outage_marker_may_appear_in_title() {
        let mut down = ContentItem::new("oversight.gov returned 503");
        down.is_error = true;
        let r = TierEngine::new(&rules()).assess("igs", &[down]);
        assert_eq!(r.status, Status::Capture);
    }

    #[test]
    fn site_outage_ignores_healthy_items() {
        let up = ContentItem::new("New report").with_link("https://www.oversight.gov/reports");
        let r = TierEngine::new(&rules()).assess("igs", &[up]);
        assert_eq!(r.status, Status::Stable);
    }

    #[test]
    fn matches_listed_capture_first() {
        let r = assess(&[ContentItem::new("Hiring freeze and Schedule F and reclassification")]);
        assert_eq!(r.matches, vec!["schedule f", "reclassification", "hiring freeze"]);
    }

    #[test]
    fn document_scores_use_class_multiplier_and_week() {
        let rules = rules();
        let engine = TierEngine::new(&rules);
        let published = Utc.with_ymd_and_hms(2026, 3, 5, 9, 0, 0).unwrap();
        let items = vec![
            ContentItem::new("Executive Order on Schedule F")
                .with_type("Presidential Document")
                .with_published(published),
            ContentItem::new("Hiring freeze notice").with_type("Notice"),
        ];
        let fallback = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        let scores = engine.score_documents("civil_service", &items, fallback);
        assert_eq!(scores.len(), 2);

        assert_eq!(scores[0].document_class, DocumentClass::ExecutiveOrder);
        assert!((scores[0].severity - 6.0).abs() < 1e-9);
        assert_eq!(scores[0].week_of, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert_eq!(scores[0].keywords, vec!["schedule f"]);

        assert_eq!(scores[1].document_class, DocumentClass::Notice);
        assert!((scores[1].severity - 0.5).abs() < 1e-9);
        assert_eq!(scores[1].week_of, NaiveDate::from_ymd_opt(2026, 3, 30).unwrap());
    }
}
