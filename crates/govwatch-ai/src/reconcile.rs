//! Keyword/AI status reconciliation.
//!
//! The keyword status is a ceiling. The AI opinion is clamped to it, so the
//! AI can argue a category is calmer than its keywords suggest but never
//! worse. Small, confident downgrades are accepted automatically; anything
//! else keeps the keyword status and goes to human review.

use std::fmt;

use govwatch_core::Status;
use serde::{Deserialize, Serialize};

/// How the AI opinion related to the keyword ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// AI agrees with the keyword status (or asked for more, and was clamped).
    Confirmed,
    /// AI's one-level downgrade was accepted.
    Downgraded,
    /// AI disagrees; keyword status stands pending human review.
    Conflict,
}

impl ReconcileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Downgraded => "downgraded",
            Self::Conflict => "conflict",
        }
    }
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DowngradeDecision {
    pub keyword_status: Status,
    /// AI status as received.
    pub ai_status: Status,
    /// AI status after clamping to the keyword ceiling.
    pub clamped_status: Status,
    pub final_status: Status,
    pub distance: u8,
    pub confidence: f64,
    pub outcome: ReconcileOutcome,
    pub downgrade_applied: bool,
    pub flagged_for_review: bool,
    pub reason: String,
}

/// Decide the displayed status from the keyword ceiling and an AI opinion.
///
/// | distance | confidence          | result                   |
/// |----------|---------------------|--------------------------|
/// | 0        | any                 | keyword status           |
/// | 1        | `>= auto_accept`    | AI status, auto-accepted |
/// | 1        | `< auto_accept`     | keyword status, flagged  |
/// | 2..=3    | any                 | keyword status, flagged  |
///
/// A NaN confidence counts as 0.
pub fn resolve_downgrade(
    keyword: Status,
    ai: Status,
    confidence: f64,
    auto_accept: f64,
) -> DowngradeDecision {
    let confidence = if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 1.0) };
    let clamped = ai.min(keyword);
    let distance = keyword.distance(clamped);

    let (final_status, outcome, reason) = match distance {
        0 if ai > keyword => (
            keyword,
            ReconcileOutcome::Confirmed,
            format!("AI suggested {ai}; held at keyword ceiling {keyword}"),
        ),
        0 => (
            keyword,
            ReconcileOutcome::Confirmed,
            format!("AI agrees: {keyword}"),
        ),
        1 if confidence >= auto_accept => (
            clamped,
            ReconcileOutcome::Downgraded,
            format!(
                "AI downgrade {keyword} -> {clamped} accepted at confidence {confidence:.2}"
            ),
        ),
        1 => (
            keyword,
            ReconcileOutcome::Conflict,
            format!(
                "AI suggests {clamped} at confidence {confidence:.2} (below {auto_accept:.2}); kept {keyword} pending review"
            ),
        ),
        _ => (
            keyword,
            ReconcileOutcome::Conflict,
            format!("AI suggests {clamped}, {distance} levels below {keyword}; kept {keyword} pending review"),
        ),
    };

    DowngradeDecision {
        keyword_status: keyword,
        ai_status: ai,
        clamped_status: clamped,
        final_status,
        distance,
        confidence,
        outcome,
        downgrade_applied: outcome == ReconcileOutcome::Downgraded,
        flagged_for_review: outcome == ReconcileOutcome::Conflict,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const AUTO: f64 = 0.7;

    #[test]
    fn agreement_is_untouched() {
        let d = resolve_downgrade(Status::Drift, Status::Drift, 0.2, AUTO);
        assert_eq!(d.final_status, Status::Drift);
        assert!(!d.downgrade_applied);
        assert!(!d.flagged_for_review);
        assert_eq!(d.outcome, ReconcileOutcome::Confirmed);
    }

    #[test]
    fn confident_one_level_downgrade_is_accepted() {
        let d = resolve_downgrade(Status::Drift, Status::Warning, 0.7, AUTO);
        assert_eq!(d.final_status, Status::Warning);
        assert!(d.downgrade_applied);
        assert!(!d.flagged_for_review);
        assert_eq!(d.distance, 1);
    }

    #[test]
    fn unsure_one_level_downgrade_is_flagged() {
        let d = resolve_downgrade(Status::Drift, Status::Warning, 0.69, AUTO);
        assert_eq!(d.final_status, Status::Drift);
        assert!(!d.downgrade_applied);
        assert!(d.flagged_for_review);
        assert_eq!(d.outcome, ReconcileOutcome::Conflict);
    }

    #[test]
    fn large_gap_is_flagged_at_any_confidence() {
        for (ai, distance) in [(Status::Warning, 2), (Status::Stable, 3)] {
            let d = resolve_downgrade(Status::Capture, ai, 1.0, AUTO);
            assert_eq!(d.final_status, Status::Capture);
            assert!(d.flagged_for_review);
            assert_eq!(d.distance, distance);
        }
    }

    #[test]
    fn ai_cannot_escalate() {
        let d = resolve_downgrade(Status::Warning, Status::Capture, 0.99, AUTO);
        assert_eq!(d.clamped_status, Status::Warning);
        assert_eq!(d.final_status, Status::Warning);
        assert_eq!(d.distance, 0);
        assert!(!d.flagged_for_review);
        assert!(d.reason.contains("ceiling"));
    }

    #[test]
    fn nan_confidence_never_auto_accepts() {
        let d = resolve_downgrade(Status::Drift, Status::Warning, f64::NAN, AUTO);
        assert_eq!(d.confidence, 0.0);
        assert!(d.flagged_for_review);
    }

    proptest! {
        #[test]
        fn prop_never_raises_severity(k in 0u8..4, a in 0u8..4, conf in proptest::num::f64::ANY) {
            let keyword = Status::from_ordinal(k).unwrap();
            let ai = Status::from_ordinal(a).unwrap();
            let d = resolve_downgrade(keyword, ai, conf, AUTO);
            prop_assert!(d.final_status <= keyword);
            prop_assert!(d.clamped_status <= keyword);
            prop_assert!(!(d.downgrade_applied && d.flagged_for_review));
            if d.flagged_for_review {
                prop_assert_eq!(d.final_status, keyword);
            }
            if d.downgrade_applied {
                prop_assert_eq!(d.distance, 1);
            }
        }
    }
}
