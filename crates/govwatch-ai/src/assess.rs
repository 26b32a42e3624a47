//! Enhanced assessment: keyword result, optional AI opinion, reconciled
//! status and data-coverage confidence for one category.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use govwatch_core::convergence::CategorySnapshot;
use govwatch_core::scoring::data_coverage;
use govwatch_core::{
    AssessmentResult, ContentItem, CoverageFactors, RuleSet, Status, TierEngine, TrendAnomaly,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::opinion::{AiOpinion, AiProvider, fetch_opinion};
use crate::reconcile::{DowngradeDecision, resolve_downgrade};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceOrigin {
    Keyword,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub text: String,
    pub origin: EvidenceOrigin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Evidence {
    fn ai(text: &str) -> Self {
        Self {
            text: text.to_string(),
            origin: EvidenceOrigin::Ai,
            link: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedAssessment {
    pub category: String,
    pub keyword: AssessmentResult,
    /// Absent when no provider was configured or it failed.
    pub ai: Option<AiOpinion>,
    pub final_status: Status,
    pub reconciliation: Option<DowngradeDecision>,
    pub confidence: f64,
    pub coverage: CoverageFactors,
    pub evidence_for: Vec<Evidence>,
    pub evidence_against: Vec<Evidence>,
    pub counter_evidence: Vec<String>,
    pub assessed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend_anomalies: Option<Vec<TrendAnomaly>>,
}

impl EnhancedAssessment {
    pub fn flagged_for_review(&self) -> bool {
        self.reconciliation
            .as_ref()
            .is_some_and(|r| r.flagged_for_review)
    }

    pub fn with_trend_anomalies(mut self, anomalies: Vec<TrendAnomaly>) -> Self {
        self.trend_anomalies = Some(anomalies);
        self
    }

    /// Supporting evidence for cross-category convergence scanning: each
    /// keyword with its source title, then the AI's evidence as written.
    pub fn snapshot(&self) -> CategorySnapshot {
        let keyword = self
            .keyword
            .keyword_matches()
            .iter()
            .map(|m| format!("{}: {}", m.keyword, m.source_title));
        let ai = self
            .evidence_for
            .iter()
            .filter(|e| e.origin == EvidenceOrigin::Ai)
            .map(|e| e.text.clone());
        CategorySnapshot::new(self.category.clone(), keyword.chain(ai).collect())
    }
}

/// Runs the keyword engine and reconciles it with an AI opinion.
#[derive(Debug, Clone)]
pub struct Assessor {
    rules: Arc<RuleSet>,
}

impl Assessor {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    fn ai_timeout(&self) -> Duration {
        Duration::from_secs(self.rules.config().reconcile.ai_timeout_secs)
    }

    /// Keyword-only result.
    pub fn keyword_assessment(&self, category: &str, items: &[ContentItem]) -> AssessmentResult {
        TierEngine::new(&self.rules).assess(category, items)
    }

    /// Assess with an already-obtained AI opinion, or none. Never blocks.
    pub fn assess(
        &self,
        category: &str,
        items: &[ContentItem],
        ai: Option<AiOpinion>,
        now: DateTime<Utc>,
    ) -> EnhancedAssessment {
        let keyword = self.keyword_assessment(category, items);
        self.combine(keyword, items, ai.map(AiOpinion::normalized), now)
    }

    /// Fetch an AI opinion under the configured timeout, then assess.
    pub async fn assess_with_provider(
        &self,
        category: &str,
        items: &[ContentItem],
        provider: &dyn AiProvider,
        now: DateTime<Utc>,
    ) -> EnhancedAssessment {
        let keyword = self.keyword_assessment(category, items);
        let ai = fetch_opinion(provider, category, items, &keyword, self.ai_timeout()).await;
        self.combine(keyword, items, ai, now)
    }

    /// Assess many categories, fetching AI opinions concurrently.
    pub async fn assess_all(
        &self,
        batches: &[(String, Vec<ContentItem>)],
        provider: Option<&dyn AiProvider>,
        now: DateTime<Utc>,
    ) -> Vec<EnhancedAssessment> {
        let runs = batches.iter().map(|(category, items)| async move {
            match provider {
                Some(p) => self.assess_with_provider(category, items, p, now).await,
                None => self.assess(category, items, None, now),
            }
        });
        let out = join_all(runs).await;
        info!(
            categories = out.len(),
            flagged = out.iter().filter(|a| a.flagged_for_review()).count(),
            "batch assessment complete"
        );
        out
    }

    fn combine(
        &self,
        keyword: AssessmentResult,
        items: &[ContentItem],
        ai: Option<AiOpinion>,
        now: DateTime<Utc>,
    ) -> EnhancedAssessment {
        let auto_accept = self.rules.config().reconcile.auto_accept_confidence;
        let reconciliation = ai
            .as_ref()
            .map(|o| resolve_downgrade(keyword.status, o.status, o.confidence, auto_accept));
        let final_status = reconciliation
            .as_ref()
            .map_or(keyword.status, |r| r.final_status);

        let match_count = keyword.detail.as_ref().map_or(0, |d| d.counts.total());
        let coverage = data_coverage(
            &self.rules,
            items,
            match_count,
            keyword.status,
            ai.as_ref().map(|o| o.status),
        );

        let mut evidence_for: Vec<Evidence> = keyword
            .keyword_matches()
            .iter()
            .map(|m| Evidence {
                text: format!("{m}: {}", m.source_title),
                origin: EvidenceOrigin::Keyword,
                link: m.source_link.clone(),
            })
            .collect();
        let mut evidence_against = Vec::new();
        if let Some(detail) = &keyword.detail
            && detail.suppressed > 0
        {
            evidence_against.push(Evidence {
                text: format!(
                    "{} keyword occurrence(s) discounted by context or negation",
                    detail.suppressed
                ),
                origin: EvidenceOrigin::Keyword,
                link: None,
            });
        }
        let mut counter_evidence = Vec::new();
        if let Some(o) = &ai {
            evidence_for.extend(o.evidence_for.iter().map(|t| Evidence::ai(t)));
            evidence_against.extend(o.evidence_against.iter().map(|t| Evidence::ai(t)));
            counter_evidence.extend(o.how_we_could_be_wrong.iter().cloned());
        }

        info!(
            category = %keyword.category,
            keyword_status = %keyword.status,
            final_status = %final_status,
            confidence = coverage.confidence,
            ai = ai.is_some(),
            "assessment complete"
        );

        EnhancedAssessment {
            category: keyword.category.clone(),
            keyword,
            ai,
            final_status,
            reconciliation,
            confidence: coverage.confidence,
            coverage: coverage.factors,
            evidence_for,
            evidence_against,
            counter_evidence,
            assessed_at: now,
            trend_anomalies: None,
        }
    }
}
