//! Serializable rule configuration.
//!
//! Keyword dictionaries, suppression rules, weights and thresholds are plain
//! data loaded once at startup. [`RuleSet::compile`](crate::RuleSet::compile)
//! validates a [`RulesConfig`] and turns it into matchers; nothing mutates the
//! configuration afterwards.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::classify::DocumentClass;
use crate::error::ConfigError;
use crate::status::{Status, Tier};

const EMBEDDED_RULES: &str = include_str!("../rules/default.json");

/// Top-level rule document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default = "default_version")]
    pub version: String,
    /// Monitored categories keyed by category key.
    pub categories: BTreeMap<String, CategoryRules>,
    /// Global phrases that nullify any keyword match found near them.
    #[serde(default)]
    pub negation_patterns: Vec<String>,
    /// Agency markers whose items count as authoritative (GAO, IG, courts).
    #[serde(default)]
    pub authoritative_sources: Vec<String>,
    /// Required: a missing tier is a startup error.
    pub tier_weights: TierWeights,
    #[serde(default)]
    pub class_multipliers: ClassMultipliers,
    #[serde(default)]
    pub coverage: CoverageConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub temporal: TemporalConfig,
    /// Characters inspected on each side of a match for suppression terms.
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    #[serde(default)]
    pub convergence: ConvergenceConfig,
}

fn default_version() -> String {
    "1".to_string()
}

fn default_context_window() -> usize {
    80
}

impl RulesConfig {
    /// The rule set shipped with the crate.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_json_str(EMBEDDED_RULES)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }
}

/// Keyword rules for one category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryRules {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub keywords: TierKeywords,
    /// Suppression rules keyed by the keyword they bind to.
    #[serde(default)]
    pub suppression: BTreeMap<String, SuppressionRule>,
    #[serde(default)]
    pub volume_thresholds: VolumeThresholds,
    #[serde(default)]
    pub site_outage: Option<SiteOutageRule>,
}

/// Keyword lists per tier. Order within a list is preserved in output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TierKeywords {
    #[serde(default)]
    pub capture: Vec<String>,
    #[serde(default)]
    pub drift: Vec<String>,
    #[serde(default)]
    pub warning: Vec<String>,
}

impl TierKeywords {
    pub fn for_tier(&self, tier: Tier) -> &[String] {
        match tier {
            Tier::Capture => &self.capture,
            Tier::Drift => &self.drift,
            Tier::Warning => &self.warning,
        }
    }
}

/// Co-occurrence terms bound to a single keyword.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuppressionRule {
    /// Any of these near the keyword drops the match.
    #[serde(default)]
    pub suppress_if_any: Vec<String>,
    /// Any of these near the keyword demotes the match one tier.
    #[serde(default)]
    pub downweight_if_any: Vec<String>,
}

/// Count gates for status escalation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeThresholds {
    /// Warning-tier matches at which a warning-only batch escalates to Drift.
    pub warning_escalation: usize,
    /// Distinct drift-tier matches required for Drift.
    pub drift: usize,
    /// Distinct capture-tier matches required for Capture. Never below 2.
    pub capture: usize,
}

impl Default for VolumeThresholds {
    fn default() -> Self {
        Self {
            warning_escalation: 5,
            drift: 2,
            capture: 2,
        }
    }
}

/// Fixed status forced when a named source is reported down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteOutageRule {
    /// Case-insensitive marker matched against an error item's agency, link or
    /// title.
    pub source: String,
    pub status: Status,
    pub reason: String,
}

/// Per-tier severity weights. All three fields are required.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierWeights {
    pub capture: f64,
    pub drift: f64,
    pub warning: f64,
}

impl TierWeights {
    pub fn get(&self, tier: Tier) -> f64 {
        match tier {
            Tier::Capture => self.capture,
            Tier::Drift => self.drift,
            Tier::Warning => self.warning,
        }
    }
}

impl Default for TierWeights {
    fn default() -> Self {
        Self {
            capture: 4.0,
            drift: 2.0,
            warning: 1.0,
        }
    }
}

/// Severity multiplier per document class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassMultipliers {
    pub executive_order: f64,
    pub presidential_memorandum: f64,
    pub final_rule: f64,
    pub proposed_rule: f64,
    pub court_opinion: f64,
    pub report: f64,
    pub press_release: f64,
    pub notice: f64,
    pub unknown: f64,
}

impl ClassMultipliers {
    pub fn get(&self, class: DocumentClass) -> f64 {
        match class {
            DocumentClass::ExecutiveOrder => self.executive_order,
            DocumentClass::PresidentialMemorandum => self.presidential_memorandum,
            DocumentClass::FinalRule => self.final_rule,
            DocumentClass::ProposedRule => self.proposed_rule,
            DocumentClass::CourtOpinion => self.court_opinion,
            DocumentClass::Report => self.report,
            DocumentClass::PressRelease => self.press_release,
            DocumentClass::Notice => self.notice,
            DocumentClass::Unknown => self.unknown,
        }
    }
}

impl Default for ClassMultipliers {
    fn default() -> Self {
        Self {
            executive_order: 1.5,
            presidential_memorandum: 1.3,
            final_rule: 1.3,
            proposed_rule: 1.0,
            court_opinion: 1.2,
            report: 1.2,
            press_release: 0.8,
            notice: 0.5,
            unknown: 1.0,
        }
    }
}

/// Saturation points and weights for the data-coverage confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
    /// Distinct sources at which source diversity saturates.
    pub max_sources: usize,
    /// Distinct authoritative sources at which authority saturates.
    pub max_authoritative: usize,
    /// Valid items at which evidence coverage saturates.
    pub max_items: usize,
    /// Matches-per-item ratio at which keyword density saturates.
    pub density_cap: f64,
    pub weights: CoverageWeights,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            max_sources: 5,
            max_authoritative: 3,
            max_items: 20,
            density_cap: 0.5,
            weights: CoverageWeights::default(),
        }
    }
}

/// Factor weights; must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageWeights {
    pub source_diversity: f64,
    pub authority: f64,
    pub evidence_coverage: f64,
    pub keyword_density: f64,
    pub ai_agreement: f64,
}

impl CoverageWeights {
    pub fn sum(&self) -> f64 {
        self.source_diversity
            + self.authority
            + self.evidence_coverage
            + self.keyword_density
            + self.ai_agreement
    }

    fn values(&self) -> [f64; 5] {
        [
            self.source_diversity,
            self.authority,
            self.evidence_coverage,
            self.keyword_density,
            self.ai_agreement,
        ]
    }
}

impl Default for CoverageWeights {
    fn default() -> Self {
        Self {
            source_diversity: 0.20,
            authority: 0.20,
            evidence_coverage: 0.25,
            keyword_density: 0.15,
            ai_agreement: 0.20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// AI confidence at which a one-level downgrade is accepted without review.
    pub auto_accept_confidence: f64,
    /// Upper bound on waiting for an AI opinion.
    pub ai_timeout_secs: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            auto_accept_confidence: 0.7,
            ai_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalConfig {
    /// Weeks after which a past week's contribution halves.
    pub half_life_weeks: f64,
    /// Keywords kept per weekly aggregate.
    pub top_keywords: usize,
    /// |z| at which a week counts as anomalous.
    pub anomaly_z: f64,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            half_life_weeks: 4.0,
            top_keywords: 5,
            anomaly_z: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceConfig {
    /// Score at or above which two or more active themes count as entrenched.
    pub entrenchment_threshold: f64,
    pub themes: Vec<ThemeConfig>,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            entrenchment_threshold: 50.0,
            themes: Vec::new(),
        }
    }
}

/// One independent infrastructure theme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeConfig {
    pub id: String,
    pub label: String,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub suppression: BTreeMap<String, SuppressionRule>,
    /// Matches needed for the theme to be active.
    #[serde(default = "default_theme_threshold")]
    pub threshold: usize,
}

fn default_theme_threshold() -> usize {
    2
}

/// Check numeric invariants that cannot be expressed in the types.
pub(crate) fn validate(config: &RulesConfig) -> Result<(), ConfigError> {
    let invalid = |msg: String| Err(ConfigError::Invalid(msg));

    for (name, w) in [
        ("capture", config.tier_weights.capture),
        ("drift", config.tier_weights.drift),
        ("warning", config.tier_weights.warning),
    ] {
        if !w.is_finite() || w < 0.0 {
            return invalid(format!("tier weight '{name}' must be a non-negative number"));
        }
    }

    for class in DocumentClass::ALL {
        let m = config.class_multipliers.get(class);
        if !m.is_finite() || m < 0.0 {
            return invalid(format!("class multiplier '{class}' must be a non-negative number"));
        }
    }

    let cov = &config.coverage;
    if cov.max_sources == 0 || cov.max_authoritative == 0 || cov.max_items == 0 {
        return invalid("coverage saturation maxima must be positive".to_string());
    }
    if !(cov.density_cap.is_finite() && cov.density_cap > 0.0) {
        return invalid("coverage density_cap must be positive".to_string());
    }
    if cov.weights.values().iter().any(|w| !w.is_finite() || *w < 0.0) {
        return invalid("coverage weights must be non-negative numbers".to_string());
    }
    if (cov.weights.sum() - 1.0).abs() > 1e-6 {
        return invalid(format!(
            "coverage weights must sum to 1.0, got {}",
            cov.weights.sum()
        ));
    }

    let threshold = config.reconcile.auto_accept_confidence;
    if !(0.0..=1.0).contains(&threshold) {
        return invalid("reconcile auto_accept_confidence must be within [0, 1]".to_string());
    }

    if !(config.temporal.half_life_weeks.is_finite() && config.temporal.half_life_weeks > 0.0) {
        return invalid("temporal half_life_weeks must be positive".to_string());
    }

    for (key, rules) in &config.categories {
        let v = &rules.volume_thresholds;
        if v.capture < 2 {
            return invalid(format!(
                "category '{key}': capture threshold {} would skip corroboration",
                v.capture
            ));
        }
        if v.drift == 0 || v.warning_escalation == 0 {
            return invalid(format!("category '{key}': volume thresholds must be positive"));
        }
    }

    for theme in &config.convergence.themes {
        if theme.threshold == 0 {
            return invalid(format!("theme '{}': threshold must be positive", theme.id));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_rules_parse_and_validate() {
        let config = RulesConfig::embedded().unwrap();
        validate(&config).unwrap();
        assert!(!config.categories.is_empty());
        assert!(config.convergence.themes.len() >= 3);
        assert!(!config.negation_patterns.is_empty());
    }

    #[test]
    fn missing_tier_weight_is_a_parse_error() {
        let json = r#"{
            "categories": {},
            "tier_weights": { "capture": 4.0, "drift": 2.0 }
        }"#;
        let err = RulesConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn defaults_fill_optional_sections() {
        let json = r#"{
            "categories": { "courts": { "keywords": { "capture": ["defy court order"] } } },
            "tier_weights": { "capture": 4.0, "drift": 2.0, "warning": 1.0 }
        }"#;
        let config = RulesConfig::from_json_str(json).unwrap();
        assert_eq!(config.context_window, 80);
        assert_eq!(config.reconcile.auto_accept_confidence, 0.7);
        assert_eq!(config.categories["courts"].volume_thresholds.capture, 2);
        assert_eq!(config.class_multipliers.get(DocumentClass::ExecutiveOrder), 1.5);
        assert_eq!(config.class_multipliers.get(DocumentClass::Notice), 0.5);
        validate(&config).unwrap();
    }

    #[test]
    fn weights_must_sum_to_one() {
        let mut config = RulesConfig::embedded().unwrap();
        config.coverage.weights.ai_agreement = 0.5;
        assert!(matches!(validate(&config), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn capture_threshold_below_two_rejected() {
        let mut config = RulesConfig::embedded().unwrap();
        let first = config.categories.values_mut().next().unwrap();
        first.volume_thresholds.capture = 1;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn negative_tier_weight_rejected() {
        let mut config = RulesConfig::embedded().unwrap();
        config.tier_weights.drift = -1.0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn load_missing_file_errors() {
        let err = RulesConfig::load(Path::new("/nonexistent/rules.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
