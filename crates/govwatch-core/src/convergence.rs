//! Multi-theme convergence detection.
//!
//! Independent infrastructure themes (detention, surveillance,
//! criminalization of opposition, ...) are scanned across the evidence of
//! every category at once. A theme is active when its match count reaches its
//! threshold; its intensity is that count. The convergence score is the
//! product of active intensities once two or more themes are active, since
//! simultaneous buildup across independent domains is rarer than depth in a
//! single one.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::rules::{RuleSet, ThemeMatcher};

/// Evidence texts currently attributed to one category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorySnapshot {
    pub category: String,
    pub texts: Vec<String>,
}

impl CategorySnapshot {
    pub fn new(category: impl Into<String>, texts: Vec<String>) -> Self {
        Self {
            category: category.into(),
            texts,
        }
    }
}

/// A theme keyword found in one category's evidence.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ThemeMatch {
    pub keyword: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfrastructureThemeResult {
    pub theme_id: String,
    pub label: String,
    pub active: bool,
    pub threshold: usize,
    /// Distinct `(keyword, category)` pairs; also the theme's intensity.
    pub match_count: usize,
    pub matches: Vec<ThemeMatch>,
    pub categories_involved: Vec<String>,
    pub suppressed: usize,
}

impl InfrastructureThemeResult {
    pub fn intensity(&self) -> usize {
        self.match_count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvergenceLevel {
    /// No active themes.
    None,
    /// One active theme.
    Emerging,
    /// Two or more active themes below the entrenchment threshold.
    Active,
    /// Two or more active themes at or above the entrenchment threshold.
    Entrenched,
}

impl ConvergenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Emerging => "emerging",
            Self::Active => "active",
            Self::Entrenched => "entrenched",
        }
    }
}

impl fmt::Display for ConvergenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfrastructureAssessment {
    pub themes: Vec<InfrastructureThemeResult>,
    pub active_theme_count: usize,
    pub convergence_score: f64,
    pub level: ConvergenceLevel,
    pub assessed_at: DateTime<Utc>,
}

impl InfrastructureAssessment {
    pub fn to_point(&self) -> ConvergencePoint {
        ConvergencePoint {
            recorded_at: self.assessed_at,
            score: self.convergence_score,
            level: self.level,
            active_themes: self
                .themes
                .iter()
                .filter(|t| t.active)
                .map(|t| t.theme_id.clone())
                .collect(),
        }
    }
}

/// Snapshot of the convergence state for history charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergencePoint {
    pub recorded_at: DateTime<Utc>,
    pub score: f64,
    pub level: ConvergenceLevel,
    pub active_themes: Vec<String>,
}

/// Product of the non-zero intensities, or 0 when fewer than two are non-zero.
pub fn convergence_score(intensities: &[usize]) -> f64 {
    let active: Vec<usize> = intensities.iter().copied().filter(|&i| i > 0).collect();
    if active.len() < 2 {
        return 0.0;
    }
    active.iter().map(|&i| i as f64).product()
}

pub fn convergence_level(active_themes: usize, score: f64, entrenchment_threshold: f64) -> ConvergenceLevel {
    match active_themes {
        0 => ConvergenceLevel::None,
        1 => ConvergenceLevel::Emerging,
        _ if score >= entrenchment_threshold => ConvergenceLevel::Entrenched,
        _ => ConvergenceLevel::Active,
    }
}

/// Scan one theme across every category snapshot.
pub fn scan_theme(rules: &RuleSet, theme: &ThemeMatcher, snapshots: &[CategorySnapshot]) -> InfrastructureThemeResult {
    let negations = rules.negations();
    let window = rules.context_window();
    let mut matched: BTreeSet<ThemeMatch> = BTreeSet::new();
    let mut suppressed = 0;

    for snapshot in snapshots {
        for text in &snapshot.texts {
            for keyword in &theme.keywords {
                let occ = keyword.scan(text, negations, window);
                // Themes have no lower tier, so demoted occurrences drop out.
                suppressed += occ.suppressed + occ.demoted;
                if occ.kept > 0 {
                    matched.insert(ThemeMatch {
                        keyword: keyword.keyword().to_string(),
                        category: snapshot.category.clone(),
                    });
                }
            }
        }
    }

    let categories_involved: BTreeSet<&str> = matched.iter().map(|m| m.category.as_str()).collect();
    let categories_involved = categories_involved.into_iter().map(String::from).collect();
    let match_count = matched.len();

    InfrastructureThemeResult {
        theme_id: theme.id.clone(),
        label: theme.label.clone(),
        active: match_count >= theme.threshold,
        threshold: theme.threshold,
        match_count,
        matches: matched.into_iter().collect(),
        categories_involved,
        suppressed,
    }
}

/// Evaluate every configured theme against current category evidence.
pub fn analyze(rules: &RuleSet, snapshots: &[CategorySnapshot], now: DateTime<Utc>) -> InfrastructureAssessment {
    let themes: Vec<InfrastructureThemeResult> = rules
        .themes()
        .iter()
        .map(|theme| scan_theme(rules, theme, snapshots))
        .collect();

    let intensities: Vec<usize> = themes
        .iter()
        .map(|t| if t.active { t.intensity() } else { 0 })
        .collect();
    let active_theme_count = themes.iter().filter(|t| t.active).count();
    let convergence_score = convergence_score(&intensities);
    let level = convergence_level(
        active_theme_count,
        convergence_score,
        rules.config().convergence.entrenchment_threshold,
    );

    info!(
        active = active_theme_count,
        score = convergence_score,
        %level,
        "convergence analysis"
    );

    InfrastructureAssessment {
        themes,
        active_theme_count,
        convergence_score,
        level,
        assessed_at: now,
    }
}
