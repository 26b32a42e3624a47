//! Compiled, read-only rule set.

use std::collections::{BTreeMap, HashSet};

use tracing::{info, warn};

use crate::classify;
use crate::config::{
    self, RulesConfig, SiteOutageRule, SuppressionRule, ThemeConfig, VolumeThresholds,
};
use crate::error::ConfigError;
use crate::item::ContentItem;
use crate::matcher::{KeywordPattern, TermSet};
use crate::status::Tier;

/// A keyword bound to its dictionary tier.
#[derive(Debug, Clone)]
pub struct TieredKeyword {
    pub tier: Tier,
    pub pattern: KeywordPattern,
}

/// Compiled rules for one category.
#[derive(Debug, Clone)]
pub struct CategoryMatcher {
    pub key: String,
    pub label: String,
    /// Keywords ordered capture, drift, warning; each keyword appears once.
    pub keywords: Vec<TieredKeyword>,
    pub volume: VolumeThresholds,
    pub site_outage: Option<SiteOutageRule>,
}

/// Compiled rules for one convergence theme.
#[derive(Debug, Clone)]
pub struct ThemeMatcher {
    pub id: String,
    pub label: String,
    pub keywords: Vec<KeywordPattern>,
    pub threshold: usize,
}

/// Validated configuration plus precompiled matchers.
///
/// Built once at startup and shared read-only (typically behind an `Arc`).
#[derive(Debug, Clone)]
pub struct RuleSet {
    config: RulesConfig,
    categories: BTreeMap<String, CategoryMatcher>,
    negations: TermSet,
    authoritative: TermSet,
    themes: Vec<ThemeMatcher>,
}

impl RuleSet {
    /// Validate `config` and compile every keyword and term.
    pub fn compile(config: RulesConfig) -> Result<Self, ConfigError> {
        config::validate(&config)?;

        let mut categories = BTreeMap::new();
        for (key, rules) in &config.categories {
            let keywords = compile_tiers(key, rules)?;
            categories.insert(
                key.clone(),
                CategoryMatcher {
                    key: key.clone(),
                    label: rules.label.clone().unwrap_or_else(|| key.clone()),
                    keywords,
                    volume: rules.volume_thresholds,
                    site_outage: rules.site_outage.clone(),
                },
            );
        }

        let themes = config
            .convergence
            .themes
            .iter()
            .map(compile_theme)
            .collect::<Result<Vec<_>, _>>()?;

        let rule_set = Self {
            negations: TermSet::compile(&config.negation_patterns)?,
            authoritative: TermSet::compile(&config.authoritative_sources)?,
            categories,
            themes,
            config,
        };
        info!(
            version = %rule_set.config.version,
            categories = rule_set.categories.len(),
            themes = rule_set.themes.len(),
            "compiled rule set"
        );
        Ok(rule_set)
    }

    /// Compile the rules shipped with the crate.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::compile(RulesConfig::embedded()?)
    }

    pub fn config(&self) -> &RulesConfig {
        &self.config
    }

    pub fn category(&self, key: &str) -> Option<&CategoryMatcher> {
        self.categories.get(key)
    }

    pub fn category_keys(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn negations(&self) -> &TermSet {
        &self.negations
    }

    pub fn themes(&self) -> &[ThemeMatcher] {
        &self.themes
    }

    pub fn context_window(&self) -> usize {
        self.config.context_window
    }

    /// Whether an item comes from an authoritative source: an authoritative
    /// document class, or a configured marker in its agency.
    pub fn is_authoritative_item(&self, item: &ContentItem) -> bool {
        classify::classify(item).is_authoritative()
            || item.agency.as_deref().is_some_and(|a| self.authoritative.is_match(a))
    }
}

fn compile_tiers(
    category: &str,
    rules: &config::CategoryRules,
) -> Result<Vec<TieredKeyword>, ConfigError> {
    let suppression = lowercase_keys(&rules.suppression);
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for tier in Tier::DESCENDING {
        for keyword in rules.keywords.for_tier(tier) {
            let key = keyword.trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            if !seen.insert(key.clone()) {
                warn!(category, keyword = %key, %tier, "keyword listed in more than one tier; keeping the higher tier");
                continue;
            }
            let rule = suppression.get(&key).copied();
            let pattern = KeywordPattern::compile(
                keyword,
                rule.map(|r| r.suppress_if_any.as_slice()).unwrap_or_default(),
                rule.map(|r| r.downweight_if_any.as_slice()).unwrap_or_default(),
            )?;
            out.push(TieredKeyword { tier, pattern });
        }
    }

    for key in suppression.keys() {
        if !seen.contains(key) {
            warn!(category, keyword = %key, "suppression rule bound to unknown keyword");
        }
    }

    Ok(out)
}

fn compile_theme(theme: &ThemeConfig) -> Result<ThemeMatcher, ConfigError> {
    let suppression = lowercase_keys(&theme.suppression);
    let mut seen = HashSet::new();
    let mut keywords = Vec::new();
    for keyword in &theme.keywords {
        let key = keyword.trim().to_lowercase();
        if key.is_empty() || !seen.insert(key.clone()) {
            continue;
        }
        let rule = suppression.get(&key).copied();
        keywords.push(KeywordPattern::compile(
            keyword,
            rule.map(|r| r.suppress_if_any.as_slice()).unwrap_or_default(),
            rule.map(|r| r.downweight_if_any.as_slice()).unwrap_or_default(),
        )?);
    }
    Ok(ThemeMatcher {
        id: theme.id.clone(),
        label: theme.label.clone(),
        keywords,
        threshold: theme.threshold,
    })
}

fn lowercase_keys(rules: &BTreeMap<String, SuppressionRule>) -> BTreeMap<String, &SuppressionRule> {
    rules
        .iter()
        .map(|(k, v)| (k.trim().to_lowercase(), v))
        .collect()
}
