//! AI provider contract.
//!
//! Providers are external and may be slow or fail. [`fetch_opinion`] is the
//! only way the assessor talks to one: it applies a timeout and turns every
//! failure into `None`, so callers fall back to keyword-only output.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use govwatch_core::{AssessmentResult, ContentItem, Status};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// An AI provider's view of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiOpinion {
    #[serde(default)]
    pub provider: String,
    pub status: Status,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub evidence_for: Vec<String>,
    #[serde(default)]
    pub evidence_against: Vec<String>,
    #[serde(default)]
    pub how_we_could_be_wrong: Vec<String>,
}

impl AiOpinion {
    pub fn new(provider: impl Into<String>, status: Status, confidence: f64) -> Self {
        Self {
            provider: provider.into(),
            status,
            confidence,
            reasoning: String::new(),
            evidence_for: Vec::new(),
            evidence_against: Vec::new(),
            how_we_could_be_wrong: Vec::new(),
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    /// Clamp confidence into [0, 1], mapping NaN to 0.
    pub fn normalized(mut self) -> Self {
        self.confidence = if self.confidence.is_nan() {
            0.0
        } else {
            self.confidence.clamp(0.0, 1.0)
        };
        self
    }
}

#[derive(Debug, Error)]
pub enum AiError {
    #[error("provider '{provider}' timed out after {secs}s")]
    Timeout { provider: String, secs: u64 },

    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("no opinion for category '{0}'")]
    NoOpinion(String),

    #[error("failed to read opinions file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("opinion JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Source of AI opinions for a category's items.
#[async_trait]
pub trait AiProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Assess one category. The keyword result is context; the provider's
    /// status is clamped to it later regardless of what it returns.
    async fn assess(
        &self,
        category: &str,
        items: &[ContentItem],
        keyword: &AssessmentResult,
    ) -> Result<AiOpinion, AiError>;
}

/// Ask a provider for an opinion, giving up after `timeout`.
///
/// Failures and timeouts are logged and yield `None`.
pub async fn fetch_opinion(
    provider: &dyn AiProvider,
    category: &str,
    items: &[ContentItem],
    keyword: &AssessmentResult,
    timeout: Duration,
) -> Option<AiOpinion> {
    let name = provider.name();
    let result = match tokio::time::timeout(timeout, provider.assess(category, items, keyword)).await {
        Ok(result) => result,
        Err(_) => Err(AiError::Timeout {
            provider: name.to_string(),
            secs: timeout.as_secs(),
        }),
    };

    match result {
        Ok(opinion) => {
            let mut opinion = opinion.normalized();
            if opinion.provider.is_empty() {
                opinion.provider = name.to_string();
            }
            debug!(category, provider = name, status = %opinion.status, "AI opinion received");
            Some(opinion)
        }
        Err(AiError::NoOpinion(_)) => {
            debug!(category, provider = name, "no AI opinion available");
            None
        }
        Err(e) => {
            warn!(category, provider = name, error = %e, "AI opinion unavailable, using keyword result");
            None
        }
    }
}

/// Pre-computed opinions keyed by category, read from a JSON object.
#[derive(Debug, Clone, Default)]
pub struct FileProvider {
    opinions: BTreeMap<String, AiOpinion>,
}

impl FileProvider {
    pub fn load(path: &Path) -> Result<Self, AiError> {
        let text = std::fs::read_to_string(path).map_err(|source| AiError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(json: &str) -> Result<Self, AiError> {
        Ok(Self {
            opinions: serde_json::from_str(json)?,
        })
    }

    pub fn from_map(opinions: BTreeMap<String, AiOpinion>) -> Self {
        Self { opinions }
    }

    pub fn len(&self) -> usize {
        self.opinions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opinions.is_empty()
    }
}

#[async_trait]
impl AiProvider for FileProvider {
    fn name(&self) -> &str {
        "file"
    }

    async fn assess(
        &self,
        category: &str,
        _items: &[ContentItem],
        _keyword: &AssessmentResult,
    ) -> Result<AiOpinion, AiError> {
        self.opinions
            .get(category)
            .cloned()
            .ok_or_else(|| AiError::NoOpinion(category.to_string()))
    }
}
