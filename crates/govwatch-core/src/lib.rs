pub mod assessment;
pub mod classify;
pub mod config;
pub mod convergence;
pub mod error;
pub mod item;
pub mod matcher;
pub mod rules;
pub mod schema;
pub mod scoring;
pub mod status;
pub mod temporal;
pub mod tiers;
pub mod trends;

pub use assessment::{AssessmentDetail, AssessmentResult, KeywordMatch, MatchProvenance};
pub use classify::{DocumentClass, classify};
pub use config::RulesConfig;
pub use convergence::{
    CategorySnapshot, ConvergenceLevel, ConvergencePoint, InfrastructureAssessment,
    InfrastructureThemeResult,
};
pub use error::{ConfigError, SchemaError};
pub use item::ContentItem;
pub use rules::RuleSet;
pub use scoring::{CoverageFactors, DataCoverage, TierCounts, data_coverage};
pub use status::{Status, Tier};
pub use temporal::{CumulativePoint, CumulativeScores, DocumentScore, WeeklyAggregate, week_start};
pub use tiers::TierEngine;
pub use trends::TrendAnomaly;
