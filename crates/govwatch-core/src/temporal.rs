//! Weekly aggregation and decay-weighted cumulative scoring.
//!
//! Weekly aggregates are a pure function of per-document scores: grouping is
//! by `(category, week)` in sorted order and documents are summed in
//! document-id order, so recomputing from the same rows reproduces identical
//! values. Cumulative views are one linear pass over a category's weeks,
//! oldest first.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::classify::DocumentClass;
use crate::scoring::TierCounts;

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Severity of one document within one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentScore {
    pub category: String,
    pub document_id: String,
    pub title: String,
    /// ISO week start (Monday) of the document's publish date.
    pub week_of: NaiveDate,
    pub document_class: DocumentClass,
    pub counts: TierCounts,
    pub severity: f64,
    pub keywords: Vec<String>,
}

/// One row per `(category, week)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyAggregate {
    pub category: String,
    pub week_of: NaiveDate,
    pub total_severity: f64,
    pub document_count: usize,
    pub average_severity: f64,
    pub capture_proportion: f64,
    pub drift_proportion: f64,
    pub warning_proportion: f64,
    pub top_keywords: Vec<String>,
}

/// Fold document scores into weekly aggregates, ordered by category then week.
pub fn aggregate_weekly(scores: &[DocumentScore], top_keywords: usize) -> Vec<WeeklyAggregate> {
    let mut groups: BTreeMap<(&str, NaiveDate), Vec<&DocumentScore>> = BTreeMap::new();
    for score in scores {
        groups
            .entry((score.category.as_str(), score.week_of))
            .or_default()
            .push(score);
    }

    groups
        .into_iter()
        .map(|((category, week_of), mut docs)| {
            docs.sort_by(|a, b| a.document_id.cmp(&b.document_id));
            aggregate_week(category, week_of, &docs, top_keywords)
        })
        .collect()
}

fn aggregate_week(
    category: &str,
    week_of: NaiveDate,
    docs: &[&DocumentScore],
    top_keywords: usize,
) -> WeeklyAggregate {
    let mut total_severity = 0.0;
    let mut counts = TierCounts::default();
    let mut keyword_freq: HashMap<&str, usize> = HashMap::new();

    for doc in docs {
        total_severity += doc.severity;
        counts.capture += doc.counts.capture;
        counts.drift += doc.counts.drift;
        counts.warning += doc.counts.warning;
        for kw in &doc.keywords {
            *keyword_freq.entry(kw.as_str()).or_default() += 1;
        }
    }

    let share = |n: usize| {
        let total = counts.total();
        if total == 0 { 0.0 } else { n as f64 / total as f64 }
    };

    let mut ranked: Vec<(&str, usize)> = keyword_freq.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let document_count = docs.len();
    WeeklyAggregate {
        category: category.to_string(),
        week_of,
        total_severity,
        document_count,
        average_severity: if document_count == 0 {
            0.0
        } else {
            total_severity / document_count as f64
        },
        capture_proportion: share(counts.capture),
        drift_proportion: share(counts.drift),
        warning_proportion: share(counts.warning),
        top_keywords: ranked
            .into_iter()
            .take(top_keywords)
            .map(|(k, _)| k.to_string())
            .collect(),
    }
}

/// Cumulative view of a category's weekly series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CumulativeScores {
    pub category: String,
    pub as_of_week: Option<NaiveDate>,
    pub running_sum: f64,
    pub running_average: f64,
    pub week_count: usize,
    pub high_water_mark: f64,
    /// Earliest week that reached the high-water mark.
    pub high_water_week: Option<NaiveDate>,
    pub current_week_score: f64,
    pub decay_weighted_score: f64,
    pub half_life_weeks: f64,
}

impl CumulativeScores {
    /// Zeroed scores, used when no weeks exist or the store is unavailable.
    pub fn empty(category: &str, half_life_weeks: f64) -> Self {
        Self {
            category: category.to_string(),
            as_of_week: None,
            running_sum: 0.0,
            running_average: 0.0,
            week_count: 0,
            high_water_mark: 0.0,
            high_water_week: None,
            current_week_score: 0.0,
            decay_weighted_score: 0.0,
            half_life_weeks,
        }
    }
}

/// Cumulative state after one week, for charting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CumulativePoint {
    pub week_of: NaiveDate,
    pub week_score: f64,
    pub running_sum: f64,
    pub running_average: f64,
    pub high_water_mark: f64,
    pub decay_weighted_score: f64,
}

/// Per-week retention factor `0.5^(1/half_life)`.
///
/// A non-positive or non-finite half-life retains nothing, so the decayed
/// score collapses to the latest week.
fn retention(half_life_weeks: f64) -> f64 {
    if half_life_weeks.is_finite() && half_life_weeks > 0.0 {
        0.5f64.powf(1.0 / half_life_weeks)
    } else {
        0.0
    }
}

fn category_weeks<'a>(category: &str, weeks: &'a [WeeklyAggregate]) -> Vec<&'a WeeklyAggregate> {
    let mut rows: Vec<&WeeklyAggregate> = weeks.iter().filter(|w| w.category == category).collect();
    rows.sort_by_key(|w| w.week_of);
    rows
}

/// Walk a category's weeks oldest to newest and emit the running state.
///
/// Week `i` of `n` contributes `score_i * 0.5^((n - 1 - i) / half_life)` to
/// the decayed score, computed incrementally.
pub fn cumulative_series(
    category: &str,
    weeks: &[WeeklyAggregate],
    half_life_weeks: f64,
) -> Vec<CumulativePoint> {
    let keep = retention(half_life_weeks);
    let mut running_sum = 0.0;
    let mut high_water_mark = f64::NEG_INFINITY;
    let mut decayed = 0.0;

    category_weeks(category, weeks)
        .into_iter()
        .enumerate()
        .map(|(i, week)| {
            let score = week.total_severity;
            running_sum += score;
            if score > high_water_mark {
                high_water_mark = score;
            }
            decayed = decayed * keep + score;
            CumulativePoint {
                week_of: week.week_of,
                week_score: score,
                running_sum,
                running_average: running_sum / (i + 1) as f64,
                high_water_mark,
                decay_weighted_score: decayed,
            }
        })
        .collect()
}

/// Cumulative scores for one category as of its latest week.
pub fn cumulative_scores(
    category: &str,
    weeks: &[WeeklyAggregate],
    half_life_weeks: f64,
) -> CumulativeScores {
    let keep = retention(half_life_weeks);
    let mut out = CumulativeScores::empty(category, half_life_weeks);

    for week in category_weeks(category, weeks) {
        let score = week.total_severity;
        out.running_sum += score;
        out.week_count += 1;
        if out.high_water_week.is_none() || score > out.high_water_mark {
            out.high_water_mark = score;
            out.high_water_week = Some(week.week_of);
        }
        out.current_week_score = score;
        out.decay_weighted_score = out.decay_weighted_score * keep + score;
        out.as_of_week = Some(week.week_of);
    }

    if out.week_count > 0 {
        out.running_average = out.running_sum / out.week_count as f64;
    }
    out
}
