//! Cross-category trend statistics over weekly aggregates.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::temporal::WeeklyAggregate;

/// Sum of squared deviations too small to tell apart from rounding residue.
fn negligible(sum_sq_dev: f64, sum_sq: f64) -> bool {
    sum_sq_dev <= f64::EPSILON * sum_sq
}

/// Pearson correlation of two equal-length series.
///
/// Returns 0 when fewer than two points are paired or either side has zero
/// variance.
pub fn pearson_correlation(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    let mut sq_x = 0.0;
    let mut sq_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
        sq_x += x * x;
        sq_y += y * y;
    }
    if negligible(var_x, sq_x) || negligible(var_y, sq_y) {
        return 0.0;
    }

    let denom = (var_x * var_y).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }
    (cov / denom).clamp(-1.0, 1.0)
}

/// Correlation between two categories' weekly severity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCorrelation {
    pub left: String,
    pub right: String,
    pub coefficient: f64,
    /// Weeks present in both series.
    pub shared_weeks: usize,
}

fn severity_by_week(category: &str, weeks: &[WeeklyAggregate]) -> BTreeMap<NaiveDate, f64> {
    weeks
        .iter()
        .filter(|w| w.category == category)
        .map(|w| (w.week_of, w.total_severity))
        .collect()
}

/// Correlate two categories over the weeks both have data for.
pub fn correlate_categories(left: &str, right: &str, weeks: &[WeeklyAggregate]) -> CategoryCorrelation {
    let a = severity_by_week(left, weeks);
    let b = severity_by_week(right, weeks);
    let (xs, ys): (Vec<f64>, Vec<f64>) = a
        .iter()
        .filter_map(|(week, x)| b.get(week).map(|y| (*x, *y)))
        .unzip();

    CategoryCorrelation {
        left: left.to_string(),
        right: right.to_string(),
        coefficient: pearson_correlation(&xs, &ys),
        shared_weeks: xs.len(),
    }
}

/// Every unordered pair of categories present in `weeks`, sorted by name.
pub fn correlation_matrix(weeks: &[WeeklyAggregate]) -> Vec<CategoryCorrelation> {
    let mut categories: Vec<&str> = weeks.iter().map(|w| w.category.as_str()).collect();
    categories.sort_unstable();
    categories.dedup();

    let mut out = Vec::new();
    for (i, left) in categories.iter().enumerate() {
        for right in &categories[i + 1..] {
            out.push(correlate_categories(left, right, weeks));
        }
    }
    out
}

/// A week whose severity deviates from the category's mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnomaly {
    pub category: String,
    pub week_of: NaiveDate,
    pub score: f64,
    pub z_score: f64,
}

/// Weeks whose severity lies at least `z_threshold` standard deviations from
/// the category mean. Needs three or more weeks and non-zero variance.
pub fn detect_anomalies(category: &str, weeks: &[WeeklyAggregate], z_threshold: f64) -> Vec<TrendAnomaly> {
    let series = severity_by_week(category, weeks);
    if series.len() < 3 {
        return Vec::new();
    }
    let n = series.len() as f64;
    let mean = series.values().sum::<f64>() / n;
    let sum_sq_dev = series.values().map(|s| (s - mean).powi(2)).sum::<f64>();
    let sum_sq = series.values().map(|s| s * s).sum::<f64>();
    let sd = (sum_sq_dev / n).sqrt();
    if negligible(sum_sq_dev, sum_sq) || !sd.is_finite() {
        return Vec::new();
    }

    series
        .into_iter()
        .filter_map(|(week_of, score)| {
            let z = (score - mean) / sd;
            (z.abs() >= z_threshold).then(|| TrendAnomaly {
                category: category.to_string(),
                week_of,
                score,
                z_score: z,
            })
        })
        .collect()
}
