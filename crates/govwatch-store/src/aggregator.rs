//! Weekly aggregation and cumulative scoring over a [`ScoreStore`].
//!
//! Weekly rows are always rebuilt from stored document scores, so a
//! recompute is idempotent. Cumulative views are derived on read and never
//! stored. Read failures degrade to zeroed output with a warning.

use govwatch_core::config::TemporalConfig;
use govwatch_core::temporal::{aggregate_weekly, cumulative_scores, cumulative_series};
use govwatch_core::trends::detect_anomalies;
use govwatch_core::{CumulativePoint, CumulativeScores, DocumentScore, TrendAnomaly, WeeklyAggregate};
use tracing::{info, warn};

use crate::{ScoreStore, StoreError, WeekRange};

pub struct TemporalService<S> {
    store: S,
    config: TemporalConfig,
}

impl<S: ScoreStore> TemporalService<S> {
    pub fn new(store: S, config: TemporalConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn record(&mut self, scores: &[DocumentScore]) -> Result<usize, StoreError> {
        self.store.put_document_scores(scores)
    }

    /// Rebuild every weekly row for `category`, replacing what was stored.
    pub fn recompute_weekly(&mut self, category: &str) -> Result<Vec<WeeklyAggregate>, StoreError> {
        let scores = self.store.document_scores(category, WeekRange::all())?;
        let weeks = aggregate_weekly(&scores, self.config.top_keywords);
        self.store.replace_weekly(category, &weeks)?;
        info!(category, documents = scores.len(), weeks = weeks.len(), "weekly aggregates recomputed");
        Ok(weeks)
    }

    /// Recompute every stored category; returns the number of weekly rows written.
    pub fn recompute_all(&mut self) -> Result<usize, StoreError> {
        let mut written = 0;
        for category in self.store.categories()? {
            written += self.recompute_weekly(&category)?.len();
        }
        Ok(written)
    }

    fn weeks_or_empty(&self, category: &str) -> Vec<WeeklyAggregate> {
        match self.store.weekly_range(category, WeekRange::all()) {
            Ok(weeks) => weeks,
            Err(e) => {
                warn!(category, error = %e, "weekly aggregates unavailable");
                Vec::new()
            }
        }
    }

    /// Cumulative scores as of the latest stored week.
    pub fn cumulative(&self, category: &str) -> CumulativeScores {
        let weeks = self.weeks_or_empty(category);
        cumulative_scores(category, &weeks, self.config.half_life_weeks)
    }

    pub fn series(&self, category: &str) -> Vec<CumulativePoint> {
        let weeks = self.weeks_or_empty(category);
        cumulative_series(category, &weeks, self.config.half_life_weeks)
    }

    pub fn anomalies(&self, category: &str) -> Vec<TrendAnomaly> {
        let weeks = self.weeks_or_empty(category);
        detect_anomalies(category, &weeks, self.config.anomaly_z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use chrono::{Duration, NaiveDate};
    use govwatch_core::{DocumentClass, TierCounts};

    fn score(id: &str, week: i64, severity: f64) -> DocumentScore {
        DocumentScore {
            category: "courts".into(),
            document_id: id.into(),
            title: id.into(),
            week_of: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap() + Duration::weeks(week),
            document_class: DocumentClass::CourtOpinion,
            counts: TierCounts::new(1, 0, 0),
            severity,
            keywords: vec!["defied court order".into()],
        }
    }

    fn config(half_life_weeks: f64) -> TemporalConfig {
        TemporalConfig {
            half_life_weeks,
            ..TemporalConfig::default()
        }
    }

    struct Down;

    impl ScoreStore for Down {
        fn put_document_scores(&mut self, _: &[DocumentScore]) -> Result<usize, StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }
        fn document_scores(&self, _: &str, _: WeekRange) -> Result<Vec<DocumentScore>, StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }
        fn put_weekly(&mut self, _: &[WeeklyAggregate]) -> Result<usize, StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }
        fn replace_weekly(&mut self, _: &str, _: &[WeeklyAggregate]) -> Result<usize, StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }
        fn weekly_range(&self, _: &str, _: WeekRange) -> Result<Vec<WeeklyAggregate>, StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }
        fn categories(&self) -> Result<Vec<String>, StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }
    }

    #[test]
    fn recompute_then_cumulative() {
        let mut svc = TemporalService::new(MemoryStore::new(), config(1.0));
        svc.record(&[score("a", 0, 4.0), score("b", 0, 6.0), score("c", 1, 20.0)])
            .unwrap();
        let weeks = svc.recompute_weekly("courts").unwrap();
        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[0].total_severity, 10.0);

        let c = svc.cumulative("courts");
        assert_eq!(c.week_count, 2);
        assert!((c.decay_weighted_score - 25.0).abs() < 1e-12);
        assert_eq!(svc.series("courts").len(), 2);
    }

    #[test]
    fn recompute_is_idempotent() {
        let mut svc = TemporalService::new(MemoryStore::new(), config(4.0));
        svc.record(&[score("a", 0, 4.0), score("b", 1, 6.0)]).unwrap();
        let first = svc.recompute_weekly("courts").unwrap();
        let second = svc.recompute_weekly("courts").unwrap();
        assert_eq!(first, second);
        assert_eq!(svc.recompute_all().unwrap(), 2);
        assert_eq!(
            svc.store().weekly_range("courts", WeekRange::all()).unwrap(),
            first
        );
    }

    #[test]
    fn moved_document_leaves_no_stale_week() {
        let mut svc = TemporalService::new(MemoryStore::new(), config(4.0));
        svc.record(&[score("a", 0, 10.0)]).unwrap();
        svc.recompute_weekly("courts").unwrap();

        svc.record(&[score("a", 1, 10.0)]).unwrap();
        let fresh = svc.recompute_weekly("courts").unwrap();
        assert_eq!(fresh.len(), 1);
        assert_eq!(svc.store().weekly_range("courts", WeekRange::all()).unwrap(), fresh);

        let c = svc.cumulative("courts");
        assert_eq!(c.week_count, 1);
        assert_eq!(c.running_sum, 10.0);
    }

    #[test]
    fn unavailable_store_degrades_to_empty() {
        let mut svc = TemporalService::new(Down, config(4.0));
        assert!(svc.recompute_weekly("courts").is_err());
        assert_eq!(svc.cumulative("courts"), CumulativeScores::empty("courts", 4.0));
        assert!(svc.series("courts").is_empty());
        assert!(svc.anomalies("courts").is_empty());
    }
}
