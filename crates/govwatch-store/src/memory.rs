//! In-process store, used by the CLI without `--db` and by tests.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use govwatch_core::{DocumentScore, WeeklyAggregate};

use crate::{ScoreStore, StoreError, WeekRange};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: BTreeMap<(String, String), DocumentScore>,
    weekly: BTreeMap<(String, NaiveDate), WeeklyAggregate>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScoreStore for MemoryStore {
    fn put_document_scores(&mut self, scores: &[DocumentScore]) -> Result<usize, StoreError> {
        for score in scores {
            self.documents.insert(
                (score.category.clone(), score.document_id.clone()),
                score.clone(),
            );
        }
        Ok(scores.len())
    }

    fn document_scores(&self, category: &str, range: WeekRange) -> Result<Vec<DocumentScore>, StoreError> {
        let mut out: Vec<DocumentScore> = self
            .documents
            .values()
            .filter(|s| s.category == category && range.contains(s.week_of))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.week_of.cmp(&b.week_of).then_with(|| a.document_id.cmp(&b.document_id)));
        Ok(out)
    }

    fn put_weekly(&mut self, weeks: &[WeeklyAggregate]) -> Result<usize, StoreError> {
        for week in weeks {
            self.weekly
                .insert((week.category.clone(), week.week_of), week.clone());
        }
        Ok(weeks.len())
    }

    fn replace_weekly(&mut self, category: &str, weeks: &[WeeklyAggregate]) -> Result<usize, StoreError> {
        self.weekly.retain(|(c, _), _| c != category);
        self.put_weekly(weeks)
    }

    fn weekly_range(&self, category: &str, range: WeekRange) -> Result<Vec<WeeklyAggregate>, StoreError> {
        Ok(self
            .weekly
            .values()
            .filter(|w| w.category == category && range.contains(w.week_of))
            .cloned()
            .collect())
    }

    fn categories(&self) -> Result<Vec<String>, StoreError> {
        let set: BTreeSet<&String> = self
            .documents
            .keys()
            .map(|(c, _)| c)
            .chain(self.weekly.keys().map(|(c, _)| c))
            .collect();
        Ok(set.into_iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use govwatch_core::{DocumentClass, TierCounts};

    fn score(category: &str, id: &str, day: u32, severity: f64) -> DocumentScore {
        DocumentScore {
            category: category.into(),
            document_id: id.into(),
            title: id.into(),
            week_of: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
            document_class: DocumentClass::Notice,
            counts: TierCounts::new(0, 0, 1),
            severity,
            keywords: vec!["injunction".into()],
        }
    }

    #[test]
    fn upsert_replaces_by_key() {
        let mut store = MemoryStore::new();
        store.put_document_scores(&[score("courts", "a", 2, 1.0)]).unwrap();
        store.put_document_scores(&[score("courts", "a", 2, 3.0)]).unwrap();
        let rows = store.document_scores("courts", WeekRange::all()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].severity, 3.0);
    }

    #[test]
    fn reads_are_filtered_and_ordered() {
        let mut store = MemoryStore::new();
        store
            .put_document_scores(&[
                score("courts", "z", 2, 1.0),
                score("courts", "a", 9, 1.0),
                score("media", "m", 2, 1.0),
            ])
            .unwrap();
        let rows = store.document_scores("courts", WeekRange::all()).unwrap();
        assert_eq!(rows.iter().map(|r| r.document_id.as_str()).collect::<Vec<_>>(), ["z", "a"]);

        let d = |day| NaiveDate::from_ymd_opt(2026, 3, day).unwrap();
        let rows = store.document_scores("courts", WeekRange::between(d(9), d(9))).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(store.categories().unwrap(), vec!["courts", "media"]);
    }

    #[test]
    fn replace_drops_stale_weeks() {
        let mut store = MemoryStore::new();
        let week = |day, total| WeeklyAggregate {
            category: "courts".into(),
            week_of: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
            total_severity: total,
            document_count: 1,
            average_severity: total,
            capture_proportion: 0.0,
            drift_proportion: 0.0,
            warning_proportion: 1.0,
            top_keywords: vec![],
        };
        store.put_weekly(&[week(2, 1.0), week(9, 2.0)]).unwrap();
        store.replace_weekly("courts", &[week(16, 5.0)]).unwrap();
        let rows = store.weekly_range("courts", WeekRange::all()).unwrap();
        assert_eq!(rows, vec![week(16, 5.0)]);
    }
}
