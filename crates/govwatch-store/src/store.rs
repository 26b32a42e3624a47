use chrono::NaiveDate;
use govwatch_core::{DocumentScore, WeeklyAggregate};

use crate::StoreError;

/// Inclusive week bounds; `None` is open-ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeekRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl WeekRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn contains(&self, week: NaiveDate) -> bool {
        self.from.is_none_or(|f| week >= f) && self.to.is_none_or(|t| week <= t)
    }
}

/// Persistence for per-document scores and weekly aggregates.
///
/// Writes are upserts: document scores are keyed by `(category, document_id)`
/// and weekly rows by `(category, week_of)`, last write wins. Reads return
/// rows ordered by week, oldest first.
pub trait ScoreStore {
    fn put_document_scores(&mut self, scores: &[DocumentScore]) -> Result<usize, StoreError>;

    fn document_scores(&self, category: &str, range: WeekRange) -> Result<Vec<DocumentScore>, StoreError>;

    fn put_weekly(&mut self, weeks: &[WeeklyAggregate]) -> Result<usize, StoreError>;

    /// Swap every weekly row of `category` for `weeks`, dropping weeks that
    /// are no longer present.
    fn replace_weekly(&mut self, category: &str, weeks: &[WeeklyAggregate]) -> Result<usize, StoreError>;

    fn weekly_range(&self, category: &str, range: WeekRange) -> Result<Vec<WeeklyAggregate>, StoreError>;

    /// Categories with any stored rows, sorted.
    fn categories(&self) -> Result<Vec<String>, StoreError>;
}
