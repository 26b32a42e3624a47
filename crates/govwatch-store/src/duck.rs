//! DuckDB storage for document scores and weekly aggregates.

use std::path::Path;

use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use duckdb::{Connection, params, params_from_iter};
use govwatch_core::schema::{document_scores_from_batches, weekly_aggregates_from_batches};
use govwatch_core::{DocumentScore, WeeklyAggregate};
use tracing::{debug, info};

use crate::{ScoreStore, StoreError, WeekRange};

/// Separator for keyword lists passed as a single parameter.
const KEYWORD_SEP: char = '\u{1f}';

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS document_scores (
    category        VARCHAR NOT NULL,
    document_id     VARCHAR NOT NULL,
    title           VARCHAR NOT NULL,
    week_of         DATE NOT NULL,
    document_class  VARCHAR NOT NULL,
    capture_count   BIGINT NOT NULL,
    drift_count     BIGINT NOT NULL,
    warning_count   BIGINT NOT NULL,
    severity        DOUBLE NOT NULL,
    keywords        VARCHAR[],
    PRIMARY KEY (category, document_id)
);
CREATE TABLE IF NOT EXISTS weekly_aggregates (
    category            VARCHAR NOT NULL,
    week_of             DATE NOT NULL,
    total_severity      DOUBLE NOT NULL,
    document_count      BIGINT NOT NULL,
    average_severity    DOUBLE NOT NULL,
    capture_proportion  DOUBLE NOT NULL,
    drift_proportion    DOUBLE NOT NULL,
    warning_proportion  DOUBLE NOT NULL,
    top_keywords        VARCHAR[],
    PRIMARY KEY (category, week_of)
);
";

const DOCUMENT_COLUMNS: &str = "category, document_id, title, week_of, document_class, \
     capture_count, drift_count, warning_count, severity, keywords";

const WEEKLY_COLUMNS: &str = "category, week_of, total_severity, document_count, average_severity, \
     capture_proportion, drift_proportion, warning_proportion, top_keywords";

/// DuckDB-backed [`ScoreStore`].
///
/// Supports both in-memory (ephemeral) and persistent (file-backed) modes.
/// Tables are created on open if missing.
pub struct DuckStore {
    conn: Connection,
}

impl DuckStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let store = Self::init(Connection::open(path)?)?;
        info!(path = %path.display(), "opened score database");
        Ok(store)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Execute arbitrary SQL and return Arrow RecordBatches.
    pub fn query_arrow(&self, sql: &str) -> Result<Vec<RecordBatch>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();
        Ok(batches)
    }

    fn select_range(
        &self,
        table: &str,
        columns: &str,
        order: &str,
        category: &str,
        range: WeekRange,
    ) -> Result<Vec<RecordBatch>, StoreError> {
        let mut sql = format!("SELECT {columns} FROM {table} WHERE category = ?");
        let mut args = vec![category.to_string()];
        if let Some(from) = range.from {
            sql.push_str(" AND week_of >= ?::DATE");
            args.push(date_param(from));
        }
        if let Some(to) = range.to {
            sql.push_str(" AND week_of <= ?::DATE");
            args.push(date_param(to));
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(order);

        let mut stmt = self.conn.prepare(&sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow(params_from_iter(args.iter()))?.collect();
        Ok(batches)
    }

    /// Upsert weekly rows, first clearing `replace`'s rows in the same
    /// transaction.
    fn write_weekly(&mut self, replace: Option<&str>, weeks: &[WeeklyAggregate]) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        if let Some(category) = replace {
            let removed = tx.execute("DELETE FROM weekly_aggregates WHERE category = ?", params![category])?;
            debug!(category, removed, "weekly aggregates cleared");
        }
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO weekly_aggregates VALUES \
                 (?, ?::DATE, ?, ?, ?, ?, ?, ?, string_split(nullif(?, ''), chr(31)))",
            )?;
            for w in weeks {
                stmt.execute(params![
                    w.category,
                    date_param(w.week_of),
                    w.total_severity,
                    w.document_count as i64,
                    w.average_severity,
                    w.capture_proportion,
                    w.drift_proportion,
                    w.warning_proportion,
                    keyword_param(&w.top_keywords),
                ])?;
            }
        }
        tx.commit()?;
        debug!(rows = weeks.len(), "weekly aggregates upserted");
        Ok(weeks.len())
    }
}

fn date_param(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn keyword_param(keywords: &[String]) -> String {
    keywords.join(&KEYWORD_SEP.to_string())
}

impl ScoreStore for DuckStore {
    fn put_document_scores(&mut self, scores: &[DocumentScore]) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO document_scores VALUES \
                 (?, ?, ?, ?::DATE, ?, ?, ?, ?, ?, string_split(nullif(?, ''), chr(31)))",
            )?;
            for s in scores {
                stmt.execute(params![
                    s.category,
                    s.document_id,
                    s.title,
                    date_param(s.week_of),
                    s.document_class.as_str(),
                    s.counts.capture as i64,
                    s.counts.drift as i64,
                    s.counts.warning as i64,
                    s.severity,
                    keyword_param(&s.keywords),
                ])?;
            }
        }
        tx.commit()?;
        debug!(rows = scores.len(), "document scores upserted");
        Ok(scores.len())
    }

    fn document_scores(&self, category: &str, range: WeekRange) -> Result<Vec<DocumentScore>, StoreError> {
        let batches = self.select_range(
            "document_scores",
            DOCUMENT_COLUMNS,
            "week_of, document_id",
            category,
            range,
        )?;
        Ok(document_scores_from_batches(&batches)?)
    }

    fn put_weekly(&mut self, weeks: &[WeeklyAggregate]) -> Result<usize, StoreError> {
        self.write_weekly(None, weeks)
    }

    fn replace_weekly(&mut self, category: &str, weeks: &[WeeklyAggregate]) -> Result<usize, StoreError> {
        self.write_weekly(Some(category), weeks)
    }

    fn weekly_range(&self, category: &str, range: WeekRange) -> Result<Vec<WeeklyAggregate>, StoreError> {
        let batches = self.select_range("weekly_aggregates", WEEKLY_COLUMNS, "week_of", category, range)?;
        Ok(weekly_aggregates_from_batches(&batches)?)
    }

    fn categories(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT category FROM document_scores \
             UNION SELECT category FROM weekly_aggregates ORDER BY category",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}
