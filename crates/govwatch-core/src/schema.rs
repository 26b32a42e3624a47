//! Arrow schemas for persisted scores, with batch converters.
//!
//! Readers accept both `Utf8`/`LargeUtf8` strings and `List`/`LargeList`
//! keyword columns, since DuckDB and IPC files differ in what they emit.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, Date32Array, Float64Array, Int32Array, Int64Array, LargeListArray,
    LargeStringArray, ListArray, ListBuilder, StringArray, StringBuilder,
};
use arrow::datatypes::{DataType, Date32Type, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;

use crate::classify::DocumentClass;
use crate::error::SchemaError;
use crate::scoring::TierCounts;
use crate::temporal::{DocumentScore, WeeklyAggregate};

fn keyword_list() -> DataType {
    DataType::List(Arc::new(Field::new("item", DataType::Utf8, true)))
}

/// One row per scored document per category.
pub fn document_scores_schema() -> Schema {
    Schema::new(vec![
        Field::new("category", DataType::Utf8, false),
        Field::new("document_id", DataType::Utf8, false),
        Field::new("title", DataType::Utf8, false),
        Field::new("week_of", DataType::Date32, false),
        Field::new("document_class", DataType::Utf8, false),
        Field::new("capture_count", DataType::Int64, false),
        Field::new("drift_count", DataType::Int64, false),
        Field::new("warning_count", DataType::Int64, false),
        Field::new("severity", DataType::Float64, false),
        Field::new("keywords", keyword_list(), true),
    ])
}

/// One row per `(category, week_of)`.
pub fn weekly_aggregates_schema() -> Schema {
    Schema::new(vec![
        Field::new("category", DataType::Utf8, false),
        Field::new("week_of", DataType::Date32, false),
        Field::new("total_severity", DataType::Float64, false),
        Field::new("document_count", DataType::Int64, false),
        Field::new("average_severity", DataType::Float64, false),
        Field::new("capture_proportion", DataType::Float64, false),
        Field::new("drift_proportion", DataType::Float64, false),
        Field::new("warning_proportion", DataType::Float64, false),
        Field::new("top_keywords", keyword_list(), true),
    ])
}

fn string_lists<'a>(rows: impl Iterator<Item = &'a Vec<String>>) -> ArrayRef {
    let mut builder = ListBuilder::new(StringBuilder::new());
    for keywords in rows {
        for kw in keywords {
            builder.values().append_value(kw);
        }
        builder.append(true);
    }
    Arc::new(builder.finish())
}

fn dates<'a>(rows: impl Iterator<Item = &'a NaiveDate>) -> ArrayRef {
    Arc::new(Date32Array::from_iter_values(
        rows.map(|d| Date32Type::from_naive_date(*d)),
    ))
}

pub fn document_scores_to_batch(scores: &[DocumentScore]) -> Result<RecordBatch, SchemaError> {
    let schema: SchemaRef = Arc::new(document_scores_schema());
    let count = |f: fn(&TierCounts) -> usize| -> ArrayRef {
        Arc::new(Int64Array::from_iter_values(
            scores.iter().map(|s| f(&s.counts) as i64),
        ))
    };
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(scores.iter().map(|s| &s.category))),
        Arc::new(StringArray::from_iter_values(scores.iter().map(|s| &s.document_id))),
        Arc::new(StringArray::from_iter_values(scores.iter().map(|s| &s.title))),
        dates(scores.iter().map(|s| &s.week_of)),
        Arc::new(StringArray::from_iter_values(
            scores.iter().map(|s| s.document_class.as_str()),
        )),
        count(|c| c.capture),
        count(|c| c.drift),
        count(|c| c.warning),
        Arc::new(Float64Array::from_iter_values(scores.iter().map(|s| s.severity))),
        string_lists(scores.iter().map(|s| &s.keywords)),
    ];
    Ok(RecordBatch::try_new(schema, columns)?)
}

pub fn weekly_aggregates_to_batch(weeks: &[WeeklyAggregate]) -> Result<RecordBatch, SchemaError> {
    let schema: SchemaRef = Arc::new(weekly_aggregates_schema());
    let float = |f: fn(&WeeklyAggregate) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from_iter_values(weeks.iter().map(f)))
    };
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(weeks.iter().map(|w| &w.category))),
        dates(weeks.iter().map(|w| &w.week_of)),
        float(|w| w.total_severity),
        Arc::new(Int64Array::from_iter_values(
            weeks.iter().map(|w| w.document_count as i64),
        )),
        float(|w| w.average_severity),
        float(|w| w.capture_proportion),
        float(|w| w.drift_proportion),
        float(|w| w.warning_proportion),
        string_lists(weeks.iter().map(|w| &w.top_keywords)),
    ];
    Ok(RecordBatch::try_new(schema, columns)?)
}

pub fn document_scores_from_batches(batches: &[RecordBatch]) -> Result<Vec<DocumentScore>, SchemaError> {
    let mut out = Vec::new();
    for batch in batches {
        let category = column(batch, "category")?;
        let document_id = column(batch, "document_id")?;
        let title = column(batch, "title")?;
        let week_of = column(batch, "week_of")?;
        let class = column(batch, "document_class")?;
        let capture = column(batch, "capture_count")?;
        let drift = column(batch, "drift_count")?;
        let warning = column(batch, "warning_count")?;
        let severity = column(batch, "severity")?;
        let keywords = column(batch, "keywords")?;

        for row in 0..batch.num_rows() {
            let class_str = string_at(class, "document_class", row)?;
            let document_class = DocumentClass::parse_str(&class_str).ok_or(SchemaError::BadValue {
                column: "document_class",
                value: class_str,
            })?;
            out.push(DocumentScore {
                category: string_at(category, "category", row)?,
                document_id: string_at(document_id, "document_id", row)?,
                title: string_at(title, "title", row)?,
                week_of: date_at(week_of, "week_of", row)?,
                document_class,
                counts: TierCounts::new(
                    count_at(capture, "capture_count", row)?,
                    count_at(drift, "drift_count", row)?,
                    count_at(warning, "warning_count", row)?,
                ),
                severity: f64_at(severity, "severity", row)?,
                keywords: string_list_at(keywords, "keywords", row)?,
            });
        }
    }
    Ok(out)
}

pub fn weekly_aggregates_from_batches(batches: &[RecordBatch]) -> Result<Vec<WeeklyAggregate>, SchemaError> {
    let mut out = Vec::new();
    for batch in batches {
        let category = column(batch, "category")?;
        let week_of = column(batch, "week_of")?;
        let total = column(batch, "total_severity")?;
        let docs = column(batch, "document_count")?;
        let average = column(batch, "average_severity")?;
        let capture = column(batch, "capture_proportion")?;
        let drift = column(batch, "drift_proportion")?;
        let warning = column(batch, "warning_proportion")?;
        let top = column(batch, "top_keywords")?;

        for row in 0..batch.num_rows() {
            out.push(WeeklyAggregate {
                category: string_at(category, "category", row)?,
                week_of: date_at(week_of, "week_of", row)?,
                total_severity: f64_at(total, "total_severity", row)?,
                document_count: count_at(docs, "document_count", row)?,
                average_severity: f64_at(average, "average_severity", row)?,
                capture_proportion: f64_at(capture, "capture_proportion", row)?,
                drift_proportion: f64_at(drift, "drift_proportion", row)?,
                warning_proportion: f64_at(warning, "warning_proportion", row)?,
                top_keywords: string_list_at(top, "top_keywords", row)?,
            });
        }
    }
    Ok(out)
}

// ── Helpers ──

fn column<'a>(batch: &'a RecordBatch, name: &'static str) -> Result<&'a ArrayRef, SchemaError> {
    batch.column_by_name(name).ok_or(SchemaError::MissingColumn(name))
}

fn not_null(col: &dyn Array, column: &'static str, row: usize) -> Result<(), SchemaError> {
    if col.is_null(row) {
        Err(SchemaError::NullValue { column, row })
    } else {
        Ok(())
    }
}

fn string_at(col: &dyn Array, column: &'static str, row: usize) -> Result<String, SchemaError> {
    not_null(col, column, row)?;
    if let Some(arr) = col.as_any().downcast_ref::<StringArray>() {
        return Ok(arr.value(row).to_string());
    }
    if let Some(arr) = col.as_any().downcast_ref::<LargeStringArray>() {
        return Ok(arr.value(row).to_string());
    }
    Err(SchemaError::WrongType {
        column,
        expected: "a string",
    })
}

fn f64_at(col: &dyn Array, column: &'static str, row: usize) -> Result<f64, SchemaError> {
    not_null(col, column, row)?;
    col.as_any()
        .downcast_ref::<Float64Array>()
        .map(|a| a.value(row))
        .ok_or(SchemaError::WrongType {
            column,
            expected: "Float64",
        })
}

fn count_at(col: &dyn Array, column: &'static str, row: usize) -> Result<usize, SchemaError> {
    not_null(col, column, row)?;
    let value = if let Some(arr) = col.as_any().downcast_ref::<Int64Array>() {
        arr.value(row)
    } else if let Some(arr) = col.as_any().downcast_ref::<Int32Array>() {
        i64::from(arr.value(row))
    } else {
        return Err(SchemaError::WrongType {
            column,
            expected: "an integer",
        });
    };
    usize::try_from(value).map_err(|_| SchemaError::BadValue {
        column,
        value: value.to_string(),
    })
}

fn date_at(col: &dyn Array, column: &'static str, row: usize) -> Result<NaiveDate, SchemaError> {
    not_null(col, column, row)?;
    let days = col
        .as_any()
        .downcast_ref::<Date32Array>()
        .map(|a| a.value(row))
        .ok_or(SchemaError::WrongType {
            column,
            expected: "Date32",
        })?;
    Ok(Date32Type::to_naive_date(days))
}

/// Strings of one list cell; a null cell reads as empty.
fn string_list_at(col: &dyn Array, column: &'static str, row: usize) -> Result<Vec<String>, SchemaError> {
    if col.is_null(row) {
        return Ok(Vec::new());
    }
    let values = if let Some(list) = col.as_any().downcast_ref::<ListArray>() {
        list.value(row)
    } else if let Some(list) = col.as_any().downcast_ref::<LargeListArray>() {
        list.value(row)
    } else {
        return Err(SchemaError::WrongType {
            column,
            expected: "a list of strings",
        });
    };
    (0..values.len())
        .filter(|&i| !values.is_null(i))
        .map(|i| string_at(values.as_ref(), column, i))
        .collect()
}
