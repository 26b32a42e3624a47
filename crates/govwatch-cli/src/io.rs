//! Input and output files.
//!
//! Item batches and AI opinions are JSON. Document scores are JSON, or an
//! Arrow IPC file when the path ends in `.arrow` or `.ipc`.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use anyhow::Context;
use arrow::ipc::reader::FileReader;
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::RecordBatch;
use govwatch_core::schema::{document_scores_from_batches, document_scores_to_batch};
use govwatch_core::{ContentItem, DocumentScore};
use serde::de::DeserializeOwned;

pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// A JSON object mapping category key to its items.
pub fn read_batches(path: &Path, only: Option<&str>) -> anyhow::Result<Vec<(String, Vec<ContentItem>)>> {
    let batches: BTreeMap<String, Vec<ContentItem>> = read_json(path)?;
    Ok(batches
        .into_iter()
        .filter(|(category, _)| only.is_none_or(|o| o == category))
        .collect())
}

fn is_ipc(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("arrow") | Some("ipc")
    )
}

pub fn read_scores(path: &Path) -> anyhow::Result<Vec<DocumentScore>> {
    if !is_ipc(path) {
        return read_json(path);
    }
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = FileReader::try_new(file, None)?;
    let batches = reader.collect::<Result<Vec<RecordBatch>, _>>()?;
    Ok(document_scores_from_batches(&batches)?)
}

pub fn write_scores(path: &Path, scores: &[DocumentScore]) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    if is_ipc(path) {
        let batch = document_scores_to_batch(scores)?;
        let mut writer = FileWriter::try_new(file, &batch.schema())?;
        writer.write(&batch)?;
        writer.finish()?;
    } else {
        serde_json::to_writer_pretty(file, scores)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use govwatch_core::{DocumentClass, TierCounts};

    fn scores() -> Vec<DocumentScore> {
        vec![DocumentScore {
            category: "elections".into(),
            document_id: "https://example.gov/1".into(),
            title: "Voter purge ordered".into(),
            week_of: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            document_class: DocumentClass::PressRelease,
            counts: TierCounts::new(0, 1, 0),
            severity: 1.6,
            keywords: vec!["voter purge".into()],
        }]
    }

    #[test]
    fn scores_survive_json_and_ipc_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        for name in ["scores.json", "scores.arrow"] {
            let path = tmp.path().join(name);
            write_scores(&path, &scores()).unwrap();
            assert_eq!(read_scores(&path).unwrap(), scores(), "{name}");
        }
    }

    #[test]
    fn batches_filter_by_category() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("items.json");
        std::fs::write(
            &path,
            r#"{"courts": [{"title": "a"}], "media": [{"title": "b", "isError": true}]}"#,
        )
        .unwrap();
        assert_eq!(read_batches(&path, None).unwrap().len(), 2);
        let only = read_batches(&path, Some("media")).unwrap();
        assert_eq!(only.len(), 1);
        assert!(only[0].1[0].is_error);
    }
}
