// src/store.rs
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use tracing::{info, warn};

use crate::config::consts::{DATASET_PREFIX, STORE_SEP};
use crate::csv::parse_rows;
use crate::error::StoreError;
use crate::record::{Field, FieldRecord};

/// Read a dataset written by `CsvSink`. Unknown columns are ignored,
/// missing ones read as the sentinel.
pub fn load_records(path: &Path) -> Result<Vec<FieldRecord>, StoreError> {
    let text = fs::read_to_string(path).map_err(|source| StoreError::Io { path: path.to_path_buf(), source })?;
    let mut rows = parse_rows(&text, STORE_SEP).into_iter();
    let header = rows.next().ok_or_else(|| StoreError::NoHeader(path.to_path_buf()))?;
    let columns: Vec<Option<Field>> = header.iter().map(|h| Field::from_header(h)).collect();
    if columns.iter().all(Option::is_none) {
        return Err(StoreError::NoHeader(path.to_path_buf()));
    }
    let unknown: Vec<&String> = header.iter().zip(&columns).filter(|(_, c)| c.is_none()).map(|(h, _)| h).collect();
    if !unknown.is_empty() {
        warn!(?unknown, "ignoring unknown columns");
    }
    let records: Vec<FieldRecord> = rows.map(|row| FieldRecord::from_row(&columns, &row)).collect();
    info!(path = %path.display(), count = records.len(), "dataset loaded");
    Ok(records)
}

/// Keep the first record per (id, year). Records without an id are all kept.
/// Returns the kept records and how many were dropped.
pub fn dedup_records(records: Vec<FieldRecord>) -> (Vec<FieldRecord>, usize) {
    let mut seen = HashSet::new();
    let before = records.len();
    let kept: Vec<FieldRecord> = records
        .into_iter()
        .filter(|r| match r.key() {
            Some(key) => seen.insert(key),
            None => true,
        })
        .collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

/// Newest `recruiting_class_*.csv` in `dir`.
pub fn latest_dataset(dir: &Path) -> Option<PathBuf> {
    let mut best: Option<(SystemTime, PathBuf)> = None;
    for entry in fs::read_dir(dir).ok()?.flatten() {
        let path = entry.path();
        let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
        if !name.starts_with(DATASET_PREFIX) || !name.ends_with(".csv") {
            continue;
        }
        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else { continue };
        if best.as_ref().is_none_or(|(t, _)| modified > *t) {
            best = Some((modified, path));
        }
    }
    best.map(|(_, p)| p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{CsvSink, Sink};
    use pretty_assertions::assert_eq;

    fn rec(id: &str, year: &str, name: &str) -> FieldRecord {
        let mut r = FieldRecord::new();
        r.set(Field::Id, id);
        r.set(Field::RecruitingYear, year);
        r.set(Field::Name, name);
        r.set(Field::CityState, "Dallas, TX");
        r
    }

    #[test]
    fn sink_then_load_keeps_fields_and_one_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("recruiting_class_2020.csv");
        let mut sink = CsvSink::new(&path);
        sink.append(&[rec("1", "2020", "A \"Ace\" B")]).unwrap();
        sink.append(&[rec("2", "2020", "C"), rec("3", "2020", "D")]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("247 ID").count(), 1);

        let back = load_records(&path).unwrap();
        assert_eq!(back.len(), 3);
        assert_eq!(back[0], rec("1", "2020", "A \"Ace\" B"));
        assert_eq!(back[2].get(Field::CityState), "Dallas, TX");
    }

    #[test]
    fn columns_by_header_not_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.csv");
        fs::write(&path, "Player Name,Extra,247 ID\nA,zzz,9\n").unwrap();
        let back = load_records(&path).unwrap();
        assert_eq!(back[0].get(Field::Id), "9");
        assert_eq!(back[0].name(), "A");
        assert_eq!(back[0].get(Field::Position), "NA");
    }

    #[test]
    fn missing_or_headerless_files_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(load_records(&dir.path().join("nope.csv")), Err(StoreError::Io { .. })));
        let empty = dir.path().join("empty.csv");
        fs::write(&empty, "").unwrap();
        assert!(matches!(load_records(&empty), Err(StoreError::NoHeader(_))));
    }

    #[test]
    fn dedup_keeps_first_and_anonymous() {
        let records = vec![
            rec("1", "2020", "first"),
            rec("1", "2020", "second"),
            rec("1", "2021", "other year"),
            rec("NA", "2020", "x"),
            rec("NA", "2020", "y"),
        ];
        let (kept, dropped) = dedup_records(records);
        assert_eq!(dropped, 1);
        let names: Vec<&str> = kept.iter().map(FieldRecord::name).collect();
        assert_eq!(names, vec!["first", "other year", "x", "y"]);
    }

    #[test]
    fn latest_dataset_by_prefix() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(latest_dataset(dir.path()), None);
        fs::write(dir.path().join("recruiting_class_2020.csv"), "x").unwrap();
        fs::write(dir.path().join("notes.csv"), "x").unwrap();
        let found = latest_dataset(dir.path()).unwrap();
        assert!(found.ends_with("recruiting_class_2020.csv"));
    }
}
