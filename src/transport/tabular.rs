use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::data::{Column, RawRow};
use crate::errors::PipelineError;
use crate::transport::fs::{ensure_parent_dir, require_path};
use crate::utils::is_missing_token;

/// Write `rows` with a header row derived from `T`'s field names.
///
/// The parent directory is created when needed; the file is flushed before
/// returning.
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), PipelineError> {
    ensure_parent_dir(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a header-only file when `rows` is empty, otherwise behave like [`write_rows`].
pub fn write_rows_with_header<T: Serialize>(
    path: &Path,
    header: &[&str],
    rows: &[T],
) -> Result<(), PipelineError> {
    if !rows.is_empty() {
        return write_rows(path, rows);
    }
    ensure_parent_dir(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(header)?;
    writer.flush()?;
    Ok(())
}

/// Read every row of a headered file into `T`.
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, PipelineError> {
    require_path(path)?;
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Read an extracted per-source table into cleanable rows.
///
/// Columns are matched by header name; absent columns read as missing, and
/// cells matching a missing-value token become `None`.
pub fn read_raw_rows(path: &Path) -> Result<Vec<RawRow>, PipelineError> {
    require_path(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let headers = reader.headers()?.clone();
    let positions: Vec<Option<usize>> = Column::ALL
        .iter()
        .map(|column| headers.iter().position(|name| name == column.name()))
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = RawRow::default();
        for (column, position) in Column::ALL.iter().zip(&positions) {
            let value = position
                .and_then(|idx| record.get(idx))
                .filter(|raw| !is_missing_token(raw))
                .map(str::to_string);
            row.set(*column, value);
        }
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::BugRecord;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn write_then_read_preserves_multiline_text() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("out/KDE_data.csv");
        let rows = vec![BugRecord {
            short_desc: "Crash, then hang".into(),
            comments: "first\n\nsecond \"quoted\"".into(),
            days_resolution: "4".into(),
            ..BugRecord::default()
        }];
        write_rows(&path, &rows).unwrap();

        let back: Vec<BugRecord> = read_rows(&path).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn read_raw_rows_maps_missing_tokens_and_absent_columns() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("Gentoo_data.csv");
        fs::write(
            &path,
            "short_desc,priority,days_resolution\nBoot fails,NA,12\n,P1,\n",
        )
        .unwrap();

        let rows = read_raw_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(Column::ShortDesc), Some("Boot fails"));
        assert_eq!(rows[0].get(Column::Priority), None);
        assert_eq!(rows[0].get(Column::DaysResolution), Some("12"));
        assert_eq!(rows[0].get(Column::Comments), None);
        assert_eq!(rows[1].get(Column::ShortDesc), None);
        assert_eq!(rows[1].get(Column::Priority), Some("P1"));
    }

    #[test]
    fn reading_missing_file_is_input_not_found() {
        let temp = tempdir().unwrap();
        let err = read_raw_rows(&temp.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, PipelineError::InputNotFound { .. }));
    }

    #[test]
    fn empty_rows_still_write_header() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("empty.csv");
        write_rows_with_header::<BugRecord>(&path, &["a", "b"], &[]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a,b\n");
    }
}
