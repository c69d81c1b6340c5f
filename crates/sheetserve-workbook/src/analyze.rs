//! Columnar analysis of a stored workbook
//!
//! An independent re-read of the stored file through a tabular lens: the
//! first row is treated as the header, everything below it as data. Shares no
//! state with [`crate::Workbook`], so results can lag behind an unpersisted
//! in-memory edit.

use crate::workbook::open_reader;
use crate::{Result, WorkbookError};
use calamine::{Data, Reader};
use sheetserve_core::types::{NumericSummary, SheetAnalysis};
use std::collections::BTreeMap;
use std::path::Path;

/// Analyze one worksheet of the stored file
///
/// Defaults to the first sheet. Reports shape (data rows, columns),
/// per-column inferred types and null counts, and summary statistics for
/// numeric columns only.
///
/// # Errors
///
/// Returns [`WorkbookError::Load`] when the file does not parse and
/// [`WorkbookError::SheetNotFound`] for an unknown sheet name.
pub fn analyze(path: &Path, sheet_name: Option<&str>) -> Result<SheetAnalysis> {
    let mut reader = open_reader(path)?;

    let names: Vec<String> = reader.sheet_names().to_vec();
    let target = match sheet_name {
        Some(n) => {
            if !names.iter().any(|existing| existing == n) {
                return Err(WorkbookError::sheet_not_found(n));
            }
            n.to_string()
        }
        None => names
            .first()
            .cloned()
            .ok_or_else(|| WorkbookError::load("workbook has no sheets"))?,
    };

    let range = reader
        .worksheet_range(&target)
        .map_err(|e| WorkbookError::load(e.to_string()))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(SheetAnalysis {
            sheet_name: target,
            shape: (0, 0),
            columns: Vec::new(),
            dtypes: BTreeMap::new(),
            null_counts: BTreeMap::new(),
            summary_stats: BTreeMap::new(),
        });
    };

    let columns = header_names(header_row);
    let data_rows: Vec<&[Data]> = rows.collect();

    let mut dtypes = BTreeMap::new();
    let mut null_counts = BTreeMap::new();
    let mut summary_stats = BTreeMap::new();

    for (idx, column) in columns.iter().enumerate() {
        let cells: Vec<&Data> = data_rows
            .iter()
            .map(|row| row.get(idx).unwrap_or(&Data::Empty))
            .collect();

        let nulls = cells.iter().filter(|c| matches!(c, Data::Empty)).count() as u64;
        let dtype = infer_dtype(&cells);

        if matches!(dtype, "integer" | "float") {
            if let Some(stats) = numeric_summary(&cells) {
                summary_stats.insert(column.clone(), stats);
            }
        }

        dtypes.insert(column.clone(), dtype.to_string());
        null_counts.insert(column.clone(), nulls);
    }

    Ok(SheetAnalysis {
        sheet_name: target,
        shape: (data_rows.len() as u64, columns.len() as u64),
        columns,
        dtypes,
        null_counts,
        summary_stats,
    })
}

/// Column names from the header row, with blanks and duplicates made unique
fn header_names(header: &[Data]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(header.len());

    for (idx, cell) in header.iter().enumerate() {
        let base = match cell {
            Data::Empty => format!("column_{idx}"),
            Data::String(s) => s.clone(),
            other => other.to_string(),
        };

        let mut name = base.clone();
        let mut suffix = 1;
        while names.contains(&name) {
            name = format!("{base}.{suffix}");
            suffix += 1;
        }
        names.push(name);
    }

    names
}

/// Infer a column's type from its non-null cells
fn infer_dtype(cells: &[&Data]) -> &'static str {
    let mut saw_int = false;
    let mut saw_float = false;
    let mut saw_bool = false;
    let mut saw_string = false;
    let mut saw_datetime = false;
    let mut saw_any = false;

    for cell in cells {
        match cell {
            Data::Empty => continue,
            Data::Int(_) => saw_int = true,
            Data::Float(f) => {
                if f.fract() == 0.0 {
                    saw_int = true;
                } else {
                    saw_float = true;
                }
            }
            Data::Bool(_) => saw_bool = true,
            Data::String(_) | Data::DateTimeIso(_) | Data::DurationIso(_) | Data::Error(_) => {
                saw_string = true;
            }
            Data::DateTime(_) => saw_datetime = true,
        }
        saw_any = true;
    }

    if !saw_any {
        return "empty";
    }

    let numeric = saw_int || saw_float;
    match (numeric, saw_bool, saw_string, saw_datetime) {
        (true, false, false, false) => {
            if saw_float {
                "float"
            } else {
                "integer"
            }
        }
        (false, true, false, false) => "boolean",
        (false, false, true, false) => "string",
        (false, false, false, true) => "datetime",
        _ => "mixed",
    }
}

/// Summary statistics over a column's numeric cells
fn numeric_summary(cells: &[&Data]) -> Option<NumericSummary> {
    #[allow(clippy::cast_precision_loss)]
    let values: Vec<f64> = cells
        .iter()
        .filter_map(|cell| match cell {
            Data::Float(f) => Some(*f),
            Data::Int(i) => Some(*i as f64),
            _ => None,
        })
        .collect();

    if values.is_empty() {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;

    let std = if values.len() > 1 {
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1.0);
        variance.sqrt()
    } else {
        0.0
    };

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(NumericSummary {
        count: values.len() as u64,
        mean,
        std,
        min,
        max,
    })
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn fixture(path: &Path) {
        let mut wb = rust_xlsxwriter::Workbook::new();
        let ws = wb.add_worksheet();
        ws.set_name("Data").unwrap();

        ws.write_string(0, 0, "name").unwrap();
        ws.write_string(0, 1, "count").unwrap();
        ws.write_string(0, 2, "ratio").unwrap();

        ws.write_string(1, 0, "alpha").unwrap();
        ws.write_number(1, 1, 3.0).unwrap();
        ws.write_number(1, 2, 0.5).unwrap();

        ws.write_string(2, 0, "beta").unwrap();
        ws.write_number(2, 1, 5.0).unwrap();
        ws.write_number(2, 2, 1.5).unwrap();

        ws.write_string(3, 0, "gamma").unwrap();
        ws.write_number(3, 1, 7.0).unwrap();
        // ratio left empty on the last row

        wb.save(path).unwrap();
    }

    #[test]
    fn test_analyze_shape_and_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.xlsx");
        fixture(&path);

        let analysis = analyze(&path, None).unwrap();

        assert_eq!(analysis.sheet_name, "Data");
        assert_eq!(analysis.shape, (3, 3));
        assert_eq!(analysis.columns, vec!["name", "count", "ratio"]);
    }

    #[test]
    fn test_analyze_dtypes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.xlsx");
        fixture(&path);

        let analysis = analyze(&path, Some("Data")).unwrap();

        assert_eq!(analysis.dtypes["name"], "string");
        assert_eq!(analysis.dtypes["count"], "integer");
        assert_eq!(analysis.dtypes["ratio"], "float");
    }

    #[test]
    fn test_analyze_null_counts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.xlsx");
        fixture(&path);

        let analysis = analyze(&path, None).unwrap();

        assert_eq!(analysis.null_counts["name"], 0);
        assert_eq!(analysis.null_counts["count"], 0);
        assert_eq!(analysis.null_counts["ratio"], 1);
    }

    #[test]
    fn test_analyze_numeric_stats_only_for_numeric_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.xlsx");
        fixture(&path);

        let analysis = analyze(&path, None).unwrap();

        assert!(!analysis.summary_stats.contains_key("name"));

        let count = &analysis.summary_stats["count"];
        assert_eq!(count.count, 3);
        assert!((count.mean - 5.0).abs() < 1e-9);
        assert!((count.std - 2.0).abs() < 1e-9);
        assert!((count.min - 3.0).abs() < 1e-9);
        assert!((count.max - 7.0).abs() < 1e-9);

        let ratio = &analysis.summary_stats["ratio"];
        assert_eq!(ratio.count, 2);
        assert!((ratio.mean - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_analyze_unknown_sheet() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.xlsx");
        fixture(&path);

        let err = analyze(&path, Some("Missing")).unwrap_err();
        assert!(matches!(err, WorkbookError::SheetNotFound { .. }));
    }

    #[test]
    fn test_analyze_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.xlsx");
        std::fs::write(&path, b"not a workbook").unwrap();

        let err = analyze(&path, None).unwrap_err();
        assert!(matches!(err, WorkbookError::Load { .. }));
    }

    #[test]
    fn test_header_names_dedup() {
        let header = [
            Data::String("a".to_string()),
            Data::String("a".to_string()),
            Data::Empty,
        ];
        let names = header_names(&header);
        assert_eq!(names, vec!["a", "a.1", "column_2"]);
    }

    #[test]
    fn test_infer_dtype_mixed() {
        let cells: Vec<Data> = vec![
            Data::Float(1.0),
            Data::String("x".to_string()),
        ];
        let refs: Vec<&Data> = cells.iter().collect();
        assert_eq!(infer_dtype(&refs), "mixed");
    }

    #[test]
    fn test_infer_dtype_empty_column() {
        let cells: Vec<Data> = vec![Data::Empty, Data::Empty];
        let refs: Vec<&Data> = cells.iter().collect();
        assert_eq!(infer_dtype(&refs), "empty");
    }
}
