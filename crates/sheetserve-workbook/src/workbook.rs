//! In-memory workbook model with formula preservation
//!
//! Loading goes through calamine (values plus formula text); persisting goes
//! through `rust_xlsxwriter`. The model is rebuilt from disk for every
//! operation and never cached across requests, so the stored file is the
//! single source of truth.

use crate::{Result, WorkbookError};
use calamine::{Data, Range, Reader, Sheets, Xlsx, open_workbook, open_workbook_auto};
use serde_json::json;
use sheetserve_core::types::{CellDataType, CellInfo, SheetSnapshot};
use sheetserve_core::utils::coordinate;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Maximum addressable row (xlsx limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum addressable column (xlsx limit)
pub const MAX_COLUMNS: u32 = 16_384;

/// A single cell: value plus optional formula
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    /// Stored value (the cached result, for formula cells)
    pub value: CellValue,
    /// Formula text with leading `=`, if any
    pub formula: Option<String>,
}

/// Typed cell value
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellValue {
    /// No value
    #[default]
    Empty,
    /// Text
    String(String),
    /// Number (integers and floats alike)
    Number(f64),
    /// Boolean
    Bool(bool),
    /// Spreadsheet error text such as `#DIV/0!`
    Error(String),
    /// Date/time as an Excel serial number
    DateTime(f64),
}

/// One worksheet: sparse cells keyed by 1-based (row, column)
#[derive(Debug, Clone)]
pub struct Sheet {
    /// Sheet name
    pub name: String,
    cells: BTreeMap<(u32, u32), Cell>,
    max_row: u32,
    max_column: u32,
}

impl Sheet {
    fn new(name: String) -> Self {
        Self {
            name,
            cells: BTreeMap::new(),
            max_row: 0,
            max_column: 0,
        }
    }

    fn insert(&mut self, row: u32, col: u32, cell: Cell) {
        self.max_row = self.max_row.max(row);
        self.max_column = self.max_column.max(col);
        self.cells.insert((row, col), cell);
    }

    /// Cell at a 1-based (row, column), if stored
    #[must_use]
    pub fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    /// 1-based row extent
    #[must_use]
    pub const fn max_row(&self) -> u32 {
        self.max_row
    }

    /// 1-based column extent
    #[must_use]
    pub const fn max_column(&self) -> u32 {
        self.max_column
    }
}

/// In-memory document representation preserving formulas
#[derive(Debug, Clone)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    /// Parse a stored file into the in-memory model
    ///
    /// The reader is chosen by byte signature rather than extension, so a
    /// legacy-named file that already holds xlsx content still loads.
    ///
    /// # Errors
    ///
    /// Returns [`WorkbookError::Load`] if the bytes are not a valid workbook.
    pub fn open(path: &Path) -> Result<Self> {
        let mut reader = open_reader(path)?;

        let names: Vec<String> = reader.sheet_names().to_vec();
        if names.is_empty() {
            return Err(WorkbookError::load("workbook has no sheets"));
        }

        let mut sheets = Vec::with_capacity(names.len());
        for name in &names {
            let mut sheet = Sheet::new(name.clone());

            let data = reader
                .worksheet_range(name)
                .map_err(|e| WorkbookError::load(e.to_string()))?;
            load_values(&mut sheet, &data);

            // Formula extraction is best-effort: legacy containers may not
            // carry recoverable formula text.
            match reader.worksheet_formula(name) {
                Ok(formulas) => load_formulas(&mut sheet, &formulas),
                Err(e) => debug!(sheet = %name, error = %e, "No formula data for sheet"),
            }

            sheets.push(sheet);
        }

        Ok(Self { sheets })
    }

    /// Names of all sheets in workbook order
    #[must_use]
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    /// Look up a sheet by name, or the first sheet when no name is given
    fn resolve_sheet(&self, name: Option<&str>) -> Result<&Sheet> {
        match name {
            Some(n) => self
                .sheets
                .iter()
                .find(|s| s.name == n)
                .ok_or_else(|| WorkbookError::sheet_not_found(n)),
            None => self
                .sheets
                .first()
                .ok_or_else(|| WorkbookError::load("workbook has no sheets")),
        }
    }

    /// Produce a read-only projection of one worksheet
    ///
    /// Defaults to the first sheet when no name is given.
    ///
    /// # Errors
    ///
    /// Returns [`WorkbookError::SheetNotFound`] for an unknown sheet name.
    pub fn sheet_snapshot(&self, sheet_name: Option<&str>) -> Result<SheetSnapshot> {
        let sheet = self.resolve_sheet(sheet_name)?;

        let mut data = Vec::with_capacity(sheet.max_row as usize);
        for row in 1..=sheet.max_row {
            let mut cells = Vec::with_capacity(sheet.max_column as usize);
            for col in 1..=sheet.max_column {
                cells.push(cell_info(sheet.cell(row, col), row, col));
            }
            data.push(cells);
        }

        Ok(SheetSnapshot {
            sheet_name: sheet.name.clone(),
            data,
            max_row: sheet.max_row,
            max_column: sheet.max_column,
            sheet_names: self.sheet_names(),
        })
    }

    /// Set a cell's value or formula
    ///
    /// 1-based coordinates. A provided formula wins over the literal value.
    ///
    /// # Errors
    ///
    /// Returns [`WorkbookError::SheetNotFound`] for an unknown sheet and
    /// [`WorkbookError::OutOfRange`] for coordinates outside the addressable
    /// range. Nothing is mutated on error.
    pub fn update_cell(
        &mut self,
        sheet_name: &str,
        row: u32,
        col: u32,
        value: &serde_json::Value,
        formula: Option<&str>,
    ) -> Result<()> {
        if row == 0 || col == 0 || row > MAX_ROWS || col > MAX_COLUMNS {
            return Err(WorkbookError::OutOfRange { row, col });
        }

        let sheet = self
            .sheets
            .iter_mut()
            .find(|s| s.name == sheet_name)
            .ok_or_else(|| WorkbookError::sheet_not_found(sheet_name))?;

        let cell = match formula.map(str::trim).filter(|f| !f.is_empty()) {
            Some(f) => Cell {
                value: CellValue::Empty,
                formula: Some(normalize_formula(f)),
            },
            None => Cell {
                value: json_to_value(value),
                formula: None,
            },
        };

        sheet.insert(row, col, cell);
        Ok(())
    }

    /// Serialize the model back to disk, overwriting the target path
    ///
    /// # Errors
    ///
    /// Returns [`WorkbookError::Save`] when serialization or the final write
    /// fails; the caller must surface this, since it leaves the stored file
    /// and the in-memory state inconsistent.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut out = rust_xlsxwriter::Workbook::new();

        for sheet in &self.sheets {
            let worksheet = out.add_worksheet();
            worksheet
                .set_name(&sheet.name)
                .map_err(|e| WorkbookError::save(e.to_string()))?;

            for (&(row, col), cell) in &sheet.cells {
                let row0 = row - 1;
                let col0 =
                    u16::try_from(col - 1).map_err(|_| WorkbookError::OutOfRange { row, col })?;

                if let Some(formula) = &cell.formula {
                    worksheet
                        .write_formula(row0, col0, formula.as_str())
                        .map_err(|e| WorkbookError::save(e.to_string()))?;
                    continue;
                }

                match &cell.value {
                    CellValue::Empty => {}
                    CellValue::String(s) => {
                        worksheet
                            .write_string(row0, col0, s)
                            .map_err(|e| WorkbookError::save(e.to_string()))?;
                    }
                    CellValue::Number(n) | CellValue::DateTime(n) => {
                        worksheet
                            .write_number(row0, col0, *n)
                            .map_err(|e| WorkbookError::save(e.to_string()))?;
                    }
                    CellValue::Bool(b) => {
                        worksheet
                            .write_boolean(row0, col0, *b)
                            .map_err(|e| WorkbookError::save(e.to_string()))?;
                    }
                    CellValue::Error(text) => {
                        worksheet
                            .write_string(row0, col0, text)
                            .map_err(|e| WorkbookError::save(e.to_string()))?;
                    }
                }
            }
        }

        out.save(path).map_err(|e| WorkbookError::save(e.to_string()))
    }
}

/// Open a calamine reader, dispatching on the file's byte signature
pub(crate) fn open_reader(path: &Path) -> Result<Sheets<BufReader<File>>> {
    let mut signature = [0u8; 2];
    let read = File::open(path)?.read(&mut signature)?;

    if read == 2 && signature == *b"PK" {
        let xlsx: Xlsx<BufReader<File>> =
            open_workbook(path).map_err(|e: calamine::XlsxError| WorkbookError::load(e.to_string()))?;
        Ok(Sheets::Xlsx(xlsx))
    } else {
        open_workbook_auto(path).map_err(|e| WorkbookError::load(e.to_string()))
    }
}

#[allow(clippy::cast_precision_loss)]
fn load_values(sheet: &mut Sheet, range: &Range<Data>) {
    let Some(start) = range.start() else {
        return;
    };

    for (r, row) in range.rows().enumerate() {
        for (c, data) in row.iter().enumerate() {
            let value = match data {
                Data::Empty => continue,
                Data::String(s) => CellValue::String(s.clone()),
                Data::Float(f) => CellValue::Number(*f),
                Data::Int(i) => CellValue::Number(*i as f64),
                Data::Bool(b) => CellValue::Bool(*b),
                Data::Error(e) => CellValue::Error(e.to_string()),
                Data::DateTime(dt) => CellValue::DateTime(dt.as_f64()),
                Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::String(s.clone()),
            };

            let row_1 = start.0 + u32::try_from(r).unwrap_or(u32::MAX - 1) + 1;
            let col_1 = start.1 + u32::try_from(c).unwrap_or(u32::MAX - 1) + 1;
            sheet.insert(
                row_1,
                col_1,
                Cell {
                    value,
                    formula: None,
                },
            );
        }
    }
}

fn load_formulas(sheet: &mut Sheet, range: &Range<String>) {
    let Some(start) = range.start() else {
        return;
    };

    for (r, row) in range.rows().enumerate() {
        for (c, formula) in row.iter().enumerate() {
            if formula.is_empty() {
                continue;
            }

            let row_1 = start.0 + u32::try_from(r).unwrap_or(u32::MAX - 1) + 1;
            let col_1 = start.1 + u32::try_from(c).unwrap_or(u32::MAX - 1) + 1;
            let entry = sheet.cells.entry((row_1, col_1)).or_default();
            entry.formula = Some(normalize_formula(formula));
            sheet.max_row = sheet.max_row.max(row_1);
            sheet.max_column = sheet.max_column.max(col_1);
        }
    }
}

fn cell_info(cell: Option<&Cell>, row: u32, col: u32) -> CellInfo {
    match cell {
        None => CellInfo {
            value: serde_json::Value::Null,
            formula: None,
            data_type: CellDataType::Empty,
            coordinate: coordinate(row, col),
        },
        Some(cell) => CellInfo {
            value: value_to_json(&cell.value),
            formula: cell.formula.clone(),
            data_type: data_type_of(cell),
            coordinate: coordinate(row, col),
        },
    }
}

const fn data_type_of(cell: &Cell) -> CellDataType {
    if cell.formula.is_some() {
        return CellDataType::Formula;
    }
    match cell.value {
        CellValue::Empty => CellDataType::Empty,
        CellValue::String(_) => CellDataType::String,
        CellValue::Number(_) => CellDataType::Number,
        CellValue::Bool(_) => CellDataType::Bool,
        CellValue::Error(_) => CellDataType::Error,
        CellValue::DateTime(_) => CellDataType::Datetime,
    }
}

fn value_to_json(value: &CellValue) -> serde_json::Value {
    match value {
        CellValue::Empty => serde_json::Value::Null,
        CellValue::String(s) | CellValue::Error(s) => json!(s),
        CellValue::Number(n) | CellValue::DateTime(n) => number_to_json(*n),
        CellValue::Bool(b) => json!(b),
    }
}

/// Integral floats serialize as JSON integers, everything else as floats
#[allow(clippy::cast_possible_truncation)]
fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        json!(n as i64)
    } else {
        json!(n)
    }
}

fn json_to_value(value: &serde_json::Value) -> CellValue {
    match value {
        serde_json::Value::Null => CellValue::Empty,
        serde_json::Value::Bool(b) => CellValue::Bool(*b),
        serde_json::Value::Number(n) => CellValue::Number(n.as_f64().unwrap_or(0.0)),
        serde_json::Value::String(s) => CellValue::String(s.clone()),
        other => CellValue::String(other.to_string()),
    }
}

fn normalize_formula(formula: &str) -> String {
    let trimmed = formula.trim();
    if trimmed.starts_with('=') {
        trimmed.to_string()
    } else {
        format!("={trimmed}")
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn fixture_workbook(path: &Path) {
        let mut wb = rust_xlsxwriter::Workbook::new();
        let ws = wb.add_worksheet();
        ws.set_name("Data").unwrap();
        ws.write_string(0, 0, "name").unwrap();
        ws.write_string(0, 1, "count").unwrap();
        ws.write_string(1, 0, "alpha").unwrap();
        ws.write_number(1, 1, 3.0).unwrap();
        ws.write_string(2, 0, "beta").unwrap();
        ws.write_number(2, 1, 4.5).unwrap();
        ws.write_formula(3, 1, "=SUM(B2:B3)").unwrap();

        let ws2 = wb.add_worksheet();
        ws2.set_name("Notes").unwrap();
        ws2.write_string(0, 0, "hello").unwrap();

        wb.save(path).unwrap();
    }

    #[test]
    fn test_open_reads_sheets_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fixture.xlsx");
        fixture_workbook(&path);

        let workbook = Workbook::open(&path).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Data", "Notes"]);
    }

    #[test]
    fn test_open_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.xlsx");
        std::fs::write(&path, b"definitely not a workbook").unwrap();

        let err = Workbook::open(&path).unwrap_err();
        assert!(matches!(err, WorkbookError::Load { .. }));
    }

    #[test]
    fn test_snapshot_defaults_to_first_sheet() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fixture.xlsx");
        fixture_workbook(&path);

        let workbook = Workbook::open(&path).unwrap();
        let snapshot = workbook.sheet_snapshot(None).unwrap();

        assert_eq!(snapshot.sheet_name, "Data");
        assert_eq!(snapshot.max_row, 4);
        assert_eq!(snapshot.max_column, 2);
        assert_eq!(snapshot.sheet_names, vec!["Data", "Notes"]);
        assert_eq!(snapshot.data.len(), 4);
        assert_eq!(snapshot.data[0].len(), 2);
    }

    #[test]
    fn test_snapshot_cell_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fixture.xlsx");
        fixture_workbook(&path);

        let workbook = Workbook::open(&path).unwrap();
        let snapshot = workbook.sheet_snapshot(Some("Data")).unwrap();

        let header = &snapshot.data[0][0];
        assert_eq!(header.value, json!("name"));
        assert_eq!(header.data_type, CellDataType::String);
        assert_eq!(header.coordinate, "A1");

        let count = &snapshot.data[1][1];
        assert_eq!(count.value, json!(3));
        assert_eq!(count.data_type, CellDataType::Number);
        assert_eq!(count.coordinate, "B2");

        let total = &snapshot.data[3][1];
        assert_eq!(total.data_type, CellDataType::Formula);
        assert_eq!(total.formula.as_deref(), Some("=SUM(B2:B3)"));
        assert_eq!(total.coordinate, "B4");
    }

    #[test]
    fn test_snapshot_unknown_sheet() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fixture.xlsx");
        fixture_workbook(&path);

        let workbook = Workbook::open(&path).unwrap();
        let err = workbook.sheet_snapshot(Some("Missing")).unwrap_err();
        assert!(matches!(err, WorkbookError::SheetNotFound { .. }));
    }

    #[test]
    fn test_update_cell_value() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fixture.xlsx");
        fixture_workbook(&path);

        let mut workbook = Workbook::open(&path).unwrap();
        workbook
            .update_cell("Data", 1, 1, &json!("hello"), None)
            .unwrap();

        let snapshot = workbook.sheet_snapshot(Some("Data")).unwrap();
        assert_eq!(snapshot.data[0][0].value, json!("hello"));
    }

    #[test]
    fn test_update_cell_formula_wins_over_value() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fixture.xlsx");
        fixture_workbook(&path);

        let mut workbook = Workbook::open(&path).unwrap();
        workbook
            .update_cell("Data", 5, 2, &json!("ignored"), Some("SUM(B2:B4)"))
            .unwrap();

        let snapshot = workbook.sheet_snapshot(Some("Data")).unwrap();
        let cell = &snapshot.data[4][1];
        assert_eq!(cell.formula.as_deref(), Some("=SUM(B2:B4)"));
        assert_eq!(cell.data_type, CellDataType::Formula);
    }

    #[test]
    fn test_update_cell_extends_extent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fixture.xlsx");
        fixture_workbook(&path);

        let mut workbook = Workbook::open(&path).unwrap();
        workbook
            .update_cell("Data", 20, 7, &json!(1.25), None)
            .unwrap();

        let snapshot = workbook.sheet_snapshot(Some("Data")).unwrap();
        assert_eq!(snapshot.max_row, 20);
        assert_eq!(snapshot.max_column, 7);
    }

    #[test]
    fn test_update_cell_unknown_sheet() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fixture.xlsx");
        fixture_workbook(&path);

        let mut workbook = Workbook::open(&path).unwrap();
        let err = workbook
            .update_cell("Missing", 1, 1, &json!(1), None)
            .unwrap_err();
        assert!(matches!(err, WorkbookError::SheetNotFound { .. }));
    }

    #[test]
    fn test_update_cell_out_of_range() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fixture.xlsx");
        fixture_workbook(&path);

        let mut workbook = Workbook::open(&path).unwrap();

        for (row, col) in [(0, 1), (1, 0), (MAX_ROWS + 1, 1), (1, MAX_COLUMNS + 1)] {
            let err = workbook
                .update_cell("Data", row, col, &json!(1), None)
                .unwrap_err();
            assert!(
                matches!(err, WorkbookError::OutOfRange { .. }),
                "expected OutOfRange for ({row}, {col})"
            );
        }
    }

    #[test]
    fn test_typed_updates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fixture.xlsx");
        fixture_workbook(&path);

        let mut workbook = Workbook::open(&path).unwrap();
        workbook.update_cell("Notes", 2, 1, &json!(true), None).unwrap();
        workbook.update_cell("Notes", 3, 1, &json!(2.5), None).unwrap();
        workbook
            .update_cell("Notes", 4, 1, &serde_json::Value::Null, None)
            .unwrap();

        let snapshot = workbook.sheet_snapshot(Some("Notes")).unwrap();
        assert_eq!(snapshot.data[1][0].data_type, CellDataType::Bool);
        assert_eq!(snapshot.data[2][0].value, json!(2.5));
        assert_eq!(snapshot.data[3][0].data_type, CellDataType::Empty);
    }

    #[test]
    fn test_normalize_formula() {
        assert_eq!(normalize_formula("SUM(A1:A2)"), "=SUM(A1:A2)");
        assert_eq!(normalize_formula("=SUM(A1:A2)"), "=SUM(A1:A2)");
        assert_eq!(normalize_formula("  =A1+1  "), "=A1+1");
    }

    #[test]
    fn test_number_to_json() {
        assert_eq!(number_to_json(3.0), json!(3));
        assert_eq!(number_to_json(4.5), json!(4.5));
        assert_eq!(number_to_json(-2.0), json!(-2));
    }
}
