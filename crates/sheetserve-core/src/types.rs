//! Wire and domain types shared across the sheetserve crates

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inferred type of a single cell, as reported in sheet snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellDataType {
    /// No stored value
    Empty,
    /// Text value
    String,
    /// Numeric value (integers and floats alike)
    Number,
    /// Boolean value
    Bool,
    /// Spreadsheet error value such as `#DIV/0!`
    Error,
    /// Cell carries a formula; the value field holds the cached result
    Formula,
    /// Date/time serial value
    Datetime,
}

/// One cell of a sheet snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellInfo {
    /// Raw cell value (null for empty cells)
    pub value: serde_json::Value,

    /// Formula text including the leading `=`, if the cell has one
    pub formula: Option<String>,

    /// Inferred data type
    pub data_type: CellDataType,

    /// A1-style coordinate, e.g. `B7`
    pub coordinate: String,
}

/// Read-only projection of one worksheet
///
/// Produced fresh on every read; never diffed against a prior snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetSnapshot {
    /// Name of the projected sheet
    pub sheet_name: String,

    /// Ordered rows of cells covering the sheet extent
    pub data: Vec<Vec<CellInfo>>,

    /// 1-based row extent
    pub max_row: u32,

    /// 1-based column extent
    pub max_column: u32,

    /// Names of every sheet in the document, in workbook order
    pub sheet_names: Vec<String>,
}

/// Request to set a target cell's value or formula
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellUpdate {
    /// Target sheet name
    pub sheet_name: String,

    /// 1-based row index
    pub row: u32,

    /// 1-based column index
    pub col: u32,

    /// Literal value to store when no formula is given
    #[serde(default)]
    pub value: serde_json::Value,

    /// Formula text; wins over `value` when present
    #[serde(default)]
    pub formula: Option<String>,
}

/// Classification of an observed file system change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// File was created
    Created,
    /// File contents changed
    Modified,
    /// File was removed
    Removed,
    /// Any other change (metadata, rename legs the watcher cannot classify)
    Other,
}

/// Message pushed to a session's live channel
///
/// Fire-and-forget: delivery is at-most-once and failures drop the channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushEvent {
    /// The session's stored file changed on disk
    FileChanged {
        /// Path of the changed file
        path: String,
        /// Underlying change classification
        change_type: ChangeKind,
    },
    /// Reply to a client ping
    Pong,
}

/// Per-column numeric summary statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    /// Number of non-null numeric values
    pub count: u64,
    /// Arithmetic mean
    pub mean: f64,
    /// Sample standard deviation (0 for a single value)
    pub std: f64,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
}

/// Columnar analysis of one worksheet
///
/// Produced by an independent re-read of the stored file; may lag behind an
/// unpersisted in-memory edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetAnalysis {
    /// Analyzed sheet name
    pub sheet_name: String,

    /// (data rows, columns) — the header row is not counted as data
    pub shape: (u64, u64),

    /// Column names from the header row, in sheet order
    pub columns: Vec<String>,

    /// Inferred data type per column
    pub dtypes: BTreeMap<String, String>,

    /// Null (empty cell) count per column
    pub null_counts: BTreeMap<String, u64>,

    /// Summary statistics for numeric columns only
    pub summary_stats: BTreeMap<String, NumericSummary>,
}
