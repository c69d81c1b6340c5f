//! Workbook processing for sheetserve
//!
//! Opens a session's stored file into an in-memory document representation
//! that preserves formulas, exposes sheet snapshots and cell updates, and
//! persists the document back to its stored path. A separate analysis path
//! re-reads the stored file through a columnar lens.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

pub mod analyze;
pub mod error;
pub mod workbook;

// Re-export commonly used types
pub use analyze::analyze;
pub use error::{Result, WorkbookError};
pub use workbook::{Cell, CellValue, Sheet, Workbook};
