//! Error types for workbook processing

use std::{error::Error as StdError, fmt};

/// Result type alias for workbook operations
pub type Result<T> = std::result::Result<T, WorkbookError>;

/// Errors that can occur while loading, editing, or persisting a workbook
#[derive(Debug)]
pub enum WorkbookError {
    /// The stored bytes do not parse as a workbook
    Load {
        /// Underlying parser message
        message: String,
    },

    /// A referenced sheet does not exist in the document
    SheetNotFound {
        /// Requested sheet name
        name: String,
    },

    /// A cell coordinate lies outside the addressable range
    OutOfRange {
        /// 1-based row index
        row: u32,
        /// 1-based column index
        col: u32,
    },

    /// Serializing the document back to disk failed
    Save {
        /// Underlying writer message
        message: String,
    },

    /// I/O error
    Io(std::io::Error),
}

impl WorkbookError {
    /// Create a new load error
    #[must_use]
    pub fn load<S: Into<String>>(message: S) -> Self {
        Self::Load {
            message: message.into(),
        }
    }

    /// Create a new sheet-not-found error
    #[must_use]
    pub fn sheet_not_found<S: Into<String>>(name: S) -> Self {
        Self::SheetNotFound { name: name.into() }
    }

    /// Create a new save error
    #[must_use]
    pub fn save<S: Into<String>>(message: S) -> Self {
        Self::Save {
            message: message.into(),
        }
    }
}

impl fmt::Display for WorkbookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load { message } => write!(f, "Failed to load workbook: {message}"),
            Self::SheetNotFound { name } => write!(f, "Sheet not found: {name}"),
            Self::OutOfRange { row, col } => {
                write!(f, "Cell ({row}, {col}) is outside the addressable range")
            }
            Self::Save { message } => write!(f, "Failed to save workbook: {message}"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl StdError for WorkbookError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for WorkbookError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_load_error_display() {
        let err = WorkbookError::load("bad zip header");
        assert_eq!(format!("{err}"), "Failed to load workbook: bad zip header");
    }

    #[test]
    fn test_sheet_not_found_display() {
        let err = WorkbookError::sheet_not_found("Budget");
        assert_eq!(format!("{err}"), "Sheet not found: Budget");
    }

    #[test]
    fn test_out_of_range_display() {
        let err = WorkbookError::OutOfRange { row: 0, col: 5 };
        assert_eq!(
            format!("{err}"),
            "Cell (0, 5) is outside the addressable range"
        );
    }

    #[test]
    fn test_io_error_source() {
        let err = WorkbookError::from(std::io::Error::other("disk full"));
        assert!(err.source().is_some());
        assert!(WorkbookError::load("x").source().is_none());
    }
}
