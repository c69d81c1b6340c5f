//! Error types for the session file watcher

use std::{error::Error as StdError, fmt, path::PathBuf};

/// Result type alias for watch operations
pub type Result<T> = std::result::Result<T, WatchError>;

/// Errors that can occur while watching a session's stored file
#[derive(Debug)]
pub enum WatchError {
    /// File system watcher error
    Watcher {
        /// Error message
        message: String,
    },

    /// The watched file (or its directory) does not exist
    TargetMissing {
        /// Missing path
        path: PathBuf,
    },

    /// Watch already running on this instance
    AlreadyWatching,

    /// I/O error
    Io(std::io::Error),
}

impl WatchError {
    /// Create a new watcher error
    #[must_use]
    pub fn watcher<S: Into<String>>(message: S) -> Self {
        Self::Watcher {
            message: message.into(),
        }
    }

    /// Create a new target-missing error
    #[must_use]
    pub fn target_missing<P: Into<PathBuf>>(path: P) -> Self {
        Self::TargetMissing { path: path.into() }
    }
}

impl fmt::Display for WatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Watcher { message } => write!(f, "File system watcher error: {message}"),
            Self::TargetMissing { path } => {
                write!(f, "Watch target does not exist: {}", path.display())
            }
            Self::AlreadyWatching => write!(f, "Watch already running"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl StdError for WatchError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for WatchError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
