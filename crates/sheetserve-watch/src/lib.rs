//! Session file watching for sheetserve
//!
//! Provides a cross-platform, debounced watch over one session's stored file
//! using the `notify` crate. A watch starts when a push channel opens for a
//! session whose file exists, reports every change that touches the stored
//! path, and stops when the channel disconnects.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

pub mod config;
pub mod error;
pub mod watcher;

// Re-export commonly used types
pub use config::WatchConfig;
pub use error::{Result, WatchError};
pub use watcher::{ChangeEvent, SessionWatch, WatchState};
