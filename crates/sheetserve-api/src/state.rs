//! Application state management

use crate::registry::ConnectionRegistry;
use crate::session::SessionStore;
use sheetserve_core::{Config, Error, Result};

/// Shared application state
///
/// Owns the session store and the connection registry; both are
/// dependency-injected into handlers through this state rather than living
/// in process-wide globals.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Config,

    /// Session store rooted at the upload directory
    pub sessions: SessionStore,

    /// Push channel registry
    pub registry: ConnectionRegistry,
}

impl AppState {
    /// Create new application state
    ///
    /// # Errors
    ///
    /// Returns an error if the upload directory cannot be created.
    pub fn new(config: Config) -> Result<Self> {
        let sessions = SessionStore::new(config.upload_dir(), config.storage.max_file_size)?;

        Ok(Self {
            config,
            sessions,
            registry: ConnectionRegistry::new(),
        })
    }

    /// Check that the application is properly configured
    ///
    /// # Errors
    ///
    /// Returns an error if the upload directory is missing or not writable.
    pub fn validate(&self) -> Result<()> {
        let upload_dir = self.sessions.upload_dir();
        if !upload_dir.exists() {
            return Err(Error::Configuration {
                message: format!("Upload directory does not exist: {}", upload_dir.display()),
            });
        }

        let test_file = upload_dir.join(".write_test");
        std::fs::write(&test_file, "test")?;
        std::fs::remove_file(&test_file)?;

        Ok(())
    }
}
