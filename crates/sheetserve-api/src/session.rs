//! Session store: one uploaded workbook per opaque token
//!
//! A session is a file on disk named `{token}_{sanitized original name}`
//! inside the upload directory. Tokens are uuid v4, so collisions are
//! negligible and the `{token}_` prefix search is exact. Lookups only ever
//! compare directory entry names, so a hostile token cannot escape the
//! upload directory.

use sheetserve_core::{Result, security, utils};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{info, warn};
use uuid::Uuid;

/// A successfully stored upload
#[derive(Debug, Clone)]
pub struct StoredSession {
    /// Opaque session token
    pub token: String,

    /// Full path of the stored file
    pub path: PathBuf,

    /// Stored filename (`{token}_{sanitized}`)
    pub stored_name: String,
}

/// Owns the upload directory and the session naming scheme
#[derive(Debug, Clone)]
pub struct SessionStore {
    upload_dir: PathBuf,
    max_file_size: u64,
}

impl SessionStore {
    /// Create a store rooted at `upload_dir`, creating the directory
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(upload_dir: PathBuf, max_file_size: u64) -> Result<Self> {
        std::fs::create_dir_all(&upload_dir)?;
        Ok(Self {
            upload_dir,
            max_file_size,
        })
    }

    /// Base upload directory
    #[must_use]
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Validate and store an upload, returning a new session
    ///
    /// Size and filename checks run before anything is written; the full
    /// content validation runs against the written file and deletes it again
    /// on rejection, so a rejected upload leaves no partial state.
    ///
    /// # Errors
    ///
    /// Returns a validation error with the rejection reason, or an I/O error
    /// if the write itself fails.
    pub fn create(&self, bytes: &[u8], original_name: &str) -> Result<StoredSession> {
        security::preflight(bytes.len() as u64, original_name, self.max_file_size)?;

        let token = Uuid::new_v4().to_string();
        let stored_name = utils::session_filename(&token, original_name);
        let path = self.upload_dir.join(&stored_name);

        std::fs::write(&path, bytes)?;

        if let Err(err) = security::validate_upload(&path, original_name, self.max_file_size) {
            if let Err(cleanup) = std::fs::remove_file(&path) {
                warn!(path = %path.display(), error = %cleanup, "Failed to remove rejected upload");
            }
            return Err(err);
        }

        info!(
            session = %token,
            file = %stored_name,
            size = bytes.len(),
            "Stored session upload"
        );

        Ok(StoredSession {
            token,
            path,
            stored_name,
        })
    }

    /// Resolve a session token to its stored file, by `{token}_` prefix scan
    #[must_use]
    pub fn resolve(&self, token: &str) -> Option<PathBuf> {
        if token.is_empty() {
            return None;
        }
        let prefix = format!("{token}_");

        let entries = std::fs::read_dir(&self.upload_dir).ok()?;
        for entry in entries.flatten() {
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(&prefix) {
                return Some(entry.path());
            }
        }
        None
    }

    /// Remove a session's stored file
    ///
    /// Returns `true` when a file was removed, `false` for an unknown token.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file exists but cannot be deleted.
    pub fn remove(&self, token: &str) -> Result<bool> {
        match self.resolve(token) {
            Some(path) => {
                std::fs::remove_file(&path)?;
                info!(session = %token, "Removed session");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove stored files older than `ttl`, returning how many were purged
    ///
    /// Creation time is implicit via file mtime. Files whose metadata cannot
    /// be read are skipped.
    pub fn purge_older_than(&self, ttl: Duration) -> usize {
        let now = SystemTime::now();
        let mut purged = 0;

        let Ok(entries) = std::fs::read_dir(&self.upload_dir) else {
            return 0;
        };

        for entry in entries.flatten() {
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            let expired = now
                .duration_since(modified)
                .map_or(false, |age| age > ttl);

            if expired {
                match std::fs::remove_file(entry.path()) {
                    Ok(()) => {
                        info!(file = %entry.path().display(), "Purged expired session");
                        purged += 1;
                    }
                    Err(e) => {
                        warn!(file = %entry.path().display(), error = %e, "Failed to purge session");
                    }
                }
            }
        }

        purged
    }

    /// Original filename for a stored path (session-token prefix stripped)
    #[must_use]
    pub fn original_name(path: &Path) -> String {
        let stored = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        utils::original_filename(&stored).to_string()
    }
}
