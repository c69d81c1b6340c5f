//! Session file watching
//!
//! Watches the directory containing a session's stored file through a
//! debounced notify watcher and reports changes that touch exactly that file.
//! One watch per push channel; the lifecycle is `idle -> watching -> stopped`
//! with no way back to `watching` on the same instance.

use crate::{Result, WatchError, config::WatchConfig};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_full::{DebounceEventResult, DebouncedEvent, Debouncer, FileIdMap, new_debouncer};
use sheetserve_core::types::ChangeKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// A change observed on a session's stored file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Path of the changed file
    pub path: PathBuf,

    /// Classification of the change
    pub kind: ChangeKind,
}

/// Watch lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Created, not yet started
    Idle,
    /// Watch loop running
    Watching,
    /// Stopped; a new instance is needed to watch again
    Stopped,
}

/// Watches one stored file for external modification
///
/// The watcher does not distinguish self-induced changes (a persist issued by
/// the same session) from external ones; both are reported.
#[derive(Debug)]
pub struct SessionWatch {
    target: PathBuf,
    config: WatchConfig,
    state: WatchState,
    active: Arc<AtomicBool>,
    debouncer: Option<Debouncer<RecommendedWatcher, FileIdMap>>,
}

impl SessionWatch {
    /// Create a watcher for a stored file
    #[must_use]
    pub fn new(target: PathBuf, config: WatchConfig) -> Self {
        Self {
            target,
            config,
            state: WatchState::Idle,
            active: Arc::new(AtomicBool::new(false)),
            debouncer: None,
        }
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn state(&self) -> WatchState {
        self.state
    }

    /// Start watching the stored file's containing directory
    ///
    /// Returns the receiving end of the change-event channel. Events are
    /// delivered best-effort: when the channel is full the event is dropped
    /// with a warning, never blocking the watch thread.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError`] if the watch is already running, the target or
    /// its directory does not exist, or the underlying watcher cannot be
    /// initialized.
    pub fn start(&mut self) -> Result<mpsc::Receiver<ChangeEvent>> {
        if self.state == WatchState::Watching {
            return Err(WatchError::AlreadyWatching);
        }
        if !self.target.exists() {
            return Err(WatchError::target_missing(&self.target));
        }
        let watch_dir = self
            .target
            .parent()
            .ok_or_else(|| WatchError::target_missing(&self.target))?
            .to_path_buf();

        info!(
            target = %self.target.display(),
            watch_dir = %watch_dir.display(),
            "Starting session file watch"
        );

        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let active = Arc::new(AtomicBool::new(true));

        let flag = Arc::clone(&active);
        let target = self.target.clone();

        let mut debouncer = new_debouncer(
            self.config.debounce_delay(),
            None,
            move |result: DebounceEventResult| {
                // Cooperative stop: checked once per debounced batch
                if !flag.load(Ordering::Relaxed) {
                    return;
                }

                match result {
                    Ok(events) => {
                        for event in events {
                            let Some(change) = classify_event(&event, &target) else {
                                continue;
                            };
                            debug!(path = %change.path.display(), kind = ?change.kind, "Stored file changed");
                            if let Err(e) = tx.try_send(change) {
                                warn!("Dropping change event: {e}");
                            }
                        }
                    }
                    Err(errors) => {
                        for e in errors {
                            error!("File system watcher error: {e:?}");
                        }
                    }
                }
            },
        )
        .map_err(|e| WatchError::watcher(e.to_string()))?;

        debouncer
            .watcher()
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .map_err(|e| {
                WatchError::watcher(format!("Failed to watch {}: {e}", watch_dir.display()))
            })?;

        self.active = active;
        self.debouncer = Some(debouncer);
        self.state = WatchState::Watching;

        Ok(rx)
    }

    /// Stop the watch
    ///
    /// Dropping the debouncer closes the event channel, which ends any
    /// consumer loop. Idempotent.
    pub fn stop(&mut self) {
        if self.debouncer.is_some() {
            info!(target = %self.target.display(), "Stopping session file watch");
        }
        self.active.store(false, Ordering::Relaxed);
        self.debouncer = None;
        if self.state == WatchState::Watching {
            self.state = WatchState::Stopped;
        }
    }
}

impl Drop for SessionWatch {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Filter a debounced event to the watched file and classify it
fn classify_event(event: &DebouncedEvent, target: &Path) -> Option<ChangeEvent> {
    if !event.event.paths.iter().any(|p| p == target) {
        return None;
    }

    let kind = match event.event.kind {
        notify::EventKind::Create(_) => ChangeKind::Created,
        notify::EventKind::Modify(_) => ChangeKind::Modified,
        notify::EventKind::Remove(_) => ChangeKind::Removed,
        _ => ChangeKind::Other,
    };

    Some(ChangeEvent {
        path: target.to_path_buf(),
        kind,
    })
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn fast_config() -> WatchConfig {
        WatchConfig {
            debounce_delay_ms: 100,
            channel_capacity: 64,
        }
    }

    #[test]
    fn test_state_machine_idle_to_stopped() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("book.xlsx");
        std::fs::write(&target, b"x").unwrap();

        let mut watch = SessionWatch::new(target, fast_config());
        assert_eq!(watch.state(), WatchState::Idle);

        // stop before start leaves the watch idle, not stopped
        watch.stop();
        assert_eq!(watch.state(), WatchState::Idle);
    }

    #[test]
    fn test_start_missing_target() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("absent.xlsx");

        let mut watch = SessionWatch::new(target, fast_config());
        let err = watch.start().unwrap_err();
        assert!(matches!(err, WatchError::TargetMissing { .. }));
        assert_eq!(watch.state(), WatchState::Idle);
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("book.xlsx");
        std::fs::write(&target, b"x").unwrap();

        let mut watch = SessionWatch::new(target, fast_config());
        let _rx = watch.start().unwrap();
        assert_eq!(watch.state(), WatchState::Watching);

        let err = watch.start().unwrap_err();
        assert!(matches!(err, WatchError::AlreadyWatching));

        watch.stop();
        assert_eq!(watch.state(), WatchState::Stopped);
    }

    #[tokio::test]
    async fn test_modification_is_reported() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("book.xlsx");
        std::fs::write(&target, b"before").unwrap();

        let mut watch = SessionWatch::new(target.clone(), fast_config());
        let mut rx = watch.start().unwrap();

        // Give the watcher a moment to arm before the write
        tokio::time::sleep(Duration::from_millis(200)).await;
        std::fs::write(&target, b"after").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("timed out waiting for change event")
            .expect("watch channel closed early");

        assert_eq!(event.path, target);
        assert_ne!(event.kind, ChangeKind::Removed);
    }

    #[tokio::test]
    async fn test_sibling_changes_are_filtered_out() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("book.xlsx");
        let sibling = dir.path().join("other.xlsx");
        std::fs::write(&target, b"t").unwrap();
        std::fs::write(&sibling, b"s").unwrap();

        let mut watch = SessionWatch::new(target.clone(), fast_config());
        let mut rx = watch.start().unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        std::fs::write(&sibling, b"sibling change").unwrap();
        std::fs::write(&target, b"target change").unwrap();

        // Every reported event references the watched file only
        let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("timed out waiting for change event")
            .expect("watch channel closed early");
        assert_eq!(event.path, target);

        while let Ok(Some(extra)) = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await
        {
            assert_eq!(extra.path, target);
        }
    }

    #[tokio::test]
    async fn test_stop_closes_channel() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("book.xlsx");
        std::fs::write(&target, b"x").unwrap();

        let mut watch = SessionWatch::new(target, fast_config());
        let mut rx = watch.start().unwrap();
        watch.stop();

        let closed = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("channel should close promptly after stop");
        assert!(closed.is_none());
    }

    #[test]
    fn test_classify_event_filters_other_paths() {
        use notify::{Event, EventKind, event::ModifyKind};

        let target = PathBuf::from("/tmp/watched.xlsx");
        let event = DebouncedEvent {
            event: Event {
                kind: EventKind::Modify(ModifyKind::Any),
                paths: vec![PathBuf::from("/tmp/other.xlsx")],
                attrs: notify::event::EventAttributes::default(),
            },
            time: std::time::Instant::now(),
        };

        assert!(classify_event(&event, &target).is_none());
    }

    #[test]
    fn test_classify_event_kinds() {
        use notify::{Event, EventKind, event::{CreateKind, ModifyKind, RemoveKind}};

        let target = PathBuf::from("/tmp/watched.xlsx");
        let cases = [
            (EventKind::Create(CreateKind::File), ChangeKind::Created),
            (EventKind::Modify(ModifyKind::Any), ChangeKind::Modified),
            (EventKind::Remove(RemoveKind::File), ChangeKind::Removed),
            (EventKind::Access(notify::event::AccessKind::Any), ChangeKind::Other),
        ];

        for (event_kind, expected) in cases {
            let event = DebouncedEvent {
                event: Event {
                    kind: event_kind,
                    paths: vec![target.clone()],
                    attrs: notify::event::EventAttributes::default(),
                },
                time: std::time::Instant::now(),
            };
            let change = classify_event(&event, &target).unwrap();
            assert_eq!(change.kind, expected);
        }
    }
}
