//! Connection registry: at most one live push channel per session
//!
//! Registering a channel for a token replaces any prior channel
//! (last-connect-wins). Delivery is best-effort and at-most-once: a failed
//! send is logged, the entry is dropped, and nothing propagates to HTTP
//! callers.

use dashmap::DashMap;
use sheetserve_core::types::PushEvent;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Sending half of a session's push channel
pub type PushSender = mpsc::UnboundedSender<PushEvent>;

/// Routes outbound push events to the session's live channel, if any
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    channels: Arc<DashMap<String, PushSender>>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel for a token, replacing any prior channel
    pub fn register(&self, token: &str, sender: PushSender) {
        if self.channels.insert(token.to_string(), sender).is_some() {
            debug!(session = %token, "Replaced existing push channel");
        }
        info!(session = %token, "Push channel registered");
    }

    /// Remove the entry for a token unconditionally
    pub fn unregister(&self, token: &str) -> bool {
        let removed = self.channels.remove(token).is_some();
        if removed {
            info!(session = %token, "Push channel unregistered");
        }
        removed
    }

    /// Remove the entry for a token only if it still holds `sender`
    ///
    /// A disconnecting handler must not evict a newer connection that has
    /// already replaced it.
    pub fn unregister_channel(&self, token: &str, sender: &PushSender) -> bool {
        let removed = self
            .channels
            .remove_if(token, |_, existing| existing.same_channel(sender))
            .is_some();
        if removed {
            info!(session = %token, "Push channel unregistered");
        }
        removed
    }

    /// Send an event to a session's channel
    ///
    /// Returns `true` on delivery into the channel. A closed channel cannot
    /// be distinguished from a slow consumer without a handshake, so failure
    /// drops the entry and returns `false`.
    pub fn send(&self, token: &str, event: PushEvent) -> bool {
        let Some(sender) = self.channels.get(token).map(|entry| entry.value().clone()) else {
            return false;
        };

        if sender.send(event).is_err() {
            warn!(session = %token, "Push delivery failed, dropping channel");
            self.unregister_channel(token, &sender);
            return false;
        }
        true
    }

    /// Whether a token has a live channel registered
    #[must_use]
    pub fn is_connected(&self, token: &str) -> bool {
        self.channels.contains_key(token)
    }

    /// Number of registered channels
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether no channels are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
