//! Fire-and-forget progress synchronization.
//!
//! Requests are spawned on the current tokio runtime and never block the
//! caller. Each completed request comes back as a [`SyncEvent`] on a channel,
//! so the owning event loop handles network responses one at a time alongside
//! user input. Nothing is retried; failures are logged and reported.

use std::sync::Arc;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, warn};

use crate::core::types::{Level, TaskSignal};
use crate::io::progress::{Progress, ProgressStore};

/// Outcome of a background request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Initial progress fetch finished.
    Loaded(Progress),
    /// A task update was acknowledged with the store's merged state.
    Updated(Progress),
    /// A request failed. Local state remains authoritative.
    Failed {
        operation: &'static str,
        error: String,
    },
}

/// Handle for pushing task state to the progress store.
///
/// Without a store (offline mode) every request is a no-op.
#[derive(Clone)]
pub struct SyncClient {
    store: Option<Arc<dyn ProgressStore>>,
    player_id: String,
    level: Level,
    events: UnboundedSender<SyncEvent>,
}

impl SyncClient {
    pub fn new(
        store: Option<Arc<dyn ProgressStore>>,
        player_id: impl Into<String>,
        level: Level,
    ) -> (Self, UnboundedReceiver<SyncEvent>) {
        let (events, rx) = unbounded_channel();
        let client = Self {
            store,
            player_id: player_id.into(),
            level,
            events,
        };
        (client, rx)
    }

    pub fn offline(level: Level) -> (Self, UnboundedReceiver<SyncEvent>) {
        Self::new(None, "offline", level)
    }

    pub fn is_offline(&self) -> bool {
        self.store.is_none()
    }

    /// Register the player and fetch prior progress in the background.
    pub fn request_load(&self) {
        let Some(store) = self.store.clone() else {
            return;
        };
        let player_id = self.player_id.clone();
        let level = self.level;
        let events = self.events.clone();
        tokio::spawn(async move {
            if let Err(err) = store.register(&player_id).await {
                warn!(error = %format!("{err:#}"), "player registration failed");
            }
            let event = match store.fetch(&player_id, level).await {
                Ok(progress) => {
                    debug!(done = progress.done, "progress loaded");
                    SyncEvent::Loaded(progress)
                }
                Err(err) => failed("load progress", &err),
            };
            let _ = events.send(event);
        });
    }

    /// Push one task signal in the background.
    pub fn push(&self, signal: TaskSignal) {
        let Some(store) = self.store.clone() else {
            return;
        };
        let player_id = self.player_id.clone();
        let level = self.level;
        let events = self.events.clone();
        tokio::spawn(async move {
            let event = match store.update(&player_id, level, &signal).await {
                Ok(progress) => SyncEvent::Updated(progress),
                Err(err) => failed("update task", &err),
            };
            let _ = events.send(event);
        });
    }
}

fn failed(operation: &'static str, err: &anyhow::Error) -> SyncEvent {
    let error = format!("{err:#}");
    warn!(operation, error = %error, "progress sync failed");
    SyncEvent::Failed { operation, error }
}
