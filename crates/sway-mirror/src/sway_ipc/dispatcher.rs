//! Routing of decoded messages into the state store
//!
//! The dispatcher is the single writer of the shared `StateStore`. Each frame
//! handed to it is decoded, applied under the write lock and followed by
//! exactly one "state changed" notification, whether or not the message was
//! understood. Failures are logged and swallowed so a single bad event can
//! never take the connection down.

use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tracing::{debug, trace, warn};

use super::codec::MessageType;
use super::error::SwayError;
use super::events::SwayMessage;
use super::state::StateStore;

/// Receiver of "state changed" notifications
///
/// Notifications carry no payload; consumers re-read the state through the
/// accessor API. Implementations must not block, they run on the read loop.
///
/// - In production: an `mpsc::Sender<()>` or a `watch::Sender<u64>`
/// - In tests: a closure counting calls, or `()`
pub trait StateObserver: Send + Sync {
    fn state_changed(&self);
}

impl<F> StateObserver for F
where
    F: Fn() + Send + Sync,
{
    fn state_changed(&self) {
        self()
    }
}

// A full channel already holds a pending wake-up, so dropping the extra one is fine
impl StateObserver for tokio::sync::mpsc::Sender<()> {
    fn state_changed(&self) {
        let _ = self.try_send(());
    }
}

// Generation counter, bumped on every change
impl StateObserver for tokio::sync::watch::Sender<u64> {
    fn state_changed(&self) {
        self.send_modify(|generation| *generation = generation.wrapping_add(1));
    }
}

impl StateObserver for () {
    fn state_changed(&self) {}
}

/// Applies decoded frames to a shared `StateStore`
pub struct EventDispatcher<O> {
    state: Arc<RwLock<StateStore>>,
    observer: O,
}

impl<O: StateObserver> EventDispatcher<O> {
    pub fn new(state: Arc<RwLock<StateStore>>, observer: O) -> Self {
        Self { state, observer }
    }

    /// Route one message to its handler, then notify the observer
    pub fn dispatch(&self, message_type: MessageType, payload: Value) {
        if let Err(e) = self.apply(message_type, payload) {
            warn!(message_type = ?message_type, "Dropping sway message: {}", e);
        }
        self.observer.state_changed();
    }

    fn apply(&self, message_type: MessageType, payload: Value) -> Result<(), SwayError> {
        let message = SwayMessage::decode(message_type, payload)?;

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match message {
            SwayMessage::Tree(root) => state.sync_tree(root),
            SwayMessage::Workspace(event) => {
                debug!(change = ?event.change, "Workspace event");
                state.apply_workspace_event(event);
            }
            SwayMessage::Window(event) => {
                debug!(change = ?event.change, id = event.container.id, "Window event");
                state.apply_window_event(event);
            }
            SwayMessage::Ignored(other) => {
                trace!(message_type = ?other, "Ignoring message");
            }
        }

        Ok(())
    }
}
