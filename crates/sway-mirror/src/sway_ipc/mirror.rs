//! Live mirror of sway's window-manager state
//!
//! `SwayMirror` is a cheap, cloneable handle onto a `StateStore` that a
//! background read loop keeps in sync with sway. Starting the mirror sends
//! `GET_TREE` followed by `SUBSCRIBE`; the tree reply seeds the store and the
//! subscribed events keep it current from then on.
//!
//! Accessors return owned snapshots, so callers never hold the store lock.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::client::{write_frame, SwayClient};
use super::codec::MessageType;
use super::dispatcher::{EventDispatcher, StateObserver};
use super::error::SwayError;
use super::reader::run_read_loop;
use super::state::StateStore;
use super::types::{ActiveState, Node};

/// Event classes subscribed to when none are configured
pub const DEFAULT_SUBSCRIPTIONS: &[&str] = &["window", "workspace"];

type SharedWriter = Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;

/// Handle to the background read loop
pub type MirrorTask = JoinHandle<Result<(), SwayError>>;

/// Read-only view of the mirrored state, plus the outbound half of the
/// connection
#[derive(Clone)]
pub struct SwayMirror {
    state: Arc<RwLock<StateStore>>,
    writer: SharedWriter,
}

impl std::fmt::Debug for SwayMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwayMirror")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl SwayMirror {
    /// Start mirroring over an already-established transport
    ///
    /// Spawns the read loop, then sends `GET_TREE` and `SUBSCRIBE` with
    /// `subscriptions`. The returned task resolves when the transport closes;
    /// if either request fails the task is aborted before returning.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sway_mirror::sway_ipc::{default_subscriptions, SwayClient, SwayMirror};
    ///
    /// # async fn example() -> Result<(), sway_mirror::SwayError> {
    /// let client = SwayClient::connect(None).await?;
    /// let (reader, writer) = client.into_split();
    /// let (tx, mut rx) = tokio::sync::mpsc::channel::<()>(1);
    ///
    /// let (mirror, _task) =
    ///     SwayMirror::start(reader, writer, &default_subscriptions(), tx).await?;
    ///
    /// while rx.recv().await.is_some() {
    ///     println!("focused: {}", mirror.active().client.title);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `SwayError::SerializeFailed` if the subscription list cannot
    /// be encoded, `SwayError::SendFailed` if either request cannot be
    /// written.
    pub async fn start<R, W, O>(
        reader: R,
        writer: W,
        subscriptions: &[String],
        observer: O,
    ) -> Result<(Self, MirrorTask), SwayError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
        O: StateObserver + 'static,
    {
        let state = Arc::new(RwLock::new(StateStore::new()));
        let dispatcher = EventDispatcher::new(state.clone(), observer);
        let task = tokio::spawn(run_read_loop(reader, dispatcher));

        let writer: Box<dyn AsyncWrite + Send + Unpin> = Box::new(writer);
        let mirror = Self {
            state,
            writer: Arc::new(Mutex::new(writer)),
        };

        if let Err(e) = mirror.request_initial_state(subscriptions).await {
            // Nobody could reach the store this task fills
            task.abort();
            return Err(e);
        }

        Ok((mirror, task))
    }

    async fn request_initial_state(&self, subscriptions: &[String]) -> Result<(), SwayError> {
        let payload = serde_json::to_string(subscriptions).map_err(SwayError::SerializeFailed)?;
        self.send(MessageType::GetTree, "").await?;
        self.send(MessageType::Subscribe, &payload).await?;
        debug!(subscriptions = %payload, "Requested tree and subscribed");
        Ok(())
    }

    /// Start mirroring over a connected client
    ///
    /// # Errors
    ///
    /// Same as [`start`](Self::start).
    pub async fn from_client<O>(
        client: SwayClient,
        subscriptions: &[String],
        observer: O,
    ) -> Result<(Self, MirrorTask), SwayError>
    where
        O: StateObserver + 'static,
    {
        info!("Mirroring sway state from {}", client.socket_path().display());
        let (reader, writer) = client.into_split();
        Self::start(reader, writer, subscriptions, observer).await
    }

    /// Send a raw message to sway
    ///
    /// Writes are serialized so concurrent callers never interleave frames.
    /// Any reply is consumed by the read loop.
    ///
    /// # Errors
    ///
    /// Returns `SwayError::SendFailed` if the write fails.
    pub async fn send(&self, message_type: MessageType, payload: &str) -> Result<(), SwayError> {
        let mut writer = self.writer.lock().await;
        write_frame(&mut *writer, message_type, payload).await
    }

    fn read(&self) -> RwLockReadGuard<'_, StateStore> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// All outputs, keyed by node id
    ///
    /// Taken under the read lock at call time; later events do not affect
    /// the returned map.
    pub fn monitors(&self) -> HashMap<i64, Node> {
        self.read().monitors().clone()
    }

    /// One output, `None` if sway has not reported it
    pub fn monitor(&self, id: i64) -> Option<Node> {
        self.read().monitors().get(&id).cloned()
    }

    /// All workspaces, keyed by node id
    pub fn workspaces(&self) -> HashMap<i64, Node> {
        self.read().workspaces().clone()
    }

    pub fn workspace(&self, id: i64) -> Option<Node> {
        self.read().workspaces().get(&id).cloned()
    }

    /// All containers and windows, keyed by node id
    ///
    /// Entries are detached from the tree: `nodes` and `floating_nodes` are
    /// empty, children are listed by id in `focus`.
    pub fn clients(&self) -> HashMap<i64, Node> {
        self.read().clients().clone()
    }

    pub fn client(&self, id: i64) -> Option<Node> {
        self.read().clients().get(&id).cloned()
    }

    /// Current focus
    ///
    /// A window that closed while focused stays here until the next focus
    /// event.
    pub fn active(&self) -> ActiveState {
        self.read().active().clone()
    }

    /// Consistent copy of the whole store
    pub fn snapshot(&self) -> StateStore {
        self.read().clone()
    }
}

/// Owned subscription list from the defaults
pub fn default_subscriptions() -> Vec<String> {
    DEFAULT_SUBSCRIPTIONS.iter().map(|s| s.to_string()).collect()
}
