//! Sway IPC client and state mirror
//!
//! This module talks to sway (or i3) over its IPC socket and keeps an
//! in-memory mirror of the window-manager state:
//! - Outputs (monitors), workspaces and client windows, keyed by node id
//! - The currently active client, workspace and monitor
//!
//! ## Architecture
//!
//! - `codec`: `i3-ipc` frame encoding and header decoding
//! - `SwayClient`: socket discovery, connection retry and request/reply queries
//! - `SwayMirror`: handle onto a `StateStore` kept current by a background read loop
//! - `EventDispatcher`: routes decoded messages into the store and notifies a `StateObserver`
//! - `SwayError`: error types for IPC operations
//!
//! ## Protocol
//!
//! Sway exposes a Unix socket at `$SWAYSOCK` (i3 uses `$I3SOCK`). Every message
//! in either direction is a 14-byte header (`"i3-ipc"`, payload length and
//! message type as little-endian u32s) followed by a JSON payload. After
//! `SUBSCRIBE`, events arrive on the same connection with the high bit of the
//! type set.

pub mod codec;
mod client;
mod dispatcher;
mod error;
mod events;
mod mirror;
mod reader;
mod state;
mod types;

pub use client::{
    check_outcomes, get_socket_path, resolve_socket_path, write_frame, CommandOutcome, SwayClient,
};
pub use codec::{FrameHeader, MessageType};
pub use dispatcher::{EventDispatcher, StateObserver};
pub use error::SwayError;
pub use events::{SwayMessage, WindowChange, WindowEvent, WorkspaceChange, WorkspaceEvent};
pub use mirror::{default_subscriptions, MirrorTask, SwayMirror, DEFAULT_SUBSCRIPTIONS};
pub use reader::{read_frame, run_read_loop, Frame};
pub use state::StateStore;
pub use types::{
    ActiveClient, ActiveState, ActiveWorkspace, IdleInhibitors, Node, NodeType, Rect,
    WindowProperties,
};
