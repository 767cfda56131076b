//! Mirror of sway/i3 window-manager state over the IPC socket

pub mod sway_ipc;

pub use sway_ipc::{
    ActiveClient, ActiveState, ActiveWorkspace, MessageType, Node, NodeType, StateObserver,
    StateStore, SwayClient, SwayError, SwayMirror,
};
