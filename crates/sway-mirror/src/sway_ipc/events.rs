//! Typed message payloads
//!
//! Frames arrive as a message type plus an untyped JSON value. `SwayMessage`
//! turns that pair into one of the payloads the mirror acts on, rejecting
//! payloads that lack the fields their type requires instead of trusting the
//! peer.

use serde::Deserialize;
use serde_json::Value;

use super::codec::MessageType;
use super::error::SwayError;
use super::types::Node;

/// `change` tag of a workspace event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceChange {
    Init,
    Empty,
    Focus,
    Move,
    Rename,
    Urgent,
    Reload,
    #[serde(other)]
    Other,
}

/// `change` tag of a window event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowChange {
    New,
    Close,
    Focus,
    Title,
    FullscreenMode,
    Move,
    Floating,
    Urgent,
    Mark,
    #[serde(other)]
    Other,
}

/// Payload of a workspace event
///
/// `current` is null for `reload`, `old` is only set for `focus` and may be
/// null there too (e.g. the first focus after startup).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorkspaceEvent {
    pub change: WorkspaceChange,
    #[serde(default)]
    pub current: Option<Node>,
    #[serde(default)]
    pub old: Option<Node>,
}

/// Payload of a window event
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WindowEvent {
    pub change: WindowChange,
    pub container: Node,
}

/// A decoded message the mirror knows how to apply
#[derive(Debug, Clone, PartialEq)]
pub enum SwayMessage {
    /// Reply to `GET_TREE`
    Tree(Node),
    Workspace(WorkspaceEvent),
    Window(WindowEvent),
    /// Anything else: other replies, the subscribe ack, unhandled events
    Ignored(MessageType),
}

impl SwayMessage {
    /// Decode a payload according to its message type
    ///
    /// # Errors
    ///
    /// Returns `SwayError::DeserializeFailed` when the payload does not have
    /// the shape its message type requires, and `SwayError::MissingField` when
    /// a workspace event other than `reload` carries no `current` workspace.
    pub fn decode(message_type: MessageType, payload: Value) -> Result<Self, SwayError> {
        match message_type {
            MessageType::GetTree => {
                let root: Node =
                    serde_json::from_value(payload).map_err(SwayError::DeserializeFailed)?;
                Ok(Self::Tree(root))
            }
            MessageType::WorkspaceEvent => {
                let event: WorkspaceEvent =
                    serde_json::from_value(payload).map_err(SwayError::DeserializeFailed)?;
                if event.current.is_none() && event.change != WorkspaceChange::Reload {
                    return Err(SwayError::MissingField {
                        message_type,
                        field: "current",
                    });
                }
                Ok(Self::Workspace(event))
            }
            MessageType::WindowEvent => {
                let event: WindowEvent =
                    serde_json::from_value(payload).map_err(SwayError::DeserializeFailed)?;
                Ok(Self::Window(event))
            }
            other => Ok(Self::Ignored(other)),
        }
    }
}
