//! Error types for sway IPC operations

use std::path::PathBuf;
use thiserror::Error;

use super::codec::MessageType;

/// Errors that can occur when talking to the sway (or i3) IPC socket
#[derive(Debug, Error)]
pub enum SwayError {
    /// Neither SWAYSOCK nor I3SOCK is set
    #[error("Neither SWAYSOCK nor I3SOCK is set - is sway running?")]
    SocketNotSet,

    /// The socket path does not exist
    #[error("Sway socket not found at {path}")]
    SocketNotFound { path: PathBuf },

    /// Failed to connect to the sway socket
    #[error("Failed to connect to sway socket at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a frame to sway
    #[error("Failed to send message to sway: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Failed to read a frame from sway
    #[error("Failed to receive message from sway: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Failed to serialize an outgoing payload
    #[error("Failed to serialize payload: {0}")]
    SerializeFailed(#[source] serde_json::Error),

    /// Payload too long for the frame's u32 length field
    #[error("Payload of {len} bytes exceeds the IPC frame limit")]
    PayloadTooLarge { len: usize },

    /// Failed to decode an incoming payload
    #[error("Failed to deserialize payload: {0}")]
    DeserializeFailed(#[source] serde_json::Error),

    /// A payload lacked a field its message type requires
    #[error("{message_type:?} payload is missing required field `{field}`")]
    MissingField {
        message_type: MessageType,
        field: &'static str,
    },

    /// Connection was closed before a reply arrived
    #[error("Connection to sway closed unexpectedly")]
    ConnectionClosed,

    /// Sway answered with a different message type than the one requested
    #[error("Unexpected reply from sway: expected {expected:?}, got {got:?}")]
    UnexpectedReply {
        expected: MessageType,
        got: MessageType,
    },

    /// Sway rejected a command or subscription
    #[error("Sway returned error: {message}")]
    CommandFailed { message: String },

    /// Maximum retry attempts exceeded
    #[error("Failed to connect to sway after {attempts} attempts")]
    MaxRetriesExceeded { attempts: u32 },
}
