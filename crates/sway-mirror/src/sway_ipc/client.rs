//! Sway IPC connection handling
//!
//! `SwayClient` owns one Unix socket connection. It can be used for plain
//! request/reply queries (`GET_TREE`, `RUN_COMMAND`, ...) or split into halves
//! and handed to a `SwayMirror` for event streaming.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::codec::{self, MessageType};
use super::error::SwayError;
use super::reader::read_frame;
use super::types::Node;

/// Initial delay between retry attempts (100ms)
const INITIAL_RETRY_DELAY_MS: u64 = 100;

/// Maximum delay between retry attempts (1 second)
const MAX_RETRY_DELAY_MS: u64 = 1_000;

/// Socket path exported by sway
const SWAYSOCK_ENV: &str = "SWAYSOCK";

/// Socket path exported by i3, which speaks the same protocol
const I3SOCK_ENV: &str = "I3SOCK";

/// Discover the IPC socket path from the environment
///
/// Reads `$SWAYSOCK`, falling back to `$I3SOCK`, and checks the path exists.
///
/// # Errors
///
/// Returns `SwayError::SocketNotSet` if neither variable is set.
/// Returns `SwayError::SocketNotFound` if the path doesn't exist.
pub fn get_socket_path() -> Result<PathBuf, SwayError> {
    let raw = std::env::var_os(SWAYSOCK_ENV)
        .or_else(|| std::env::var_os(I3SOCK_ENV))
        .ok_or(SwayError::SocketNotSet)?;

    check_socket_path(PathBuf::from(raw))
}

/// Resolve the socket path, preferring an explicit override
///
/// # Errors
///
/// Same as [`get_socket_path`]; an override that does not exist yields
/// `SwayError::SocketNotFound`.
pub fn resolve_socket_path(override_path: Option<&Path>) -> Result<PathBuf, SwayError> {
    match override_path {
        Some(path) => check_socket_path(path.to_path_buf()),
        None => get_socket_path(),
    }
}

fn check_socket_path(path: PathBuf) -> Result<PathBuf, SwayError> {
    if !path.exists() {
        return Err(SwayError::SocketNotFound { path });
    }
    Ok(path)
}

/// Write one frame and flush
///
/// # Errors
///
/// Returns `SwayError::PayloadTooLarge` if the payload cannot be framed,
/// `SwayError::SendFailed` if the write fails.
pub async fn write_frame<W>(
    writer: &mut W,
    message_type: MessageType,
    payload: &str,
) -> Result<(), SwayError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let frame = codec::encode(message_type, payload)?;
    writer.write_all(&frame).await.map_err(SwayError::SendFailed)?;
    writer.flush().await.map_err(SwayError::SendFailed)
}

/// Result of one command in a `RUN_COMMAND` reply
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandOutcome {
    pub success: bool,
    #[serde(default)]
    pub parse_error: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubscribeReply {
    success: bool,
}

/// Fail with the first rejected command's error, if any
///
/// # Errors
///
/// Returns `SwayError::CommandFailed` carrying sway's error message.
pub fn check_outcomes(outcomes: &[CommandOutcome]) -> Result<(), SwayError> {
    match outcomes.iter().find(|o| !o.success) {
        Some(failed) => Err(SwayError::CommandFailed {
            message: failed
                .error
                .clone()
                .unwrap_or_else(|| "command failed".to_string()),
        }),
        None => Ok(()),
    }
}

/// A connection to the sway IPC socket
#[derive(Debug)]
pub struct SwayClient {
    socket: UnixStream,
    socket_path: PathBuf,
}

impl SwayClient {
    /// Connect to sway
    ///
    /// Uses `socket_path` when given, otherwise discovers the socket from the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns `SwayError::SocketNotSet`/`SocketNotFound` if no socket can be
    /// located, `SwayError::ConnectionFailed` if connecting fails.
    pub async fn connect(socket_path: Option<&Path>) -> Result<Self, SwayError> {
        let socket_path = resolve_socket_path(socket_path)?;

        let socket = UnixStream::connect(&socket_path)
            .await
            .map_err(|e| SwayError::ConnectionFailed {
                path: socket_path.clone(),
                source: e,
            })?;

        debug!("Connected to sway socket at {}", socket_path.display());

        Ok(Self {
            socket,
            socket_path,
        })
    }

    /// Connect with retry logic and exponential backoff
    ///
    /// # Backoff Strategy
    ///
    /// - Initial delay: 100ms
    /// - Each retry: delay *= 2
    /// - Maximum delay: 1 second (capped)
    ///
    /// `max_retries` of 0 means a single attempt.
    ///
    /// # Errors
    ///
    /// Returns `SwayError::SocketNotSet` immediately if no socket is
    /// configured, `SwayError::MaxRetriesExceeded` once all attempts fail.
    pub async fn connect_with_retry(
        socket_path: Option<&Path>,
        max_retries: u32,
    ) -> Result<Self, SwayError> {
        let mut attempt = 0;
        let mut delay_ms = INITIAL_RETRY_DELAY_MS;
        let last_error = loop {
            attempt += 1;

            match Self::connect(socket_path).await {
                Ok(client) => {
                    if attempt > 1 {
                        info!("Connected to sway after {} attempt(s)", attempt);
                    }
                    return Ok(client);
                }
                Err(e) => {
                    // Nothing to wait for if no socket is configured at all
                    if matches!(e, SwayError::SocketNotSet) {
                        return Err(e);
                    }

                    if attempt > max_retries {
                        break e;
                    }

                    warn!(
                        attempt = attempt,
                        max_retries = max_retries,
                        delay_ms = delay_ms,
                        "Sway IPC connection failed, retrying..."
                    );

                    sleep(Duration::from_millis(delay_ms)).await;

                    delay_ms = (delay_ms * 2).min(MAX_RETRY_DELAY_MS);
                }
            }
        };

        warn!(
            attempts = attempt,
            last_error = %last_error,
            "Failed to connect to sway after all retry attempts"
        );

        Err(SwayError::MaxRetriesExceeded { attempts: attempt })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Send a message without waiting for the reply
    ///
    /// # Errors
    ///
    /// Returns `SwayError::SendFailed` if writing to the socket fails.
    pub async fn send(&mut self, message_type: MessageType, payload: &str) -> Result<(), SwayError> {
        write_frame(&mut self.socket, message_type, payload).await
    }

    /// Send a query and wait for its reply
    ///
    /// Frames of other types arriving in between (events on a subscribed
    /// connection) are skipped.
    ///
    /// # Errors
    ///
    /// Returns `SwayError::SendFailed`/`ReceiveFailed` on I/O failure,
    /// `SwayError::ConnectionClosed` if sway hangs up first,
    /// `SwayError::UnexpectedReply` if a reply of another type arrives and
    /// `SwayError::DeserializeFailed` if the reply is not JSON.
    pub async fn request(
        &mut self,
        message_type: MessageType,
        payload: &str,
    ) -> Result<Value, SwayError> {
        self.send(message_type, payload).await?;

        loop {
            let frame = read_frame(&mut self.socket)
                .await?
                .ok_or(SwayError::ConnectionClosed)?;

            let got = frame.header.message_type;
            if got.is_event() {
                debug!(event = ?got, "Skipping event while waiting for reply");
                continue;
            }
            if got != message_type {
                return Err(SwayError::UnexpectedReply {
                    expected: message_type,
                    got,
                });
            }

            return serde_json::from_slice(&frame.payload).map_err(SwayError::DeserializeFailed);
        }
    }

    /// Fetch the full layout tree
    ///
    /// # Errors
    ///
    /// Returns any error from [`request`](Self::request), or
    /// `SwayError::DeserializeFailed` if the reply is not a tree.
    pub async fn get_tree(&mut self) -> Result<Node, SwayError> {
        let value = self.request(MessageType::GetTree, "").await?;
        serde_json::from_value(value).map_err(SwayError::DeserializeFailed)
    }

    /// Run one or more sway commands
    ///
    /// Returns one outcome per command. A command sway rejects is reported
    /// in its outcome, not as an error.
    ///
    /// # Errors
    ///
    /// Returns any error from [`request`](Self::request), or
    /// `SwayError::DeserializeFailed` if the reply has an unexpected shape.
    pub async fn run_command(&mut self, command: &str) -> Result<Vec<CommandOutcome>, SwayError> {
        let value = self.request(MessageType::RunCommand, command).await?;
        serde_json::from_value(value).map_err(SwayError::DeserializeFailed)
    }

    /// Subscribe this connection to the given event classes
    ///
    /// # Errors
    ///
    /// Returns `SwayError::CommandFailed` if sway refuses the subscription,
    /// or any error from [`request`](Self::request).
    pub async fn subscribe(&mut self, events: &[String]) -> Result<(), SwayError> {
        let payload = serde_json::to_string(events).map_err(SwayError::SerializeFailed)?;
        let reply: SubscribeReply = serde_json::from_value(
            self.request(MessageType::Subscribe, &payload).await?,
        )
        .map_err(SwayError::DeserializeFailed)?;

        if !reply.success {
            return Err(SwayError::CommandFailed {
                message: format!("subscription to {payload} refused"),
            });
        }
        Ok(())
    }

    /// Split into read and write halves for a `SwayMirror`
    pub fn into_split(self) -> (OwnedReadHalf, OwnedWriteHalf) {
        self.socket.into_split()
    }
}
