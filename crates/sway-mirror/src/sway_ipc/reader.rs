//! Frame reader and the mirror's read loop
//!
//! The loop alternates between two awaits on the same transport: the 14-byte
//! header, then exactly `length` payload bytes. Reads are never issued in
//! parallel since framing depends on byte order.
//!
//! ## Termination
//!
//! - EOF between frames: clean shutdown, `Ok(())`
//! - EOF inside a frame: logged as a truncated frame, `Ok(())`
//! - Any other I/O error: logged, `Err(SwayError::ReceiveFailed)`
//!
//! A payload that is not valid JSON is logged and skipped; the loop carries
//! on with the next header.

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};

use super::codec::{self, FrameHeader, HEADER_LEN};
use super::dispatcher::{EventDispatcher, StateObserver};
use super::error::SwayError;

/// One raw frame read off the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: FrameHeader,
    pub payload: Vec<u8>,
}

/// Outcome of filling a buffer from the transport
enum Fill {
    Complete,
    /// EOF after this many bytes
    Eof(usize),
}

async fn fill<R>(reader: &mut R, buf: &mut [u8]) -> Result<Fill, SwayError>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader
            .read(&mut buf[filled..])
            .await
            .map_err(SwayError::ReceiveFailed)?;
        if n == 0 {
            return Ok(Fill::Eof(filled));
        }
        filled += n;
    }
    Ok(Fill::Complete)
}

/// Read one complete frame
///
/// Returns `Ok(None)` when the transport closes, whether cleanly between
/// frames or in the middle of one (the latter is logged).
///
/// # Errors
///
/// Returns `SwayError::ReceiveFailed` if the transport reports an error.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Frame>, SwayError>
where
    R: AsyncRead + Unpin,
{
    let mut raw = [0u8; HEADER_LEN];
    match fill(reader, &mut raw).await? {
        Fill::Complete => {}
        Fill::Eof(0) => return Ok(None),
        Fill::Eof(got) => {
            warn!(got, expected = HEADER_LEN, "Sway connection closed mid-header");
            return Ok(None);
        }
    }

    if !codec::has_valid_magic(&raw) {
        warn!("Frame header does not start with i3-ipc magic");
    }
    let header = codec::decode_header(&raw);

    // Grows with the bytes actually received, not the length the header claims
    let mut payload = Vec::new();
    let got = (&mut *reader)
        .take(u64::from(header.length))
        .read_to_end(&mut payload)
        .await
        .map_err(SwayError::ReceiveFailed)?;
    if got < header.length as usize {
        warn!(
            got,
            expected = header.length,
            message_type = ?header.message_type,
            "Sway connection closed mid-payload"
        );
        return Ok(None);
    }

    Ok(Some(Frame { header, payload }))
}

/// Read frames until the transport closes, dispatching each one
///
/// # Errors
///
/// Returns `SwayError::ReceiveFailed` if the transport reports an error.
/// Closure of the transport is not an error.
pub async fn run_read_loop<R, O>(
    mut reader: R,
    dispatcher: EventDispatcher<O>,
) -> Result<(), SwayError>
where
    R: AsyncRead + Unpin,
    O: StateObserver,
{
    loop {
        let frame = match read_frame(&mut reader).await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!("Sway IPC connection closed");
                return Ok(());
            }
            Err(e) => {
                warn!("Sway IPC read loop stopped: {}", e);
                return Err(e);
            }
        };

        let message_type = frame.header.message_type;
        debug!(message_type = ?message_type, len = frame.payload.len(), "Received frame");

        let payload: serde_json::Value = match serde_json::from_slice(&frame.payload) {
            Ok(value) => value,
            Err(e) => {
                warn!(message_type = ?message_type, "Dropping unparseable payload: {}", e);
                continue;
            }
        };

        dispatcher.dispatch(message_type, payload);
    }
}
