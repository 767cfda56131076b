//! Frame codec for the i3/sway IPC wire format
//!
//! Every message in either direction is a single frame:
//!
//! ```text
//! +----------+------------------+------------------+-----------------+
//! | "i3-ipc" | length (u32, LE) | type (u32, LE)   | payload (UTF-8) |
//! | 6 bytes  | 4 bytes          | 4 bytes          | `length` bytes  |
//! +----------+------------------+------------------+-----------------+
//! ```
//!
//! Replies reuse the request's type code. Asynchronous events carry codes
//! with the high bit set, so they never collide with reply codes.

use super::error::SwayError;

/// Magic string that opens every frame
pub const MAGIC: &[u8; 6] = b"i3-ipc";

/// Size of the fixed frame header (magic + length + type)
pub const HEADER_LEN: usize = 14;

const LENGTH_OFFSET: usize = 6;
const TYPE_OFFSET: usize = 10;

/// Bit set on every asynchronous event code
const EVENT_BIT: u32 = 0x8000_0000;

/// IPC message type codes
///
/// Query codes double as the codes of their replies. Codes this client does
/// not know about are carried through as `Unknown` so newer sway releases
/// never break framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    RunCommand,
    GetWorkspaces,
    Subscribe,
    GetOutputs,
    GetTree,
    GetMarks,
    GetBarConfig,
    GetVersion,
    GetBindingModes,
    GetConfig,
    SendTick,
    Sync,
    GetBindingState,
    GetInputs,
    GetSeats,
    WorkspaceEvent,
    ModeEvent,
    WindowEvent,
    BarConfigUpdateEvent,
    BindingEvent,
    ShutdownEvent,
    TickEvent,
    BarStateUpdateEvent,
    InputEvent,
    Unknown(u32),
}

impl MessageType {
    /// Numeric code as written on the wire
    pub fn code(self) -> u32 {
        match self {
            Self::RunCommand => 0,
            Self::GetWorkspaces => 1,
            Self::Subscribe => 2,
            Self::GetOutputs => 3,
            Self::GetTree => 4,
            Self::GetMarks => 5,
            Self::GetBarConfig => 6,
            Self::GetVersion => 7,
            Self::GetBindingModes => 8,
            Self::GetConfig => 9,
            Self::SendTick => 10,
            Self::Sync => 11,
            Self::GetBindingState => 12,
            Self::GetInputs => 100,
            Self::GetSeats => 101,
            Self::WorkspaceEvent => EVENT_BIT,
            Self::ModeEvent => EVENT_BIT | 0x02,
            Self::WindowEvent => EVENT_BIT | 0x03,
            Self::BarConfigUpdateEvent => EVENT_BIT | 0x04,
            Self::BindingEvent => EVENT_BIT | 0x05,
            Self::ShutdownEvent => EVENT_BIT | 0x06,
            Self::TickEvent => EVENT_BIT | 0x07,
            Self::BarStateUpdateEvent => EVENT_BIT | 0x14,
            Self::InputEvent => EVENT_BIT | 0x15,
            Self::Unknown(code) => code,
        }
    }

    /// Whether this is an asynchronous event rather than a reply
    pub fn is_event(self) -> bool {
        self.code() & EVENT_BIT != 0
    }
}

impl From<u32> for MessageType {
    fn from(code: u32) -> Self {
        match code {
            0 => Self::RunCommand,
            1 => Self::GetWorkspaces,
            2 => Self::Subscribe,
            3 => Self::GetOutputs,
            4 => Self::GetTree,
            5 => Self::GetMarks,
            6 => Self::GetBarConfig,
            7 => Self::GetVersion,
            8 => Self::GetBindingModes,
            9 => Self::GetConfig,
            10 => Self::SendTick,
            11 => Self::Sync,
            12 => Self::GetBindingState,
            100 => Self::GetInputs,
            101 => Self::GetSeats,
            0x8000_0000 => Self::WorkspaceEvent,
            0x8000_0002 => Self::ModeEvent,
            0x8000_0003 => Self::WindowEvent,
            0x8000_0004 => Self::BarConfigUpdateEvent,
            0x8000_0005 => Self::BindingEvent,
            0x8000_0006 => Self::ShutdownEvent,
            0x8000_0007 => Self::TickEvent,
            0x8000_0014 => Self::BarStateUpdateEvent,
            0x8000_0015 => Self::InputEvent,
            other => Self::Unknown(other),
        }
    }
}

impl From<MessageType> for u32 {
    fn from(message_type: MessageType) -> Self {
        message_type.code()
    }
}

/// Decoded fixed-size frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Number of payload bytes following the header
    pub length: u32,
    pub message_type: MessageType,
}

/// Length field for a payload of `len` bytes
///
/// # Errors
///
/// Returns `SwayError::PayloadTooLarge` if `len` does not fit in a u32.
pub fn payload_length(len: usize) -> Result<u32, SwayError> {
    u32::try_from(len).map_err(|_| SwayError::PayloadTooLarge { len })
}

/// Encode a message into a complete frame
///
/// # Errors
///
/// Returns `SwayError::PayloadTooLarge` for payloads longer than `u32::MAX`
/// bytes.
pub fn encode(message_type: MessageType, payload: &str) -> Result<Vec<u8>, SwayError> {
    let payload = payload.as_bytes();
    let length = payload_length(payload.len())?;

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(MAGIC);
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&message_type.code().to_le_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Decode the length and type fields of a frame header
///
/// The magic bytes are not checked; see [`has_valid_magic`].
pub fn decode_header(header: &[u8; HEADER_LEN]) -> FrameHeader {
    let length = u32::from_le_bytes([
        header[LENGTH_OFFSET],
        header[LENGTH_OFFSET + 1],
        header[LENGTH_OFFSET + 2],
        header[LENGTH_OFFSET + 3],
    ]);
    let code = u32::from_le_bytes([
        header[TYPE_OFFSET],
        header[TYPE_OFFSET + 1],
        header[TYPE_OFFSET + 2],
        header[TYPE_OFFSET + 3],
    ]);

    FrameHeader {
        length,
        message_type: MessageType::from(code),
    }
}

/// Whether a header starts with the `i3-ipc` magic string
pub fn has_valid_magic(header: &[u8; HEADER_LEN]) -> bool {
    header[..MAGIC.len()] == MAGIC[..]
}
