//! Protocol Messages
//!
//! Wire format between the bridge and external controllers over WebSocket.
//! Control messages are JSON text tagged by `type`; frames travel as binary
//! messages with a fixed 9-byte header followed by the JPEG payload.

use serde::{Serialize, Deserialize};

use crate::capture::frame::{EncodedFrame, FrameConfig};
use crate::control::action::{ActionCommand, Acknowledgment};
use crate::control::world::WorldSnapshot;

// =============================================================================
// JSON MESSAGES
// =============================================================================

/// Every JSON message exchanged over the bridge, in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeMessage {
    /// Controller → bridge: apply a timed action.
    Action(ActionCommand),

    /// Bridge → controller: action completed or failed.
    Ack(Acknowledgment),

    /// Bridge → controller: world and player state.
    State(WorldSnapshot),

    /// Controller → bridge: change capture settings.
    FrameConfig(FrameConfig),
}

impl BridgeMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON string.
    ///
    /// Unknown fields are ignored. A missing field or unknown `type` is an
    /// error whose message names the offending field or tag.
    pub fn from_json(s: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(s)?)
    }

    /// The `type` tag of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeMessage::Action(_) => "action",
            BridgeMessage::Ack(_) => "ack",
            BridgeMessage::State(_) => "state",
            BridgeMessage::FrameConfig(_) => "frame_config",
        }
    }
}

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// JSON text did not decode into a known message.
    #[error("Invalid message: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary message shorter than the frame header.
    #[error("Frame message too short: {len} bytes, header needs {}", FrameHeader::SIZE)]
    FrameTooShort {
        /// Bytes received.
        len: usize,
    },

    /// Binary message with an unrecognised tag byte.
    #[error("Unknown frame tag: 0x{0:02x}")]
    UnknownFrameTag(u8),
}

// =============================================================================
// BINARY FRAMES
// =============================================================================

/// Tag byte of a frame message.
pub const FRAME_TAG: u8 = 0x01;

/// Fixed header preceding every binary frame payload.
///
/// ```text
/// | tag (1) | sequence, u32 BE (4) | timestamp_ms, u32 BE (4) | payload ... |
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Message tag, [`FRAME_TAG`] for frames.
    pub tag: u8,
    /// Frame sequence number.
    pub sequence: u32,
    /// Truncated wall-clock milliseconds.
    pub timestamp_ms: u32,
}

impl FrameHeader {
    /// Encoded header length.
    pub const SIZE: usize = 9;

    /// Header for a frame.
    pub fn for_frame(frame: &EncodedFrame) -> Self {
        Self {
            tag: FRAME_TAG,
            sequence: frame.sequence,
            timestamp_ms: frame.timestamp_ms,
        }
    }

    /// Encode into the first [`Self::SIZE`] bytes.
    pub fn write(&self, out: &mut Vec<u8>) {
        out.push(self.tag);
        out.extend_from_slice(&self.sequence.to_be_bytes());
        out.extend_from_slice(&self.timestamp_ms.to_be_bytes());
    }

    /// Decode from the start of `data`.
    pub fn read(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < Self::SIZE {
            return Err(ProtocolError::FrameTooShort { len: data.len() });
        }
        let mut sequence = [0u8; 4];
        sequence.copy_from_slice(&data[1..5]);
        let mut timestamp = [0u8; 4];
        timestamp.copy_from_slice(&data[5..9]);

        Ok(Self {
            tag: data[0],
            sequence: u32::from_be_bytes(sequence),
            timestamp_ms: u32::from_be_bytes(timestamp),
        })
    }
}

/// Header + payload as one binary message. No length prefix: the payload
/// runs to the end of the message.
pub fn encode_frame_message(frame: &EncodedFrame) -> Vec<u8> {
    let mut out = Vec::with_capacity(FrameHeader::SIZE + frame.payload.len());
    FrameHeader::for_frame(frame).write(&mut out);
    out.extend_from_slice(&frame.payload);
    out
}

/// Parse a binary frame message.
pub fn decode_frame_message(data: &[u8]) -> Result<EncodedFrame, ProtocolError> {
    let header = FrameHeader::read(data)?;
    if header.tag != FRAME_TAG {
        return Err(ProtocolError::UnknownFrameTag(header.tag));
    }
    Ok(EncodedFrame {
        sequence: header.sequence,
        timestamp_ms: header.timestamp_ms,
        payload: data[FrameHeader::SIZE..].to_vec(),
    })
}
