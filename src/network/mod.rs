//! Network Layer
//!
//! WebSocket transport for external controllers and the wire codec it speaks.
//! Nothing here touches client state directly; everything inbound goes
//! through the bridge inbox.

pub mod protocol;
pub mod server;

pub use protocol::{
    BridgeMessage, FrameHeader, ProtocolError, FRAME_TAG, decode_frame_message,
    encode_frame_message,
};
pub use server::{BridgeServer, Broadcaster, ServerConfig, ServerError};
