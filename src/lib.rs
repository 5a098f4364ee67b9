//! # Vision Bridge
//!
//! Real-time bridge between a vision-driven decision loop and a 3D game
//! client: rendered frames go out, movement/look/button actions come in.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       VISION BRIDGE                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  control/        - Owner-thread action application           │
//! │  ├── action.rs   - Commands, clamping, acknowledgments       │
//! │  ├── applier.rs  - One active action, FIFO queue             │
//! │  ├── safety.rs   - Look bound, rate limit, kill switch       │
//! │  ├── world.rs    - Client control surface + state snapshot   │
//! │  └── headless.rs - In-memory client                          │
//! │                                                              │
//! │  capture/        - Frame capture and encoding                │
//! │  ├── frame.rs    - Settings, scale/flip, JPEG                │
//! │  ├── queue.rs    - Bounded drop-oldest handoff               │
//! │  ├── pipeline.rs - Decimation, encoder pool, sequencing      │
//! │  └── debug_buffer.rs - Recent frames on disk                 │
//! │                                                              │
//! │  network/        - Controller transport                      │
//! │  ├── protocol.rs - JSON messages + binary frame header       │
//! │  └── server.rs   - WebSocket server and fan-out              │
//! │                                                              │
//! │  agent/          - In-process decision loop                  │
//! │  ├── model.rs    - Model boundary + chat/completions client  │
//! │  ├── orchestrator.rs - Cadence and single-flight             │
//! │  └── metrics.rs  - Counters and latencies                    │
//! │                                                              │
//! │  bridge.rs       - Owner context and cross-thread handle     │
//! │  config.rs       - Environment configuration                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Threading
//!
//! Only the owning thread (the one calling [`Bridge::tick`] and
//! [`Bridge::on_render_frame`]) touches the client. Transport tasks,
//! inference tasks and encoder threads reach it through a
//! [`BridgeHandle`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod agent;
pub mod bridge;
pub mod capture;
pub mod config;
pub mod control;
pub mod network;

// Re-export commonly used types
pub use bridge::{Bridge, BridgeError, BridgeHandle, OperatingMode, OwnerCommand};
pub use capture::{EncodedFrame, FrameConfig, FrameSource};
pub use config::{BridgeConfig, ConfigError};
pub use control::{ActionCommand, Acknowledgment, ControlSurface, WorldSnapshot};
pub use network::{BridgeMessage, BridgeServer, Broadcaster};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default controller port
pub const DEFAULT_PORT: u16 = 8765;

/// Default in-process decision rate (Hz)
pub const DEFAULT_DECISION_HZ: f64 = 6.0;

/// Simulation tick rate of the reference client (Hz)
pub const TICK_RATE: u32 = 20;
