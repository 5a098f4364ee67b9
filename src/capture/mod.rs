//! Frame Capture
//!
//! Render-thread capture, a drop-oldest hand-off, and a small encoder pool
//! producing sequenced JPEG frames.
//!
//! ## Module Structure
//!
//! - `frame`: Frame config, raw/encoded frames, scaler and JPEG encoder
//! - `queue`: Capacity-bounded drop-oldest hand-off queue
//! - `pipeline`: Capture → encode pipeline and worker pool
//! - `debug_buffer`: Ring of recent frames dumped to disk
//! - `pattern`: Synthetic frame source

pub mod frame;
pub mod queue;
pub mod pipeline;
pub mod debug_buffer;
pub mod pattern;

// Re-export key types
pub use frame::{CaptureError, EncodeError, EncodedFrame, FrameConfig, FrameSource, RawFrame};
pub use queue::{DropOldestQueue, PushOutcome};
pub use pipeline::{CaptureOutcome, FramePipeline, FrameSink, PipelineError};
pub use debug_buffer::DebugFrameBuffer;
pub use pattern::TestPatternSource;
