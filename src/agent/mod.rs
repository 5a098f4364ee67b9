//! Decision Loop
//!
//! In-process inference: frames in, throttled single-flight model calls,
//! actions handed back to the owning thread.
//!
//! ## Module Structure
//!
//! - `model`: Model boundary trait and the chat/completions client
//! - `orchestrator`: Cadence, single-flight guard, dispatch
//! - `metrics`: Counters and latency sums

pub mod model;
pub mod orchestrator;
pub mod metrics;

// Re-export key types
pub use model::{ActionModel, ChatCompletionsModel, DecisionRequest, ModelConfig, ModelError};
pub use orchestrator::{DecisionOrchestrator, FrameDecision, InFlightGuard};
pub use metrics::{MetricsAggregator, MetricsSnapshot};
