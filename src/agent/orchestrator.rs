//! Decision Orchestrator
//!
//! Paces model calls against incoming frames. Each eligible frame may start
//! at most one inference; while a call is in flight, further frames are
//! dropped rather than queued. Results go back to the owning thread through
//! the bridge inbox, never applied from the worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use crate::agent::metrics::{frame_progress_due, MetricsAggregator};
use crate::agent::model::{ActionModel, DecisionRequest};
use crate::bridge::BridgeHandle;
use crate::capture::frame::EncodedFrame;
use crate::control::action::Acknowledgment;
use crate::control::applier::OWNER_NOT_READY;
use crate::control::world::WorldSnapshot;

/// What happened to a frame offered to the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDecision {
    /// Decisions are switched off or the kill switch is engaged.
    Disabled,
    /// No world/player context; frame discarded.
    NoOwner,
    /// Too soon after the previous decision.
    Throttled,
    /// An inference is already running.
    Busy,
    /// A model call was started for this frame.
    Dispatched,
}

/// Single-flight token. Holding one means an inference is in flight;
/// dropping it, on any path including unwinding, frees the slot.
#[derive(Debug)]
pub struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl InFlightGuard {
    /// Claim the slot if it is free.
    pub fn try_acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag: flag.clone() })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Throttled, single-flight driver of the model loop.
pub struct DecisionOrchestrator {
    runtime: Handle,
    model: Arc<dyn ActionModel>,
    handle: BridgeHandle,
    metrics: Arc<MetricsAggregator>,
    goal: Arc<str>,
    interval_ms: u64,
    last_decision_ms: Option<u64>,
    in_flight: Arc<AtomicBool>,
    enabled: bool,
}

impl DecisionOrchestrator {
    /// Orchestrator deciding at most `decision_hz` times per second.
    pub fn new(
        runtime: Handle,
        model: Arc<dyn ActionModel>,
        handle: BridgeHandle,
        decision_hz: f64,
        goal: impl Into<String>,
    ) -> Self {
        let hz = if decision_hz.is_finite() && decision_hz > 0.0 { decision_hz } else { 1.0 };
        let interval_ms = (1000.0 / hz) as u64;
        let goal: String = goal.into();
        info!("Decision loop at {:.1} Hz ({} ms), goal: {}", hz, interval_ms, goal);

        Self {
            runtime,
            model,
            metrics: handle.metrics(),
            handle,
            goal: goal.into(),
            interval_ms,
            last_decision_ms: None,
            in_flight: Arc::new(AtomicBool::new(false)),
            enabled: true,
        }
    }

    /// Minimum gap between decisions (ms).
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Whether an inference is running.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Whether new decisions may start.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Pause or resume decisions. An in-flight call is not cancelled.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            info!("Decision loop enabled: {}", enabled);
        }
        self.enabled = enabled;
    }

    /// Offer a freshly encoded frame. Called on the owning thread.
    pub fn on_frame(
        &mut self,
        frame: EncodedFrame,
        snapshot: Option<WorldSnapshot>,
        now_ms: u64,
        capture_ms: f64,
        encode_ms: f64,
    ) -> FrameDecision {
        let seen = self.metrics.record_frame_seen();
        if frame_progress_due(seen) {
            info!(
                "Frame #{} seq={} ({} bytes) reached the decision loop",
                seen,
                frame.sequence,
                frame.payload.len()
            );
        }

        if !self.enabled || self.handle.kill_switch().is_engaged() {
            return FrameDecision::Disabled;
        }
        let Some(snapshot) = snapshot else {
            return FrameDecision::NoOwner;
        };
        if let Some(last) = self.last_decision_ms {
            if now_ms.saturating_sub(last) < self.interval_ms {
                return FrameDecision::Throttled;
            }
        }
        let Some(guard) = InFlightGuard::try_acquire(&self.in_flight) else {
            debug!("Inference in flight, frame {} dropped", frame.sequence);
            return FrameDecision::Busy;
        };

        self.last_decision_ms = Some(now_ms);
        self.metrics.record_decision(capture_ms, encode_ms);

        let request = DecisionRequest {
            jpeg: frame.payload,
            goal: self.goal.to_string(),
            state_summary: Some(snapshot.prompt_summary()),
        };
        self.runtime.spawn(run_decision(
            self.model.clone(),
            self.handle.clone(),
            self.metrics.clone(),
            request,
            guard,
            capture_ms + encode_ms,
        ));

        FrameDecision::Dispatched
    }
}

/// One model round trip, off the owning thread.
async fn run_decision(
    model: Arc<dyn ActionModel>,
    handle: BridgeHandle,
    metrics: Arc<MetricsAggregator>,
    request: DecisionRequest,
    guard: InFlightGuard,
    upstream_ms: f64,
) {
    let started = Instant::now();
    let result = model.decide(request).await;
    let inference_ms = started.elapsed().as_secs_f64() * 1000.0;

    let command = match result {
        Ok(command) => command,
        Err(e) => {
            metrics.record_error();
            error!("Inference failed after {:.0} ms: {}", inference_ms, e);
            return;
        }
    };

    metrics.record_inference(inference_ms, command.summary());
    info!("Decision in {:.0} ms: {}", inference_ms, command.summary());

    let ack_rx = handle.submit_action(command);
    metrics.record_end_to_end(upstream_ms + started.elapsed().as_secs_f64() * 1000.0);
    drop(guard);

    let ack = ack_rx
        .await
        .unwrap_or_else(|_| Acknowledgment::failed(OWNER_NOT_READY));
    metrics.record_ack(&ack);
    if !ack.success {
        warn!("Model action failed: {}", ack.error.as_deref().unwrap_or("unknown"));
    }
}
