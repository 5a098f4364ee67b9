//! Decision Loop Metrics
//!
//! Lock-free counters and latency sums. Each field has a single writer;
//! readers may see a slightly stale mix, which is fine for telemetry.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;

use crate::control::action::Acknowledgment;

/// Running counters for the decision loop.
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    decisions: AtomicU64,
    frames_seen: AtomicU64,
    actions_enqueued: AtomicU64,
    acks_received: AtomicU64,
    errors: AtomicU64,
    dropped_frames: AtomicU64,
    capture_us: AtomicU64,
    encode_us: AtomicU64,
    inference_us: AtomicU64,
    end_to_end_us: AtomicU64,
    last_inference_us: AtomicU64,
    last_action: Mutex<String>,
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Decisions dispatched.
    pub decisions: u64,
    /// Encoded frames observed.
    pub frames_seen: u64,
    /// Actions accepted into the applier.
    pub actions_enqueued: u64,
    /// Acknowledgments observed.
    pub acks_received: u64,
    /// Failed acks, inference failures and other errors.
    pub errors: u64,
    /// Captures discarded by the drop-oldest hand-off.
    pub dropped_frames: u64,
    /// Mean capture time per decision (ms).
    pub avg_capture_ms: f64,
    /// Mean encode time per decision (ms).
    pub avg_encode_ms: f64,
    /// Mean inference time per decision (ms).
    pub avg_inference_ms: f64,
    /// Mean end-to-end latency per decision (ms).
    pub avg_end_to_end_ms: f64,
    /// Most recent inference time (ms).
    pub last_inference_ms: f64,
    /// Summary of the most recent model action.
    pub last_action: String,
}

fn to_us(ms: f64) -> u64 {
    if ms.is_finite() && ms > 0.0 {
        (ms * 1000.0).round() as u64
    } else {
        0
    }
}

fn to_ms(us: u64) -> f64 {
    us as f64 / 1000.0
}

/// Per-frame progress is logged at `info` for the first 3 frames and every 120th.
pub fn frame_progress_due(count: u64) -> bool {
    count <= 3 || count % 120 == 0
}

impl MetricsAggregator {
    /// Zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// An encoded frame reached a consumer. Returns the running count.
    pub fn record_frame_seen(&self) -> u64 {
        self.frames_seen.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// A decision was dispatched for a frame with these stage timings.
    pub fn record_decision(&self, capture_ms: f64, encode_ms: f64) {
        self.decisions.fetch_add(1, Ordering::Relaxed);
        self.capture_us.fetch_add(to_us(capture_ms), Ordering::Relaxed);
        self.encode_us.fetch_add(to_us(encode_ms), Ordering::Relaxed);
    }

    /// A model call returned an action.
    pub fn record_inference(&self, ms: f64, summary: impl Into<String>) {
        let us = to_us(ms);
        self.inference_us.fetch_add(us, Ordering::Relaxed);
        self.last_inference_us.store(us, Ordering::Relaxed);
        *self.last_action.lock() = summary.into();
    }

    /// Frame-to-action latency of one decision.
    pub fn record_end_to_end(&self, ms: f64) {
        self.end_to_end_us.fetch_add(to_us(ms), Ordering::Relaxed);
    }

    /// An action entered the applier queue.
    pub fn record_action_enqueued(&self) {
        self.actions_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// An acknowledgment arrived; failures also count as errors.
    pub fn record_ack(&self, ack: &Acknowledgment) {
        self.acks_received.fetch_add(1, Ordering::Relaxed);
        if !ack.success {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Any other failure.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// The hand-off evicted a capture.
    pub fn record_dropped_frame(&self) {
        self.dropped_frames.fetch_add(1, Ordering::Relaxed);
    }

    /// Decisions dispatched so far.
    pub fn decisions(&self) -> u64 {
        self.decisions.load(Ordering::Relaxed)
    }

    /// Errors so far.
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Read every counter. Averages divide by `max(1, decisions)`.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let decisions = self.decisions.load(Ordering::Relaxed);
        let per = decisions.max(1) as f64;
        let avg = |slot: &AtomicU64| to_ms(slot.load(Ordering::Relaxed)) / per;

        MetricsSnapshot {
            decisions,
            frames_seen: self.frames_seen.load(Ordering::Relaxed),
            actions_enqueued: self.actions_enqueued.load(Ordering::Relaxed),
            acks_received: self.acks_received.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            dropped_frames: self.dropped_frames.load(Ordering::Relaxed),
            avg_capture_ms: avg(&self.capture_us),
            avg_encode_ms: avg(&self.encode_us),
            avg_inference_ms: avg(&self.inference_us),
            avg_end_to_end_ms: avg(&self.end_to_end_us),
            last_inference_ms: to_ms(self.last_inference_us.load(Ordering::Relaxed)),
            last_action: self.last_action.lock().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_progress_cadence() {
        let metrics = MetricsAggregator::new();
        let due: Vec<u64> = (0..400)
            .map(|_| metrics.record_frame_seen())
            .filter(|&n| frame_progress_due(n))
            .collect();
        assert_eq!(due, vec![1, 2, 3, 120, 240, 360]);
        assert_eq!(metrics.snapshot().frames_seen, 400);
    }

    #[test]
    fn test_empty_snapshot_has_no_nan() {
        let snapshot = MetricsAggregator::new().snapshot();
        assert_eq!(snapshot.decisions, 0);
        assert_eq!(snapshot.avg_inference_ms, 0.0);
        assert_eq!(snapshot.avg_end_to_end_ms, 0.0);
        assert!(snapshot.last_action.is_empty());
    }

    #[test]
    fn test_averages_over_decisions() {
        let metrics = MetricsAggregator::new();
        metrics.record_decision(2.0, 10.0);
        metrics.record_decision(4.0, 20.0);
        metrics.record_inference(100.0, "a");
        metrics.record_inference(300.0, "fwd=1.00");
        metrics.record_end_to_end(150.0);
        metrics.record_end_to_end(350.0);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.decisions, 2);
        assert_eq!(snapshot.avg_capture_ms, 3.0);
        assert_eq!(snapshot.avg_encode_ms, 15.0);
        assert_eq!(snapshot.avg_inference_ms, 200.0);
        assert_eq!(snapshot.avg_end_to_end_ms, 250.0);
        assert_eq!(snapshot.last_inference_ms, 300.0);
        assert_eq!(snapshot.last_action, "fwd=1.00");
    }

    #[test]
    fn test_failed_ack_counts_as_error() {
        let metrics = MetricsAggregator::new();
        metrics.record_ack(&Acknowledgment::completed());
        metrics.record_ack(&Acknowledgment::failed("owner not ready"));
        metrics.record_error();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.acks_received, 2);
        assert_eq!(snapshot.errors, 2);
    }

    #[test]
    fn test_counters_monotonic() {
        let metrics = MetricsAggregator::new();
        let mut previous = metrics.snapshot();
        for _ in 0..10 {
            metrics.record_frame_seen();
            metrics.record_action_enqueued();
            metrics.record_dropped_frame();
            let current = metrics.snapshot();
            assert!(current.frames_seen > previous.frames_seen);
            assert!(current.actions_enqueued > previous.actions_enqueued);
            assert!(current.dropped_frames > previous.dropped_frames);
            previous = current;
        }
    }

    #[test]
    fn test_negative_and_nan_durations_ignored() {
        let metrics = MetricsAggregator::new();
        metrics.record_decision(-5.0, f64::NAN);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.avg_capture_ms, 0.0);
        assert_eq!(snapshot.avg_encode_ms, 0.0);
    }
}
