//! Safety Contracts
//!
//! Limits enforced regardless of what the controller or model asks for:
//! action rate, relative look bound, and an out-of-band kill switch.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::control::action::MAX_LOOK_DELTA_DEG;

/// Hard ceiling on accepted actions per minute.
pub const MAX_ACTIONS_PER_MINUTE: u32 = 1200;

/// Rate-limit window (ms).
const WINDOW_MS: u64 = 60_000;

/// Bound a relative look change to ±12 degrees. NaN collapses to zero.
#[inline]
pub fn bound_look_delta(delta: f32) -> f32 {
    if delta.is_nan() {
        0.0
    } else {
        delta.clamp(-MAX_LOOK_DELTA_DEG, MAX_LOOK_DELTA_DEG)
    }
}

/// Sliding one-minute window over accepted actions.
#[derive(Debug)]
pub struct ActionRateLimiter {
    limit: u32,
    accepted: VecDeque<u64>,
}

impl ActionRateLimiter {
    /// Create a limiter; `per_minute` is capped at [`MAX_ACTIONS_PER_MINUTE`].
    pub fn new(per_minute: u32) -> Self {
        let limit = per_minute.min(MAX_ACTIONS_PER_MINUTE);
        Self {
            limit,
            accepted: VecDeque::with_capacity(limit as usize),
        }
    }

    /// Effective limit.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Record an action at `now_ms` if the window has room.
    pub fn try_acquire(&mut self, now_ms: u64) -> bool {
        while let Some(&oldest) = self.accepted.front() {
            if now_ms.saturating_sub(oldest) >= WINDOW_MS {
                self.accepted.pop_front();
            } else {
                break;
            }
        }

        if self.accepted.len() as u32 >= self.limit {
            return false;
        }

        self.accepted.push_back(now_ms);
        true
    }

    /// Actions counted in the current window.
    pub fn in_window(&self) -> usize {
        self.accepted.len()
    }
}

/// Process-wide stop flag, settable from any thread.
///
/// Engaging it stops action application on the next owner tick, independent
/// of the transport and the model loop.
#[derive(Clone, Debug, Default)]
pub struct KillSwitch {
    engaged: Arc<AtomicBool>,
}

impl KillSwitch {
    /// Create a released switch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop all action application.
    pub fn engage(&self) {
        if !self.engaged.swap(true, Ordering::SeqCst) {
            tracing::warn!("Kill switch engaged");
        }
    }

    /// Allow action application again.
    pub fn reset(&self) {
        if self.engaged.swap(false, Ordering::SeqCst) {
            tracing::info!("Kill switch released");
        }
    }

    /// Whether the switch is engaged.
    #[inline]
    pub fn is_engaged(&self) -> bool {
        self.engaged.load(Ordering::SeqCst)
    }
}
