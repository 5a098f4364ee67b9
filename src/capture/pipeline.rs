//! Frame Pipeline
//!
//! Capture runs synchronously on the render thread so it reflects exactly
//! what was last drawn. Encoding runs on a small worker pool fed through a
//! capacity-2 drop-oldest queue: under backpressure the newest capture wins.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, warn};

use crate::capture::frame::{
    encode_raw, truncated_timestamp_ms, EncodedFrame, FrameConfig, FrameSource, RawFrame,
};
use crate::capture::queue::{DropOldestQueue, PushOutcome};

/// Hand-off queue capacity between capture and encode.
pub const HANDOFF_CAPACITY: usize = 2;

/// Upper bound on encoder threads.
pub const MAX_ENCODER_WORKERS: usize = 2;

/// How often idle workers re-check for shutdown.
const WORKER_POLL: Duration = Duration::from_millis(100);

/// Receives encoded frames. Called on encoder threads; must not block.
pub trait FrameSink: Send + Sync {
    /// Take ownership of an encoded frame.
    fn deliver(&self, frame: EncodedFrame);
}

impl<F> FrameSink for F
where
    F: Fn(EncodedFrame) + Send + Sync,
{
    fn deliver(&self, frame: EncodedFrame) {
        self(frame)
    }
}

/// What a render frame did.
#[derive(Debug)]
pub enum CaptureOutcome {
    /// Capture disabled.
    Disabled,
    /// Not a capture frame under the decimation factor.
    Skipped,
    /// Handed to the encoders.
    Queued,
    /// Handed to the encoders; an older capture was discarded.
    ReplacedOldest,
    /// Framebuffer read failed.
    Failed(crate::capture::frame::CaptureError),
    /// Pipeline shut down.
    Stopped,
}

/// Pipeline construction errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Could not start an encoder thread.
    #[error("Failed to spawn encoder thread: {0}")]
    SpawnFailed(#[from] std::io::Error),
}

struct DeliveryState {
    next_sequence: u32,
    last_capture_index: u64,
}

struct PipelineShared {
    queue: DropOldestQueue<RawFrame>,
    sink: Arc<dyn FrameSink>,
    delivery: Mutex<DeliveryState>,
    last_capture_ms: AtomicU64,
    last_encode_ms: AtomicU64,
    encoded: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    stale: AtomicU64,
    live_workers: Mutex<usize>,
    workers_done: Condvar,
    /// Set once shutdown gives up on the workers; the sink is closed to them.
    detached: AtomicBool,
}

impl PipelineShared {
    fn store_ms(slot: &AtomicU64, ms: f64) {
        slot.store(ms.to_bits(), Ordering::Relaxed);
    }

    fn load_ms(slot: &AtomicU64) -> f64 {
        f64::from_bits(slot.load(Ordering::Relaxed))
    }

    /// Assign a sequence number and hand off, unless a newer capture already went out.
    fn deliver(&self, capture_index: u64, payload: Vec<u8>) {
        let mut delivery = self.delivery.lock();
        if self.detached.load(Ordering::Acquire) {
            debug!("Pipeline shut down, encode of capture {} discarded", capture_index);
            return;
        }
        if capture_index <= delivery.last_capture_index {
            self.stale.fetch_add(1, Ordering::Relaxed);
            debug!("Discarding stale encode of capture {}", capture_index);
            return;
        }
        delivery.last_capture_index = capture_index;
        let sequence = delivery.next_sequence;
        delivery.next_sequence = delivery.next_sequence.wrapping_add(1);

        self.sink.deliver(EncodedFrame {
            sequence,
            timestamp_ms: truncated_timestamp_ms(),
            payload,
        });
    }
}

/// Capture → encode pipeline with a bounded encoder pool.
pub struct FramePipeline {
    config: FrameConfig,
    frame_counter: u64,
    next_capture_index: u64,
    shared: Arc<PipelineShared>,
    workers: Vec<JoinHandle<()>>,
    stopped: bool,
}

impl FramePipeline {
    /// Start `workers` encoder threads (clamped to 1..=2).
    pub fn new(
        config: FrameConfig,
        workers: usize,
        sink: Arc<dyn FrameSink>,
    ) -> Result<Self, PipelineError> {
        let worker_count = workers.clamp(1, MAX_ENCODER_WORKERS);
        let shared = Arc::new(PipelineShared {
            queue: DropOldestQueue::new(HANDOFF_CAPACITY),
            sink,
            delivery: Mutex::new(DeliveryState {
                next_sequence: 1,
                last_capture_index: 0,
            }),
            last_capture_ms: AtomicU64::new(0f64.to_bits()),
            last_encode_ms: AtomicU64::new(0f64.to_bits()),
            encoded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            stale: AtomicU64::new(0),
            live_workers: Mutex::new(0),
            workers_done: Condvar::new(),
            detached: AtomicBool::new(false),
        });

        let mut handles = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let worker_shared = shared.clone();
            *shared.live_workers.lock() += 1;
            let spawned = thread::Builder::new()
                .name(format!("frame-encoder-{}", id))
                .spawn(move || encoder_loop(worker_shared, id));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    *shared.live_workers.lock() -= 1;
                    shared.queue.close();
                    return Err(PipelineError::SpawnFailed(e));
                }
            }
        }

        let config = config.clamped();
        info!(
            "Frame pipeline started: {}x{} every {} frames, quality {:.2}, {} encoder(s)",
            config.width, config.height, config.capture_every, config.quality, worker_count
        );

        Ok(Self {
            config,
            frame_counter: 0,
            next_capture_index: 1,
            shared,
            workers: handles,
            stopped: false,
        })
    }

    /// Current settings.
    pub fn config(&self) -> FrameConfig {
        self.config
    }

    /// Replace settings; takes effect on the next render frame.
    pub fn apply_config(&mut self, config: FrameConfig) {
        let config = config.clamped();
        if config != self.config {
            info!(
                "Frame capture configured: enabled={} {}x{} every {} frames, quality {:.2}",
                config.enabled, config.width, config.height, config.capture_every, config.quality
            );
        }
        self.config = config;
    }

    /// Enable or disable capture.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.config.enabled != enabled {
            info!("Frame capture enabled: {}", enabled);
        }
        self.config.enabled = enabled;
    }

    /// Render-thread hook, called once per drawn frame.
    pub fn on_render_frame(&mut self, source: &mut dyn FrameSource) -> CaptureOutcome {
        if self.stopped {
            return CaptureOutcome::Stopped;
        }
        if !self.config.enabled {
            return CaptureOutcome::Disabled;
        }

        self.frame_counter += 1;
        if self.frame_counter % self.config.capture_every as u64 != 0 {
            return CaptureOutcome::Skipped;
        }

        let started = Instant::now();
        let (width, height) = source.dimensions();
        if width == 0 || height == 0 {
            return CaptureOutcome::Failed(crate::capture::frame::CaptureError::EmptyFramebuffer {
                width,
                height,
            });
        }

        let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
        if let Err(e) = source.read_pixels(&mut rgba) {
            warn!("Frame capture failed: {}", e);
            return CaptureOutcome::Failed(e);
        }

        let capture_index = self.next_capture_index;
        self.next_capture_index += 1;
        let raw = RawFrame {
            capture_index,
            width,
            height,
            rgba,
            config: self.config,
            captured_at: Instant::now(),
            capture_ms: started.elapsed().as_secs_f64() * 1000.0,
        };

        match self.shared.queue.push(raw) {
            PushOutcome::Queued => CaptureOutcome::Queued,
            PushOutcome::Evicted(old) => {
                self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("Encoder behind, dropped capture {}", old.capture_index);
                CaptureOutcome::ReplacedOldest
            }
            PushOutcome::Closed(_) => CaptureOutcome::Stopped,
        }
    }

    /// Render frames counted while enabled.
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// Duration of the most recent framebuffer read (ms), best-effort.
    pub fn last_capture_ms(&self) -> f64 {
        PipelineShared::load_ms(&self.shared.last_capture_ms)
    }

    /// Duration of the most recent encode (ms), best-effort.
    pub fn last_encode_ms(&self) -> f64 {
        PipelineShared::load_ms(&self.shared.last_encode_ms)
    }

    /// Frames encoded successfully.
    pub fn encoded_frames(&self) -> u64 {
        self.shared.encoded.load(Ordering::Relaxed)
    }

    /// Encodes that failed and were dropped.
    pub fn failed_encodes(&self) -> u64 {
        self.shared.failed.load(Ordering::Relaxed)
    }

    /// Captures evicted by the drop-oldest queue.
    pub fn dropped_frames(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Encodes discarded because a newer capture was already delivered.
    pub fn stale_frames(&self) -> u64 {
        self.shared.stale.load(Ordering::Relaxed)
    }

    /// Captures waiting for an encoder.
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }

    /// Stop capturing and release the encoder pool.
    ///
    /// Waits up to `timeout` for workers to finish what is queued; after
    /// that the queue is cleared and the threads are detached. Returns
    /// `true` when every worker exited in time.
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        if self.stopped {
            return true;
        }
        self.stopped = true;
        self.config.enabled = false;
        self.shared.queue.close();

        let deadline = Instant::now() + timeout;
        let graceful = {
            let mut live = self.shared.live_workers.lock();
            while *live > 0 {
                if self.shared.workers_done.wait_until(&mut live, deadline).timed_out() {
                    break;
                }
            }
            *live == 0
        };

        if graceful {
            for handle in self.workers.drain(..) {
                let _ = handle.join();
            }
            info!("Frame pipeline shutdown complete");
        } else {
            {
                // Waits out a delivery in progress; none starts after this.
                let _delivery = self.shared.delivery.lock();
                self.shared.detached.store(true, Ordering::Release);
            }
            let discarded = self.shared.queue.clear();
            self.workers.clear();
            warn!(
                "Frame pipeline shutdown timed out after {:?}; detached encoders, discarded {} capture(s)",
                timeout, discarded
            );
        }
        graceful
    }
}

impl Drop for FramePipeline {
    fn drop(&mut self) {
        self.shutdown(Duration::from_secs(1));
    }
}

fn encoder_loop(shared: Arc<PipelineShared>, id: usize) {
    debug!("Encoder {} started", id);
    loop {
        let raw = match shared.queue.pop_timeout(WORKER_POLL) {
            Some(raw) => raw,
            None if shared.queue.is_closed() => break,
            None => continue,
        };

        let started = Instant::now();
        match encode_raw(&raw) {
            Ok(payload) => {
                let encode_ms = started.elapsed().as_secs_f64() * 1000.0;
                PipelineShared::store_ms(&shared.last_capture_ms, raw.capture_ms);
                PipelineShared::store_ms(&shared.last_encode_ms, encode_ms);
                shared.encoded.fetch_add(1, Ordering::Relaxed);
                shared.deliver(raw.capture_index, payload);
            }
            Err(e) => {
                shared.failed.fetch_add(1, Ordering::Relaxed);
                error!("Failed to encode frame {}: {}", raw.capture_index, e);
            }
        }
    }

    let mut live = shared.live_workers.lock();
    *live -= 1;
    shared.workers_done.notify_all();
    debug!("Encoder {} stopped", id);
}
