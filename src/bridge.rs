//! Bridge Context
//!
//! The one place the pieces are wired together. [`Bridge`] lives on the
//! owning simulation/render thread and is the only thing that touches the
//! client. Every other thread holds a [`BridgeHandle`] and reaches the
//! owner through its inbox.
//!
//! ```text
//!  transport / inference ──BridgeHandle──► inbox ──tick()──► ActionApplier ──► client
//!                                                   │
//!  render ──on_render_frame()──► FramePipeline ──► encoders ──► sink
//!                                                               │
//!                    Remote: Broadcaster ◄──────────────────────┤
//!                    InProcess: inbox ─► DecisionOrchestrator ◄─┘
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::agent::metrics::MetricsAggregator;
use crate::agent::model::ActionModel;
use crate::agent::orchestrator::DecisionOrchestrator;
use crate::capture::debug_buffer::DebugFrameBuffer;
use crate::capture::frame::{EncodedFrame, FrameConfig, FrameSource};
use crate::capture::pipeline::{CaptureOutcome, FramePipeline, FrameSink, PipelineError};
use crate::config::BridgeConfig;
use crate::control::action::{AckReceiver, AckSender, ActionCommand, Acknowledgment};
use crate::control::applier::{ActionApplier, TickReport, OWNER_NOT_READY};
use crate::control::safety::{ActionRateLimiter, KillSwitch};
use crate::control::world::{ControlSurface, WorldSnapshot};
use crate::network::server::Broadcaster;

/// Failure reason while the kill switch is engaged.
pub const KILL_SWITCH_ENGAGED: &str = "kill switch engaged";

/// Failure reason when the action rate ceiling is hit.
pub const RATE_LIMITED: &str = "rate limit exceeded";

/// Failure reason for actions drained by [`Bridge::stop`].
pub const BRIDGE_STOPPED: &str = "bridge stopped";

// =============================================================================
// OPERATING MODE
// =============================================================================

/// Where frames go and where actions come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OperatingMode {
    /// Frames stream to external controllers; actions arrive over the wire;
    /// state is pushed periodically.
    #[default]
    Remote,
    /// Frames feed the local decision loop; no state push.
    InProcess,
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatingMode::Remote => write!(f, "remote"),
            OperatingMode::InProcess => write!(f, "in_process"),
        }
    }
}

impl FromStr for OperatingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote" => Ok(OperatingMode::Remote),
            "in_process" | "in-process" | "inprocess" => Ok(OperatingMode::InProcess),
            other => Err(format!("unknown mode '{}', expected remote or in_process", other)),
        }
    }
}

// =============================================================================
// HANDLE
// =============================================================================

/// Work queued for the owning thread.
#[derive(Debug)]
pub enum OwnerCommand {
    /// Enqueue an action; its acknowledgment goes to `ack`.
    Apply {
        /// The command to apply.
        command: ActionCommand,
        /// Completion channel.
        ack: AckSender,
    },
    /// Replace the capture settings.
    ConfigureFrames(FrameConfig),
    /// An encoded frame for the in-process decision loop.
    FrameReady(EncodedFrame),
}

/// Cloneable, thread-safe route into the owning thread.
#[derive(Clone, Debug)]
pub struct BridgeHandle {
    inbox: mpsc::UnboundedSender<OwnerCommand>,
    kill_switch: KillSwitch,
    metrics: Arc<MetricsAggregator>,
}

impl BridgeHandle {
    /// A handle and the inbox it feeds.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OwnerCommand>) {
        let (inbox, rx) = mpsc::unbounded_channel();
        let handle = Self {
            inbox,
            kill_switch: KillSwitch::new(),
            metrics: Arc::new(MetricsAggregator::new()),
        };
        (handle, rx)
    }

    /// Queue an action for the owner. The receiver resolves exactly once.
    pub fn submit_action(&self, command: ActionCommand) -> AckReceiver {
        let (tx, rx) = oneshot::channel();
        if let Err(mpsc::error::SendError(OwnerCommand::Apply { ack, .. })) =
            self.inbox.send(OwnerCommand::Apply { command, ack: tx })
        {
            let _ = ack.send(Acknowledgment::failed(OWNER_NOT_READY));
        }
        rx
    }

    /// Queue new capture settings. `false` if the owner is gone.
    pub fn configure_frames(&self, config: FrameConfig) -> bool {
        self.inbox.send(OwnerCommand::ConfigureFrames(config)).is_ok()
    }

    /// Queue an encoded frame for the decision loop. `false` if the owner is gone.
    pub fn deliver_frame(&self, frame: EncodedFrame) -> bool {
        self.inbox.send(OwnerCommand::FrameReady(frame)).is_ok()
    }

    /// Out-of-band stop.
    pub fn kill_switch(&self) -> &KillSwitch {
        &self.kill_switch
    }

    /// Shared counters.
    pub fn metrics(&self) -> Arc<MetricsAggregator> {
        self.metrics.clone()
    }
}

// =============================================================================
// BRIDGE
// =============================================================================

/// Bridge construction errors.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The frame pipeline could not start.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Owner-side context. Not `Sync`: keep it on the thread that drives the client.
pub struct Bridge {
    mode: OperatingMode,
    clock: Instant,
    handle: BridgeHandle,
    inbox: mpsc::UnboundedReceiver<OwnerCommand>,
    applier: ActionApplier,
    limiter: ActionRateLimiter,
    pipeline: FramePipeline,
    orchestrator: Option<DecisionOrchestrator>,
    broadcaster: Option<Broadcaster>,
    state_push_every: u64,
    shutdown_timeout: Duration,
    ticks: u64,
    kill_latched: bool,
    stopped: bool,
}

impl Bridge {
    /// Wire a bridge for `config.mode`.
    ///
    /// `runtime` runs inference tasks; `model` drives in-process decisions;
    /// `broadcaster` receives frames and state in remote mode.
    pub fn new(
        config: &BridgeConfig,
        runtime: Handle,
        model: Option<Arc<dyn ActionModel>>,
        broadcaster: Option<Broadcaster>,
    ) -> Result<Self, BridgeError> {
        let (handle, inbox) = BridgeHandle::channel();
        let metrics = handle.metrics();

        let sink: Arc<dyn FrameSink> = match config.mode {
            OperatingMode::Remote => {
                let fan_out = broadcaster.clone();
                Arc::new(move |frame: EncodedFrame| {
                    metrics.record_frame_seen();
                    if let Some(fan_out) = &fan_out {
                        fan_out.broadcast_frame(&frame);
                    }
                })
            }
            OperatingMode::InProcess => {
                let owner = handle.clone();
                // Disk dumps happen here, on the encoder thread.
                let debug_ring = config.debug_frames_dir.as_ref().map(|dir| {
                    info!("Saving debug frames to {}", dir.display());
                    Mutex::new(DebugFrameBuffer::new(dir, config.debug_save_every))
                });
                Arc::new(move |frame: EncodedFrame| {
                    if let Some(ring) = &debug_ring {
                        ring.lock().push(&frame.payload);
                    }
                    owner.deliver_frame(frame);
                })
            }
        };
        let pipeline = FramePipeline::new(config.frame, config.encoder_workers, sink)?;

        let orchestrator = match (config.mode, model) {
            (OperatingMode::InProcess, Some(model)) => Some(DecisionOrchestrator::new(
                runtime,
                model,
                handle.clone(),
                config.decision_hz,
                config.goal.clone(),
            )),
            (OperatingMode::InProcess, None) => {
                warn!("In-process mode without a model, frames will be discarded");
                None
            }
            (OperatingMode::Remote, _) => None,
        };

        info!("Bridge ready in {} mode", config.mode);

        Ok(Self {
            mode: config.mode,
            clock: Instant::now(),
            handle,
            inbox,
            applier: ActionApplier::new(),
            limiter: ActionRateLimiter::new(config.max_actions_per_minute),
            pipeline,
            orchestrator,
            broadcaster,
            state_push_every: config.state_push_every_ticks.max(1) as u64,
            shutdown_timeout: config.shutdown_timeout,
            ticks: 0,
            kill_latched: false,
            stopped: false,
        })
    }

    /// Handle for other threads.
    pub fn handle(&self) -> BridgeHandle {
        self.handle.clone()
    }

    /// Operating mode.
    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    /// Milliseconds since the bridge was created.
    pub fn now_ms(&self) -> u64 {
        self.clock.elapsed().as_millis() as u64
    }

    /// The action state machine.
    pub fn applier(&self) -> &ActionApplier {
        &self.applier
    }

    /// The capture pipeline.
    pub fn pipeline(&self) -> &FramePipeline {
        &self.pipeline
    }

    /// The decision loop, when running in-process with a model.
    pub fn orchestrator(&self) -> Option<&DecisionOrchestrator> {
        self.orchestrator.as_ref()
    }

    /// Render-thread hook, once per drawn frame.
    pub fn on_render_frame(&mut self, source: &mut dyn FrameSource) -> CaptureOutcome {
        let outcome = self.pipeline.on_render_frame(source);
        if matches!(outcome, CaptureOutcome::ReplacedOldest) {
            self.handle.metrics.record_dropped_frame();
        }
        outcome
    }

    /// Simulation tick on the bridge clock.
    pub fn tick(&mut self, world: Option<&mut dyn ControlSurface>) -> TickReport {
        let now_ms = self.now_ms();
        self.tick_at(now_ms, world)
    }

    /// Simulation tick at an explicit time.
    ///
    /// Drains the inbox, honours the kill switch, advances the applier and,
    /// in remote mode, pushes state on cadence. `world` is `None` whenever no
    /// world/player is loaded.
    pub fn tick_at(&mut self, now_ms: u64, mut world: Option<&mut dyn ControlSurface>) -> TickReport {
        let mut report = TickReport::default();
        self.drain_inbox(now_ms, &mut world, &mut report);

        if self.handle.kill_switch.is_engaged() {
            report.failed += self.applier.drain(KILL_SWITCH_ENGAGED);
            if !self.kill_latched {
                if let Some(w) = reborrow(&mut world) {
                    w.release_all();
                }
                self.kill_latched = true;
            }
            return report;
        }
        self.kill_latched = false;

        let applied = self.applier.tick(now_ms, reborrow(&mut world));
        report.completed += applied.completed;
        report.failed += applied.failed;
        report.advanced = applied.advanced;
        report.applied = applied.applied;

        self.ticks += 1;
        if self.mode == OperatingMode::Remote && self.ticks % self.state_push_every == 0 {
            if let (Some(broadcaster), Some(w)) = (&self.broadcaster, reborrow(&mut world)) {
                broadcaster.broadcast_state(&w.snapshot());
            }
        }

        report
    }

    fn drain_inbox(
        &mut self,
        now_ms: u64,
        world: &mut Option<&mut dyn ControlSurface>,
        report: &mut TickReport,
    ) {
        while let Ok(command) = self.inbox.try_recv() {
            match command {
                OwnerCommand::Apply { command, ack } => {
                    if !self.accept_action(command, ack, now_ms) {
                        report.failed += 1;
                    }
                }
                OwnerCommand::ConfigureFrames(config) => {
                    if !self.stopped {
                        self.pipeline.apply_config(config);
                    }
                }
                OwnerCommand::FrameReady(frame) => {
                    let snapshot = world.as_deref().map(|w| w.snapshot());
                    self.on_encoded_frame(frame, snapshot, now_ms);
                }
            }
        }
    }

    fn accept_action(&mut self, command: ActionCommand, ack: AckSender, now_ms: u64) -> bool {
        let refusal = if self.stopped {
            Some(BRIDGE_STOPPED)
        } else if self.handle.kill_switch.is_engaged() {
            Some(KILL_SWITCH_ENGAGED)
        } else if !self.limiter.try_acquire(now_ms) {
            Some(RATE_LIMITED)
        } else {
            None
        };

        if let Some(reason) = refusal {
            debug!("Action refused: {}", reason);
            let _ = ack.send(Acknowledgment::failed(reason));
            return false;
        }

        self.applier.enqueue_with(command, ack, now_ms);
        self.handle.metrics.record_action_enqueued();
        true
    }

    fn on_encoded_frame(&mut self, frame: EncodedFrame, snapshot: Option<WorldSnapshot>, now_ms: u64) {
        match self.orchestrator.as_mut() {
            Some(orchestrator) => {
                let capture_ms = self.pipeline.last_capture_ms();
                let encode_ms = self.pipeline.last_encode_ms();
                let decision = orchestrator.on_frame(frame, snapshot, now_ms, capture_ms, encode_ms);
                debug!("Frame decision: {:?}", decision);
            }
            None => {
                self.handle.metrics.record_frame_seen();
            }
        }
    }

    /// Stop the bridge: capture off, every action failed, encoders released.
    ///
    /// Returns `true` when the encoder pool shut down within the configured
    /// timeout.
    pub fn stop(&mut self, world: Option<&mut dyn ControlSurface>) -> bool {
        if self.stopped {
            return true;
        }
        info!("Stopping bridge");
        self.stopped = true;
        self.pipeline.set_enabled(false);
        if let Some(orchestrator) = self.orchestrator.as_mut() {
            orchestrator.set_enabled(false);
        }

        // Actions still in the inbox are failed too.
        while let Ok(command) = self.inbox.try_recv() {
            if let OwnerCommand::Apply { ack, .. } = command {
                let _ = ack.send(Acknowledgment::failed(BRIDGE_STOPPED));
            }
        }
        let drained = self.applier.drain(BRIDGE_STOPPED);
        if let Some(world) = world {
            world.release_all();
        }

        let graceful = self.pipeline.shutdown(self.shutdown_timeout);
        info!("Bridge stopped ({} action(s) drained)", drained);
        graceful
    }

    /// Whether [`Self::stop`] has run.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

fn reborrow<'a>(world: &'a mut Option<&mut dyn ControlSurface>) -> Option<&'a mut dyn ControlSurface> {
    match world {
        Some(w) => Some(&mut **w),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::agent::model::{DecisionRequest, ModelError};
    use crate::capture::pattern::TestPatternSource;
    use crate::control::action::HeldKeys;
    use crate::control::applier::ApplierState;
    use crate::control::headless::HeadlessWorld;

    fn remote_config() -> BridgeConfig {
        BridgeConfig {
            frame: FrameConfig::new(true, 32, 18, 1, 0.5),
            state_push_every_ticks: 2,
            ..Default::default()
        }
    }

    fn recv(rx: &mut AckReceiver) -> Option<Acknowledgment> {
        rx.try_recv().ok()
    }

    #[tokio::test]
    async fn test_submitted_actions_apply_on_tick() {
        let mut bridge = Bridge::new(&remote_config(), Handle::current(), None, None).unwrap();
        let handle = bridge.handle();
        let mut world = HeadlessWorld::new();

        let mut first = handle.submit_action(ActionCommand::movement(1.0, 0.0, 100));
        let mut second = handle.submit_action(ActionCommand::movement(0.0, -1.0, 50));
        assert_eq!(bridge.applier().state(), ApplierState::Idle);

        bridge.tick_at(0, Some(&mut world));
        assert!(world.held_keys().contains(HeldKeys::FORWARD));
        assert_eq!(bridge.applier().queue_len(), 1);

        let report = bridge.tick_at(100, Some(&mut world));
        assert_eq!(report.completed, 1);
        assert!(recv(&mut first).unwrap().success);
        assert!(world.held_keys().contains(HeldKeys::LEFT));

        let report = bridge.tick_at(150, Some(&mut world));
        assert_eq!(report.completed, 1);
        assert!(recv(&mut second).unwrap().success);
        assert!(bridge.applier().is_idle());
        assert!(world.held_keys().is_neutral());

        assert_eq!(handle.metrics().snapshot().actions_enqueued, 2);
        bridge.stop(None);
    }

    #[tokio::test]
    async fn test_no_world_fails_everything() {
        let mut bridge = Bridge::new(&remote_config(), Handle::current(), None, None).unwrap();
        let handle = bridge.handle();

        let mut acks: Vec<_> = (0..3)
            .map(|_| handle.submit_action(ActionCommand::idle(100)))
            .collect();
        let report = bridge.tick_at(0, None);

        assert_eq!(report.failed, 3);
        for rx in acks.iter_mut() {
            let ack = recv(rx).unwrap();
            assert!(!ack.success);
            assert_eq!(ack.error.as_deref(), Some(OWNER_NOT_READY));
        }
        bridge.stop(None);
    }

    #[tokio::test]
    async fn test_kill_switch_stops_application() {
        let mut bridge = Bridge::new(&remote_config(), Handle::current(), None, None).unwrap();
        let handle = bridge.handle();
        let mut world = HeadlessWorld::new();

        let mut running = handle.submit_action(ActionCommand::movement(1.0, 0.0, 2000));
        bridge.tick_at(0, Some(&mut world));
        assert!(world.held_keys().contains(HeldKeys::FORWARD));

        handle.kill_switch().engage();
        let report = bridge.tick_at(10, Some(&mut world));
        assert_eq!(report.failed, 1);
        assert_eq!(recv(&mut running).unwrap().error.as_deref(), Some(KILL_SWITCH_ENGAGED));
        assert!(world.held_keys().is_neutral());

        let mut refused = handle.submit_action(ActionCommand::movement(1.0, 0.0, 100));
        bridge.tick_at(20, Some(&mut world));
        assert_eq!(recv(&mut refused).unwrap().error.as_deref(), Some(KILL_SWITCH_ENGAGED));
        assert!(world.held_keys().is_neutral());

        handle.kill_switch().reset();
        let mut resumed = handle.submit_action(ActionCommand::movement(1.0, 0.0, 100));
        bridge.tick_at(30, Some(&mut world));
        assert!(world.held_keys().contains(HeldKeys::FORWARD));
        assert!(recv(&mut resumed).is_none());
        bridge.stop(None);
    }

    #[tokio::test]
    async fn test_rate_limit_refuses_excess() {
        let config = BridgeConfig { max_actions_per_minute: 2, ..remote_config() };
        let mut bridge = Bridge::new(&config, Handle::current(), None, None).unwrap();
        let handle = bridge.handle();
        let mut world = HeadlessWorld::new();

        let _a = handle.submit_action(ActionCommand::idle(20));
        let _b = handle.submit_action(ActionCommand::idle(20));
        let mut c = handle.submit_action(ActionCommand::idle(20));
        let report = bridge.tick_at(0, Some(&mut world));

        assert_eq!(report.failed, 1);
        assert_eq!(recv(&mut c).unwrap().error.as_deref(), Some(RATE_LIMITED));
        bridge.stop(None);
    }

    #[tokio::test]
    async fn test_frame_config_applied_on_tick() {
        let mut bridge = Bridge::new(&remote_config(), Handle::current(), None, None).unwrap();
        let handle = bridge.handle();

        assert!(handle.configure_frames(FrameConfig::new(true, 854, 480, 2, 0.75)));
        assert_eq!(bridge.pipeline().config().width, 32);
        bridge.tick_at(0, None);
        assert_eq!(bridge.pipeline().config(), FrameConfig::new(true, 854, 480, 2, 0.75));
        bridge.stop(None);
    }

    #[tokio::test]
    async fn test_stop_drains_and_disables_capture() {
        let mut bridge = Bridge::new(&remote_config(), Handle::current(), None, None).unwrap();
        let handle = bridge.handle();
        let mut world = HeadlessWorld::new();
        let mut source = TestPatternSource::new(64, 36);

        let mut active = handle.submit_action(ActionCommand::movement(1.0, 0.0, 500));
        bridge.tick_at(0, Some(&mut world));
        let mut queued = handle.submit_action(ActionCommand::idle(100));
        bridge.tick_at(10, Some(&mut world));
        let mut unread = handle.submit_action(ActionCommand::idle(100));

        assert!(bridge.stop(Some(&mut world)));
        assert!(bridge.is_stopped());
        for rx in [&mut active, &mut queued, &mut unread] {
            let ack = recv(rx).unwrap();
            assert!(!ack.success);
        }
        assert!(world.held_keys().is_neutral());
        assert!(matches!(bridge.on_render_frame(&mut source), CaptureOutcome::Stopped));

        let mut late = handle.submit_action(ActionCommand::idle(100));
        bridge.tick_at(20, Some(&mut world));
        assert_eq!(recv(&mut late).unwrap().error.as_deref(), Some(BRIDGE_STOPPED));
    }

    #[tokio::test]
    async fn test_submit_after_bridge_dropped() {
        let bridge = Bridge::new(&remote_config(), Handle::current(), None, None).unwrap();
        let handle = bridge.handle();
        drop(bridge);

        let ack = handle.submit_action(ActionCommand::idle(100)).await.unwrap();
        assert_eq!(ack.error.as_deref(), Some(OWNER_NOT_READY));
        assert!(!handle.configure_frames(FrameConfig::default()));
    }

    #[tokio::test]
    async fn test_remote_mode_broadcasts_frames() {
        let broadcaster = Broadcaster::new();
        let mut bridge = Bridge::new(
            &remote_config(),
            Handle::current(),
            None,
            Some(broadcaster.clone()),
        )
        .unwrap();
        let mut source = TestPatternSource::new(64, 36);

        bridge.on_render_frame(&mut source);
        assert!(bridge.stop(None));
        assert_eq!(broadcaster.frames_sent(), 1);
        assert_eq!(bridge.handle().metrics().snapshot().frames_seen, 1);
    }

    struct FixedModel;

    #[async_trait]
    impl ActionModel for FixedModel {
        async fn decide(&self, _request: DecisionRequest) -> Result<ActionCommand, ModelError> {
            Ok(ActionCommand::movement(0.0, 1.0, 200))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_in_process_loop_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig {
            mode: OperatingMode::InProcess,
            debug_frames_dir: Some(dir.path().to_path_buf()),
            ..remote_config()
        };
        let mut bridge =
            Bridge::new(&config, Handle::current(), Some(Arc::new(FixedModel)), None).unwrap();
        let mut world = HeadlessWorld::new();
        let mut source = TestPatternSource::new(64, 36);

        bridge.on_render_frame(&mut source);

        // Frame → owner → model → owner → applier.
        let mut applied = false;
        for step in 0..500u64 {
            bridge.tick_at(step, Some(&mut world));
            if world.held_keys().contains(HeldKeys::RIGHT) {
                applied = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(applied);

        let snapshot = bridge.handle().metrics().snapshot();
        assert_eq!(snapshot.decisions, 1);
        assert_eq!(snapshot.actions_enqueued, 1);
        assert!(dir.path().join("frame_0.jpg").exists());
        bridge.stop(Some(&mut world));
    }

    #[tokio::test]
    async fn test_debug_frames_written_off_owner_tick() {
        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig {
            mode: OperatingMode::InProcess,
            debug_frames_dir: Some(dir.path().to_path_buf()),
            ..remote_config()
        };
        let mut bridge = Bridge::new(&config, Handle::current(), None, None).unwrap();
        let mut source = TestPatternSource::new(64, 36);

        bridge.on_render_frame(&mut source);
        // No tick: the encoder thread has already dumped the ring.
        assert!(bridge.stop(None));
        assert!(dir.path().join("frame_0.jpg").exists());
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("remote".parse::<OperatingMode>().unwrap(), OperatingMode::Remote);
        assert_eq!("In-Process".parse::<OperatingMode>().unwrap(), OperatingMode::InProcess);
        assert!("both".parse::<OperatingMode>().is_err());
        assert_eq!(OperatingMode::InProcess.to_string(), "in_process");
    }
}
