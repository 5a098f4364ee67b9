//! Action Application
//!
//! Single-consumer state machine that turns queued, time-bounded actions
//! into per-tick control effects. Runs on the owning simulation thread only.
//!
//! ```text
//!   Idle ──enqueue──► Applying ──tick (now < end)──► Applying (re-assert)
//!    ▲                   │
//!    └──tick (now ≥ end, queue empty)
//!                        └──tick (now ≥ end, queue non-empty)──► Applying (next)
//!
//!   any ──owner unavailable──► Idle (every action failed, world untouched)
//! ```

use std::collections::VecDeque;

use tokio::sync::oneshot;
use tracing::debug;

use crate::control::action::{
    ActionCommand, Acknowledgment, AckReceiver, AckSender, LookMode, PendingAction,
    clamp_pitch,
};
use crate::control::world::ControlSurface;

/// Failure reason when the world or player is not loaded.
pub const OWNER_NOT_READY: &str = "owner not ready";

/// Applier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplierState {
    /// No active action.
    Idle,
    /// One action is driving the controls.
    Applying,
}

/// What happened during one tick.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Actions completed successfully this tick.
    pub completed: u32,
    /// Actions failed this tick.
    pub failed: u32,
    /// Whether a queued action became active this tick.
    pub advanced: bool,
    /// Whether continuous effects were asserted this tick.
    pub applied: bool,
}

/// Queue of pending actions plus the single active one.
#[derive(Debug)]
pub struct ActionApplier {
    active: Option<PendingAction>,
    queue: VecDeque<PendingAction>,
}

impl ActionApplier {
    /// Create an idle applier.
    pub fn new() -> Self {
        Self {
            active: None,
            queue: VecDeque::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> ApplierState {
        if self.active.is_some() {
            ApplierState::Applying
        } else {
            ApplierState::Idle
        }
    }

    /// True when nothing is active.
    pub fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    /// Actions waiting behind the active one.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// The action currently driving the controls.
    pub fn active(&self) -> Option<&PendingAction> {
        self.active.as_ref()
    }

    /// Enqueue a command and get its acknowledgment future.
    pub fn enqueue(&mut self, command: ActionCommand, now_ms: u64) -> AckReceiver {
        let (tx, rx) = oneshot::channel();
        self.enqueue_with(command, tx, now_ms);
        rx
    }

    /// Enqueue a command whose acknowledgment goes to an existing channel.
    ///
    /// From `Idle` the action becomes active immediately, starting at `now_ms`.
    pub fn enqueue_with(&mut self, command: ActionCommand, ack: AckSender, now_ms: u64) {
        let mut pending = PendingAction::new(command, ack);
        if self.active.is_none() && self.queue.is_empty() {
            pending.activate(now_ms);
            self.active = Some(pending);
        } else {
            self.queue.push_back(pending);
        }
    }

    /// Advance one simulation tick.
    ///
    /// `world` is `None` when no world/player is loaded; every action is then
    /// failed with [`OWNER_NOT_READY`] and nothing is written.
    pub fn tick(&mut self, now_ms: u64, world: Option<&mut dyn ControlSurface>) -> TickReport {
        let mut report = TickReport::default();

        let world = match world {
            Some(world) => world,
            None => {
                report.failed = self.drain(OWNER_NOT_READY);
                return report;
            }
        };

        // Queued work with nothing active starts now.
        if self.active.is_none() {
            if let Some(mut next) = self.queue.pop_front() {
                next.activate(now_ms);
                self.active = Some(next);
                report.advanced = true;
            }
        }

        let expired = match self.active.as_ref() {
            Some(active) => active.is_expired(now_ms),
            None => return report,
        };

        if expired {
            if let Some(done) = self.active.take() {
                done.resolve(Acknowledgment::completed());
                report.completed += 1;
            }
            world.release_all();

            // At most one transition per tick.
            if let Some(mut next) = self.queue.pop_front() {
                next.activate(now_ms);
                self.active = Some(next);
                report.advanced = true;
            }
        }

        if let Some(active) = self.active.as_ref() {
            apply_effects(&active.command, world);
            report.applied = true;
        }

        report
    }

    /// Fail every queued and active action at once. Returns how many.
    pub fn drain(&mut self, reason: &str) -> u32 {
        let mut count = 0;
        if let Some(active) = self.active.take() {
            active.resolve(Acknowledgment::failed(reason));
            count += 1;
        }
        while let Some(pending) = self.queue.pop_front() {
            pending.resolve(Acknowledgment::failed(reason));
            count += 1;
        }
        if count > 0 {
            debug!("Drained {} action(s): {}", count, reason);
        }
        count
    }
}

impl Default for ActionApplier {
    fn default() -> Self {
        Self::new()
    }
}

/// Write one tick of a command's effects to the client.
fn apply_effects(command: &ActionCommand, world: &mut dyn ControlSurface) {
    world.set_held_keys(command.held_keys());

    if command.look_requested() {
        let (yaw, pitch) = match command.look_mode() {
            LookMode::Absolute => (command.yaw(), command.pitch()),
            LookMode::Delta => {
                let (yaw, pitch) = world.orientation();
                (yaw + command.yaw(), clamp_pitch(pitch + command.pitch()))
            }
        };
        world.set_look(yaw, pitch);
    }

    let buttons = command.buttons();
    if buttons.attack {
        world.attack();
    }
    if buttons.use_item {
        world.use_item();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::action::{ActionButtons, HeldKeys};
    use crate::control::headless::HeadlessWorld;

    fn recv(rx: &mut AckReceiver) -> Option<Acknowledgment> {
        rx.try_recv().ok()
    }

    #[test]
    fn test_idle_enqueue_activates() {
        let mut applier = ActionApplier::new();
        assert_eq!(applier.state(), ApplierState::Idle);

        let _rx = applier.enqueue(ActionCommand::idle(100), 5);
        assert_eq!(applier.state(), ApplierState::Applying);
        assert_eq!(applier.active().unwrap().start_ms, 5);
        assert_eq!(applier.active().unwrap().end_ms, 105);
        assert_eq!(applier.queue_len(), 0);
    }

    #[test]
    fn test_two_action_sequence() {
        let mut applier = ActionApplier::new();
        let mut world = HeadlessWorld::new();

        let mut first = applier.enqueue(ActionCommand::movement(1.0, 0.0, 100), 0);
        let mut second = applier.enqueue(ActionCommand::movement(0.0, 1.0, 50), 0);
        assert_eq!(applier.queue_len(), 1);

        let report = applier.tick(50, Some(&mut world));
        assert!(report.applied);
        assert!(world.held_keys().contains(HeldKeys::FORWARD));
        assert!(recv(&mut first).is_none());

        let report = applier.tick(100, Some(&mut world));
        assert_eq!(report.completed, 1);
        assert!(report.advanced);
        assert!(recv(&mut first).unwrap().success);
        assert_eq!(applier.active().unwrap().start_ms, 100);
        assert!(world.held_keys().contains(HeldKeys::RIGHT));
        assert!(!world.held_keys().contains(HeldKeys::FORWARD));

        let report = applier.tick(149, Some(&mut world));
        assert_eq!(report.completed, 0);
        assert!(recv(&mut second).is_none());

        let report = applier.tick(150, Some(&mut world));
        assert_eq!(report.completed, 1);
        assert!(recv(&mut second).unwrap().success);
        assert_eq!(applier.state(), ApplierState::Idle);
        assert_eq!(applier.queue_len(), 0);
        assert!(world.held_keys().is_neutral());
    }

    #[test]
    fn test_one_transition_per_tick() {
        let mut applier = ActionApplier::new();
        let mut world = HeadlessWorld::new();

        let mut acks: Vec<_> = (0..3)
            .map(|_| applier.enqueue(ActionCommand::idle(20), 0))
            .collect();

        // Far past every end time: still only one completion per tick.
        let report = applier.tick(10_000, Some(&mut world));
        assert_eq!(report.completed, 1);
        assert_eq!(applier.queue_len(), 1);

        let report = applier.tick(10_001, Some(&mut world));
        assert_eq!(report.completed, 0);

        let report = applier.tick(10_020, Some(&mut world));
        assert_eq!(report.completed, 1);
        assert_eq!(applier.queue_len(), 0);

        applier.tick(10_040, Some(&mut world));
        assert!(applier.is_idle());

        for rx in acks.iter_mut() {
            assert!(recv(rx).unwrap().success);
        }
    }

    #[test]
    fn test_owner_unavailable_drains_all() {
        let mut applier = ActionApplier::new();
        let mut acks: Vec<_> = (0..3)
            .map(|_| applier.enqueue(ActionCommand::movement(1.0, 0.0, 500), 0))
            .collect();

        let report = applier.tick(10, None);
        assert_eq!(report.failed, 3);
        assert!(!report.applied);
        assert!(applier.is_idle());
        assert_eq!(applier.queue_len(), 0);

        for rx in acks.iter_mut() {
            let ack = recv(rx).unwrap();
            assert!(!ack.success);
            assert_eq!(ack.error.as_deref(), Some(OWNER_NOT_READY));
        }
    }

    #[test]
    fn test_no_partial_application_when_unavailable() {
        let mut applier = ActionApplier::new();
        let world = HeadlessWorld::new();
        let _rx = applier.enqueue(ActionCommand::movement(1.0, 0.0, 500), 0);

        applier.tick(10, None);
        assert!(world.held_keys().is_neutral());
        assert_eq!(world.attack_count(), 0);
    }

    #[test]
    fn test_absolute_look_written_directly() {
        let mut applier = ActionApplier::new();
        let mut world = HeadlessWorld::new();
        world.set_look(10.0, 5.0);

        let cmd = ActionCommand::new(0.0, 0.0, 170.0, -45.0, ActionButtons::default(), 100);
        let _rx = applier.enqueue(cmd, 0);
        applier.tick(1, Some(&mut world));

        assert_eq!(world.orientation(), (170.0, -45.0));
    }

    #[test]
    fn test_zero_look_leaves_camera() {
        let mut applier = ActionApplier::new();
        let mut world = HeadlessWorld::new();
        world.set_look(33.0, 12.0);

        let _rx = applier.enqueue(ActionCommand::movement(1.0, 0.0, 100), 0);
        applier.tick(1, Some(&mut world));

        assert_eq!(world.orientation(), (33.0, 12.0));
    }

    #[test]
    fn test_delta_look_accumulates_and_clamps() {
        let mut applier = ActionApplier::new();
        let mut world = HeadlessWorld::new();
        world.set_look(0.0, 85.0);

        let cmd = ActionCommand::with_look_mode(
            0.0, 0.0, 30.0, 30.0, LookMode::Delta, ActionButtons::default(), 100,
        );
        let _rx = applier.enqueue(cmd, 0);
        applier.tick(1, Some(&mut world));

        assert_eq!(world.orientation(), (12.0, 90.0));
    }

    #[test]
    fn test_attack_is_one_shot_per_tick() {
        let mut applier = ActionApplier::new();
        let mut world = HeadlessWorld::new();

        let buttons = ActionButtons { attack: true, ..Default::default() };
        let cmd = ActionCommand::new(0.0, 0.0, 0.0, 0.0, buttons, 100);
        let _rx = applier.enqueue(cmd, 0);

        applier.tick(10, Some(&mut world));
        applier.tick(20, Some(&mut world));
        applier.tick(30, Some(&mut world));

        assert_eq!(world.attack_count(), 3);
        assert!(world.held_keys().is_neutral());
    }

    #[test]
    fn test_completion_releases_controls() {
        let mut applier = ActionApplier::new();
        let mut world = HeadlessWorld::new();

        let buttons = ActionButtons { jump: true, sneak: true, sprint: true, ..Default::default() };
        let cmd = ActionCommand::new(-1.0, -1.0, 0.0, 0.0, buttons, 40);
        let _rx = applier.enqueue(cmd, 0);

        applier.tick(10, Some(&mut world));
        assert!(world.held_keys().contains(HeldKeys::BACK));
        assert!(world.held_keys().contains(HeldKeys::SNEAK));

        applier.tick(40, Some(&mut world));
        assert!(world.held_keys().is_neutral());
        assert!(applier.is_idle());
    }

    #[test]
    fn test_drain_fails_everything_once() {
        let mut applier = ActionApplier::new();
        let mut acks: Vec<_> = (0..4)
            .map(|_| applier.enqueue(ActionCommand::idle(100), 0))
            .collect();

        assert_eq!(applier.drain("stopping"), 4);
        assert_eq!(applier.drain("stopping"), 0);

        for rx in acks.iter_mut() {
            let ack = recv(rx).unwrap();
            assert!(!ack.success);
            assert_eq!(ack.error.as_deref(), Some("stopping"));
        }
    }

    #[test]
    fn test_dropped_receiver_is_harmless() {
        let mut applier = ActionApplier::new();
        let mut world = HeadlessWorld::new();
        drop(applier.enqueue(ActionCommand::idle(20), 0));

        let report = applier.tick(20, Some(&mut world));
        assert_eq!(report.completed, 1);
        assert!(applier.is_idle());
    }
}
