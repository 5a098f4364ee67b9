//! Action Commands and Acknowledgments
//!
//! Timed control actions requested by a controller or the model loop.
//! All range clamping happens at construction, so a held `ActionCommand`
//! is always inside its documented bounds.

use serde::{Serialize, Deserialize};
use tokio::sync::oneshot;

// =============================================================================
// RANGES
// =============================================================================

/// Shortest action duration (ms).
pub const MIN_DURATION_MS: u32 = 20;

/// Longest action duration (ms).
pub const MAX_DURATION_MS: u32 = 2000;

/// Pitch bound in degrees (both directions).
pub const PITCH_LIMIT_DEG: f32 = 90.0;

/// Per-action bound for relative look changes (degrees).
pub const MAX_LOOK_DELTA_DEG: f32 = 12.0;

/// Kind reported in acknowledgments for action messages.
pub const ACTION_KIND: &str = "action";

/// Clamp a movement axis to [-1, 1]. NaN collapses to neutral.
#[inline]
pub fn clamp_axis(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}

/// Clamp a pitch angle to [-90, 90]. NaN collapses to level.
#[inline]
pub fn clamp_pitch(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-PITCH_LIMIT_DEG, PITCH_LIMIT_DEG)
    }
}

/// Clamp a duration to [20, 2000] ms.
#[inline]
pub fn clamp_duration(value: i64) -> u32 {
    value.clamp(MIN_DURATION_MS as i64, MAX_DURATION_MS as i64) as u32
}

/// Round a numeric duration to whole ms, saturating at the `i64` range.
/// NaN maps to 0, which then clamps to the minimum.
#[inline]
pub fn round_duration(value: f64) -> i64 {
    if value.is_nan() {
        0
    } else {
        value.round() as i64
    }
}

// Any JSON number is accepted; floats and out-of-range integers are rounded
// and saturated rather than rejected.
fn lenient_duration<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    f64::deserialize(deserializer).map(round_duration)
}

// =============================================================================
// LOOK MODE
// =============================================================================

/// How `yaw`/`pitch` of a command are interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookMode {
    /// Angles are written directly to orientation.
    #[default]
    Absolute,
    /// Angles are added to the current orientation, bounded per action.
    Delta,
}

impl LookMode {
    /// True for the default mode (omitted on the wire).
    pub fn is_absolute(&self) -> bool {
        matches!(self, LookMode::Absolute)
    }
}

// =============================================================================
// ACTION COMMAND
// =============================================================================

/// One timed control action.
///
/// Construct with [`ActionCommand::new`] or by deserializing; both paths
/// clamp every field. Relative look angles are bounded to
/// [`MAX_LOOK_DELTA_DEG`] at construction as well.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "ActionWire", into = "ActionWire")]
pub struct ActionCommand {
    forward: f32,
    strafe: f32,
    yaw: f32,
    pitch: f32,
    look_mode: LookMode,
    jump: bool,
    attack: bool,
    use_item: bool,
    sneak: bool,
    sprint: bool,
    duration_ms: u32,
}

/// Button flags of a command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActionButtons {
    /// Hold jump.
    pub jump: bool,
    /// Left click, once per tick.
    pub attack: bool,
    /// Right click, once per tick.
    pub use_item: bool,
    /// Hold sneak.
    pub sneak: bool,
    /// Hold sprint.
    pub sprint: bool,
}

impl ActionCommand {
    /// Build a command, clamping every field into range.
    pub fn new(
        forward: f32,
        strafe: f32,
        yaw: f32,
        pitch: f32,
        buttons: ActionButtons,
        duration_ms: i64,
    ) -> Self {
        Self::with_look_mode(forward, strafe, yaw, pitch, LookMode::Absolute, buttons, duration_ms)
    }

    /// Build a command with an explicit look mode.
    pub fn with_look_mode(
        forward: f32,
        strafe: f32,
        yaw: f32,
        pitch: f32,
        look_mode: LookMode,
        buttons: ActionButtons,
        duration_ms: i64,
    ) -> Self {
        let (yaw, pitch) = match look_mode {
            LookMode::Absolute => (finite_or_zero(yaw), clamp_pitch(pitch)),
            LookMode::Delta => (
                crate::control::safety::bound_look_delta(yaw),
                crate::control::safety::bound_look_delta(pitch),
            ),
        };

        Self {
            forward: clamp_axis(forward),
            strafe: clamp_axis(strafe),
            yaw,
            pitch,
            look_mode,
            jump: buttons.jump,
            attack: buttons.attack,
            use_item: buttons.use_item,
            sneak: buttons.sneak,
            sprint: buttons.sprint,
            duration_ms: clamp_duration(duration_ms),
        }
    }

    /// A command that holds nothing for `duration_ms`.
    pub fn idle(duration_ms: i64) -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0, ActionButtons::default(), duration_ms)
    }

    /// A command that walks with the given axes.
    pub fn movement(forward: f32, strafe: f32, duration_ms: i64) -> Self {
        Self::new(forward, strafe, 0.0, 0.0, ActionButtons::default(), duration_ms)
    }

    /// Forward axis (-1 backward, 1 forward).
    pub fn forward(&self) -> f32 {
        self.forward
    }

    /// Strafe axis (-1 left, 1 right).
    pub fn strafe(&self) -> f32 {
        self.strafe
    }

    /// Yaw in degrees (absolute or delta per [`Self::look_mode`]).
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Pitch in degrees (absolute or delta per [`Self::look_mode`]).
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Look interpretation.
    pub fn look_mode(&self) -> LookMode {
        self.look_mode
    }

    /// Button flags.
    pub fn buttons(&self) -> ActionButtons {
        ActionButtons {
            jump: self.jump,
            attack: self.attack,
            use_item: self.use_item,
            sneak: self.sneak,
            sprint: self.sprint,
        }
    }

    /// Duration in ms, always within [20, 2000].
    pub fn duration_ms(&self) -> u32 {
        self.duration_ms
    }

    /// Whether this command changes orientation at all.
    ///
    /// Yaw and pitch both exactly zero means "leave the camera alone".
    pub fn look_requested(&self) -> bool {
        self.yaw != 0.0 || self.pitch != 0.0
    }

    /// Held keys this command asserts every tick it is active.
    pub fn held_keys(&self) -> HeldKeys {
        let mut keys = HeldKeys::NONE;
        keys.set(HeldKeys::FORWARD, self.forward > 0.0);
        keys.set(HeldKeys::BACK, self.forward < 0.0);
        keys.set(HeldKeys::LEFT, self.strafe < 0.0);
        keys.set(HeldKeys::RIGHT, self.strafe > 0.0);
        keys.set(HeldKeys::JUMP, self.jump);
        keys.set(HeldKeys::SNEAK, self.sneak);
        keys.set(HeldKeys::SPRINT, self.sprint);
        keys
    }

    /// One-line summary for logs and metrics.
    pub fn summary(&self) -> String {
        format!(
            "fwd={:.2} str={:.2} yaw={:.1} pitch={:.1} jump={} atk={} use={} sneak={} sprint={} dur={}",
            self.forward, self.strafe, self.yaw, self.pitch,
            self.jump, self.attack, self.use_item, self.sneak, self.sprint, self.duration_ms,
        )
    }
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() { value } else { 0.0 }
}

/// Wire shape of an action. Every field except `look_mode` is required.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct ActionWire {
    forward: f32,
    strafe: f32,
    yaw: f32,
    pitch: f32,
    #[serde(default, skip_serializing_if = "LookMode::is_absolute")]
    look_mode: LookMode,
    jump: bool,
    attack: bool,
    #[serde(rename = "use")]
    use_item: bool,
    sneak: bool,
    sprint: bool,
    #[serde(deserialize_with = "lenient_duration")]
    duration_ms: i64,
}

impl From<ActionWire> for ActionCommand {
    fn from(wire: ActionWire) -> Self {
        ActionCommand::with_look_mode(
            wire.forward,
            wire.strafe,
            wire.yaw,
            wire.pitch,
            wire.look_mode,
            ActionButtons {
                jump: wire.jump,
                attack: wire.attack,
                use_item: wire.use_item,
                sneak: wire.sneak,
                sprint: wire.sprint,
            },
            wire.duration_ms,
        )
    }
}

impl From<ActionCommand> for ActionWire {
    fn from(cmd: ActionCommand) -> Self {
        ActionWire {
            forward: cmd.forward,
            strafe: cmd.strafe,
            yaw: cmd.yaw,
            pitch: cmd.pitch,
            look_mode: cmd.look_mode,
            jump: cmd.jump,
            attack: cmd.attack,
            use_item: cmd.use_item,
            sneak: cmd.sneak,
            sprint: cmd.sprint,
            duration_ms: cmd.duration_ms as i64,
        }
    }
}

// =============================================================================
// HELD KEYS
// =============================================================================

/// Continuous key state asserted on the client each tick (packed bits).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeldKeys(u8);

impl HeldKeys {
    /// Nothing held.
    pub const NONE: HeldKeys = HeldKeys(0);
    /// Walk forward.
    pub const FORWARD: u8 = 0x01;
    /// Walk backward.
    pub const BACK: u8 = 0x02;
    /// Strafe left.
    pub const LEFT: u8 = 0x04;
    /// Strafe right.
    pub const RIGHT: u8 = 0x08;
    /// Jump.
    pub const JUMP: u8 = 0x10;
    /// Sneak.
    pub const SNEAK: u8 = 0x20;
    /// Sprint.
    pub const SPRINT: u8 = 0x40;

    /// Raw bits.
    #[inline]
    pub fn bits(&self) -> u8 {
        self.0
    }

    /// Check a flag.
    #[inline]
    pub fn contains(&self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    /// Set or clear a flag.
    #[inline]
    pub fn set(&mut self, flag: u8, held: bool) {
        if held {
            self.0 |= flag;
        } else {
            self.0 &= !flag;
        }
    }

    /// True when every key is released.
    #[inline]
    pub fn is_neutral(&self) -> bool {
        self.0 == 0
    }
}

// =============================================================================
// ACKNOWLEDGMENT
// =============================================================================

/// Completion report for one action, produced exactly once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgment {
    /// Kind of the acknowledged message.
    #[serde(rename = "action_type")]
    pub action_kind: String,
    /// Whether the action ran to completion.
    pub success: bool,
    /// Failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Acknowledgment {
    /// Successful completion of an action.
    pub fn completed() -> Self {
        Self {
            action_kind: ACTION_KIND.to_string(),
            success: true,
            error: None,
        }
    }

    /// Failed action with a reason.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::failed_kind(ACTION_KIND, reason)
    }

    /// Failure for a message whose kind could not be established.
    pub fn failed_kind(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            action_kind: kind.into(),
            success: false,
            error: Some(reason.into()),
        }
    }
}

/// Receiving half of an action's acknowledgment.
pub type AckReceiver = oneshot::Receiver<Acknowledgment>;

/// Sending half of an action's acknowledgment.
pub type AckSender = oneshot::Sender<Acknowledgment>;

// =============================================================================
// PENDING ACTION
// =============================================================================

/// A queued or active action with its completion channel.
///
/// Resolving consumes the action, so an acknowledgment can only be sent once.
#[derive(Debug)]
pub struct PendingAction {
    /// The command being applied.
    pub command: ActionCommand,
    /// When the action became active (ms, bridge clock).
    pub start_ms: u64,
    /// `start_ms + duration_ms`.
    pub end_ms: u64,
    ack: AckSender,
}

impl PendingAction {
    /// Wrap a command; timing is assigned on activation.
    pub fn new(command: ActionCommand, ack: AckSender) -> Self {
        Self {
            command,
            start_ms: 0,
            end_ms: 0,
            ack,
        }
    }

    /// Mark the action active from `now_ms`.
    pub fn activate(&mut self, now_ms: u64) {
        self.start_ms = now_ms;
        self.end_ms = now_ms + self.command.duration_ms() as u64;
    }

    /// Whether the action has run its full duration.
    #[inline]
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.end_ms
    }

    /// Deliver the acknowledgment. A dropped receiver is not an error.
    pub fn resolve(self, ack: Acknowledgment) {
        let _ = self.ack.send(ack);
    }
}
