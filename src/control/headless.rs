//! Headless Client
//!
//! In-memory `ControlSurface` with a trivial kinematic model. Drives the
//! demo binary and the test suite where no real client is attached.

use crate::control::action::HeldKeys;
use crate::control::world::{ControlSurface, PlayerState, WorldFacts, WorldSnapshot};

/// Blocks moved per tick at full speed.
const WALK_SPEED: f64 = 0.2;

/// Sprint multiplier.
const SPRINT_FACTOR: f64 = 1.3;

/// Sneak multiplier.
const SNEAK_FACTOR: f64 = 0.3;

/// Game ticks per day.
const DAY_LENGTH: i64 = 24_000;

/// Simulated player in a flat world.
#[derive(Debug, Clone)]
pub struct HeadlessWorld {
    player: PlayerState,
    facts: WorldFacts,
    keys: HeldKeys,
    attacks: u32,
    uses: u32,
}

impl HeadlessWorld {
    /// Spawn at the origin, on the ground, full vitals.
    pub fn new() -> Self {
        Self {
            player: PlayerState {
                y: 64.0,
                health: 20.0,
                food: 20.0,
                on_ground: true,
                ..Default::default()
            },
            facts: WorldFacts {
                dimension: "minecraft:overworld".to_string(),
                time: 0,
                is_raining: false,
                is_thundering: false,
            },
            keys: HeldKeys::NONE,
            attacks: 0,
            uses: 0,
        }
    }

    /// Keys currently held.
    pub fn held_keys(&self) -> HeldKeys {
        self.keys
    }

    /// Left clicks so far.
    pub fn attack_count(&self) -> u32 {
        self.attacks
    }

    /// Right clicks so far.
    pub fn use_count(&self) -> u32 {
        self.uses
    }

    /// Advance one simulation tick using the held keys.
    pub fn step(&mut self) {
        let mut forward = 0.0;
        let mut strafe = 0.0;
        if self.keys.contains(HeldKeys::FORWARD) {
            forward += 1.0;
        }
        if self.keys.contains(HeldKeys::BACK) {
            forward -= 1.0;
        }
        if self.keys.contains(HeldKeys::RIGHT) {
            strafe += 1.0;
        }
        if self.keys.contains(HeldKeys::LEFT) {
            strafe -= 1.0;
        }

        let mut speed = WALK_SPEED;
        if self.keys.contains(HeldKeys::SPRINT) && forward > 0.0 {
            speed *= SPRINT_FACTOR;
        }
        if self.keys.contains(HeldKeys::SNEAK) {
            speed *= SNEAK_FACTOR;
        }

        // Yaw 0 faces +Z, 90 faces -X.
        let yaw = (self.player.yaw as f64).to_radians();
        let (sin, cos) = yaw.sin_cos();
        self.player.x += (-sin * forward - cos * strafe) * speed;
        self.player.z += (cos * forward - sin * strafe) * speed;

        self.player.on_ground = !self.keys.contains(HeldKeys::JUMP);
        self.facts.time = (self.facts.time + 1) % DAY_LENGTH;
    }
}

impl Default for HeadlessWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlSurface for HeadlessWorld {
    fn set_held_keys(&mut self, keys: HeldKeys) {
        self.keys = keys;
    }

    fn set_look(&mut self, yaw: f32, pitch: f32) {
        self.player.yaw = yaw;
        self.player.pitch = pitch;
    }

    fn orientation(&self) -> (f32, f32) {
        (self.player.yaw, self.player.pitch)
    }

    fn attack(&mut self) {
        self.attacks += 1;
    }

    fn use_item(&mut self) {
        self.uses += 1;
    }

    fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            player: self.player.clone(),
            world: self.facts.clone(),
        }
    }
}
