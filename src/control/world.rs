//! World Snapshots and the Control Surface
//!
//! `ControlSurface` is the owner-side seam to the game client: the only
//! place continuous inputs, look angles and clicks are written, and the only
//! place world state is read. Implementations are not `Send`; they live on
//! the simulation thread.

use serde::{Serialize, Deserialize};

use crate::control::action::HeldKeys;

/// Player pose and vitals.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Position X.
    pub x: f64,
    /// Position Y.
    pub y: f64,
    /// Position Z.
    pub z: f64,
    /// Yaw in degrees.
    pub yaw: f32,
    /// Pitch in degrees.
    pub pitch: f32,
    /// Health points.
    pub health: f32,
    /// Hunger / food level.
    pub food: f32,
    /// Experience level.
    pub experience_level: i32,
    /// Standing on a block.
    pub on_ground: bool,
    /// Submerged in water.
    pub in_water: bool,
    /// Submerged in lava.
    pub in_lava: bool,
}

/// Facts about the loaded world.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldFacts {
    /// Dimension identifier.
    pub dimension: String,
    /// Time of day in game ticks.
    pub time: i64,
    /// Raining.
    pub is_raining: bool,
    /// Thunderstorm.
    pub is_thundering: bool,
}

/// Read-only view of player and world, regenerated on demand.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Player state.
    pub player: PlayerState,
    /// World state.
    pub world: WorldFacts,
}

impl WorldSnapshot {
    /// Compact summary passed to the model alongside the frame.
    pub fn prompt_summary(&self) -> String {
        format!(
            "{{\"health\":{},\"hunger\":{}}}",
            self.player.health, self.player.food
        )
    }
}

/// Owner-thread access to the running client.
///
/// Only the simulation thread holds a `&mut dyn ControlSurface`; every other
/// thread reaches it through the bridge inbox.
pub trait ControlSurface {
    /// Assert the continuous key state for this tick.
    fn set_held_keys(&mut self, keys: HeldKeys);

    /// Write absolute orientation, no interpolation.
    fn set_look(&mut self, yaw: f32, pitch: f32);

    /// Current orientation `(yaw, pitch)`.
    fn orientation(&self) -> (f32, f32);

    /// Single left click for this tick.
    fn attack(&mut self);

    /// Single right click for this tick.
    fn use_item(&mut self);

    /// Snapshot of player and world.
    fn snapshot(&self) -> WorldSnapshot;

    /// Release every held key and axis.
    fn release_all(&mut self) {
        self.set_held_keys(HeldKeys::NONE);
    }
}
