//! Control Layer
//!
//! Everything that mutates client controls. Runs on the owning simulation
//! thread; other threads reach it only through the bridge inbox.
//!
//! ## Module Structure
//!
//! - `action`: Commands, held keys, pending actions, acknowledgments
//! - `applier`: Per-tick action state machine
//! - `world`: World snapshots and the `ControlSurface` seam
//! - `safety`: Rate limit, look bound, kill switch
//! - `headless`: In-memory client for demos and tests

pub mod action;
pub mod applier;
pub mod world;
pub mod safety;
pub mod headless;

// Re-export key types
pub use action::{
    ActionCommand, ActionButtons, Acknowledgment, AckReceiver, HeldKeys, LookMode, PendingAction,
};
pub use applier::{ActionApplier, ApplierState, TickReport};
pub use world::{ControlSurface, PlayerState, WorldFacts, WorldSnapshot};
pub use safety::{ActionRateLimiter, KillSwitch};
pub use headless::HeadlessWorld;
