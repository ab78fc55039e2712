//! Simulation module
//!
//! Physics, pushers, entity registries, scoring, timed effects, random
//! events and the boss. Everything here is driven by the engine through
//! explicit arguments; nothing reads the clock on its own.

pub mod boss;
pub mod boundary;
pub mod combo;
pub mod effects;
pub mod entities;
pub mod events;
pub mod physics;
pub mod pusher;
pub mod tick;

pub use boss::{BossAttack, BossDefeat, BossEncounter, LostObject};
pub use boundary::{Boundaries, CoinFate, ItemFate};
pub use combo::{ComboResult, ComboTracker};
pub use effects::{EffectContext, EffectKind, EffectManager, EffectType, Modifiers};
pub use entities::{Coin, CoinRegistry, Item, ItemRegistry};
pub use physics::{BodyHandle, PhysicsWorld, Transform};
pub use pusher::{PusherController, PusherSnapshot};
pub use tick::{TICK_PIPELINE, TickPhase};
