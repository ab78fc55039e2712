//! Coin Pusher - an arcade coin pusher simulation and progression engine
//!
//! Core modules:
//! - `sim`: Simulation (physics, pushers, scoring, effects, random events, boss)
//! - `progression`: Levels, achievements and the lucky wheel
//! - `engine`: The orchestrator that runs the tick pipeline and exposes controls
//! - `event_bus`: Synchronous events from the core to presentation
//! - `persistence`: Save/load with debounced writes
//! - `platform`: Clock and input abstraction
//! - `tuning`: Data-driven game balance

pub mod config;
pub mod engine;
pub mod error;
pub mod event_bus;
pub mod highscores;
pub mod persistence;
pub mod platform;
pub mod progression;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use config::EngineConfig;
pub use engine::{GameEngine, Presenter, RenderSnapshot};
pub use event_bus::{EventBus, EventSink, GameEvent, Topic};
pub use highscores::HighScores;
pub use settings::{QualityPreset, Settings};

/// Game configuration constants
///
/// World units are roughly "coin diameters / 2"; +y is up, +z points at the
/// player (the collection edge), x runs across the table.
pub mod consts {
    /// Fixed physics timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum physics substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 4;
    /// Upper bound on a single frame's delta (ms)
    pub const MAX_FRAME_DT_MS: f64 = 50.0;

    /// Gravity along -y
    pub const GRAVITY: f32 = 9.81;

    /// Table dimensions (top surface at y = 0)
    pub const TABLE_WIDTH: f32 = 6.0;
    pub const TABLE_DEPTH: f32 = 8.0;
    pub const TABLE_HALF_WIDTH: f32 = TABLE_WIDTH / 2.0;
    pub const TABLE_HALF_DEPTH: f32 = TABLE_DEPTH / 2.0;
    pub const WALL_HEIGHT: f32 = 0.8;

    /// Objects below this height have left the table
    pub const COLLECTION_HEIGHT: f32 = -0.5;
    /// Slack beyond the side walls before an object counts as overflowed
    pub const LATERAL_MARGIN: f32 = 0.5;
    /// Objects behind this z are removed to prevent pile-up behind the pusher
    pub const BARRIER_Z: f32 = -4.5;

    /// Main pusher
    pub const PUSHER_WIDTH: f32 = 4.2;
    pub const PUSHER_HEIGHT: f32 = 0.5;
    pub const PUSHER_DEPTH: f32 = 3.0;
    /// Pusher center travel along z
    pub const PUSHER_Z_MIN: f32 = -3.5;
    pub const PUSHER_Z_MAX: f32 = -1.5;
    /// Pusher speed (units/s)
    pub const PUSHER_SPEED: f32 = 0.8;

    /// Shelf pusher riding on top of the main pusher
    pub const SHELF_PUSHER_DEPTH: f32 = 1.5;
    pub const SHELF_PUSHER_Z_MIN: f32 = -4.0;
    pub const SHELF_PUSHER_Z_MAX: f32 = -3.0;

    /// Coin drop line
    pub const DROP_HEIGHT: f32 = 2.5;
    pub const DROP_Z: f32 = -1.0;
    /// Drop x is clamped to [-DROP_RANGE, DROP_RANGE]
    pub const DROP_RANGE: f32 = 2.5;
    /// Minimum time between player drops (ms)
    pub const DROP_COOLDOWN_MS: f64 = 250.0;

    /// Coins below this speed count as settled
    pub const SETTLE_SPEED: f32 = 0.2;
    /// Per-tick factor applied to settled coins' X/Z spin
    pub const TILT_DAMPING: f32 = 0.5;

    /// Item ids start here so they never collide with coin ids
    pub const ITEM_ID_OFFSET: u32 = 1_000_000;
}
