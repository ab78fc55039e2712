//! Tick pipeline
//!
//! The order in which the engine advances its subsystems each frame.
//! Fall checks must run after physics and effect expiry, and event machines
//! after fall checks, so the order is data rather than inline calls.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickPhase {
    /// Integrate physics over the clamped frame delta
    Physics,
    /// Damp X/Z spin on settled coins
    SettleCoins,
    Pushers,
    ExpireEffects,
    /// Classify coins, then items
    FallChecks,
    Frenzy,
    /// Thief, sweeper, slammer, low gravity
    EventMachines,
    /// Bob-omb timers
    Fuses,
    Magnet,
    Boss,
    /// Hand the snapshot to presentation
    Present,
}

pub const TICK_PIPELINE: [TickPhase; 11] = [
    TickPhase::Physics,
    TickPhase::SettleCoins,
    TickPhase::Pushers,
    TickPhase::ExpireEffects,
    TickPhase::FallChecks,
    TickPhase::Frenzy,
    TickPhase::EventMachines,
    TickPhase::Fuses,
    TickPhase::Magnet,
    TickPhase::Boss,
    TickPhase::Present,
];

impl TickPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TickPhase::Physics => "physics",
            TickPhase::SettleCoins => "settle_coins",
            TickPhase::Pushers => "pushers",
            TickPhase::ExpireEffects => "expire_effects",
            TickPhase::FallChecks => "fall_checks",
            TickPhase::Frenzy => "frenzy",
            TickPhase::EventMachines => "event_machines",
            TickPhase::Fuses => "fuses",
            TickPhase::Magnet => "magnet",
            TickPhase::Boss => "boss",
            TickPhase::Present => "present",
        }
    }
}

/// Frame delta in milliseconds, clamped to `[0, max_ms]`
pub fn clamp_frame_delta(last_ms: Option<f64>, now_ms: f64, max_ms: f64) -> f64 {
    match last_ms {
        Some(last) => (now_ms - last).clamp(0.0, max_ms),
        None => 0.0,
    }
}
