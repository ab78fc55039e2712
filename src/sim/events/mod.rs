//! Random world events
//!
//! Thief, sweeper and slammer share one shape: a [`PhaseMachine`] that sits
//! idle until its trigger time, then walks a fixed list of timed phases back
//! to idle. Machines never touch the world; they return outcomes and the
//! engine applies them. Low gravity is a plain [`TriggerSchedule`] that fires
//! a timed effect. The frenzy window lives here too.

mod frenzy;
mod slammer;
mod sweeper;
mod thief;

pub use frenzy::{FRENZY_DURATION_MS, FRENZY_SPAWN_INTERVAL_MS, FRENZY_SPEED_FACTOR, FrenzyWindow};
pub use slammer::{SLAM_RADIUS, Slam, Slammer, SlammerPhase};
pub use sweeper::{SWEEP_REACH, SweepImpulse, Sweeper, SweeperPhase};
pub use thief::{Thief, ThiefPhase, pick_victims};

use rand::Rng;
use serde::Serialize;

/// Which machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Thief,
    Sweeper,
    Slammer,
    LowGravity,
}

/// Per-tick gating inputs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventContext {
    /// Coins on the table
    pub population: usize,
    /// Whether the machine's mechanic is unlocked
    pub unlocked: bool,
    /// Divides the trigger delay (>= 1 at higher levels)
    pub frequency_scale: f32,
}

/// A fixed sequence of timed phases starting and ending at idle
pub trait PhaseSet: Copy + Eq + std::fmt::Debug {
    const IDLE: Self;
    /// First phase after a trigger
    const FIRST: Self;

    fn duration_ms(self) -> f64;
    fn next(self) -> Self;
    fn name(self) -> &'static str;
}

/// Random delay between triggers, scaled down by event frequency
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerSchedule {
    pub min_delay_ms: f64,
    pub max_delay_ms: f64,
    next_trigger_ms: Option<f64>,
}

impl TriggerSchedule {
    pub fn new(min_delay_ms: f64, max_delay_ms: f64) -> Self {
        Self {
            min_delay_ms,
            max_delay_ms,
            next_trigger_ms: None,
        }
    }

    pub fn next_trigger_ms(&self) -> Option<f64> {
        self.next_trigger_ms
    }

    /// Roll the next trigger time from `now`
    pub fn reroll(&mut self, now: f64, frequency_scale: f32, rng: &mut impl Rng) -> f64 {
        let delay = rng.random_range(self.min_delay_ms..=self.max_delay_ms);
        let next = now + delay / f64::from(frequency_scale.max(1.0));
        self.next_trigger_ms = Some(next);
        next
    }

    /// True when the trigger time has come; the first call only schedules
    pub fn is_due(&mut self, now: f64, frequency_scale: f32, rng: &mut impl Rng) -> bool {
        match self.next_trigger_ms {
            Some(next) => now >= next,
            None => {
                self.reroll(now, frequency_scale, rng);
                false
            }
        }
    }
}

/// Transition reported by [`PhaseMachine::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition<P> {
    pub from: P,
    pub to: P,
}

#[derive(Debug, Clone)]
pub struct PhaseMachine<P: PhaseSet> {
    phase: P,
    phase_start_ms: f64,
    schedule: TriggerSchedule,
}

impl<P: PhaseSet> PhaseMachine<P> {
    pub fn new(schedule: TriggerSchedule) -> Self {
        Self {
            phase: P::IDLE,
            phase_start_ms: 0.0,
            schedule,
        }
    }

    pub fn phase(&self) -> P {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == P::IDLE
    }

    pub fn schedule(&self) -> &TriggerSchedule {
        &self.schedule
    }

    /// Fraction of the current phase elapsed, in [0, 1]; 0 while idle
    pub fn progress(&self, now: f64) -> f32 {
        if self.is_idle() {
            return 0.0;
        }
        let duration = self.phase.duration_ms();
        if duration <= 0.0 {
            return 1.0;
        }
        ((now - self.phase_start_ms) / duration).clamp(0.0, 1.0) as f32
    }

    /// Enter the first phase immediately
    pub fn trigger(&mut self, now: f64) {
        self.phase = P::FIRST;
        self.phase_start_ms = now;
        log::info!("Event started: {}", self.phase.name());
    }

    /// Advance by the clock; returns the transition taken, if any
    ///
    /// While idle this checks the schedule and gating: a due trigger that
    /// fails gating is skipped and rerolled.
    pub fn update(
        &mut self,
        now: f64,
        ctx: &EventContext,
        min_population: usize,
        rng: &mut impl Rng,
    ) -> Option<Transition<P>> {
        if self.is_idle() {
            if !self.schedule.is_due(now, ctx.frequency_scale, rng) {
                return None;
            }
            if ctx.unlocked && ctx.population >= min_population {
                self.trigger(now);
                return Some(Transition {
                    from: P::IDLE,
                    to: P::FIRST,
                });
            }
            self.schedule.reroll(now, ctx.frequency_scale, rng);
            return None;
        }

        if self.progress(now) < 1.0 {
            return None;
        }
        let from = self.phase;
        let to = from.next();
        self.phase = to;
        self.phase_start_ms = now;
        if to == P::IDLE {
            self.schedule.reroll(now, ctx.frequency_scale, rng);
        }
        Some(Transition { from, to })
    }

    /// Return to idle at once and reroll the next trigger
    pub fn abort(&mut self, now: f64, frequency_scale: f32, rng: &mut impl Rng) {
        if !self.is_idle() {
            log::info!("Event aborted during {}", self.phase.name());
        }
        self.phase = P::IDLE;
        self.phase_start_ms = now;
        self.schedule.reroll(now, frequency_scale, rng);
    }
}

/// Presentation view of a running hazard
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HazardSnapshot {
    pub kind: EventKind,
    pub phase: &'static str,
    pub progress: f32,
    /// World x of the hazard, where it has one
    pub x: Option<f32>,
    pub z: Option<f32>,
}

/// Gravity drop window
#[derive(Debug, Clone)]
pub struct LowGravityEvent {
    schedule: TriggerSchedule,
}

/// Gravity factor while low gravity is active
pub const LOW_GRAVITY_SCALE: f32 = 0.4;
pub const LOW_GRAVITY_DURATION_MS: f64 = 8_000.0;

impl Default for LowGravityEvent {
    fn default() -> Self {
        Self {
            schedule: TriggerSchedule::new(60_000.0, 120_000.0),
        }
    }
}

impl LowGravityEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when a low gravity window should start now
    pub fn update(&mut self, now: f64, ctx: &EventContext, rng: &mut impl Rng) -> bool {
        if !self.schedule.is_due(now, ctx.frequency_scale, rng) {
            return false;
        }
        self.schedule.reroll(now, ctx.frequency_scale, rng);
        ctx.unlocked
    }

    pub fn abort(&mut self, now: f64, frequency_scale: f32, rng: &mut impl Rng) {
        self.schedule.reroll(now, frequency_scale, rng);
    }

    pub fn schedule(&self) -> &TriggerSchedule {
        &self.schedule
    }
}
