use rand::Rng;
use rand::seq::index::sample;

use super::{EventContext, PhaseMachine, PhaseSet, Transition, TriggerSchedule};

/// Fewest coins on the table before the thief shows up
pub const THIEF_MIN_POPULATION: usize = 20;
pub const THIEF_STEAL_MIN: usize = 5;
pub const THIEF_STEAL_MAX: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThiefPhase {
    Idle,
    FlyingIn,
    Fishing,
    FlyingOut,
}

impl PhaseSet for ThiefPhase {
    const IDLE: Self = ThiefPhase::Idle;
    const FIRST: Self = ThiefPhase::FlyingIn;

    fn duration_ms(self) -> f64 {
        match self {
            ThiefPhase::Idle => 0.0,
            ThiefPhase::FlyingIn => 2_000.0,
            ThiefPhase::Fishing => 3_000.0,
            ThiefPhase::FlyingOut => 2_000.0,
        }
    }

    fn next(self) -> Self {
        match self {
            ThiefPhase::Idle => ThiefPhase::FlyingIn,
            ThiefPhase::FlyingIn => ThiefPhase::Fishing,
            ThiefPhase::Fishing => ThiefPhase::FlyingOut,
            ThiefPhase::FlyingOut => ThiefPhase::Idle,
        }
    }

    fn name(self) -> &'static str {
        match self {
            ThiefPhase::Idle => "idle",
            ThiefPhase::FlyingIn => "flying_in",
            ThiefPhase::Fishing => "fishing",
            ThiefPhase::FlyingOut => "flying_out",
        }
    }
}

/// Flies in, fishes coins off the table and leaves with them
#[derive(Debug, Clone)]
pub struct Thief {
    machine: PhaseMachine<ThiefPhase>,
}

impl Default for Thief {
    fn default() -> Self {
        Self {
            machine: PhaseMachine::new(TriggerSchedule::new(45_000.0, 90_000.0)),
        }
    }
}

impl Thief {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn machine(&self) -> &PhaseMachine<ThiefPhase> {
        &self.machine
    }

    /// Advance; returns how many coins to steal when the fishing line comes up
    pub fn update(&mut self, now: f64, ctx: &EventContext, rng: &mut impl Rng) -> Option<usize> {
        let transition = self.machine.update(now, ctx, THIEF_MIN_POPULATION, rng)?;
        match transition {
            Transition {
                from: ThiefPhase::Fishing,
                to: ThiefPhase::FlyingOut,
            } => {
                let count = rng
                    .random_range(THIEF_STEAL_MIN..=THIEF_STEAL_MAX)
                    .min(ctx.population);
                Some(count)
            }
            _ => None,
        }
    }

    pub fn trigger(&mut self, now: f64) {
        self.machine.trigger(now);
    }

    pub fn abort(&mut self, now: f64, frequency_scale: f32, rng: &mut impl Rng) {
        self.machine.abort(now, frequency_scale, rng);
    }
}

/// Pick `count` distinct ids uniformly at random
pub fn pick_victims(ids: &[u32], count: usize, rng: &mut impl Rng) -> Vec<u32> {
    let count = count.min(ids.len());
    sample(rng, ids.len(), count)
        .into_iter()
        .map(|i| ids[i])
        .collect()
}
