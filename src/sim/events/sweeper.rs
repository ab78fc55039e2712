use rand::Rng;

use super::{EventContext, PhaseMachine, PhaseSet, TriggerSchedule};
use crate::consts::TABLE_HALF_WIDTH;

pub const SWEEPER_MIN_POPULATION: usize = 15;
/// Lateral distance from the broom that still gets pushed
pub const SWEEP_REACH: f32 = 0.8;
/// Impulse per tick at full sweep progress
pub const SWEEP_STRENGTH: f32 = 0.06;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweeperPhase {
    Idle,
    FlyingIn,
    Sweeping,
    FlyingOut,
}

impl PhaseSet for SweeperPhase {
    const IDLE: Self = SweeperPhase::Idle;
    const FIRST: Self = SweeperPhase::FlyingIn;

    fn duration_ms(self) -> f64 {
        match self {
            SweeperPhase::Idle => 0.0,
            SweeperPhase::FlyingIn => 1_500.0,
            SweeperPhase::Sweeping => 3_000.0,
            SweeperPhase::FlyingOut => 1_500.0,
        }
    }

    fn next(self) -> Self {
        match self {
            SweeperPhase::Idle => SweeperPhase::FlyingIn,
            SweeperPhase::FlyingIn => SweeperPhase::Sweeping,
            SweeperPhase::Sweeping => SweeperPhase::FlyingOut,
            SweeperPhase::FlyingOut => SweeperPhase::Idle,
        }
    }

    fn name(self) -> &'static str {
        match self {
            SweeperPhase::Idle => "idle",
            SweeperPhase::FlyingIn => "flying_in",
            SweeperPhase::Sweeping => "sweeping",
            SweeperPhase::FlyingOut => "flying_out",
        }
    }
}

/// Lateral push for coins near the broom this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepImpulse {
    /// Broom x
    pub x: f32,
    pub reach: f32,
    /// Signed x impulse
    pub impulse: f32,
}

impl SweepImpulse {
    pub fn affects(&self, coin_x: f32) -> bool {
        (coin_x - self.x).abs() <= self.reach
    }
}

/// Drags a broom across the table, shoving coins sideways
#[derive(Debug, Clone)]
pub struct Sweeper {
    machine: PhaseMachine<SweeperPhase>,
    /// +1 sweeps left to right
    direction: f32,
}

impl Default for Sweeper {
    fn default() -> Self {
        Self {
            machine: PhaseMachine::new(TriggerSchedule::new(30_000.0, 60_000.0)),
            direction: 1.0,
        }
    }
}

impl Sweeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn machine(&self) -> &PhaseMachine<SweeperPhase> {
        &self.machine
    }

    /// Broom x for the current sweep progress
    pub fn x(&self, now: f64) -> f32 {
        match self.machine.phase() {
            SweeperPhase::Sweeping => {
                let t = self.machine.progress(now);
                self.direction * (-TABLE_HALF_WIDTH + 2.0 * TABLE_HALF_WIDTH * t)
            }
            SweeperPhase::FlyingOut => self.direction * TABLE_HALF_WIDTH,
            _ => -self.direction * TABLE_HALF_WIDTH,
        }
    }

    /// Advance; returns the push to apply while sweeping
    pub fn update(
        &mut self,
        now: f64,
        ctx: &EventContext,
        rng: &mut impl Rng,
    ) -> Option<SweepImpulse> {
        if let Some(t) = self.machine.update(now, ctx, SWEEPER_MIN_POPULATION, rng) {
            if t.to == SweeperPhase::FlyingIn {
                self.direction = if rng.random::<bool>() { 1.0 } else { -1.0 };
            }
        }
        if self.machine.phase() != SweeperPhase::Sweeping {
            return None;
        }
        let progress = self.machine.progress(now);
        Some(SweepImpulse {
            x: self.x(now),
            reach: SWEEP_REACH,
            impulse: self.direction * SWEEP_STRENGTH * progress,
        })
    }

    pub fn trigger(&mut self, now: f64) {
        self.machine.trigger(now);
    }

    pub fn abort(&mut self, now: f64, frequency_scale: f32, rng: &mut impl Rng) {
        self.machine.abort(now, frequency_scale, rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn ctx() -> EventContext {
        EventContext {
            population: 40,
            unlocked: true,
            frequency_scale: 1.0,
        }
    }

    #[test]
    fn test_pushes_only_while_sweeping() {
        let mut rng = Pcg32::seed_from_u64(2);
        let mut sweeper = Sweeper::new();
        sweeper.trigger(0.0);
        assert!(sweeper.update(1_000.0, &ctx(), &mut rng).is_none());
        // Enters sweeping at 1.5 s with zero progress
        let first = sweeper.update(1_500.0, &ctx(), &mut rng).unwrap();
        assert_eq!(first.impulse, 0.0);
        let mid = sweeper.update(3_000.0, &ctx(), &mut rng).unwrap();
        assert!((mid.impulse.abs() - SWEEP_STRENGTH * 0.5).abs() < 1e-6);
        assert!(mid.x.abs() < 1e-4);
        assert!(mid.affects(0.5));
        assert!(!mid.affects(1.0));
        // Sweeping ends at 4.5 s
        assert!(sweeper.update(4_500.0, &ctx(), &mut rng).is_none());
        assert_eq!(sweeper.machine().phase(), SweeperPhase::FlyingOut);
    }

    #[test]
    fn test_broom_crosses_table() {
        let mut rng = Pcg32::seed_from_u64(2);
        let mut sweeper = Sweeper::new();
        sweeper.trigger(0.0);
        sweeper.update(1_500.0, &ctx(), &mut rng);
        let start = sweeper.x(1_500.0);
        let end = sweeper.x(4_499.0);
        assert!((start + end).abs() < 0.01);
        assert!((start.abs() - TABLE_HALF_WIDTH).abs() < 1e-4);
    }
}
