use glam::Vec3;
use rand::Rng;

use super::{EventContext, PhaseMachine, PhaseSet, Transition, TriggerSchedule};

pub const SLAMMER_MIN_POPULATION: usize = 10;
pub const SLAM_RADIUS: f32 = 2.0;
/// Impulse at the center of the blast
pub const SLAM_STRENGTH: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlammerPhase {
    Idle,
    Warning,
    Slamming,
    Stunned,
    Rising,
}

impl PhaseSet for SlammerPhase {
    const IDLE: Self = SlammerPhase::Idle;
    const FIRST: Self = SlammerPhase::Warning;

    fn duration_ms(self) -> f64 {
        match self {
            SlammerPhase::Idle => 0.0,
            SlammerPhase::Warning => 1_500.0,
            SlammerPhase::Slamming => 400.0,
            SlammerPhase::Stunned => 2_000.0,
            SlammerPhase::Rising => 1_000.0,
        }
    }

    fn next(self) -> Self {
        match self {
            SlammerPhase::Idle => SlammerPhase::Warning,
            SlammerPhase::Warning => SlammerPhase::Slamming,
            SlammerPhase::Slamming => SlammerPhase::Stunned,
            SlammerPhase::Stunned => SlammerPhase::Rising,
            SlammerPhase::Rising => SlammerPhase::Idle,
        }
    }

    fn name(self) -> &'static str {
        match self {
            SlammerPhase::Idle => "idle",
            SlammerPhase::Warning => "warning",
            SlammerPhase::Slamming => "slamming",
            SlammerPhase::Stunned => "stunned",
            SlammerPhase::Rising => "rising",
        }
    }
}

/// Radial blast on the table surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slam {
    pub center: Vec3,
    pub radius: f32,
    pub strength: f32,
}

impl Slam {
    /// Outward impulse for a body at `pos`, `None` outside the blast
    pub fn impulse_at(&self, pos: Vec3) -> Option<Vec3> {
        let offset = Vec3::new(pos.x - self.center.x, 0.0, pos.z - self.center.z);
        let distance = offset.length();
        if distance >= self.radius {
            return None;
        }
        let falloff = 1.0 - distance / self.radius;
        let dir = offset.try_normalize().unwrap_or(Vec3::Z);
        Some((dir + Vec3::Y * 0.5) * self.strength * falloff)
    }
}

/// Telegraphs a spot, then slams it
#[derive(Debug, Clone)]
pub struct Slammer {
    machine: PhaseMachine<SlammerPhase>,
    target: Vec3,
}

impl Default for Slammer {
    fn default() -> Self {
        Self {
            machine: PhaseMachine::new(TriggerSchedule::new(40_000.0, 80_000.0)),
            target: Vec3::ZERO,
        }
    }
}

impl Slammer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn machine(&self) -> &PhaseMachine<SlammerPhase> {
        &self.machine
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    /// Advance; returns the blast once the slam lands
    pub fn update(&mut self, now: f64, ctx: &EventContext, rng: &mut impl Rng) -> Option<Slam> {
        match self.machine.update(now, ctx, SLAMMER_MIN_POPULATION, rng)? {
            Transition {
                to: SlammerPhase::Warning,
                ..
            } => {
                self.target = Vec3::new(rng.random_range(-2.0..=2.0), 0.0, rng.random_range(-1.0..=3.0));
                None
            }
            Transition {
                from: SlammerPhase::Slamming,
                ..
            } => Some(Slam {
                center: self.target,
                radius: SLAM_RADIUS,
                strength: SLAM_STRENGTH,
            }),
            _ => None,
        }
    }

    pub fn trigger(&mut self, now: f64, target: Vec3) {
        self.target = target;
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

    fn ctx(unlocked: bool) -> EventContext {
        EventContext {
            population: 30,
            unlocked,
            frequency_scale: 1.0,
        }
    }

    #[test]
    fn test_slam_lands_once() {
        let mut rng = Pcg32::seed_from_u64(5);
        let mut slammer = Slammer::new();
        slammer.trigger(0.0, Vec3::new(1.0, 0.0, 1.0));
        assert!(slammer.update(1_500.0, &ctx(true), &mut rng).is_none());
        assert_eq!(slammer.machine().phase(), SlammerPhase::Slamming);
        let slam = slammer.update(1_900.0, &ctx(true), &mut rng).unwrap();
        assert_eq!(slam.center, Vec3::new(1.0, 0.0, 1.0));
        assert!(slammer.update(1_950.0, &ctx(true), &mut rng).is_none());
        assert!(slammer.update(3_900.0, &ctx(true), &mut rng).is_none());
        assert!(slammer.update(4_900.0, &ctx(true), &mut rng).is_none());
        assert!(slammer.machine().is_idle());
    }

    #[test]
    fn test_locked_never_triggers() {
        let mut rng = Pcg32::seed_from_u64(5);
        let mut slammer = Slammer::new();
        for t in 0..100 {
            slammer.update(t as f64 * 10_000.0, &ctx(false), &mut rng);
            assert!(slammer.machine().is_idle());
        }
    }

    #[test]
    fn test_blast_falloff() {
        let slam = Slam {
            center: Vec3::ZERO,
            radius: 2.0,
            strength: 4.0,
        };
        let near = slam.impulse_at(Vec3::new(0.5, 0.1, 0.0)).unwrap();
        let far = slam.impulse_at(Vec3::new(1.5, 0.1, 0.0)).unwrap();
        assert!(near.x > far.x && far.x > 0.0);
        assert!(slam.impulse_at(Vec3::new(2.0, 0.0, 0.0)).is_none());
    }
}
