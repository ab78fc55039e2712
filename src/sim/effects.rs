//! Timed effects
//!
//! [`EffectManager`] is a generic ledger of timed effects keyed by type: one
//! live instance per key, a same-key add reverts the old one first. What an
//! effect actually does lives in a single dispatch, [`apply_effect`] and
//! [`revert_effect`], over plain data ([`EffectKind`]).

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use super::physics::PhysicsWorld;
use super::pusher::PusherController;

/// An effect value that knows which slot it occupies
pub trait Keyed {
    type Key: Copy + Eq + Debug;
    fn key(&self) -> Self::Key;
}

/// Receives apply/revert calls from the manager
pub trait EffectTarget<E> {
    fn apply(&mut self, effect: &E);
    fn revert(&mut self, effect: &E);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedEffect<E> {
    pub effect: E,
    pub duration_ms: f64,
    pub start_ms: f64,
}

impl<E> TimedEffect<E> {
    pub fn elapsed(&self, now: f64) -> f64 {
        now - self.start_ms
    }

    pub fn remaining(&self, now: f64) -> f64 {
        (self.duration_ms - self.elapsed(now)).max(0.0)
    }

    pub fn is_expired(&self, now: f64) -> bool {
        self.elapsed(now) >= self.duration_ms
    }
}

/// Reporting view of a live effect
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveEffect<E> {
    pub effect: E,
    pub remaining_ms: f64,
}

#[derive(Debug, Clone)]
pub struct EffectManager<E> {
    effects: Vec<TimedEffect<E>>,
}

impl<E> Default for EffectManager<E> {
    fn default() -> Self {
        Self {
            effects: Vec::new(),
        }
    }
}

impl<E: Keyed + Clone> EffectManager<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any same-key effect, then apply `effect` now
    pub fn add(
        &mut self,
        effect: E,
        duration_ms: f64,
        now: f64,
        target: &mut impl EffectTarget<E>,
    ) {
        let key = effect.key();
        if let Some(index) = self.effects.iter().position(|e| e.effect.key() == key) {
            let old = self.effects.remove(index);
            target.revert(&old.effect);
        }
        target.apply(&effect);
        self.effects.push(TimedEffect {
            effect,
            duration_ms,
            start_ms: now,
        });
    }

    /// Revert and drop every effect whose duration has elapsed
    pub fn update(&mut self, now: f64, target: &mut impl EffectTarget<E>) -> Vec<E> {
        let mut expired = Vec::new();
        self.effects.retain(|e| {
            if e.is_expired(now) {
                expired.push(e.effect.clone());
                false
            } else {
                true
            }
        });
        for effect in &expired {
            target.revert(effect);
        }
        expired
    }

    /// Revert every effect regardless of time
    pub fn clear(&mut self, target: &mut impl EffectTarget<E>) {
        for e in self.effects.drain(..) {
            target.revert(&e.effect);
        }
    }

    /// Force-remove one effect by key; false if it was not active
    pub fn remove(&mut self, key: E::Key, target: &mut impl EffectTarget<E>) -> bool {
        let Some(index) = self.effects.iter().position(|e| e.effect.key() == key) else {
            return false;
        };
        let old = self.effects.remove(index);
        target.revert(&old.effect);
        true
    }

    pub fn is_active(&self, key: E::Key) -> bool {
        self.effects.iter().any(|e| e.effect.key() == key)
    }

    pub fn active_effects(&self, now: f64) -> Vec<ActiveEffect<E>> {
        self.effects
            .iter()
            .map(|e| ActiveEffect {
                effect: e.effect.clone(),
                remaining_ms: e.remaining(now),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Game effects
// ---------------------------------------------------------------------------

/// Effect slots; one live effect per slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectType {
    ScoreMultiplier,
    PusherWidth,
    FrenzySpeed,
    LowGravity,
    Magnet,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectKind {
    ScoreMultiplier { factor: f32 },
    /// Wider and narrower pushers share this slot
    PusherWidth { scale: f32 },
    FrenzySpeed { factor: f32 },
    LowGravity { scale: f32 },
    Magnet,
}

impl Keyed for EffectKind {
    type Key = EffectType;

    fn key(&self) -> EffectType {
        match self {
            EffectKind::ScoreMultiplier { .. } => EffectType::ScoreMultiplier,
            EffectKind::PusherWidth { .. } => EffectType::PusherWidth,
            EffectKind::FrenzySpeed { .. } => EffectType::FrenzySpeed,
            EffectKind::LowGravity { .. } => EffectType::LowGravity,
            EffectKind::Magnet => EffectType::Magnet,
        }
    }
}

/// Engine-wide modifiers driven by effects
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Modifiers {
    pub score_multiplier: f32,
    pub pusher_width: f32,
    pub pusher_speed: f32,
    pub gravity_scale: f32,
    pub magnet_active: bool,
}

impl Default for Modifiers {
    fn default() -> Self {
        Self {
            score_multiplier: 1.0,
            pusher_width: 1.0,
            pusher_speed: 1.0,
            gravity_scale: 1.0,
            magnet_active: false,
        }
    }
}

/// What effects may touch when applied or reverted
pub struct EffectContext<'a> {
    pub modifiers: &'a mut Modifiers,
    pub physics: &'a mut PhysicsWorld,
    pub pushers: &'a mut PusherController,
}

pub fn apply_effect(kind: &EffectKind, ctx: &mut EffectContext<'_>) {
    match *kind {
        EffectKind::ScoreMultiplier { factor } => ctx.modifiers.score_multiplier = factor,
        EffectKind::PusherWidth { scale } => {
            ctx.modifiers.pusher_width = scale;
            ctx.pushers.set_width_scale(scale, ctx.physics);
        }
        EffectKind::FrenzySpeed { factor } => ctx.modifiers.pusher_speed = factor,
        EffectKind::LowGravity { scale } => {
            ctx.modifiers.gravity_scale = scale;
            ctx.physics.set_gravity_scale(scale);
            ctx.physics.wake_all();
        }
        EffectKind::Magnet => ctx.modifiers.magnet_active = true,
    }
    log::debug!("Effect applied: {:?}", kind);
}

pub fn revert_effect(kind: &EffectKind, ctx: &mut EffectContext<'_>) {
    let base = Modifiers::default();
    match kind {
        EffectKind::ScoreMultiplier { .. } => ctx.modifiers.score_multiplier = base.score_multiplier,
        EffectKind::PusherWidth { .. } => {
            ctx.modifiers.pusher_width = base.pusher_width;
            ctx.pushers.set_width_scale(base.pusher_width, ctx.physics);
        }
        EffectKind::FrenzySpeed { .. } => ctx.modifiers.pusher_speed = base.pusher_speed,
        EffectKind::LowGravity { .. } => {
            ctx.modifiers.gravity_scale = base.gravity_scale;
            ctx.physics.set_gravity_scale(base.gravity_scale);
        }
        EffectKind::Magnet => ctx.modifiers.magnet_active = false,
    }
    log::debug!("Effect reverted: {:?}", kind);
}

impl EffectTarget<EffectKind> for EffectContext<'_> {
    fn apply(&mut self, effect: &EffectKind) {
        apply_effect(effect, self);
    }

    fn revert(&mut self, effect: &EffectKind) {
        revert_effect(effect, self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every callback
    #[derive(Default)]
    struct Log(Vec<String>);

    impl EffectTarget<EffectKind> for Log {
        fn apply(&mut self, effect: &EffectKind) {
            self.0.push(format!("apply {:?}", effect.key()));
        }

        fn revert(&mut self, effect: &EffectKind) {
            self.0.push(format!("revert {:?}", effect.key()));
        }
    }

    #[test]
    fn test_same_key_replaces() {
        let mut mgr = EffectManager::new();
        let mut log = Log::default();
        mgr.add(EffectKind::PusherWidth { scale: 1.4 }, 1000.0, 0.0, &mut log);
        mgr.add(EffectKind::PusherWidth { scale: 0.7 }, 1000.0, 10.0, &mut log);
        assert_eq!(
            log.0,
            vec!["apply PusherWidth", "revert PusherWidth", "apply PusherWidth"]
        );
        assert_eq!(mgr.len(), 1);
        let active = mgr.active_effects(10.0);
        assert_eq!(active[0].effect, EffectKind::PusherWidth { scale: 0.7 });
    }

    #[test]
    fn test_different_keys_coexist() {
        let mut mgr = EffectManager::new();
        let mut log = Log::default();
        mgr.add(EffectKind::Magnet, 1000.0, 0.0, &mut log);
        mgr.add(EffectKind::ScoreMultiplier { factor: 2.0 }, 1000.0, 0.0, &mut log);
        assert_eq!(mgr.len(), 2);
        assert!(log.0.iter().all(|l| l.starts_with("apply")));
    }

    #[test]
    fn test_update_expires_at_duration() {
        let mut mgr = EffectManager::new();
        let mut log = Log::default();
        mgr.add(EffectKind::Magnet, 500.0, 100.0, &mut log);
        assert!(mgr.update(599.0, &mut log).is_empty());
        assert_eq!(mgr.update(600.0, &mut log), vec![EffectKind::Magnet]);
        assert!(mgr.is_empty());
        assert!(mgr.active_effects(600.0).is_empty());
        assert_eq!(log.0.last().map(String::as_str), Some("revert Magnet"));
    }

    #[test]
    fn test_remaining_is_clamped() {
        let mut mgr = EffectManager::new();
        let mut log = Log::default();
        mgr.add(EffectKind::Magnet, 500.0, 0.0, &mut log);
        assert_eq!(mgr.active_effects(200.0)[0].remaining_ms, 300.0);
        // Queried late, before update has run
        assert_eq!(mgr.active_effects(10_000.0)[0].remaining_ms, 0.0);
    }

    #[test]
    fn test_clear_reverts_all() {
        let mut mgr = EffectManager::new();
        let mut log = Log::default();
        mgr.add(EffectKind::Magnet, 500.0, 0.0, &mut log);
        mgr.add(EffectKind::LowGravity { scale: 0.4 }, 500.0, 0.0, &mut log);
        log.0.clear();
        mgr.clear(&mut log);
        assert_eq!(log.0.len(), 2);
        assert!(mgr.is_empty());
    }

    #[test]
    fn test_dispatch_modifies_world() {
        let mut physics = PhysicsWorld::new();
        let mut pushers = PusherController::new(&mut physics);
        let mut modifiers = Modifiers::default();
        let mut mgr = EffectManager::new();
        {
            let mut ctx = EffectContext {
                modifiers: &mut modifiers,
                physics: &mut physics,
                pushers: &mut pushers,
            };
            mgr.add(EffectKind::LowGravity { scale: 0.4 }, 8000.0, 0.0, &mut ctx);
            mgr.add(EffectKind::ScoreMultiplier { factor: 2.0 }, 1000.0, 0.0, &mut ctx);
        }
        assert_eq!(modifiers.score_multiplier, 2.0);
        assert!((physics.gravity().y + crate::consts::GRAVITY * 0.4).abs() < 1e-5);

        let mut ctx = EffectContext {
            modifiers: &mut modifiers,
            physics: &mut physics,
            pushers: &mut pushers,
        };
        mgr.update(8000.0, &mut ctx);
        assert_eq!(modifiers, Modifiers::default());
        assert!((physics.gravity().y + crate::consts::GRAVITY).abs() < 1e-5);
    }

    #[test]
    fn test_effect_kind_serializes_tagged() {
        let json = serde_json::to_string(&EffectKind::LowGravity { scale: 0.5 }).unwrap();
        assert_eq!(json, r#"{"type":"low_gravity","scale":0.5}"#);
    }
}
