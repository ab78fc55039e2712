//! XP, levels and unlocks

use serde::Serialize;

use crate::event_bus::{EventSink, GameEvent};
use crate::tuning::{
    ItemKind, LEVEL_THRESHOLDS, MAX_LEVEL, Mechanic, SceneId, Unlock, level_coin_reward,
    unlocks_for_level,
};

/// Per-level tuning multipliers
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DifficultyScale {
    pub pusher_speed: f32,
    /// Relative event frequency; lower means shorter delays
    pub event_freq: f32,
    pub xp_mult: f32,
    pub coin_mult: f32,
}

/// Lowest `event_freq` any level reaches
pub const MIN_EVENT_FREQ: f32 = 0.1;

/// Pure function of level
pub fn difficulty_scale(level: u32) -> DifficultyScale {
    let steps = level.max(1).min(MAX_LEVEL) as f32 - 1.0;
    DifficultyScale {
        pusher_speed: (1.0 + 0.02 * steps).min(1.5),
        event_freq: (1.0 - 0.04 * steps).max(MIN_EVENT_FREQ),
        xp_mult: 1.0 + 0.05 * steps,
        coin_mult: 1.0 + 0.03 * steps,
    }
}

/// Highest level whose threshold is covered by `xp`
pub fn level_for_xp(xp: u64) -> u32 {
    LEVEL_THRESHOLDS.iter().rposition(|&t| xp >= t).unwrap_or(0) as u32 + 1
}

/// Carries the fractional part of scaled XP grants between awards
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct XpCarry {
    fraction: f64,
}

impl XpCarry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whole XP for one grant of `base * mult`; the remainder rolls over
    pub fn accrue(&mut self, base: u64, mult: f32) -> u64 {
        let total = base as f64 * f64::from(mult.max(0.0)) + self.fraction;
        // Multipliers arrive as f32, so 1.05 is really 1.0499999...
        let whole = (total + 1e-6).floor();
        self.fraction = (total - whole).max(0.0);
        whole as u64
    }

    pub fn fraction(&self) -> f64 {
        self.fraction
    }
}

/// Emitted once per `add_xp` that raised the level
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelUp {
    pub previous_level: u32,
    pub level: u32,
    /// Union of every crossed level's unlocks
    pub unlocked: Vec<Unlock>,
    pub coin_reward: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelProgression {
    xp: u64,
    level: u32,
}

impl Default for LevelProgression {
    fn default() -> Self {
        Self { xp: 0, level: 1 }
    }
}

impl LevelProgression {
    /// Resume from saved xp; the level is derived, never trusted
    pub fn new(xp: u64) -> Self {
        Self {
            xp,
            level: level_for_xp(xp),
        }
    }

    pub fn xp(&self) -> u64 {
        self.xp
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Xp still needed for the next level, `None` at the cap
    pub fn xp_to_next(&self) -> Option<u64> {
        LEVEL_THRESHOLDS
            .get(self.level as usize)
            .map(|next| next.saturating_sub(self.xp))
    }

    pub fn add_xp(&mut self, amount: u64, events: &mut impl EventSink) -> Option<LevelUp> {
        let previous_level = self.level;
        self.xp = self.xp.saturating_add(amount);
        self.level = level_for_xp(self.xp);

        let level_up = if self.level > previous_level {
            let crossed = previous_level + 1..=self.level;
            let mut unlocked = Vec::new();
            for unlock in crossed.clone().flat_map(unlocks_for_level) {
                if !unlocked.contains(unlock) {
                    unlocked.push(*unlock);
                }
            }
            let coin_reward = crossed.map(level_coin_reward).sum();
            log::info!("Level up: {} -> {}", previous_level, self.level);
            events.emit(GameEvent::LevelUp {
                level: self.level,
                previous_level,
                unlocked: unlocked.clone(),
                coin_reward,
            });
            Some(LevelUp {
                previous_level,
                level: self.level,
                unlocked,
                coin_reward,
            })
        } else {
            None
        };

        events.emit(GameEvent::XpGained {
            amount,
            total: self.xp,
            level: self.level,
        });
        level_up
    }

    pub fn difficulty(&self) -> DifficultyScale {
        difficulty_scale(self.level)
    }

    /// Divisor for event trigger delays, in [1, 10]
    pub fn event_frequency_scale(&self) -> f32 {
        1.0 / self.difficulty().event_freq
    }

    fn is_unlocked(&self, unlock: Unlock) -> bool {
        (1..=self.level).any(|l| unlocks_for_level(l).contains(&unlock))
    }

    pub fn is_mechanic_unlocked(&self, mechanic: Mechanic) -> bool {
        self.is_unlocked(Unlock::Mechanic(mechanic))
    }

    pub fn is_scene_unlocked(&self, scene: SceneId) -> bool {
        self.is_unlocked(Unlock::Scene(scene))
    }

    /// Items that may spawn from drops at this level
    pub fn unlocked_items(&self) -> Vec<ItemKind> {
        (1..=self.level)
            .flat_map(unlocks_for_level)
            .filter_map(|u| match u {
                Unlock::Item(kind) => Some(*kind),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::Topic;
    use proptest::prelude::*;

    #[test]
    fn test_xp_carry_keeps_fractions() {
        let mut carry = XpCarry::new();
        let mult = difficulty_scale(2).xp_mult;
        let total: u64 = (0..20).map(|_| carry.accrue(1, mult)).sum();
        assert_eq!(total, 21);

        let mut carry = XpCarry::new();
        let total: u64 = (0..10).map(|_| carry.accrue(1, 1.0)).sum();
        assert_eq!(total, 10);
        assert_eq!(carry.fraction(), 0.0);
    }

    #[test]
    fn test_level_for_xp() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(19), 1);
        assert_eq!(level_for_xp(20), 2);
        assert_eq!(level_for_xp(150), 5);
        assert_eq!(level_for_xp(u64::MAX), MAX_LEVEL);
    }

    #[test]
    fn test_jump_to_level_five() {
        let mut prog = LevelProgression::default();
        let mut events = Vec::new();
        let up = prog.add_xp(150, &mut events).unwrap();
        assert_eq!(prog.level(), 5);
        assert_eq!(up.previous_level, 1);
        assert_eq!(events.iter().filter(|e| e.topic() == Topic::LevelUp).count(), 1);
        assert_eq!(events.iter().filter(|e| e.topic() == Topic::XpGained).count(), 1);

        // Union of levels 2..=5, not just level 5
        for level in 2..=5 {
            for unlock in unlocks_for_level(level) {
                assert!(up.unlocked.contains(unlock), "missing {:?}", unlock);
            }
        }
        assert!(up.unlocked.contains(&Unlock::Item(ItemKind::Star)));
        assert_eq!(up.coin_reward, 10 * (2 + 3 + 4 + 5));
    }

    #[test]
    fn test_xp_gained_without_level_up() {
        let mut prog = LevelProgression::default();
        let mut events = Vec::new();
        assert!(prog.add_xp(5, &mut events).is_none());
        assert_eq!(
            events,
            vec![GameEvent::XpGained {
                amount: 5,
                total: 5,
                level: 1
            }]
        );
    }

    #[test]
    fn test_mechanic_gating() {
        let prog = LevelProgression::new(LEVEL_THRESHOLDS[3]);
        assert_eq!(prog.level(), 4);
        assert!(prog.is_mechanic_unlocked(Mechanic::Thief));
        assert!(!prog.is_mechanic_unlocked(Mechanic::Sweeper));
        assert!(prog.is_scene_unlocked(SceneId::Overworld));
        assert!(!prog.is_scene_unlocked(SceneId::Underground));
        assert_eq!(
            prog.unlocked_items(),
            vec![ItemKind::QuestionBlock, ItemKind::Star, ItemKind::Mushroom]
        );
    }

    #[test]
    fn test_event_frequency_scale_bounds() {
        assert_eq!(LevelProgression::default().event_frequency_scale(), 1.0);
        let top = LevelProgression::new(u64::MAX);
        assert!(top.event_frequency_scale() <= 10.0 + 1e-4);
    }

    proptest! {
        #[test]
        fn prop_difficulty_monotonic(level in 1u32..MAX_LEVEL) {
            let a = difficulty_scale(level);
            let b = difficulty_scale(level + 1);
            prop_assert!(b.pusher_speed >= a.pusher_speed);
            prop_assert!(b.xp_mult >= a.xp_mult);
            prop_assert!(b.coin_mult >= a.coin_mult);
            prop_assert!(b.event_freq <= a.event_freq);
            prop_assert!(b.event_freq >= MIN_EVENT_FREQ);
        }

        #[test]
        fn prop_level_matches_thresholds(xp in 0u64..10_000) {
            let level = level_for_xp(xp);
            prop_assert!(LEVEL_THRESHOLDS[level as usize - 1] <= xp);
            if let Some(next) = LEVEL_THRESHOLDS.get(level as usize) {
                prop_assert!(xp < *next);
            }
        }
    }
}
