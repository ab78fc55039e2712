//! Achievement catalog and evaluation
//!
//! Evaluation is stateless: every call compares the current stats against
//! the catalog, and the unlocked set lives in the save.

use serde::Serialize;

use crate::event_bus::{EventSink, GameEvent};
use crate::persistence::{SaveData, SaveStore};

/// Cumulative stats the predicates look at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Stats {
    pub coins_collected: u64,
    pub max_chain: u32,
    pub level: u32,
    pub boss_defeated: bool,
    pub unique_items: usize,
    pub frenzy_triggered: bool,
    pub session_score: u64,
}

impl Stats {
    pub fn from_save(save: &SaveData, session_score: u64) -> Self {
        Self {
            coins_collected: save.total_coins_collected,
            max_chain: save.max_chain,
            level: save.level,
            boss_defeated: save.boss_defeated,
            unique_items: save.unique_items_collected.len(),
            frenzy_triggered: save.frenzy_triggered,
            session_score,
        }
    }
}

pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub condition: fn(&Stats) -> bool,
}

pub const ACHIEVEMENTS: [Achievement; 11] = [
    Achievement {
        id: "first_coin",
        name: "First Coin",
        description: "Collect your first coin",
        condition: |s| s.coins_collected >= 1,
    },
    Achievement {
        id: "coins_100",
        name: "Pocket Change",
        description: "Collect 100 coins",
        condition: |s| s.coins_collected >= 100,
    },
    Achievement {
        id: "coins_1000",
        name: "Coin Hoarder",
        description: "Collect 1,000 coins",
        condition: |s| s.coins_collected >= 1000,
    },
    Achievement {
        id: "chain_10",
        name: "Amazing!",
        description: "Reach a 10 coin chain",
        condition: |s| s.max_chain >= 10,
    },
    Achievement {
        id: "chain_20",
        name: "Incredible!",
        description: "Reach a 20 coin chain",
        condition: |s| s.max_chain >= 20,
    },
    Achievement {
        id: "level_10",
        name: "Regular",
        description: "Reach level 10",
        condition: |s| s.level >= 10,
    },
    Achievement {
        id: "level_20",
        name: "Veteran",
        description: "Reach level 20",
        condition: |s| s.level >= 20,
    },
    Achievement {
        id: "boss_slayer",
        name: "Boss Slayer",
        description: "Defeat the boss",
        condition: |s| s.boss_defeated,
    },
    Achievement {
        id: "collector",
        name: "Collector",
        description: "Collect 5 different items",
        condition: |s| s.unique_items >= 5,
    },
    Achievement {
        id: "frenzy",
        name: "Frenzy!",
        description: "Trigger a coin frenzy",
        condition: |s| s.frenzy_triggered,
    },
    Achievement {
        id: "high_roller",
        name: "High Roller",
        description: "Score 10,000 in one session",
        condition: |s| s.session_score >= 10_000,
    },
];

/// Unlock every newly satisfied achievement; returns their ids
pub fn check(
    stats: &Stats,
    store: &mut SaveStore,
    now: f64,
    events: &mut impl EventSink,
) -> Vec<&'static str> {
    let mut unlocked = Vec::new();
    for a in &ACHIEVEMENTS {
        if store.is_achievement_unlocked(a.id) || !(a.condition)(stats) {
            continue;
        }
        if store.unlock_achievement(a.id, now) {
            log::info!("Achievement unlocked: {}", a.name);
            events.emit(GameEvent::AchievementUnlock {
                id: a.id,
                name: a.name,
            });
            unlocked.push(a.id);
        }
    }
    unlocked
}

/// Catalog entry with its unlock status
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AchievementStatus {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub unlocked_at: Option<f64>,
}

pub fn all(save: &SaveData) -> Vec<AchievementStatus> {
    ACHIEVEMENTS
        .iter()
        .map(|a| AchievementStatus {
            id: a.id,
            name: a.name,
            description: a.description,
            unlocked_at: save.achievements.get(a.id).copied(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_unique() {
        for (i, a) in ACHIEVEMENTS.iter().enumerate() {
            assert!(ACHIEVEMENTS[i + 1..].iter().all(|b| b.id != a.id));
        }
    }

    #[test]
    fn test_never_refires() {
        let mut store = SaveStore::in_memory();
        let mut events = Vec::new();
        let stats = Stats {
            coins_collected: 150,
            max_chain: 10,
            ..Default::default()
        };
        let first = check(&stats, &mut store, 1.0, &mut events);
        assert_eq!(first, vec!["first_coin", "coins_100", "chain_10"]);
        assert_eq!(events.len(), 3);

        let again = check(&stats, &mut store, 2.0, &mut events);
        assert!(again.is_empty());
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn test_all_reports_status() {
        let mut store = SaveStore::in_memory();
        let stats = Stats {
            boss_defeated: true,
            ..Default::default()
        };
        check(&stats, &mut store, 42.0, &mut Vec::new());
        let statuses = all(store.data());
        assert_eq!(statuses.len(), ACHIEVEMENTS.len());
        let boss = statuses.iter().find(|s| s.id == "boss_slayer").unwrap();
        assert_eq!(boss.unlocked_at, Some(42.0));
        assert!(statuses.iter().filter(|s| s.unlocked_at.is_some()).count() == 1);
    }

    #[test]
    fn test_stats_from_save() {
        let mut save = SaveData::default();
        save.total_coins_collected = 7;
        save.max_chain = 3;
        let stats = Stats::from_save(&save, 99);
        assert_eq!(stats.coins_collected, 7);
        assert_eq!(stats.session_score, 99);
        assert_eq!(stats.level, 1);
    }
}
