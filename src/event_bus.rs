//! Synchronous publish/subscribe between the simulation and presentation
//!
//! Subsystems emit through the [`EventSink`] trait so they can be driven in
//! isolation with a plain `Vec<GameEvent>`; the engine hands them the real
//! [`EventBus`]. Every listener call is isolated: a panicking listener is
//! logged and skipped, the rest still run and the tick carries on.

use std::panic::{AssertUnwindSafe, catch_unwind};

use glam::Vec3;
use serde::Serialize;

use crate::tuning::{CoinSize, ItemKind, Unlock, WheelReward};

/// Event topics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    CoinCollected,
    ItemCollected,
    ItemSpawned,
    FrenzyStart,
    FrenzyEnd,
    BossStart,
    BossDamaged,
    BossDefeated,
    BossAttack,
    BossRushWave,
    BossRushComplete,
    LevelUp,
    XpGained,
    AchievementUnlock,
    ThiefSteal,
    WheelSpin,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::CoinCollected => "coin:collected",
            Topic::ItemCollected => "item:collected",
            Topic::ItemSpawned => "item:spawned",
            Topic::FrenzyStart => "frenzy:start",
            Topic::FrenzyEnd => "frenzy:end",
            Topic::BossStart => "boss:start",
            Topic::BossDamaged => "boss:damaged",
            Topic::BossDefeated => "boss:defeated",
            Topic::BossAttack => "boss:attack",
            Topic::BossRushWave => "boss:rush_wave",
            Topic::BossRushComplete => "boss:rush_complete",
            Topic::LevelUp => "level:up",
            Topic::XpGained => "xp:gained",
            Topic::AchievementUnlock => "achievement:unlock",
            Topic::ThiefSteal => "thief:steal",
            Topic::WheelSpin => "wheel:spin",
        }
    }
}

/// Event payloads
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "topic", rename_all = "snake_case")]
pub enum GameEvent {
    CoinCollected {
        coin_id: u32,
        size: CoinSize,
        score: u64,
        chain: u32,
        multiplier: f32,
        tier: Option<&'static str>,
        new_tier: bool,
        position: Vec3,
    },
    ItemCollected {
        item_id: u32,
        kind: ItemKind,
        score: u64,
        position: Vec3,
    },
    ItemSpawned {
        item_id: u32,
        kind: ItemKind,
        position: Vec3,
    },
    FrenzyStart {
        duration_ms: f64,
    },
    FrenzyEnd,
    BossStart {
        max_hp: u32,
        /// 1-based Boss Rush wave, `None` for a single encounter
        wave: Option<u32>,
    },
    BossDamaged {
        damage: u32,
        hp_remaining: u32,
        max_hp: u32,
    },
    BossDefeated {
        reward: u32,
        wave: Option<u32>,
    },
    BossAttack {
        hp_remaining: u32,
    },
    BossRushWave {
        wave: u32,
        total_waves: u32,
    },
    BossRushComplete {
        total_reward: u32,
    },
    LevelUp {
        level: u32,
        previous_level: u32,
        /// Union of the unlocks of every crossed level
        unlocked: Vec<Unlock>,
        coin_reward: u32,
    },
    XpGained {
        amount: u64,
        total: u64,
        level: u32,
    },
    AchievementUnlock {
        id: &'static str,
        name: &'static str,
    },
    ThiefSteal {
        count: usize,
    },
    WheelSpin {
        prize_id: &'static str,
        reward: WheelReward,
    },
}

impl GameEvent {
    pub fn topic(&self) -> Topic {
        match self {
            GameEvent::CoinCollected { .. } => Topic::CoinCollected,
            GameEvent::ItemCollected { .. } => Topic::ItemCollected,
            GameEvent::ItemSpawned { .. } => Topic::ItemSpawned,
            GameEvent::FrenzyStart { .. } => Topic::FrenzyStart,
            GameEvent::FrenzyEnd => Topic::FrenzyEnd,
            GameEvent::BossStart { .. } => Topic::BossStart,
            GameEvent::BossDamaged { .. } => Topic::BossDamaged,
            GameEvent::BossDefeated { .. } => Topic::BossDefeated,
            GameEvent::BossAttack { .. } => Topic::BossAttack,
            GameEvent::BossRushWave { .. } => Topic::BossRushWave,
            GameEvent::BossRushComplete { .. } => Topic::BossRushComplete,
            GameEvent::LevelUp { .. } => Topic::LevelUp,
            GameEvent::XpGained { .. } => Topic::XpGained,
            GameEvent::AchievementUnlock { .. } => Topic::AchievementUnlock,
            GameEvent::ThiefSteal { .. } => Topic::ThiefSteal,
            GameEvent::WheelSpin { .. } => Topic::WheelSpin,
        }
    }
}

/// Anything that accepts emitted events
pub trait EventSink {
    fn emit(&mut self, event: GameEvent);
}

impl EventSink for Vec<GameEvent> {
    fn emit(&mut self, event: GameEvent) {
        self.push(event);
    }
}

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&GameEvent)>;

struct Subscription {
    id: SubscriptionId,
    /// `None` = every topic
    topic: Option<Topic>,
    listener: Listener,
}

/// Topic-filtered listener registry
#[derive(Default)]
pub struct EventBus {
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen to one topic
    pub fn subscribe(
        &mut self,
        topic: Topic,
        listener: impl FnMut(&GameEvent) + 'static,
    ) -> SubscriptionId {
        self.add(Some(topic), Box::new(listener))
    }

    /// Listen to every topic
    pub fn subscribe_all(&mut self, listener: impl FnMut(&GameEvent) + 'static) -> SubscriptionId {
        self.add(None, Box::new(listener))
    }

    fn add(&mut self, topic: Option<Topic>, listener: Listener) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscriptions.push(Subscription { id, topic, listener });
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Deliver `event` to matching listeners in subscription order
    ///
    /// Returns the number of listeners that panicked.
    pub fn publish(&mut self, event: &GameEvent) -> usize {
        let topic = event.topic();
        let mut faults = 0;
        for sub in self
            .subscriptions
            .iter_mut()
            .filter(|s| s.topic.is_none_or(|t| t == topic))
        {
            let listener = &mut sub.listener;
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                faults += 1;
                log::error!("Listener {:?} panicked handling '{}'", sub.id, topic.as_str());
            }
        }
        faults
    }
}

impl EventSink for EventBus {
    fn emit(&mut self, event: GameEvent) {
        self.publish(&event);
    }
}
