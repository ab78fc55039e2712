//! Boss encounter and Boss Rush
//!
//! The boss loses hp whenever an object leaves the table past the pusher.
//! It attacks on a fixed interval while active. Defeat happens exactly once
//! per encounter; the caller persists it from the returned [`BossDefeat`].

use serde::Serialize;

use crate::event_bus::{EventSink, GameEvent};
use crate::tuning::{
    BOSS_ATTACK_INTERVAL_MS, BOSS_COOLDOWN_MS, BOSS_MAX_HP, BOSS_REWARD, BOSS_RUSH_BREAK_MS,
    BOSS_RUSH_WAVES, BossWave, ItemKind,
};

/// What left the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LostObject {
    Coin,
    Item(ItemKind),
}

/// Hp removed per lost object
pub fn damage_for(object: LostObject) -> u32 {
    match object {
        LostObject::Coin => 1,
        LostObject::Item(ItemKind::Mushroom) => 5,
        LostObject::Item(ItemKind::Star) => 10,
        LostObject::Item(ItemKind::FireFlower) => 20,
        LostObject::Item(_) => 1,
    }
}

/// Attack tick, consumed by presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BossAttack {
    pub hp_remaining: u32,
}

/// A finished encounter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BossDefeat {
    pub reward: u32,
    /// 1-based rush wave, `None` for a single encounter
    pub wave: Option<u32>,
    pub rush_complete: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct RushState {
    /// Index into `BOSS_RUSH_WAVES` of the current or next wave
    wave: usize,
    total_reward: u32,
    /// Set between waves
    next_wave_at: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BossEncounter {
    active: bool,
    hp: u32,
    max_hp: u32,
    attack_interval_ms: f64,
    reward: u32,
    last_attack_ms: f64,
    started_ms: f64,
    last_defeated_ms: Option<f64>,
    rush: Option<RushState>,
}

impl BossEncounter {
    /// `last_defeated_ms` comes from the save
    pub fn new(last_defeated_ms: Option<f64>) -> Self {
        Self {
            active: false,
            hp: 0,
            max_hp: BOSS_MAX_HP,
            attack_interval_ms: BOSS_ATTACK_INTERVAL_MS,
            reward: BOSS_REWARD,
            last_attack_ms: 0.0,
            started_ms: 0.0,
            last_defeated_ms,
            rush: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_rush(&self) -> bool {
        self.rush.is_some()
    }

    pub fn hp(&self) -> u32 {
        self.hp
    }

    pub fn max_hp(&self) -> u32 {
        self.max_hp
    }

    pub fn last_defeated_ms(&self) -> Option<f64> {
        self.last_defeated_ms
    }

    /// 1-based wave while a rush is running
    pub fn rush_wave(&self) -> Option<u32> {
        self.rush.as_ref().map(|r| r.wave as u32 + 1)
    }

    /// Idle, and never defeated or the cooldown has passed
    pub fn can_start(&self, now: f64) -> bool {
        if self.active || self.rush.is_some() {
            return false;
        }
        match self.last_defeated_ms {
            None => true,
            Some(t) => now - t >= BOSS_COOLDOWN_MS,
        }
    }

    /// Start a single encounter; a no-op returning false when it can't
    pub fn start(&mut self, now: f64, events: &mut impl EventSink) -> bool {
        if !self.can_start(now) {
            return false;
        }
        self.begin(
            BossWave {
                max_hp: BOSS_MAX_HP,
                attack_interval_ms: BOSS_ATTACK_INTERVAL_MS,
                reward: BOSS_REWARD,
            },
            now,
            None,
            events,
        );
        true
    }

    /// Start a Boss Rush; ignores the single-encounter cooldown
    pub fn start_rush(&mut self, now: f64, events: &mut impl EventSink) -> bool {
        if self.active || self.rush.is_some() {
            return false;
        }
        self.rush = Some(RushState {
            wave: 0,
            total_reward: 0,
            next_wave_at: None,
        });
        self.begin_rush_wave(now, events);
        true
    }

    fn begin_rush_wave(&mut self, now: f64, events: &mut impl EventSink) {
        let Some(rush) = self.rush.as_mut() else {
            return;
        };
        rush.next_wave_at = None;
        let index = rush.wave;
        let wave = BOSS_RUSH_WAVES[index];
        let number = index as u32 + 1;
        events.emit(GameEvent::BossRushWave {
            wave: number,
            total_waves: BOSS_RUSH_WAVES.len() as u32,
        });
        self.begin(wave, now, Some(number), events);
    }

    fn begin(&mut self, wave: BossWave, now: f64, number: Option<u32>, events: &mut impl EventSink) {
        self.active = true;
        self.max_hp = wave.max_hp;
        self.hp = wave.max_hp;
        self.attack_interval_ms = wave.attack_interval_ms;
        self.reward = wave.reward;
        self.started_ms = now;
        self.last_attack_ms = now;
        log::info!("Boss started (hp {}, wave {:?})", self.hp, number);
        events.emit(GameEvent::BossStart {
            max_hp: self.max_hp,
            wave: number,
        });
    }

    /// Apply damage for an object lost past the pusher
    pub fn on_object_lost_back(
        &mut self,
        object: LostObject,
        now: f64,
        events: &mut impl EventSink,
    ) -> Option<BossDefeat> {
        if !self.active {
            return None;
        }
        let damage = damage_for(object).min(self.hp);
        self.hp -= damage;
        events.emit(GameEvent::BossDamaged {
            damage,
            hp_remaining: self.hp,
            max_hp: self.max_hp,
        });
        if self.hp == 0 {
            return Some(self.defeat(now, events));
        }
        None
    }

    fn defeat(&mut self, now: f64, events: &mut impl EventSink) -> BossDefeat {
        self.active = false;
        let reward = self.reward;
        let wave = self.rush_wave();
        events.emit(GameEvent::BossDefeated { reward, wave });
        log::info!("Boss defeated after {:.1}s", (now - self.started_ms) / 1000.0);

        let mut rush_complete = false;
        match self.rush.as_mut() {
            None => self.last_defeated_ms = Some(now),
            Some(rush) => {
                rush.total_reward += reward;
                if rush.wave + 1 < BOSS_RUSH_WAVES.len() {
                    rush.wave += 1;
                    rush.next_wave_at = Some(now + BOSS_RUSH_BREAK_MS);
                } else {
                    let total_reward = rush.total_reward;
                    self.rush = None;
                    rush_complete = true;
                    events.emit(GameEvent::BossRushComplete { total_reward });
                }
            }
        }
        BossDefeat {
            reward,
            wave,
            rush_complete,
        }
    }

    /// Attack timer and rush wave breaks; call once per tick
    pub fn update(&mut self, now: f64, events: &mut impl EventSink) -> Option<BossAttack> {
        if let Some(at) = self.rush.as_ref().and_then(|r| r.next_wave_at) {
            if now >= at {
                self.begin_rush_wave(now, events);
            }
            return None;
        }
        if !self.active || now - self.last_attack_ms < self.attack_interval_ms {
            return None;
        }
        self.last_attack_ms = now;
        let attack = BossAttack {
            hp_remaining: self.hp,
        };
        events.emit(GameEvent::BossAttack {
            hp_remaining: self.hp,
        });
        Some(attack)
    }

    /// Drop the encounter (and any rush) without recording a defeat
    pub fn abort(&mut self) {
        if self.active || self.rush.is_some() {
            log::info!("Boss aborted");
        }
        self.active = false;
        self.hp = 0;
        self.rush = None;
    }
}
