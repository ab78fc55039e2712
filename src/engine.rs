//! Game engine
//!
//! The composition root. [`GameEngine::new`] builds every subsystem from a
//! config, a clock and a storage backend; the host then calls
//! [`GameEngine::frame`] once per display frame. Each frame walks
//! [`TICK_PIPELINE`] in order and records the phases it ran.

use glam::{Quat, Vec3};
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::consts::*;
use crate::event_bus::{EventBus, EventSink, GameEvent};
use crate::persistence::{SaveStore, StorageBackend};
use crate::platform::input::{LinearProjector, ScreenProjector};
use crate::platform::time::{Clock, epoch_day};
use crate::progression::achievements::{self, Stats};
use crate::progression::{LevelProgression, XpCarry, wheel};
use crate::settings::QualityPreset;
use crate::sim::boss::{BossDefeat, BossEncounter, LostObject};
use crate::sim::boundary::{Boundaries, CoinFate, ItemFate};
use crate::sim::combo::ComboTracker;
use crate::sim::effects::{ActiveEffect, EffectContext, EffectKind, EffectManager, EffectType, Modifiers};
use crate::sim::entities::{CoinRegistry, ItemRegistry};
use crate::sim::events::{
    EventContext, EventKind, FRENZY_DURATION_MS, FRENZY_SPEED_FACTOR, FrenzyWindow,
    HazardSnapshot, LOW_GRAVITY_DURATION_MS, LOW_GRAVITY_SCALE, LowGravityEvent, PhaseSet, Slam,
    Slammer, SweepImpulse, Sweeper, Thief, pick_victims,
};
use crate::sim::physics::PhysicsWorld;
use crate::sim::pusher::{PusherController, PusherSnapshot};
use crate::sim::tick::{TICK_PIPELINE, TickPhase, clamp_frame_delta};
use crate::tuning::{
    BOB_OMB_BLAST, BOB_OMB_FUSE_MS, CoinSize, FRENZY_TIER_INDEX, GIANT_BOB_OMB_BLAST, ItemEffect,
    ItemKind, Mechanic, RANDOM_REWARDS, SceneId, Unlock, WHEEL_PRIZES, WheelReward,
};

/// Coins in front of this z get shoved off by a fire flower
const CLEAR_ROW_Z: f32 = 2.0;

/// Continuous pushes are tuned per physics step; scale them to the frame
fn frame_impulse_scale(dt: f32) -> f32 {
    dt / SIM_DT
}

/// Receives a snapshot at the end of every tick
pub trait Presenter {
    fn present(&mut self, snapshot: &RenderSnapshot);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoinView {
    pub id: u32,
    pub size: CoinSize,
    pub position: Vec3,
    pub rotation: Quat,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ItemView {
    pub id: u32,
    pub kind: ItemKind,
    pub position: Vec3,
    pub rotation: Quat,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BossView {
    pub hp: u32,
    pub max_hp: u32,
    pub wave: Option<u32>,
}

/// Read-only view handed to presentation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSnapshot {
    pub pushers: Vec<PusherSnapshot>,
    pub coins: Vec<CoinView>,
    pub items: Vec<ItemView>,
    pub drop_x: f32,
    pub magnet_active: bool,
    pub delta_ms: f64,
    pub hazards: Vec<HazardSnapshot>,
    pub boss: Option<BossView>,
    pub chain: u32,
    pub score: u64,
    pub level: u32,
    pub wallet: u64,
}

#[derive(Debug, Clone, Copy)]
struct AutoDrop {
    interval_ms: f64,
    next_at: f64,
}

/// Armed bob-omb sitting on the table
#[derive(Debug, Clone, Copy)]
struct Fuse {
    item_id: u32,
    detonate_at: f64,
    /// (radius, strength)
    blast: (f32, f32),
}

pub struct GameEngine {
    config: EngineConfig,
    clock: Box<dyn Clock>,
    rng: Pcg32,

    physics: PhysicsWorld,
    pushers: PusherController,
    coins: CoinRegistry,
    items: ItemRegistry,
    boundaries: Boundaries,

    combo: ComboTracker,
    effects: EffectManager<EffectKind>,
    modifiers: Modifiers,

    thief: Thief,
    sweeper: Sweeper,
    slammer: Slammer,
    low_gravity: LowGravityEvent,
    frenzy: FrenzyWindow,
    boss: BossEncounter,
    fuses: Vec<Fuse>,

    progression: LevelProgression,
    save: SaveStore,
    bus: EventBus,
    projector: Box<dyn ScreenProjector>,
    presenter: Option<Box<dyn Presenter>>,

    running: bool,
    last_frame_ms: Option<f64>,
    last_delta_ms: f64,
    last_drop_ms: Option<f64>,
    drop_x: f32,
    coin_size: CoinSize,
    auto_drop: Option<AutoDrop>,
    session_score: u64,
    xp_carry: XpCarry,
    trace: Vec<TickPhase>,
}

impl GameEngine {
    pub fn new(
        config: EngineConfig,
        clock: Box<dyn Clock>,
        storage: Box<dyn StorageBackend>,
    ) -> Self {
        let mut save = SaveStore::load(storage);
        let progression = LevelProgression::new(save.data().xp);
        save.set_progress(progression.xp(), progression.level());

        let quality = config
            .quality_override
            .unwrap_or(save.data().settings.quality);

        let mut physics = PhysicsWorld::with_table();
        let mut pushers = PusherController::new(&mut physics);
        if progression.is_mechanic_unlocked(Mechanic::SecondPusher) {
            pushers.enable_second(&mut physics);
        }
        let boss = BossEncounter::new(save.data().boss_last_defeated);

        log::info!(
            "Engine ready: level {}, wallet {}, quality {}",
            progression.level(),
            save.wallet(),
            quality.as_str()
        );

        Self {
            rng: Pcg32::seed_from_u64(config.seed),
            clock,
            physics,
            pushers,
            coins: CoinRegistry::new(quality.max_coins()),
            items: ItemRegistry::new(quality.max_items()),
            boundaries: Boundaries::default(),
            combo: ComboTracker::new(),
            effects: EffectManager::new(),
            modifiers: Modifiers::default(),
            thief: Thief::new(),
            sweeper: Sweeper::new(),
            slammer: Slammer::new(),
            low_gravity: LowGravityEvent::new(),
            frenzy: FrenzyWindow::new(),
            boss,
            fuses: Vec::new(),
            progression,
            save,
            bus: EventBus::new(),
            projector: Box::new(LinearProjector::new(800.0, TABLE_WIDTH)),
            presenter: None,
            running: false,
            last_frame_ms: None,
            last_delta_ms: 0.0,
            last_drop_ms: None,
            drop_x: 0.0,
            coin_size: CoinSize::Small,
            auto_drop: None,
            session_score: 0,
            xp_carry: XpCarry::new(),
            trace: Vec::with_capacity(TICK_PIPELINE.len()),
            config,
        }
    }

    // === Lifecycle ===

    /// Begin a new session
    ///
    /// Lays out the starting coins on an empty table; a restart keeps what is
    /// already there.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        if self.coins.is_empty() {
            self.seed_table();
        }
        self.session_score = 0;
        self.combo.reset();
        self.running = true;
        self.last_frame_ms = Some(self.clock.now_ms());
        log::info!("Engine started with {} coins", self.coins.len());
    }

    fn seed_table(&mut self) {
        const COLUMNS: u32 = 6;
        const ROWS: u32 = 5;
        let span = 2.0 * (self.config.drop_range - 0.1);
        let spacing = span / COLUMNS as f32;
        for i in 0..self.config.initial_coins {
            let col = i % COLUMNS;
            let row = (i / COLUMNS) % ROWS;
            let layer = i / (COLUMNS * ROWS);
            let jitter = Vec3::new(
                self.rng.random_range(-0.1..=0.1),
                0.0,
                self.rng.random_range(-0.1..=0.1),
            );
            let pos = Vec3::new(
                -span / 2.0 + (col as f32 + 0.5) * spacing,
                0.1 + layer as f32 * 0.15,
                -0.5 + row as f32 * 0.8,
            ) + jitter;
            if self.coins.spawn(&mut self.physics, pos, CoinSize::Small).is_none() {
                break;
            }
        }
    }

    /// Stop the loop, cancel auto-drop, record the session and flush
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.auto_drop = None;
        if self.frenzy.is_active() {
            self.frenzy.abort();
            self.bus.emit(GameEvent::FrenzyEnd);
        }
        let mut ctx = EffectContext {
            modifiers: &mut self.modifiers,
            physics: &mut self.physics,
            pushers: &mut self.pushers,
        };
        self.effects.clear(&mut ctx);

        let now = self.clock.now_ms();
        if self.session_score > 0 {
            if let Some(rank) =
                self.save
                    .submit_score(self.session_score, self.progression.level(), now)
            {
                log::info!("Session score {} placed #{}", self.session_score, rank);
            }
        }
        self.save.flush();
        log::info!("Engine stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Advance one display frame
    pub fn frame(&mut self) {
        if !self.running {
            return;
        }
        let now = self.clock.now_ms();
        let dt_ms = clamp_frame_delta(self.last_frame_ms, now, self.config.max_frame_dt_ms);
        self.last_frame_ms = Some(now);
        self.last_delta_ms = dt_ms;

        self.service_auto_drop(now);

        self.trace.clear();
        for phase in TICK_PIPELINE {
            self.run_phase(phase, now, dt_ms);
            self.trace.push(phase);
        }

        self.save.tick(now);
    }

    /// Phases run by the last `frame`, in order
    pub fn last_tick_trace(&self) -> &[TickPhase] {
        &self.trace
    }

    fn run_phase(&mut self, phase: TickPhase, now: f64, dt_ms: f64) {
        let dt = (dt_ms / 1000.0) as f32;
        match phase {
            TickPhase::Physics => {
                self.physics.step(dt);
            }
            TickPhase::SettleCoins => {
                for coin in self.coins.iter() {
                    self.physics.damp_tilt(coin.body, TILT_DAMPING, SETTLE_SPEED);
                }
            }
            TickPhase::Pushers => {
                let speed = self.progression.difficulty().pusher_speed * self.modifiers.pusher_speed;
                self.pushers.update(dt, speed, &mut self.physics);
            }
            TickPhase::ExpireEffects => {
                let mut ctx = EffectContext {
                    modifiers: &mut self.modifiers,
                    physics: &mut self.physics,
                    pushers: &mut self.pushers,
                };
                self.effects.update(now, &mut ctx);
            }
            TickPhase::FallChecks => {
                self.check_coins(now);
                self.check_items(now);
                self.evaluate_achievements(now);
            }
            TickPhase::Frenzy => self.update_frenzy(now),
            TickPhase::EventMachines => {
                if self.config.random_events {
                    self.update_event_machines(now, dt);
                }
            }
            TickPhase::Fuses => self.update_fuses(now),
            TickPhase::Magnet => {
                if self.modifiers.magnet_active {
                    self.pull_magnet(dt);
                }
            }
            TickPhase::Boss => {
                if let Some(attack) = self.boss.update(now, &mut self.bus) {
                    log::debug!("Boss attacks ({} hp left)", attack.hp_remaining);
                }
            }
            TickPhase::Present => {
                if self.presenter.is_some() {
                    let snapshot = self.snapshot();
                    if let Some(presenter) = self.presenter.as_mut() {
                        presenter.present(&snapshot);
                    }
                }
            }
        }
    }

    fn service_auto_drop(&mut self, now: f64) {
        let Some(auto) = self.auto_drop else {
            return;
        };
        if now >= auto.next_at {
            self.drop_coin(false);
            self.auto_drop = Some(AutoDrop {
                interval_ms: auto.interval_ms,
                next_at: now + auto.interval_ms,
            });
        }
    }

    // === Fall checks ===

    fn check_coins(&mut self, now: f64) {
        let fallen: Vec<(u32, CoinFate, Vec3)> = self
            .coins
            .iter()
            .filter_map(|c| {
                let pos = self.physics.position(c.body)?;
                self.boundaries.classify_coin(pos).map(|fate| (c.id, fate, pos))
            })
            .collect();

        for (id, fate, pos) in fallen {
            let Some(coin) = self.coins.remove(id, &mut self.physics) else {
                continue;
            };
            match fate {
                CoinFate::Collected => self.collect_coin(coin.id, coin.size, pos, now),
                CoinFate::LostSide => log::debug!("Coin {} spilled over the side", id),
                CoinFate::LostBelow | CoinFate::LostBehindBarrier => {}
            }
            if fate.damages_boss() {
                self.damage_boss(LostObject::Coin, now);
            }
        }
    }

    fn collect_coin(&mut self, coin_id: u32, size: CoinSize, position: Vec3, now: f64) {
        let combo = self.combo.on_coin_collected(now);
        let difficulty = self.progression.difficulty();
        let config = size.config();
        let score = (config.score_value as f32
            * combo.multiplier
            * self.modifiers.score_multiplier
            * difficulty.coin_mult)
            .round() as u64;
        self.session_score += score;

        self.bus.emit(GameEvent::CoinCollected {
            coin_id,
            size,
            score,
            chain: combo.chain,
            multiplier: combo.multiplier,
            tier: combo.tier_info().map(|t| t.label),
            new_tier: combo.new_tier,
            position,
        });

        self.save.record_coin_collected();
        self.save.set_max_chain(combo.chain);
        self.save.set_high_score(self.session_score);
        self.save.credit_wallet(u64::from(config.recovered_value));

        let xp = self.xp_carry.accrue(1, difficulty.xp_mult);
        if xp > 0 {
            self.award_xp(xp);
        }

        if combo.new_tier && combo.tier == Some(FRENZY_TIER_INDEX) {
            self.start_frenzy(now);
        }
    }

    fn check_items(&mut self, now: f64) {
        let fallen: Vec<(u32, ItemFate, Vec3)> = self
            .items
            .iter()
            .filter_map(|i| {
                let pos = self.physics.position(i.body)?;
                self.boundaries.classify_item(pos).map(|fate| (i.id, fate, pos))
            })
            .collect();

        for (id, fate, pos) in fallen {
            let Some(item) = self.items.remove(id, &mut self.physics) else {
                continue;
            };
            self.fuses.retain(|f| f.item_id != id);
            if fate == ItemFate::Collected {
                self.collect_item(item.id, item.kind, pos, now);
            }
            if fate.damages_boss() {
                self.damage_boss(LostObject::Item(item.kind), now);
            }
        }
    }

    fn collect_item(&mut self, item_id: u32, kind: ItemKind, position: Vec3, now: f64) {
        let spec = kind.spec();
        let bonus = self.activate_item_effect(spec.effect, now);
        let score = (spec.score_value as f32 * self.modifiers.score_multiplier).round() as u64 + bonus;
        self.session_score += score;
        self.save.set_high_score(self.session_score);
        if self.save.record_item_collected(kind) {
            log::info!("New item collected: {}", kind.as_str());
        }
        self.bus.emit(GameEvent::ItemCollected {
            item_id,
            kind,
            score,
            position,
        });
    }

    /// Run an item's effect; returns any bonus score it grants
    fn activate_item_effect(&mut self, effect: ItemEffect, now: f64) -> u64 {
        match effect {
            ItemEffect::RandomReward => {
                let Some(reward) = RANDOM_REWARDS.choose(&mut self.rng).copied() else {
                    return 0;
                };
                self.activate_item_effect(reward, now)
            }
            ItemEffect::ScoreMultiplier { factor, duration_ms } => {
                self.add_effect(EffectKind::ScoreMultiplier { factor }, duration_ms, now);
                0
            }
            ItemEffect::WiderPusher { scale, duration_ms }
            | ItemEffect::NarrowerPusher { scale, duration_ms } => {
                self.add_effect(EffectKind::PusherWidth { scale }, duration_ms, now);
                0
            }
            ItemEffect::BurstCoins { count } => {
                for _ in 0..count {
                    let pos = Vec3::new(
                        self.rng.random_range(-2.0..=2.0),
                        1.0,
                        self.rng.random_range(1.0..=3.0),
                    );
                    if self.coins.spawn(&mut self.physics, pos, CoinSize::Small).is_none() {
                        break;
                    }
                }
                0
            }
            ItemEffect::ClearRow => {
                for coin in self.coins.iter() {
                    if let Some(pos) = self.physics.position(coin.body) {
                        if pos.z > CLEAR_ROW_Z {
                            self.physics.apply_impulse(coin.body, Vec3::new(0.0, 0.3, 1.2));
                        }
                    }
                }
                0
            }
            ItemEffect::TeleportCoins { count } => {
                self.teleport_rear_coins(count as usize);
                0
            }
            ItemEffect::CoinRain { count } => {
                for _ in 0..count {
                    let x = self.rng.random_range(-self.config.drop_range..=self.config.drop_range);
                    let z = self.rng.random_range(-1.0..=2.0);
                    let pos = Vec3::new(x, DROP_HEIGHT, z);
                    if self.coins.spawn(&mut self.physics, pos, CoinSize::Small).is_none() {
                        break;
                    }
                }
                0
            }
            ItemEffect::Magnet { duration_ms } => {
                self.add_effect(EffectKind::Magnet, duration_ms, now);
                0
            }
            ItemEffect::DiamondScore { score } => score,
            // Collected before the fuse ran out
            ItemEffect::BobOmb | ItemEffect::GiantBobOmb => 0,
        }
    }

    /// Move the rearmost coins up to the front edge
    fn teleport_rear_coins(&mut self, count: usize) {
        let mut by_z: Vec<(f32, u32)> = self
            .coins
            .iter()
            .filter_map(|c| self.physics.position(c.body).map(|p| (p.z, c.id)))
            .collect();
        by_z.sort_by(|a, b| a.0.total_cmp(&b.0));
        for (_, id) in by_z.into_iter().take(count) {
            let x = self.rng.random_range(-2.0..=2.0);
            if let Some(coin) = self.coins.get(id) {
                self.physics.set_position(coin.body, Vec3::new(x, 0.5, 3.2));
            }
        }
    }

    // === Effects ===

    fn add_effect(&mut self, kind: EffectKind, duration_ms: f64, now: f64) {
        let mut ctx = EffectContext {
            modifiers: &mut self.modifiers,
            physics: &mut self.physics,
            pushers: &mut self.pushers,
        };
        self.effects.add(kind, duration_ms, now, &mut ctx);
    }

    fn remove_effect(&mut self, key: EffectType) -> bool {
        let mut ctx = EffectContext {
            modifiers: &mut self.modifiers,
            physics: &mut self.physics,
            pushers: &mut self.pushers,
        };
        self.effects.remove(key, &mut ctx)
    }

    pub fn active_effects(&self) -> Vec<ActiveEffect<EffectKind>> {
        self.effects.active_effects(self.clock.now_ms())
    }

    pub fn modifiers(&self) -> &Modifiers {
        &self.modifiers
    }

    // === Frenzy ===

    fn start_frenzy(&mut self, now: f64) {
        if !self.frenzy.start(now) {
            return;
        }
        self.add_effect(
            EffectKind::FrenzySpeed {
                factor: FRENZY_SPEED_FACTOR,
            },
            FRENZY_DURATION_MS,
            now,
        );
        self.save.set_frenzy_triggered();
        self.bus.emit(GameEvent::FrenzyStart {
            duration_ms: FRENZY_DURATION_MS,
        });
    }

    fn update_frenzy(&mut self, now: f64) {
        let tick = self.frenzy.update(now);
        for _ in 0..tick.spawn {
            let x = self.rng.random_range(-self.config.drop_range..=self.config.drop_range);
            let pos = Vec3::new(x, DROP_HEIGHT, DROP_Z);
            if self.coins.spawn(&mut self.physics, pos, CoinSize::Small).is_none() {
                break;
            }
        }
        if tick.ended {
            self.remove_effect(EffectType::FrenzySpeed);
            self.bus.emit(GameEvent::FrenzyEnd);
        }
    }

    pub fn is_frenzy_active(&self) -> bool {
        self.frenzy.is_active()
    }

    // === Event machines ===

    fn event_context(&self, mechanic: Mechanic) -> EventContext {
        EventContext {
            population: self.coins.len(),
            unlocked: self.progression.is_mechanic_unlocked(mechanic),
            frequency_scale: self.progression.event_frequency_scale(),
        }
    }

    fn update_event_machines(&mut self, now: f64, dt: f32) {
        let ctx = self.event_context(Mechanic::Thief);
        if let Some(count) = self.thief.update(now, &ctx, &mut self.rng) {
            self.steal_coins(count);
        }

        let ctx = self.event_context(Mechanic::Sweeper);
        if let Some(sweep) = self.sweeper.update(now, &ctx, &mut self.rng) {
            self.sweep_coins(&sweep, dt);
        }

        let ctx = self.event_context(Mechanic::Slammer);
        if let Some(slam) = self.slammer.update(now, &ctx, &mut self.rng) {
            log::info!("Slam at ({:.1}, {:.1})", slam.center.x, slam.center.z);
            self.blast(&slam);
        }

        let ctx = self.event_context(Mechanic::LowGravity);
        if self.low_gravity.update(now, &ctx, &mut self.rng) {
            log::info!("Low gravity");
            self.add_effect(
                EffectKind::LowGravity {
                    scale: LOW_GRAVITY_SCALE,
                },
                LOW_GRAVITY_DURATION_MS,
                now,
            );
        }
    }

    /// Push coins under the broom; returns the total impulse applied
    fn sweep_coins(&mut self, sweep: &SweepImpulse, dt: f32) -> f32 {
        let impulse = sweep.impulse * frame_impulse_scale(dt);
        let mut total = 0.0;
        for coin in self.coins.iter() {
            let Some(pos) = self.physics.position(coin.body) else {
                continue;
            };
            if sweep.affects(pos.x) {
                self.physics.apply_impulse(coin.body, Vec3::X * impulse);
                total += impulse.abs();
            }
        }
        total
    }

    fn steal_coins(&mut self, count: usize) {
        let ids = self.coins.ids();
        let victims = pick_victims(&ids, count, &mut self.rng);
        for id in &victims {
            self.coins.remove(*id, &mut self.physics);
        }
        log::info!("Thief stole {} coins", victims.len());
        self.bus.emit(GameEvent::ThiefSteal {
            count: victims.len(),
        });
    }

    fn blast(&mut self, blast: &Slam) {
        for coin in self.coins.iter() {
            let Some(pos) = self.physics.position(coin.body) else {
                continue;
            };
            if let Some(impulse) = blast.impulse_at(pos) {
                self.physics.apply_impulse(coin.body, impulse);
            }
        }
    }

    /// Reset one event machine to idle immediately
    pub fn abort_event(&mut self, kind: EventKind) {
        let now = self.clock.now_ms();
        let scale = self.progression.event_frequency_scale();
        match kind {
            EventKind::Thief => self.thief.abort(now, scale, &mut self.rng),
            EventKind::Sweeper => self.sweeper.abort(now, scale, &mut self.rng),
            EventKind::Slammer => self.slammer.abort(now, scale, &mut self.rng),
            EventKind::LowGravity => {
                self.remove_effect(EffectType::LowGravity);
                self.low_gravity.abort(now, scale, &mut self.rng);
            }
        }
    }

    // === Fuses and magnet ===

    fn update_fuses(&mut self, now: f64) {
        let (due, pending): (Vec<Fuse>, Vec<Fuse>) = std::mem::take(&mut self.fuses)
            .into_iter()
            .partition(|f| now >= f.detonate_at);
        self.fuses = pending;
        for fuse in due {
            let Some(item) = self.items.get(fuse.item_id).copied() else {
                continue;
            };
            let Some(center) = self.physics.position(item.body) else {
                continue;
            };
            self.items.remove(item.id, &mut self.physics);
            let (radius, strength) = fuse.blast;
            log::info!("{} exploded", item.kind.as_str());
            self.blast(&Slam {
                center,
                radius,
                strength,
            });
        }
    }

    /// Draw coins toward the front edge; returns the total impulse applied
    fn pull_magnet(&mut self, dt: f32) -> f32 {
        let strength = self.config.magnet_strength * frame_impulse_scale(dt);
        let mut total = 0.0;
        for coin in self.coins.iter() {
            let Some(pos) = self.physics.position(coin.body) else {
                continue;
            };
            let target = Vec3::new(0.0, pos.y, TABLE_HALF_DEPTH);
            if let Some(dir) = (target - pos).try_normalize() {
                self.physics.apply_impulse(coin.body, dir * strength);
                total += strength;
            }
        }
        total
    }

    // === Boss ===

    fn damage_boss(&mut self, object: LostObject, now: f64) {
        if let Some(defeat) = self.boss.on_object_lost_back(object, now, &mut self.bus) {
            self.on_boss_defeated(defeat, now);
        }
    }

    fn on_boss_defeated(&mut self, defeat: BossDefeat, now: f64) {
        self.save.credit_wallet(u64::from(defeat.reward));
        match defeat.wave {
            None => self.save.set_boss_defeated(now),
            Some(_) => self.save.mark_boss_defeated(),
        }
        if defeat.rush_complete {
            log::info!("Boss Rush complete");
        }
    }

    /// Start a boss encounter; false when locked or on cooldown
    pub fn start_boss(&mut self) -> bool {
        if !self.progression.is_mechanic_unlocked(Mechanic::Boss) {
            return false;
        }
        let now = self.clock.now_ms();
        self.boss.start(now, &mut self.bus)
    }

    pub fn start_boss_rush(&mut self) -> bool {
        if !self.progression.is_mechanic_unlocked(Mechanic::BossRush) {
            return false;
        }
        let now = self.clock.now_ms();
        self.boss.start_rush(now, &mut self.bus)
    }

    pub fn abort_boss(&mut self) {
        self.boss.abort();
    }

    pub fn boss(&self) -> &BossEncounter {
        &self.boss
    }

    // === Progression ===

    fn award_xp(&mut self, amount: u64) {
        if let Some(up) = self.progression.add_xp(amount, &mut self.bus) {
            self.save.credit_wallet(u64::from(up.coin_reward));
            if up.unlocked.contains(&Unlock::Mechanic(Mechanic::SecondPusher)) {
                self.pushers.enable_second(&mut self.physics);
            }
        }
        self.save
            .set_progress(self.progression.xp(), self.progression.level());
    }

    fn evaluate_achievements(&mut self, now: f64) {
        let stats = Stats::from_save(self.save.data(), self.session_score);
        achievements::check(&stats, &mut self.save, now, &mut self.bus);
    }

    /// Spin the lucky wheel once per calendar day
    pub fn claim_daily_spin(&mut self) -> Option<WheelReward> {
        let now = self.clock.now_ms();
        if !self.save.claim_daily_reward(epoch_day(now)) {
            return None;
        }
        let prize = *wheel::spin(&WHEEL_PRIZES, &mut self.rng)?;
        log::info!("Wheel landed on {}", prize.id);
        self.bus.emit(GameEvent::WheelSpin {
            prize_id: prize.id,
            reward: prize.reward,
        });

        match prize.reward {
            WheelReward::Coins(n) => self.save.credit_wallet(u64::from(n)),
            WheelReward::Xp(n) => self.award_xp(n),
            WheelReward::Item(kind) => {
                let x = self.rng.random_range(-self.config.drop_range..=self.config.drop_range);
                let pos = Vec3::new(x, DROP_HEIGHT, DROP_Z);
                if let Some(id) = self.place_item(kind, pos) {
                    let blast = match kind {
                        ItemKind::BobOmb => Some(BOB_OMB_BLAST),
                        ItemKind::GiantBobOmb => Some(GIANT_BOB_OMB_BLAST),
                        _ => None,
                    };
                    if let Some(blast) = blast {
                        self.fuses.push(Fuse {
                            item_id: id,
                            detonate_at: now + BOB_OMB_FUSE_MS,
                            blast,
                        });
                    }
                }
            }
        }
        self.evaluate_achievements(now);
        Some(prize.reward)
    }

    pub fn progression(&self) -> &LevelProgression {
        &self.progression
    }

    pub fn level(&self) -> u32 {
        self.progression.level()
    }

    pub fn session_score(&self) -> u64 {
        self.session_score
    }

    pub fn wallet(&self) -> u64 {
        self.save.wallet()
    }

    /// Current chain, 0 once the window has lapsed
    pub fn chain(&mut self) -> u32 {
        let now = self.clock.now_ms();
        self.combo.chain(now)
    }

    pub fn multiplier(&mut self) -> f32 {
        let now = self.clock.now_ms();
        self.combo.multiplier(now)
    }

    // === Dropping ===

    /// Drop a coin at the current drop x
    ///
    /// Fails without side effects on cooldown, an empty wallet or a full table.
    pub fn drop_coin(&mut self, ignore_cooldown: bool) -> bool {
        let now = self.clock.now_ms();
        if !ignore_cooldown {
            if let Some(last) = self.last_drop_ms {
                if now - last < self.config.drop_cooldown_ms {
                    return false;
                }
            }
        }
        if self.coins.is_full() {
            return false;
        }
        let cost = u64::from(self.coin_size.config().drop_cost);
        if !self.save.debit_wallet(cost) {
            return false;
        }
        let pos = Vec3::new(self.drop_x, DROP_HEIGHT, DROP_Z);
        if self.coins.spawn(&mut self.physics, pos, self.coin_size).is_none() {
            self.save.credit_wallet(cost);
            return false;
        }
        self.last_drop_ms = Some(now);
        self.save.record_coin_dropped();

        if self.rng.random::<f32>() < self.config.item_spawn_chance {
            self.spawn_random_item();
        }
        true
    }

    fn spawn_random_item(&mut self) {
        let candidates: Vec<(ItemKind, f32)> = self
            .progression
            .unlocked_items()
            .into_iter()
            .filter(|k| !k.is_wheel_exclusive())
            .map(|k| (k, k.spec().spawn_weight))
            .collect();
        let Ok(&(kind, _)) = candidates.choose_weighted(&mut self.rng, |c| c.1) else {
            return;
        };
        let offset = self.rng.random_range(-0.3..=0.3);
        let pos = Vec3::new(
            (self.drop_x + offset).clamp(-self.config.drop_range, self.config.drop_range),
            DROP_HEIGHT + 0.5,
            DROP_Z,
        );
        self.place_item(kind, pos);
    }

    /// Put an item on the table; `None` when the item cap is reached
    pub fn place_item(&mut self, kind: ItemKind, position: Vec3) -> Option<u32> {
        let item_id = self.items.spawn(&mut self.physics, position, kind)?;
        self.bus.emit(GameEvent::ItemSpawned {
            item_id,
            kind,
            position,
        });
        Some(item_id)
    }

    pub fn set_drop_x(&mut self, x: f32) {
        let range = self.config.drop_range;
        self.drop_x = if x.is_nan() { 0.0 } else { x.clamp(-range, range) };
    }

    pub fn drop_x(&self) -> f32 {
        self.drop_x
    }

    pub fn set_coin_size(&mut self, size: CoinSize) {
        self.coin_size = size;
    }

    pub fn coin_size(&self) -> CoinSize {
        self.coin_size
    }

    /// Drop automatically every `interval_ms`; `None` cancels
    pub fn set_auto_drop(&mut self, interval_ms: Option<f64>) {
        let now = self.clock.now_ms();
        self.auto_drop = interval_ms
            .filter(|i| *i > 0.0)
            .map(|interval_ms| AutoDrop {
                interval_ms,
                next_at: now + interval_ms,
            });
    }

    pub fn is_auto_dropping(&self) -> bool {
        self.auto_drop.is_some()
    }

    // === Input and settings ===

    pub fn set_projector(&mut self, projector: Box<dyn ScreenProjector>) {
        self.projector = projector;
    }

    /// Screen position to a drop x, clamped to the drop range
    pub fn screen_to_world_x(&self, screen_x: f32, screen_y: f32) -> f32 {
        let range = self.config.drop_range;
        let x = self.projector.screen_to_world_x(screen_x, screen_y);
        if x.is_nan() { 0.0 } else { x.clamp(-range, range) }
    }

    /// Switch table theme; false if the scene is still locked
    pub fn set_scene(&mut self, scene: SceneId) -> bool {
        if !self.progression.is_scene_unlocked(scene) {
            return false;
        }
        self.save.set_scene(scene);
        true
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.save.set_volume(volume);
    }

    pub fn set_haptic(&mut self, enabled: bool) {
        self.save.set_haptic(enabled);
    }

    /// Store the preset and apply its population caps to new spawns
    pub fn set_quality(&mut self, quality: QualityPreset) {
        self.save.set_quality(quality);
        self.coins.set_cap(quality.max_coins());
        self.items.set_cap(quality.max_items());
    }

    // === Presentation ===

    pub fn set_presenter(&mut self, presenter: Box<dyn Presenter>) {
        self.presenter = Some(presenter);
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn snapshot(&self) -> RenderSnapshot {
        let now = self.clock.now_ms();
        let coins = self
            .coins
            .iter()
            .filter_map(|c| {
                self.physics.transform(c.body).map(|t| CoinView {
                    id: c.id,
                    size: c.size,
                    position: t.position,
                    rotation: t.rotation,
                })
            })
            .collect();
        let items = self
            .items
            .iter()
            .filter_map(|i| {
                self.physics.transform(i.body).map(|t| ItemView {
                    id: i.id,
                    kind: i.kind,
                    position: t.position,
                    rotation: t.rotation,
                })
            })
            .collect();
        let boss = (self.boss.is_active() || self.boss.is_rush()).then(|| BossView {
            hp: self.boss.hp(),
            max_hp: self.boss.max_hp(),
            wave: self.boss.rush_wave(),
        });
        let chain = if self.combo.is_expired(now) {
            0
        } else {
            self.combo.peek_chain()
        };

        RenderSnapshot {
            pushers: self.pushers.snapshot(&self.physics),
            coins,
            items,
            drop_x: self.drop_x,
            magnet_active: self.modifiers.magnet_active,
            delta_ms: self.last_delta_ms,
            hazards: self.hazards(now),
            boss,
            chain,
            score: self.session_score,
            level: self.progression.level(),
            wallet: self.save.wallet(),
        }
    }

    fn hazards(&self, now: f64) -> Vec<HazardSnapshot> {
        let mut hazards = Vec::new();
        let thief = self.thief.machine();
        if !thief.is_idle() {
            hazards.push(HazardSnapshot {
                kind: EventKind::Thief,
                phase: thief.phase().name(),
                progress: thief.progress(now),
                x: None,
                z: None,
            });
        }
        let sweeper = self.sweeper.machine();
        if !sweeper.is_idle() {
            hazards.push(HazardSnapshot {
                kind: EventKind::Sweeper,
                phase: sweeper.phase().name(),
                progress: sweeper.progress(now),
                x: Some(self.sweeper.x(now)),
                z: None,
            });
        }
        let slammer = self.slammer.machine();
        if !slammer.is_idle() {
            let target = self.slammer.target();
            hazards.push(HazardSnapshot {
                kind: EventKind::Slammer,
                phase: slammer.phase().name(),
                progress: slammer.progress(now),
                x: Some(target.x),
                z: Some(target.z),
            });
        }
        if self.effects.is_active(EffectType::LowGravity) {
            hazards.push(HazardSnapshot {
                kind: EventKind::LowGravity,
                phase: "active",
                progress: 0.0,
                x: None,
                z: None,
            });
        }
        hazards
    }

    // === Accessors ===

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn coins(&self) -> &CoinRegistry {
        &self.coins
    }

    pub fn items(&self) -> &ItemRegistry {
        &self.items
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.physics
    }

    pub fn pushers(&self) -> &PusherController {
        &self.pushers
    }

    pub fn save(&self) -> &SaveStore {
        &self.save
    }

    /// Write the save now
    pub fn flush(&mut self) -> bool {
        self.save.flush()
    }
}

impl Drop for GameEngine {
    fn drop(&mut self) {
        if !self.save.flush() {
            log::warn!("Final save flush failed");
        }
    }
}
