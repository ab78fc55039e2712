//! End-to-end sessions driven through the public engine API

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;

use coin_pusher::config::EngineConfig;
use coin_pusher::persistence::{MemoryStorage, SaveData};
use coin_pusher::platform::time::{MS_PER_DAY, ManualClock};
use coin_pusher::sim::TICK_PIPELINE;
use coin_pusher::tuning::{CoinSize, ItemKind, LEVEL_THRESHOLDS, SceneId};
use coin_pusher::{GameEngine, GameEvent, Presenter, RenderSnapshot, Topic};

const START_MS: f64 = 5.0 * MS_PER_DAY;

fn quiet_config() -> EngineConfig {
    EngineConfig {
        initial_coins: 0,
        item_spawn_chance: 0.0,
        random_events: false,
        ..Default::default()
    }
}

fn save_at_xp(xp: u64) -> MemoryStorage {
    let save = SaveData {
        xp,
        ..Default::default()
    };
    MemoryStorage::with_blob(save.to_json().unwrap())
}

fn new_engine(storage: &MemoryStorage) -> (GameEngine, ManualClock) {
    let clock = ManualClock::new(START_MS);
    let engine = GameEngine::new(
        quiet_config(),
        Box::new(clock.clone()),
        Box::new(storage.clone()),
    );
    (engine, clock)
}

fn record_events(engine: &mut GameEngine) -> Rc<RefCell<Vec<GameEvent>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    engine
        .bus_mut()
        .subscribe_all(move |e| sink.borrow_mut().push(e.clone()));
    log
}

fn count(events: &[GameEvent], topic: Topic) -> usize {
    events.iter().filter(|e| e.topic() == topic).count()
}

fn newest_coin(engine: &GameEngine) -> coin_pusher::sim::Coin {
    let id = *engine.coins().ids().last().unwrap();
    *engine.coins().get(id).unwrap()
}

fn item_kinds(events: &[GameEvent]) -> Vec<ItemKind> {
    events
        .iter()
        .filter_map(|e| match e {
            GameEvent::ItemCollected { kind, .. } => Some(*kind),
            _ => None,
        })
        .collect()
}

const FRONT: Vec3 = Vec3::new(0.0, -1.0, 4.5);
const BEHIND: Vec3 = Vec3::new(0.0, 0.5, -5.0);
const SIDE: Vec3 = Vec3::new(5.0, 0.5, 0.0);

#[test]
fn test_single_coin_off_the_front() {
    let storage = MemoryStorage::new();
    let (mut engine, clock) = new_engine(&storage);
    let events = record_events(&mut engine);
    engine.start();

    assert!(engine.drop_coin(false));
    let coin = newest_coin(&engine);
    engine
        .physics_mut()
        .set_position(coin.body, Vec3::new(0.0, -1.0, 4.5));
    clock.advance(16.0);
    engine.frame();

    let events = events.borrow();
    let collected: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            GameEvent::CoinCollected {
                coin_id,
                score,
                chain,
                multiplier,
                tier,
                ..
            } => Some((*coin_id, *score, *chain, *multiplier, *tier)),
            _ => None,
        })
        .collect();
    assert_eq!(collected, vec![(coin.id, 10, 1, 1.0, None)]);
    assert!(engine.coins().get(coin.id).is_none());
    assert_eq!(engine.session_score(), 10);
    // Paid 1 to drop, got 1 back
    assert_eq!(engine.wallet(), 100);
    assert_eq!(engine.save().data().total_coins_collected, 1);
    assert_eq!(count(&events, Topic::AchievementUnlock), 1);
}

#[test]
fn test_boss_defeated_by_lost_coins() {
    let storage = save_at_xp(LEVEL_THRESHOLDS[14]);
    let (mut engine, clock) = new_engine(&storage);
    assert_eq!(engine.level(), 15);
    let events = record_events(&mut engine);
    engine.start();

    assert!(engine.start_boss());
    assert!(!engine.start_boss());
    assert_eq!(engine.boss().hp(), 100);

    // Park every coin under the table, spread out so none overlap
    for i in 0..100 {
        assert!(engine.drop_coin(true));
        let coin = newest_coin(&engine);
        let x = (i % 10) as f32 * 1.2 - 5.4;
        let z = -(i / 10) as f32 * 1.2 - 1.0;
        engine
            .physics_mut()
            .set_position(coin.body, Vec3::new(x, -2.0, z));
    }
    assert_eq!(engine.wallet(), 0);
    clock.advance(16.0);
    engine.frame();

    let events = events.borrow();
    assert_eq!(count(&events, Topic::BossStart), 1);
    assert_eq!(count(&events, Topic::BossDamaged), 100);
    assert_eq!(count(&events, Topic::BossDefeated), 1);
    assert!(events.contains(&GameEvent::BossDefeated {
        reward: 100,
        wave: None
    }));
    assert_eq!(engine.boss().hp(), 0);
    assert_eq!(engine.wallet(), 100);
    assert!(engine.save().data().boss_defeated);
    assert_eq!(engine.save().data().boss_last_defeated, Some(START_MS + 16.0));
    // On cooldown now
    assert!(!engine.start_boss());
}

#[test]
fn test_boss_locked_below_level() {
    let storage = save_at_xp(LEVEL_THRESHOLDS[13]);
    let (mut engine, _) = new_engine(&storage);
    assert_eq!(engine.level(), 14);
    assert!(!engine.start_boss());
}

#[test]
fn test_pipeline_trace() {
    let storage = MemoryStorage::new();
    let (mut engine, clock) = new_engine(&storage);
    engine.frame();
    assert!(engine.last_tick_trace().is_empty());

    engine.start();
    clock.advance(16.0);
    engine.frame();
    assert_eq!(engine.last_tick_trace(), &TICK_PIPELINE[..]);
}

#[test]
fn test_stop_cancels_auto_drop_and_flushes() {
    let storage = MemoryStorage::new();
    let (mut engine, clock) = new_engine(&storage);
    engine.start();
    engine.set_auto_drop(Some(300.0));
    assert!(engine.is_auto_dropping());

    for _ in 0..19 {
        clock.advance(50.0);
        engine.frame();
    }
    let dropped = engine.save().data().total_coins_dropped;
    assert_eq!(dropped, 3);

    let writes = storage.writes();
    engine.stop();
    assert!(!engine.is_running());
    assert!(!engine.is_auto_dropping());
    assert!(storage.writes() > writes);

    clock.advance(1_000.0);
    engine.frame();
    assert_eq!(engine.save().data().total_coins_dropped, dropped);
}

#[test]
fn test_drop_flushes_save() {
    let storage = MemoryStorage::new();
    {
        let (mut engine, _) = new_engine(&storage);
        engine.set_coin_size(CoinSize::Large);
        assert!(engine.drop_coin(false));
    }
    let saved = SaveData::from_json_lenient(&storage.blob().unwrap());
    assert_eq!(saved.wallet, 97);
    assert_eq!(saved.total_coins_dropped, 1);
}

#[test]
fn test_daily_spin_per_day() {
    let storage = MemoryStorage::new();
    let (mut engine, clock) = new_engine(&storage);
    let events = record_events(&mut engine);

    assert!(engine.claim_daily_spin().is_some());
    clock.advance(MS_PER_DAY / 2.0);
    assert!(engine.claim_daily_spin().is_none());
    clock.advance(MS_PER_DAY);
    assert!(engine.claim_daily_spin().is_some());
    assert_eq!(count(&events.borrow(), Topic::WheelSpin), 2);
}

#[test]
fn test_scene_gating() {
    let storage = save_at_xp(LEVEL_THRESHOLDS[9]);
    let (mut engine, _) = new_engine(&storage);
    assert!(engine.set_scene(SceneId::Castle));
    assert!(!engine.set_scene(SceneId::Sky));
    assert_eq!(engine.save().data().current_scene, SceneId::Castle);
    // Level 10 also brings in the shelf pusher
    assert!(engine.pushers().has_second());
}

#[test]
fn test_quality_caps_population() {
    let storage = MemoryStorage::new();
    let clock = ManualClock::new(START_MS);
    let config = EngineConfig {
        quality_override: Some(coin_pusher::QualityPreset::Low),
        ..quiet_config()
    };
    let mut engine = GameEngine::new(config, Box::new(clock), Box::new(storage));
    for _ in 0..80 {
        assert!(engine.drop_coin(true));
    }
    assert!(!engine.drop_coin(true));
    assert_eq!(engine.coins().len(), 80);
    assert_eq!(engine.wallet(), 20);
}

struct Recorder(Rc<RefCell<Vec<RenderSnapshot>>>);

impl Presenter for Recorder {
    fn present(&mut self, snapshot: &RenderSnapshot) {
        self.0.borrow_mut().push(snapshot.clone());
    }
}

#[test]
fn test_presenter_sees_every_tick() {
    let storage = MemoryStorage::new();
    let (mut engine, clock) = new_engine(&storage);
    let frames = Rc::new(RefCell::new(Vec::new()));
    engine.set_presenter(Box::new(Recorder(frames.clone())));
    engine.start();
    engine.set_drop_x(1.0);
    engine.drop_coin(false);

    for _ in 0..3 {
        clock.advance(16.0);
        engine.frame();
    }
    let frames = frames.borrow();
    assert_eq!(frames.len(), 3);
    let last = frames.last().unwrap();
    assert_eq!(last.coins.len(), 1);
    assert_eq!(last.drop_x, 1.0);
    assert_eq!(last.delta_ms, 16.0);
    assert_eq!(last.pushers.len(), 1);
    assert!(last.boss.is_none());
}

#[test]
fn test_long_frame_is_clamped() {
    let storage = MemoryStorage::new();
    let (mut engine, clock) = new_engine(&storage);
    engine.start();
    clock.advance(10_000.0);
    engine.frame();
    assert_eq!(engine.snapshot().delta_ms, engine.config().max_frame_dt_ms);
}

#[test]
fn test_restart_records_one_session() {
    let storage = MemoryStorage::new();
    let (mut engine, clock) = new_engine(&storage);
    engine.start();
    assert!(engine.drop_coin(false));
    let coin = newest_coin(&engine);
    engine.physics_mut().set_position(coin.body, FRONT);
    clock.advance(16.0);
    engine.frame();
    assert_eq!(engine.session_score(), 10);

    engine.stop();
    engine.start();
    assert_eq!(engine.session_score(), 0);
    clock.advance(16.0);
    engine.frame();
    engine.stop();

    let board = &engine.save().data().leaderboard.entries;
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].score, 10);
}

#[test]
fn test_item_collected_off_the_front() {
    let storage = MemoryStorage::new();
    let (mut engine, clock) = new_engine(&storage);
    let events = record_events(&mut engine);
    engine.start();

    let id = engine.place_item(ItemKind::Star, FRONT).unwrap();
    clock.advance(16.0);
    engine.frame();

    assert!(engine.items().get(id).is_none());
    assert_eq!(item_kinds(&events.borrow()), vec![ItemKind::Star]);
    assert_eq!(engine.modifiers().score_multiplier, 2.0);
    assert_eq!(engine.session_score(), 100);
}

#[test]
fn test_lost_items_have_no_effect() {
    let storage = MemoryStorage::new();
    let (mut engine, clock) = new_engine(&storage);
    let events = record_events(&mut engine);
    engine.start();

    let behind = engine.place_item(ItemKind::Star, BEHIND).unwrap();
    let under_back = engine
        .place_item(ItemKind::Mushroom, Vec3::new(0.0, -2.0, -3.0))
        .unwrap();
    let side = engine.place_item(ItemKind::Mushroom, SIDE).unwrap();
    clock.advance(16.0);
    engine.frame();

    for id in [behind, under_back, side] {
        assert!(engine.items().get(id).is_none());
    }
    assert!(item_kinds(&events.borrow()).is_empty());
    assert_eq!(engine.modifiers().score_multiplier, 1.0);
    assert_eq!(engine.modifiers().pusher_width, 1.0);
    assert_eq!(engine.session_score(), 0);
    assert!(engine.active_effects().is_empty());
}

#[test]
fn test_items_damage_boss_by_kind() {
    let storage = save_at_xp(LEVEL_THRESHOLDS[14]);
    let (mut engine, clock) = new_engine(&storage);
    let events = record_events(&mut engine);
    engine.start();
    assert!(engine.start_boss());

    engine.place_item(ItemKind::FireFlower, BEHIND).unwrap();
    engine.place_item(ItemKind::Star, SIDE).unwrap();
    clock.advance(16.0);
    engine.frame();
    assert_eq!(engine.boss().hp(), 80);
    assert_eq!(count(&events.borrow(), Topic::BossDamaged), 1);

    engine.place_item(ItemKind::Mushroom, FRONT).unwrap();
    clock.advance(16.0);
    engine.frame();
    assert_eq!(engine.boss().hp(), 75);
    assert_eq!(engine.modifiers().pusher_width, 1.4);
    assert_eq!(item_kinds(&events.borrow()), vec![ItemKind::Mushroom]);
}

#[test]
fn test_thief_takes_coins_without_scoring() {
    let storage = save_at_xp(LEVEL_THRESHOLDS[3]);
    let clock = ManualClock::new(START_MS);
    let config = EngineConfig {
        initial_coins: 40,
        random_events: true,
        ..quiet_config()
    };
    let mut engine = GameEngine::new(config, Box::new(clock.clone()), Box::new(storage));
    assert_eq!(engine.level(), 4);
    let events = record_events(&mut engine);
    engine.start();

    for _ in 0..600 {
        let coins_before = engine.coins().len();
        let score_before = engine.session_score();
        events.borrow_mut().clear();
        clock.advance(1_000.0);
        engine.frame();

        let events = events.borrow();
        let Some(stolen) = events.iter().find_map(|e| match e {
            GameEvent::ThiefSteal { count } => Some(*count),
            _ => None,
        }) else {
            continue;
        };
        let scored: u64 = events
            .iter()
            .filter_map(|e| match e {
                GameEvent::CoinCollected { score, .. } => Some(*score),
                _ => None,
            })
            .sum();
        assert!((5..=50).contains(&stolen));
        assert!(coins_before - engine.coins().len() >= stolen);
        assert_eq!(engine.session_score() - score_before, scored);
        return;
    }
    panic!("thief never struck");
}

#[test]
fn test_ten_chain_starts_frenzy() {
    let storage = MemoryStorage::new();
    let (mut engine, clock) = new_engine(&storage);
    let events = record_events(&mut engine);
    engine.start();

    for i in 0..10 {
        assert!(engine.drop_coin(true));
        let coin = newest_coin(&engine);
        let x = (i % 5) as f32 * 1.2 - 2.4;
        let z = 4.5 + (i / 5) as f32;
        engine
            .physics_mut()
            .set_position(coin.body, Vec3::new(x, -2.0, z));
    }
    clock.advance(16.0);
    engine.frame();

    let events = events.borrow();
    assert_eq!(count(&events, Topic::CoinCollected), 10);
    assert_eq!(count(&events, Topic::FrenzyStart), 1);
    assert!(engine.is_frenzy_active());
    assert_eq!(engine.modifiers().pusher_speed, 1.5);
}
