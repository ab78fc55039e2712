//! Data-driven game balance
//!
//! Static tables read by the simulation and progression systems: coin sizes,
//! the item catalog, combo tiers, level thresholds and unlocks, boss waves and
//! lucky-wheel prizes. Their shape is load-bearing (ascending thresholds,
//! level -> unlock lists); their values are tuning.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Coins
// ---------------------------------------------------------------------------

/// Coin size class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoinSize {
    #[default]
    Small,
    Large,
}

/// Physical and economic properties of a coin size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoinSizeConfig {
    pub radius: f32,
    pub thickness: f32,
    pub mass: f32,
    /// Wallet cost of dropping one coin
    pub drop_cost: u32,
    /// Wallet credit when the coin is collected
    pub recovered_value: u32,
    /// Base score before multipliers
    pub score_value: u32,
}

const SMALL_COIN: CoinSizeConfig = CoinSizeConfig {
    radius: 0.35,
    thickness: 0.08,
    mass: 1.0,
    drop_cost: 1,
    recovered_value: 1,
    score_value: 10,
};

const LARGE_COIN: CoinSizeConfig = CoinSizeConfig {
    radius: 0.5,
    thickness: 0.1,
    mass: 2.0,
    drop_cost: 3,
    recovered_value: 4,
    score_value: 30,
};

impl CoinSize {
    pub fn config(self) -> &'static CoinSizeConfig {
        match self {
            CoinSize::Small => &SMALL_COIN,
            CoinSize::Large => &LARGE_COIN,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CoinSize::Small => "small",
            CoinSize::Large => "large",
        }
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Item catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    QuestionBlock,
    Star,
    Mushroom,
    CoinTower,
    FireFlower,
    GreenPipe,
    PoisonMushroom,
    // Wheel-exclusive
    BobOmb,
    Magnet,
    DiamondCoin,
    GiantBobOmb,
}

/// What an item does when it is collected off the front edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemEffect {
    RandomReward,
    ScoreMultiplier { factor: f32, duration_ms: f64 },
    WiderPusher { scale: f32, duration_ms: f64 },
    NarrowerPusher { scale: f32, duration_ms: f64 },
    BurstCoins { count: u32 },
    ClearRow,
    TeleportCoins { count: u32 },
    CoinRain { count: u32 },
    Magnet { duration_ms: f64 },
    DiamondScore { score: u64 },
    BobOmb,
    GiantBobOmb,
}

/// Catalog entry for an item kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemSpec {
    /// Relative spawn weight (0 = never spawns randomly)
    pub spawn_weight: f32,
    pub effect: ItemEffect,
    /// Half edge length of the item's box collider
    pub half_extent: f32,
    pub mass: f32,
    pub score_value: u32,
}

impl ItemKind {
    pub const ALL: [ItemKind; 11] = [
        ItemKind::QuestionBlock,
        ItemKind::Star,
        ItemKind::Mushroom,
        ItemKind::CoinTower,
        ItemKind::FireFlower,
        ItemKind::GreenPipe,
        ItemKind::PoisonMushroom,
        ItemKind::BobOmb,
        ItemKind::Magnet,
        ItemKind::DiamondCoin,
        ItemKind::GiantBobOmb,
    ];

    pub fn spec(self) -> ItemSpec {
        let (spawn_weight, effect, half_extent, mass, score_value) = match self {
            ItemKind::QuestionBlock => (30.0, ItemEffect::RandomReward, 0.3, 1.5, 50),
            ItemKind::Star => (
                15.0,
                ItemEffect::ScoreMultiplier { factor: 2.0, duration_ms: 10_000.0 },
                0.28,
                1.0,
                100,
            ),
            ItemKind::Mushroom => (
                20.0,
                ItemEffect::WiderPusher { scale: 1.4, duration_ms: 15_000.0 },
                0.28,
                1.2,
                80,
            ),
            ItemKind::CoinTower => (10.0, ItemEffect::BurstCoins { count: 10 }, 0.35, 3.0, 120),
            ItemKind::FireFlower => (10.0, ItemEffect::ClearRow, 0.28, 1.0, 100),
            ItemKind::GreenPipe => (8.0, ItemEffect::TeleportCoins { count: 6 }, 0.35, 2.5, 90),
            ItemKind::PoisonMushroom => (
                12.0,
                ItemEffect::NarrowerPusher { scale: 0.7, duration_ms: 10_000.0 },
                0.28,
                1.2,
                20,
            ),
            ItemKind::BobOmb => (0.0, ItemEffect::BobOmb, 0.3, 2.0, 50),
            ItemKind::Magnet => (0.0, ItemEffect::Magnet { duration_ms: 8_000.0 }, 0.3, 1.5, 60),
            ItemKind::DiamondCoin => (0.0, ItemEffect::DiamondScore { score: 500 }, 0.3, 1.0, 0),
            ItemKind::GiantBobOmb => (0.0, ItemEffect::GiantBobOmb, 0.5, 4.0, 80),
        };
        ItemSpec {
            spawn_weight,
            effect,
            half_extent,
            mass,
            score_value,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::QuestionBlock => "question_block",
            ItemKind::Star => "star",
            ItemKind::Mushroom => "mushroom",
            ItemKind::CoinTower => "coin_tower",
            ItemKind::FireFlower => "fire_flower",
            ItemKind::GreenPipe => "green_pipe",
            ItemKind::PoisonMushroom => "poison_mushroom",
            ItemKind::BobOmb => "bob_omb",
            ItemKind::Magnet => "magnet",
            ItemKind::DiamondCoin => "diamond_coin",
            ItemKind::GiantBobOmb => "giant_bob_omb",
        }
    }

    /// Wheel-exclusive items never spawn from drops
    pub fn is_wheel_exclusive(&self) -> bool {
        self.spec().spawn_weight <= 0.0
    }
}

/// Pool a question block draws from (uniformly)
pub const RANDOM_REWARDS: [ItemEffect; 4] = [
    ItemEffect::BurstCoins { count: 5 },
    ItemEffect::CoinRain { count: 12 },
    ItemEffect::ScoreMultiplier { factor: 1.5, duration_ms: 8_000.0 },
    ItemEffect::DiamondScore { score: 150 },
];

/// Bob-omb fuse length
pub const BOB_OMB_FUSE_MS: f64 = 3_000.0;
/// Bob-omb blast (radius, impulse strength)
pub const BOB_OMB_BLAST: (f32, f32) = (1.5, 4.0);
pub const GIANT_BOB_OMB_BLAST: (f32, f32) = (3.0, 8.0);

// ---------------------------------------------------------------------------
// Combo
// ---------------------------------------------------------------------------

/// Max gap between collections that keeps a chain alive
pub const CHAIN_WINDOW_MS: f64 = 1_500.0;

/// A named multiplier bracket
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComboTier {
    pub min_chain: u32,
    pub multiplier: f32,
    pub label: &'static str,
}

/// Ordered ascending by `min_chain`
pub const COMBO_TIERS: [ComboTier; 4] = [
    ComboTier { min_chain: 2, multiplier: 1.5, label: "Nice!" },
    ComboTier { min_chain: 5, multiplier: 2.0, label: "Great!" },
    ComboTier { min_chain: 10, multiplier: 3.0, label: "Amazing!" },
    ComboTier { min_chain: 20, multiplier: 5.0, label: "Incredible!" },
];

/// Reaching this tier index starts a frenzy
pub const FRENZY_TIER_INDEX: usize = 2;

// ---------------------------------------------------------------------------
// Levels and unlocks
// ---------------------------------------------------------------------------

/// Game mechanics gated behind a level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mechanic {
    Thief,
    Sweeper,
    LowGravity,
    SecondPusher,
    Slammer,
    Boss,
    BossRush,
}

/// Table themes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneId {
    #[default]
    Overworld,
    Underground,
    Castle,
    Sky,
}

impl SceneId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SceneId::Overworld => "overworld",
            SceneId::Underground => "underground",
            SceneId::Castle => "castle",
            SceneId::Sky => "sky",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "overworld" => Some(SceneId::Overworld),
            "underground" => Some(SceneId::Underground),
            "castle" => Some(SceneId::Castle),
            "sky" => Some(SceneId::Sky),
            _ => None,
        }
    }
}

/// Something a level grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Unlock {
    Item(ItemKind),
    Scene(SceneId),
    Mechanic(Mechanic),
}

/// Cumulative XP required for each level (index 0 = level 1), strictly increasing
pub const LEVEL_THRESHOLDS: [u64; 30] = [
    0, 20, 50, 90, 150, 220, 300, 400, 520, 660, 820, 1000, 1200, 1420, 1660, 1920, 2200, 2500,
    2820, 3160, 3520, 3900, 4300, 4720, 5160, 5620, 6100, 6600, 7120, 7660,
];

pub const MAX_LEVEL: u32 = LEVEL_THRESHOLDS.len() as u32;

/// Unlocks granted on reaching `level` (level 1 = starting kit)
pub fn unlocks_for_level(level: u32) -> &'static [Unlock] {
    match level {
        1 => &[
            Unlock::Item(ItemKind::QuestionBlock),
            Unlock::Scene(SceneId::Overworld),
        ],
        2 => &[Unlock::Item(ItemKind::Star)],
        3 => &[Unlock::Item(ItemKind::Mushroom)],
        4 => &[Unlock::Mechanic(Mechanic::Thief)],
        5 => &[
            Unlock::Item(ItemKind::CoinTower),
            Unlock::Scene(SceneId::Underground),
        ],
        6 => &[Unlock::Mechanic(Mechanic::Sweeper)],
        7 => &[Unlock::Item(ItemKind::FireFlower)],
        8 => &[Unlock::Mechanic(Mechanic::LowGravity)],
        10 => &[
            Unlock::Item(ItemKind::GreenPipe),
            Unlock::Mechanic(Mechanic::SecondPusher),
            Unlock::Scene(SceneId::Castle),
        ],
        12 => &[
            Unlock::Mechanic(Mechanic::Slammer),
            Unlock::Item(ItemKind::PoisonMushroom),
        ],
        15 => &[Unlock::Mechanic(Mechanic::Boss)],
        18 => &[Unlock::Scene(SceneId::Sky)],
        20 => &[Unlock::Mechanic(Mechanic::BossRush)],
        _ => &[],
    }
}

/// Wallet bonus for reaching `level`
pub fn level_coin_reward(level: u32) -> u32 {
    10 * level
}

// ---------------------------------------------------------------------------
// Boss
// ---------------------------------------------------------------------------

pub const BOSS_MAX_HP: u32 = 100;
pub const BOSS_ATTACK_INTERVAL_MS: f64 = 5_000.0;
pub const BOSS_REWARD: u32 = 100;
/// Minimum time between a defeat and the next encounter
pub const BOSS_COOLDOWN_MS: f64 = 24.0 * 60.0 * 60.0 * 1000.0;
/// Pause between Boss Rush waves
pub const BOSS_RUSH_BREAK_MS: f64 = 3_000.0;

/// One Boss Rush wave
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BossWave {
    pub max_hp: u32,
    pub attack_interval_ms: f64,
    pub reward: u32,
}

pub const BOSS_RUSH_WAVES: [BossWave; 3] = [
    BossWave { max_hp: 100, attack_interval_ms: 5_000.0, reward: 100 },
    BossWave { max_hp: 150, attack_interval_ms: 4_000.0, reward: 150 },
    BossWave { max_hp: 250, attack_interval_ms: 3_000.0, reward: 250 },
];

// ---------------------------------------------------------------------------
// Lucky wheel
// ---------------------------------------------------------------------------

/// What a wheel slot pays out
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum WheelReward {
    Coins(u32),
    Xp(u64),
    Item(ItemKind),
}

/// A weighted wheel slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelPrize {
    pub id: &'static str,
    pub weight: f32,
    pub reward: WheelReward,
}

pub const WHEEL_PRIZES: [WheelPrize; 8] = [
    WheelPrize { id: "coins_10", weight: 30.0, reward: WheelReward::Coins(10) },
    WheelPrize { id: "coins_50", weight: 15.0, reward: WheelReward::Coins(50) },
    WheelPrize { id: "xp_50", weight: 15.0, reward: WheelReward::Xp(50) },
    WheelPrize { id: "bob_omb", weight: 10.0, reward: WheelReward::Item(ItemKind::BobOmb) },
    WheelPrize { id: "magnet", weight: 10.0, reward: WheelReward::Item(ItemKind::Magnet) },
    WheelPrize { id: "diamond_coin", weight: 8.0, reward: WheelReward::Item(ItemKind::DiamondCoin) },
    WheelPrize { id: "giant_bob_omb", weight: 5.0, reward: WheelReward::Item(ItemKind::GiantBobOmb) },
    WheelPrize { id: "jackpot", weight: 2.0, reward: WheelReward::Coins(500) },
];
