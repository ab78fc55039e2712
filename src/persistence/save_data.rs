//! The persisted player record

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::highscores::HighScores;
use crate::settings::Settings;
use crate::tuning::{ItemKind, SceneId};

/// Current save schema version
pub const SAVE_VERSION: u32 = 1;

/// Coins a fresh player starts with
pub const STARTING_WALLET: u64 = 100;

/// Everything that survives between sessions
///
/// Missing fields fall back to [`Default`], so new fields can be added
/// without a migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveData {
    pub version: u32,
    pub xp: u64,
    pub level: u32,
    pub total_coins_collected: u64,
    pub total_coins_dropped: u64,
    pub max_chain: u32,
    /// Epoch day of the last claimed daily spin
    pub last_daily_reward_day: Option<u64>,
    pub current_scene: SceneId,
    /// Achievement id -> unlock timestamp (ms)
    pub achievements: BTreeMap<String, f64>,
    pub settings: Settings,
    pub leaderboard: HighScores,
    pub boss_last_defeated: Option<f64>,
    pub boss_defeated: bool,
    pub unique_items_collected: BTreeSet<ItemKind>,
    pub frenzy_triggered: bool,
    pub high_score: u64,
    /// Coin balance used to pay for drops
    pub wallet: u64,
}

impl Default for SaveData {
    fn default() -> Self {
        Self {
            version: SAVE_VERSION,
            xp: 0,
            level: 1,
            total_coins_collected: 0,
            total_coins_dropped: 0,
            max_chain: 0,
            last_daily_reward_day: None,
            current_scene: SceneId::Overworld,
            achievements: BTreeMap::new(),
            settings: Settings::default(),
            leaderboard: HighScores::new(),
            boss_last_defeated: None,
            boss_defeated: false,
            unique_items_collected: BTreeSet::new(),
            frenzy_triggered: false,
            high_score: 0,
            wallet: STARTING_WALLET,
        }
    }
}

impl SaveData {
    /// Parse a stored blob, never failing
    ///
    /// A record that parses as a whole is used directly. Otherwise each
    /// top-level field is merged over the defaults one at a time and any field
    /// that does not deserialize is dropped.
    pub fn from_json_lenient(blob: &str) -> Self {
        let parsed: Value = match serde_json::from_str(blob) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("Save record is not valid JSON, using defaults: {}", e);
                return Self::default();
            }
        };

        let Value::Object(fields) = parsed else {
            log::warn!("Save record is not an object, using defaults");
            return Self::default();
        };

        if let Ok(data) = serde_json::from_value::<SaveData>(Value::Object(fields.clone())) {
            return data.normalized();
        }

        let mut merged = match serde_json::to_value(Self::default()) {
            Ok(Value::Object(map)) => map,
            _ => return Self::default(),
        };

        for (key, value) in fields {
            let mut candidate = merged.clone();
            candidate.insert(key.clone(), value);
            match serde_json::from_value::<SaveData>(Value::Object(candidate.clone())) {
                Ok(_) => merged = candidate,
                Err(e) => log::warn!("Dropping malformed save field '{}': {}", key, e),
            }
        }

        serde_json::from_value::<SaveData>(Value::Object(merged))
            .map(Self::normalized)
            .unwrap_or_default()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    fn normalized(mut self) -> Self {
        self.version = SAVE_VERSION;
        self.level = self.level.max(1);
        self.leaderboard.normalize();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut data = SaveData::default();
        data.xp = 42;
        data.unique_items_collected.insert(ItemKind::Star);
        data.achievements.insert("first_coin".into(), 12.0);
        let json = data.to_json().unwrap();
        assert_eq!(SaveData::from_json_lenient(&json), data);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let data = SaveData::from_json_lenient(r#"{"xp": 90, "level": 4}"#);
        assert_eq!(data.xp, 90);
        assert_eq!(data.level, 4);
        assert_eq!(data.wallet, STARTING_WALLET);
        assert_eq!(data.current_scene, SceneId::Overworld);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let data = SaveData::from_json_lenient(r#"{"xp": 5, "future_feature": [1,2,3]}"#);
        assert_eq!(data.xp, 5);
    }

    #[test]
    fn test_malformed_field_dropped_others_kept() {
        let data = SaveData::from_json_lenient(
            r#"{"xp": "lots", "max_chain": 12, "current_scene": "castle", "wallet": -4}"#,
        );
        assert_eq!(data.xp, 0);
        assert_eq!(data.max_chain, 12);
        assert_eq!(data.current_scene, SceneId::Castle);
        assert_eq!(data.wallet, STARTING_WALLET);
    }

    #[test]
    fn test_garbage_yields_defaults() {
        assert_eq!(SaveData::from_json_lenient("{{{not json"), SaveData::default());
        assert_eq!(SaveData::from_json_lenient("[1,2]"), SaveData::default());
    }

    #[test]
    fn test_level_zero_repaired() {
        let data = SaveData::from_json_lenient(r#"{"level": 0}"#);
        assert_eq!(data.level, 1);
    }
}
