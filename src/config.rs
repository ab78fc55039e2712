//! Runtime engine configuration
//!
//! [`EngineConfig`] defaults to the compile-time values in [`crate::consts`].
//! A TOML file may override any subset of fields; missing keys keep their
//! defaults. Values are range-checked after parsing.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;
use crate::settings::QualityPreset;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// RNG seed; the same seed and inputs replay the same session
    pub seed: u64,
    /// Coins laid out on the table by `start()`
    pub initial_coins: u32,
    /// Chance per player drop of an extra item spawning
    pub item_spawn_chance: f32,
    pub drop_cooldown_ms: f64,
    /// Drop x is clamped to `[-drop_range, drop_range]`
    pub drop_range: f32,
    /// Upper bound on one frame's delta
    pub max_frame_dt_ms: f64,
    /// Population caps come from the saved quality unless this is set
    pub quality_override: Option<QualityPreset>,
    /// Pull strength of an active magnet (impulse per tick)
    pub magnet_strength: f32,
    /// Event machines (thief, sweeper, slammer, low gravity) run at all
    pub random_events: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed_c011,
            initial_coins: 30,
            item_spawn_chance: 0.08,
            drop_cooldown_ms: DROP_COOLDOWN_MS,
            drop_range: DROP_RANGE,
            max_frame_dt_ms: MAX_FRAME_DT_MS,
            quality_override: None,
            magnet_strength: 0.02,
            random_events: true,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&text)?;
        log::info!("Loaded engine config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.item_spawn_chance) {
            return Err(ConfigError::OutOfRange {
                name: "item_spawn_chance",
                value: f64::from(self.item_spawn_chance),
                range: "[0, 1]",
            });
        }
        if !(self.drop_range > 0.0 && self.drop_range <= TABLE_HALF_WIDTH) {
            return Err(ConfigError::OutOfRange {
                name: "drop_range",
                value: f64::from(self.drop_range),
                range: "(0, table half-width]",
            });
        }
        if !(self.drop_cooldown_ms >= 0.0) {
            return Err(ConfigError::OutOfRange {
                name: "drop_cooldown_ms",
                value: self.drop_cooldown_ms,
                range: "[0, inf)",
            });
        }
        if !(self.max_frame_dt_ms > 0.0) {
            return Err(ConfigError::OutOfRange {
                name: "max_frame_dt_ms",
                value: self.max_frame_dt_ms,
                range: "(0, inf)",
            });
        }
        if !(self.magnet_strength >= 0.0) {
            return Err(ConfigError::OutOfRange {
                name: "magnet_strength",
                value: f64::from(self.magnet_strength),
                range: "[0, inf)",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str("seed = 42\ninitial_coins = 0\n").unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.initial_coins, 0);
        assert_eq!(config.drop_range, DROP_RANGE);
    }

    #[test]
    fn test_quality_override() {
        let config = EngineConfig::from_toml_str("quality_override = \"Low\"").unwrap();
        assert_eq!(config.quality_override, Some(QualityPreset::Low));
    }

    #[test]
    fn test_rejects_out_of_range() {
        let err = EngineConfig::from_toml_str("item_spawn_chance = 1.5").unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { name: "item_spawn_chance", .. }));
        let err = EngineConfig::from_toml_str("drop_range = 9.0").unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { name: "drop_range", .. }));
    }

    #[test]
    fn test_rejects_bad_syntax() {
        assert!(matches!(
            EngineConfig::from_toml_str("seed = \"abc\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
