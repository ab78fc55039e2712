//! Player settings and preferences
//!
//! Persisted as part of the save record (see `persistence::SaveData`).

use serde::{Deserialize, Serialize};

/// Quality preset levels
///
/// Graphics tuning itself is owned by the presentation layer; the engine only
/// reads the population caps a preset allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Hard cap on live coins for this preset
    pub fn max_coins(&self) -> usize {
        match self {
            QualityPreset::Low => 80,
            QualityPreset::Medium => 150,
            QualityPreset::High => 250,
        }
    }

    /// Hard cap on live items for this preset
    pub fn max_items(&self) -> usize {
        match self {
            QualityPreset::Low => 5,
            QualityPreset::Medium | QualityPreset::High => 8,
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Master volume (0.0 - 1.0)
    pub volume: f32,
    /// Haptic feedback on collections and blasts
    pub haptic: bool,
    /// Quality preset reported by the presentation layer
    pub quality: QualityPreset,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            volume: 0.8,
            haptic: true,
            quality: QualityPreset::Medium,
        }
    }
}

impl Settings {
    /// Set volume, clamped to [0, 1]; NaN falls back to mute
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_clamped() {
        let mut s = Settings::default();
        s.set_volume(1.7);
        assert_eq!(s.volume, 1.0);
        s.set_volume(-0.2);
        assert_eq!(s.volume, 0.0);
        s.set_volume(f32::NAN);
        assert_eq!(s.volume, 0.0);
    }

    #[test]
    fn test_quality_caps_grow_with_preset() {
        assert!(QualityPreset::Low.max_coins() < QualityPreset::Medium.max_coins());
        assert!(QualityPreset::Medium.max_coins() < QualityPreset::High.max_coins());
        assert_eq!(QualityPreset::from_str("MED"), Some(QualityPreset::Medium));
    }

    #[test]
    fn test_partial_settings_json_uses_defaults() {
        let s: Settings = serde_json::from_str(r#"{"haptic": false}"#).unwrap();
        assert!(!s.haptic);
        assert_eq!(s.volume, 0.8);
        assert_eq!(s.quality, QualityPreset::Medium);
    }
}
