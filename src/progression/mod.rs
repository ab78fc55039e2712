//! Player progression: levels, achievements and the lucky wheel

pub mod achievements;
pub mod level;
pub mod wheel;

pub use achievements::{ACHIEVEMENTS, AchievementStatus, Stats};
pub use level::{DifficultyScale, LevelProgression, LevelUp, XpCarry, difficulty_scale};
