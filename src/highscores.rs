//! Session leaderboard
//!
//! Lives inside the save record and keeps the best [`MAX_HIGH_SCORES`]
//! finished sessions, best first.

use serde::{Deserialize, Serialize};

pub const MAX_HIGH_SCORES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    pub score: u64,
    /// Player level when the session ended
    pub level: u32,
    /// Epoch ms when the session ended
    pub timestamp: f64,
}

/// Sorted descending by score; ties keep submission order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
}

impl HighScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero never places; a full board must be beaten outright
    pub fn qualifies(&self, score: u64) -> bool {
        score > 0
            && (self.entries.len() < MAX_HIGH_SCORES
                || self.entries.last().is_some_and(|e| score > e.score))
    }

    /// Insert a finished session; returns its 1-based rank if it placed
    pub fn add_score(&mut self, score: u64, level: u32, timestamp: f64) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }
        let index = self.entries.partition_point(|e| e.score >= score);
        self.entries.insert(
            index,
            HighScoreEntry {
                score,
                level,
                timestamp,
            },
        );
        self.entries.truncate(MAX_HIGH_SCORES);
        Some(index + 1)
    }

    /// Re-establish ordering and bounds after loading untrusted data
    pub fn normalize(&mut self) {
        self.entries.sort_by(|a, b| b.score.cmp(&a.score));
        self.entries.truncate(MAX_HIGH_SCORES);
    }
}
