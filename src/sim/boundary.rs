//! Fall classification
//!
//! Decides what happened to an object that left the playfield. Checks run in
//! priority order and the first match wins: below the table (front or not),
//! then lateral overflow, then behind the barrier.

use glam::Vec3;

use crate::consts::*;

/// Loss/collection boundaries of the table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundaries {
    pub collection_height: f32,
    /// |x| beyond this is a side overflow
    pub lateral_limit: f32,
    pub barrier_z: f32,
}

impl Default for Boundaries {
    fn default() -> Self {
        Self {
            collection_height: COLLECTION_HEIGHT,
            lateral_limit: TABLE_HALF_WIDTH + LATERAL_MARGIN,
            barrier_z: BARRIER_Z,
        }
    }
}

/// What happened to a coin this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoinFate {
    /// Fell off the front edge
    Collected,
    /// Fell below the table anywhere but the front
    LostBelow,
    /// Spilled over a side wall
    LostSide,
    /// Pushed behind the barrier
    LostBehindBarrier,
}

impl CoinFate {
    /// Side spills never hurt the boss
    pub fn damages_boss(&self) -> bool {
        !matches!(self, CoinFate::LostSide)
    }
}

/// What happened to an item this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemFate {
    Collected,
    /// Below and behind the center line, or behind the barrier
    LostBack,
    LostSide,
}

impl ItemFate {
    pub fn damages_boss(&self) -> bool {
        !matches!(self, ItemFate::LostSide)
    }
}

impl Boundaries {
    pub fn classify_coin(&self, pos: Vec3) -> Option<CoinFate> {
        if pos.y < self.collection_height {
            if pos.z > 0.0 {
                return Some(CoinFate::Collected);
            }
            return Some(CoinFate::LostBelow);
        }
        if pos.x.abs() > self.lateral_limit {
            return Some(CoinFate::LostSide);
        }
        if pos.z < self.barrier_z {
            return Some(CoinFate::LostBehindBarrier);
        }
        None
    }

    pub fn classify_item(&self, pos: Vec3) -> Option<ItemFate> {
        if pos.y < self.collection_height {
            if pos.z > 0.0 {
                return Some(ItemFate::Collected);
            }
            return Some(ItemFate::LostBack);
        }
        if pos.x.abs() > self.lateral_limit {
            return Some(ItemFate::LostSide);
        }
        if pos.z < self.barrier_z {
            return Some(ItemFate::LostBack);
        }
        None
    }
}
