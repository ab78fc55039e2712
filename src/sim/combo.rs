//! Chain scoring
//!
//! Collections within [`CHAIN_WINDOW_MS`] of each other build a chain; the
//! chain length picks a multiplier tier. A collection after the window
//! restarts the chain at 1, while the read-only queries report 0 once the
//! window has passed. Both paths use [`ComboTracker::is_expired`].

use serde::Serialize;

use crate::tuning::{CHAIN_WINDOW_MS, COMBO_TIERS, ComboTier};

/// Result of one collection
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComboResult {
    pub chain: u32,
    pub multiplier: f32,
    /// Index into `COMBO_TIERS`
    pub tier: Option<usize>,
    /// True only when the tier index went up on this collection
    pub new_tier: bool,
}

impl ComboResult {
    pub fn tier_info(&self) -> Option<&'static ComboTier> {
        self.tier.map(|i| &COMBO_TIERS[i])
    }
}

#[derive(Debug, Clone, Default)]
pub struct ComboTracker {
    chain: u32,
    last_collect_ms: Option<f64>,
    tier: Option<usize>,
}

/// Highest tier whose `min_chain` is reached
pub fn tier_for_chain(chain: u32) -> Option<usize> {
    COMBO_TIERS.iter().rposition(|t| chain >= t.min_chain)
}

fn multiplier_for(tier: Option<usize>) -> f32 {
    tier.map(|i| COMBO_TIERS[i].multiplier).unwrap_or(1.0)
}

impl ComboTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the chain window has elapsed since the last collection
    pub fn is_expired(&self, now: f64) -> bool {
        match self.last_collect_ms {
            Some(last) => now - last > CHAIN_WINDOW_MS,
            None => true,
        }
    }

    pub fn on_coin_collected(&mut self, now: f64) -> ComboResult {
        let previous_tier = if self.is_expired(now) {
            self.chain = 1;
            None
        } else {
            self.chain += 1;
            self.tier
        };
        self.last_collect_ms = Some(now);

        let tier = tier_for_chain(self.chain);
        let new_tier = match (tier, previous_tier) {
            (Some(t), Some(p)) => t > p,
            (Some(_), None) => true,
            _ => false,
        };
        self.tier = tier;

        ComboResult {
            chain: self.chain,
            multiplier: multiplier_for(tier),
            tier,
            new_tier,
        }
    }

    pub fn chain(&mut self, now: f64) -> u32 {
        self.expire_if_stale(now);
        self.chain
    }

    pub fn multiplier(&mut self, now: f64) -> f32 {
        self.expire_if_stale(now);
        multiplier_for(self.tier)
    }

    pub fn tier(&mut self, now: f64) -> Option<usize> {
        self.expire_if_stale(now);
        self.tier
    }

    /// Current chain without expiring it
    pub fn peek_chain(&self) -> u32 {
        self.chain
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn expire_if_stale(&mut self, now: f64) {
        if self.chain > 0 && self.is_expired(now) {
            self.chain = 0;
            self.tier = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_collection() {
        let mut combo = ComboTracker::new();
        let r = combo.on_coin_collected(1000.0);
        assert_eq!(r.chain, 1);
        assert_eq!(r.multiplier, 1.0);
        assert_eq!(r.tier, None);
        assert!(!r.new_tier);
    }

    #[test]
    fn test_great_tier_on_fifth() {
        let mut combo = ComboTracker::new();
        let mut results = Vec::new();
        for i in 0..5 {
            results.push(combo.on_coin_collected(i as f64 * 1400.0));
        }
        let last = results[4];
        assert_eq!(last.chain, 5);
        assert_eq!(last.multiplier, 2.0);
        assert_eq!(last.tier_info().map(|t| t.label), Some("Great!"));
        assert!(last.new_tier);
        // "Nice!" fired on the 2nd, nothing on the 3rd and 4th
        let fired: Vec<bool> = results.iter().map(|r| r.new_tier).collect();
        assert_eq!(fired, vec![false, true, false, false, true]);
    }

    #[test]
    fn test_reset_to_one_after_window() {
        let mut combo = ComboTracker::new();
        combo.on_coin_collected(0.0);
        combo.on_coin_collected(1000.0);
        let r = combo.on_coin_collected(1000.0 + CHAIN_WINDOW_MS + 1.0);
        assert_eq!(r.chain, 1);
        assert_eq!(r.tier, None);
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let mut combo = ComboTracker::new();
        combo.on_coin_collected(0.0);
        assert_eq!(combo.on_coin_collected(CHAIN_WINDOW_MS).chain, 2);
        assert_eq!(combo.chain(2.0 * CHAIN_WINDOW_MS), 2);
    }

    #[test]
    fn test_lazy_expiry_on_query() {
        let mut combo = ComboTracker::new();
        for i in 0..3 {
            combo.on_coin_collected(i as f64 * 100.0);
        }
        assert_eq!(combo.chain(250.0), 3);
        assert_eq!(combo.multiplier(250.0), 1.5);
        assert_eq!(combo.chain(200.0 + CHAIN_WINDOW_MS + 1.0), 0);
        assert_eq!(combo.multiplier(200.0 + CHAIN_WINDOW_MS + 1.0), 1.0);
        assert_eq!(combo.peek_chain(), 0);
    }

    #[test]
    fn test_new_tier_after_restart() {
        let mut combo = ComboTracker::new();
        combo.on_coin_collected(0.0);
        assert!(combo.on_coin_collected(100.0).new_tier);
        // Chain breaks, Nice! is a crossing again
        combo.on_coin_collected(10_000.0);
        assert!(combo.on_coin_collected(10_100.0).new_tier);
    }

    proptest! {
        #[test]
        fn prop_chain_counts_collections(n in 1u32..60, gap in 0.0f64..CHAIN_WINDOW_MS) {
            let mut combo = ComboTracker::new();
            let mut last = None;
            let mut crossings = 0;
            for i in 0..n {
                let r = combo.on_coin_collected(i as f64 * gap);
                if r.new_tier {
                    crossings += 1;
                }
                last = Some(r);
            }
            let r = last.unwrap();
            prop_assert_eq!(r.chain, n);
            prop_assert_eq!(r.tier, tier_for_chain(n));
            // One crossing per tier reached
            prop_assert_eq!(crossings, r.tier.map(|t| t + 1).unwrap_or(0));
        }
    }
}
