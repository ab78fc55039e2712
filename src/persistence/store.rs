//! Debounced save store
//!
//! The in-memory [`SaveData`] is the source of truth for the session. Named
//! accessors mutate it and mark it dirty; [`SaveStore::tick`] coalesces dirty
//! periods into at most one write per [`SAVE_DEBOUNCE_MS`], and
//! [`SaveStore::flush`] writes synchronously on teardown.

use super::save_data::SaveData;
use super::storage::{MemoryStorage, StorageBackend};
use crate::error::StorageResult;
use crate::settings::QualityPreset;
use crate::tuning::{ItemKind, SceneId};

/// Minimum time between debounced writes
pub const SAVE_DEBOUNCE_MS: f64 = 1_000.0;

pub struct SaveStore {
    data: SaveData,
    backend: Box<dyn StorageBackend>,
    dirty: bool,
    /// When the current dirty period was first observed by `tick`
    dirty_since: Option<f64>,
}

impl SaveStore {
    /// Load the record from `backend`, falling back to defaults on any failure
    pub fn load(backend: Box<dyn StorageBackend>) -> Self {
        let data = match backend.read() {
            Ok(Some(blob)) => {
                let data = SaveData::from_json_lenient(&blob);
                log::info!("Loaded save (level {}, xp {})", data.level, data.xp);
                data
            }
            Ok(None) => {
                log::info!("No save found, starting fresh");
                SaveData::default()
            }
            Err(e) => {
                log::warn!("Save unavailable, starting fresh: {}", e);
                SaveData::default()
            }
        };

        Self {
            data,
            backend,
            dirty: false,
            dirty_since: None,
        }
    }

    /// Fresh store backed by throwaway memory
    pub fn in_memory() -> Self {
        Self::load(Box::new(MemoryStorage::new()))
    }

    pub fn data(&self) -> &SaveData {
        &self.data
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    // === Progress ===

    pub fn set_progress(&mut self, xp: u64, level: u32) {
        if self.data.xp != xp || self.data.level != level {
            self.data.xp = xp;
            self.data.level = level;
            self.mark_dirty();
        }
    }

    pub fn record_coin_collected(&mut self) {
        self.data.total_coins_collected += 1;
        self.mark_dirty();
    }

    pub fn record_coin_dropped(&mut self) {
        self.data.total_coins_dropped += 1;
        self.mark_dirty();
    }

    /// Raise the best chain; smaller values are ignored
    pub fn set_max_chain(&mut self, chain: u32) -> bool {
        if chain <= self.data.max_chain {
            return false;
        }
        self.data.max_chain = chain;
        self.mark_dirty();
        true
    }

    /// Raise the high score; smaller values are ignored
    pub fn set_high_score(&mut self, score: u64) -> bool {
        if score <= self.data.high_score {
            return false;
        }
        self.data.high_score = score;
        self.mark_dirty();
        true
    }

    /// Record a first-time item collection; returns true if it was new
    pub fn record_item_collected(&mut self, kind: ItemKind) -> bool {
        let added = self.data.unique_items_collected.insert(kind);
        if added {
            self.mark_dirty();
        }
        added
    }

    pub fn set_frenzy_triggered(&mut self) {
        if !self.data.frenzy_triggered {
            self.data.frenzy_triggered = true;
            self.mark_dirty();
        }
    }

    // === Achievements ===

    pub fn is_achievement_unlocked(&self, id: &str) -> bool {
        self.data.achievements.contains_key(id)
    }

    /// Record an unlock; returns false if it was already unlocked
    pub fn unlock_achievement(&mut self, id: &str, timestamp: f64) -> bool {
        if self.is_achievement_unlocked(id) {
            return false;
        }
        self.data.achievements.insert(id.to_string(), timestamp);
        self.mark_dirty();
        true
    }

    // === Boss ===

    /// Persist a defeat; the timestamp drives the encounter cooldown
    pub fn set_boss_defeated(&mut self, timestamp: f64) {
        self.data.boss_last_defeated = Some(timestamp);
        self.data.boss_defeated = true;
        self.mark_dirty();
    }

    /// Set the defeated flag without touching the cooldown timestamp
    pub fn mark_boss_defeated(&mut self) {
        if !self.data.boss_defeated {
            self.data.boss_defeated = true;
            self.mark_dirty();
        }
    }

    // === Scene and settings ===

    pub fn set_scene(&mut self, scene: SceneId) {
        if self.data.current_scene != scene {
            self.data.current_scene = scene;
            self.mark_dirty();
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.data.settings.set_volume(volume);
        self.mark_dirty();
    }

    pub fn set_haptic(&mut self, enabled: bool) {
        if self.data.settings.haptic != enabled {
            self.data.settings.haptic = enabled;
            self.mark_dirty();
        }
    }

    pub fn set_quality(&mut self, quality: QualityPreset) {
        if self.data.settings.quality != quality {
            self.data.settings.quality = quality;
            self.mark_dirty();
        }
    }

    // === Leaderboard and daily reward ===

    /// Submit a finished session; returns the rank if it placed
    pub fn submit_score(&mut self, score: u64, level: u32, timestamp: f64) -> Option<usize> {
        let rank = self.data.leaderboard.add_score(score, level, timestamp);
        if rank.is_some() {
            self.mark_dirty();
        }
        rank
    }

    /// Claim the daily reward for `day`; false if already claimed that day
    pub fn claim_daily_reward(&mut self, day: u64) -> bool {
        if self.data.last_daily_reward_day == Some(day) {
            return false;
        }
        self.data.last_daily_reward_day = Some(day);
        self.mark_dirty();
        true
    }

    // === Wallet ===

    pub fn wallet(&self) -> u64 {
        self.data.wallet
    }

    pub fn credit_wallet(&mut self, amount: u64) {
        if amount > 0 {
            self.data.wallet = self.data.wallet.saturating_add(amount);
            self.mark_dirty();
        }
    }

    /// Spend coins; false (and no change) if the balance is short
    pub fn debit_wallet(&mut self, amount: u64) -> bool {
        if self.data.wallet < amount {
            return false;
        }
        self.data.wallet -= amount;
        if amount > 0 {
            self.mark_dirty();
        }
        true
    }

    // === Writing ===

    /// Debounce timer; call once per frame
    pub fn tick(&mut self, now: f64) {
        if !self.dirty {
            return;
        }
        let since = *self.dirty_since.get_or_insert(now);
        if now - since >= SAVE_DEBOUNCE_MS {
            if !self.write() {
                // Retry after another debounce window
                self.dirty_since = Some(now);
            }
        }
    }

    /// Write immediately if dirty; returns true if the record is clean afterwards
    pub fn flush(&mut self) -> bool {
        if !self.dirty {
            return true;
        }
        self.write()
    }

    fn write(&mut self) -> bool {
        match self.try_write() {
            Ok(bytes) => {
                self.dirty = false;
                self.dirty_since = None;
                log::debug!("Save written ({} bytes)", bytes);
                true
            }
            Err(e) => {
                log::warn!("Save write failed, keeping in-memory state: {}", e);
                false
            }
        }
    }

    /// Serialize and hand one blob to the backend
    fn try_write(&mut self) -> StorageResult<usize> {
        let blob = self.data.to_json()?;
        self.backend.write(&blob)?;
        Ok(blob.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;

    fn store_with(storage: &MemoryStorage) -> SaveStore {
        SaveStore::load(Box::new(storage.clone()))
    }

    #[test]
    fn test_max_chain_monotonic() {
        let mut store = SaveStore::in_memory();
        assert!(store.set_max_chain(7));
        assert!(!store.set_max_chain(3));
        assert!(!store.set_max_chain(7));
        assert_eq!(store.data().max_chain, 7);
    }

    #[test]
    fn test_high_score_monotonic() {
        let mut store = SaveStore::in_memory();
        assert!(store.set_high_score(500));
        assert!(!store.set_high_score(499));
        assert_eq!(store.data().high_score, 500);
    }

    #[test]
    fn test_debounce_coalesces_writes() {
        let storage = MemoryStorage::new();
        let mut store = store_with(&storage);

        store.record_coin_dropped();
        store.tick(0.0);
        store.record_coin_dropped();
        store.tick(400.0);
        store.record_coin_dropped();
        store.tick(999.0);
        assert_eq!(storage.writes(), 0);

        store.tick(1_000.0);
        assert_eq!(storage.writes(), 1);
        assert!(!store.is_dirty());

        // Clean store never writes
        store.tick(5_000.0);
        assert_eq!(storage.writes(), 1);

        let reloaded = store_with(&storage);
        assert_eq!(reloaded.data().total_coins_dropped, 3);
    }

    #[test]
    fn test_flush_writes_synchronously() {
        let storage = MemoryStorage::new();
        let mut store = store_with(&storage);
        store.credit_wallet(25);
        assert!(store.flush());
        assert_eq!(storage.writes(), 1);
        assert!(store.flush());
        assert_eq!(storage.writes(), 1);
    }

    #[test]
    fn test_write_failure_keeps_memory_state() {
        let storage = MemoryStorage::new();
        let mut store = store_with(&storage);
        storage.set_fail_writes(true);
        store.set_high_score(10);
        assert!(!store.flush());
        assert!(store.is_dirty());
        assert_eq!(store.data().high_score, 10);

        let err = store.try_write().unwrap_err();
        assert!(matches!(err, StorageError::Rejected(_)), "{err}");

        storage.set_fail_writes(false);
        store.tick(0.0);
        store.tick(1_000.0);
        assert_eq!(storage.writes(), 1);
    }

    #[test]
    fn test_wallet_debit_requires_balance() {
        let mut store = SaveStore::in_memory();
        let start = store.wallet();
        assert!(!store.debit_wallet(start + 1));
        assert_eq!(store.wallet(), start);
        assert!(store.debit_wallet(start));
        assert_eq!(store.wallet(), 0);
    }

    #[test]
    fn test_daily_reward_once_per_day() {
        let mut store = SaveStore::in_memory();
        assert!(store.claim_daily_reward(100));
        assert!(!store.claim_daily_reward(100));
        assert!(store.claim_daily_reward(101));
    }

    #[test]
    fn test_achievement_unlock_once() {
        let mut store = SaveStore::in_memory();
        assert!(store.unlock_achievement("first_coin", 1.0));
        assert!(!store.unlock_achievement("first_coin", 2.0));
        assert_eq!(store.data().achievements.get("first_coin"), Some(&1.0));
    }

    #[test]
    fn test_corrupt_storage_loads_defaults() {
        let storage = MemoryStorage::with_blob("not json at all");
        let store = store_with(&storage);
        assert_eq!(store.data(), &SaveData::default());
    }
}
