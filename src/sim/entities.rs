//! Coin and item registries
//!
//! Each registry owns its entities and their physics bodies. Entities are kept
//! sorted by id for deterministic iteration. Spawning past the population cap
//! is a silent no-op that returns `None`.

use glam::Vec3;

use super::physics::{BodyHandle, PhysicsWorld};
use crate::consts::ITEM_ID_OFFSET;
use crate::tuning::{CoinSize, ItemKind};

/// A physics-backed coin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coin {
    pub id: u32,
    pub body: BodyHandle,
    pub size: CoinSize,
}

/// A physics-backed item
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Item {
    pub id: u32,
    pub body: BodyHandle,
    pub kind: ItemKind,
}

#[derive(Debug, Clone)]
pub struct CoinRegistry {
    coins: Vec<Coin>,
    next_id: u32,
    cap: usize,
}

impl CoinRegistry {
    pub fn new(cap: usize) -> Self {
        Self {
            coins: Vec::new(),
            next_id: 1,
            cap,
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn set_cap(&mut self, cap: usize) {
        self.cap = cap;
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.coins.len() >= self.cap
    }

    /// Spawn a coin at `position`; `None` at the population cap
    pub fn spawn(
        &mut self,
        physics: &mut PhysicsWorld,
        position: Vec3,
        size: CoinSize,
    ) -> Option<u32> {
        if self.is_full() {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        let body = physics.add_coin(position, size.config());
        // Ids are monotonic, so pushing keeps the list sorted
        self.coins.push(Coin { id, body, size });
        Some(id)
    }

    pub fn get(&self, id: u32) -> Option<&Coin> {
        self.coins
            .binary_search_by_key(&id, |c| c.id)
            .ok()
            .map(|i| &self.coins[i])
    }

    /// Remove a coin and its body
    pub fn remove(&mut self, id: u32, physics: &mut PhysicsWorld) -> Option<Coin> {
        let index = self.coins.binary_search_by_key(&id, |c| c.id).ok()?;
        let coin = self.coins.remove(index);
        physics.remove(coin.body);
        Some(coin)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coin> {
        self.coins.iter()
    }

    pub fn ids(&self) -> Vec<u32> {
        self.coins.iter().map(|c| c.id).collect()
    }

    pub fn clear(&mut self, physics: &mut PhysicsWorld) {
        for coin in self.coins.drain(..) {
            physics.remove(coin.body);
        }
    }
}

#[derive(Debug, Clone)]
pub struct ItemRegistry {
    items: Vec<Item>,
    next_id: u32,
    cap: usize,
}

impl ItemRegistry {
    pub fn new(cap: usize) -> Self {
        Self {
            items: Vec::new(),
            next_id: ITEM_ID_OFFSET,
            cap,
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn set_cap(&mut self, cap: usize) {
        self.cap = cap;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.cap
    }

    /// Spawn an item at `position`; `None` at the population cap
    pub fn spawn(
        &mut self,
        physics: &mut PhysicsWorld,
        position: Vec3,
        kind: ItemKind,
    ) -> Option<u32> {
        if self.is_full() {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        let spec = kind.spec();
        let body = physics.add_item(position, spec.half_extent, spec.mass);
        self.items.push(Item { id, body, kind });
        Some(id)
    }

    pub fn get(&self, id: u32) -> Option<&Item> {
        self.items
            .binary_search_by_key(&id, |i| i.id)
            .ok()
            .map(|i| &self.items[i])
    }

    pub fn remove(&mut self, id: u32, physics: &mut PhysicsWorld) -> Option<Item> {
        let index = self.items.binary_search_by_key(&id, |i| i.id).ok()?;
        let item = self.items.remove(index);
        physics.remove(item.body);
        Some(item)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn ids(&self) -> Vec<u32> {
        self.items.iter().map(|i| i.id).collect()
    }

    pub fn clear(&mut self, physics: &mut PhysicsWorld) {
        for item in self.items.drain(..) {
            physics.remove(item.body);
        }
    }
}
