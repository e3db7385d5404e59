//! Persistence boundary: player records and inventories behind an async
//! trait, with in-memory and checksummed-file implementations.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::core::constants::*;
use crate::core::errors::StoreError;
use crate::core::ids::UserId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Persisted account state. The progression invariant
/// `0 <= xp < xp_to_next_level` holds after every update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: UserId,
    pub name: String,
    pub coins: u64,
    pub level: u32,
    pub xp: u64,
    pub xp_to_next_level: u64,
    pub stat_points: u32,
    pub strength: u32,
    pub vitality: u32,
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl PlayerRecord {
    pub fn new(name: String, now: i64) -> Self {
        Self {
            id: UserId::new(),
            name,
            coins: STARTING_COINS,
            level: 1,
            xp: 0,
            xp_to_next_level: crate::progression::xp_for_next_level(1),
            stat_points: 0,
            strength: STARTING_STRENGTH,
            vitality: STARTING_VITALITY,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Owned items, referencing catalog templates by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub collectibles: Vec<String>,
    pub weapons: Vec<String>,
}

/// Abstract account/inventory store. Reads and writes complete before the
/// triggering action's resolution is emitted; implementations must make
/// each coin operation atomic.
#[async_trait]
pub trait PlayerStore: Send + Sync {
    /// Looks a player up by display name, creating a starter account on
    /// first sight.
    async fn load_or_create(&self, name: &str) -> Result<PlayerRecord, StoreError>;

    async fn load(&self, id: UserId) -> Result<PlayerRecord, StoreError>;

    /// Atomic increment. Returns the new balance.
    async fn credit_coins(&self, id: UserId, amount: u64) -> Result<u64, StoreError>;

    /// Atomic decrement that fails soft: `Ok(None)` means the balance was
    /// insufficient and nothing changed.
    async fn try_debit_coins(&self, id: UserId, amount: u64)
        -> Result<Option<u64>, StoreError>;

    /// Persists progression and attribute fields in one write.
    async fn update_progression(&self, record: &PlayerRecord) -> Result<(), StoreError>;

    async fn inventory(&self, id: UserId) -> Result<Inventory, StoreError>;

    async fn grant_collectible(&self, id: UserId, template: &str) -> Result<(), StoreError>;

    async fn grant_weapon(&self, id: UserId, template: &str) -> Result<(), StoreError>;
}
