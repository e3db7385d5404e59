use crate::core::constants::*;
use crate::core::errors::StoreError;
use crate::core::ids::UserId;
use crate::store::{Inventory, PlayerRecord, PlayerStore};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Default)]
struct Inner {
    players: HashMap<UserId, PlayerRecord>,
    by_name: HashMap<String, UserId>,
    inventories: HashMap<UserId, Inventory>,
}

/// In-memory store for tests and ephemeral servers. Every operation holds
/// the single inner lock for its full duration, so coin updates and grants
/// are atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    unavailable: AtomicBool,
    fail_next_grant: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail, simulating a store outage.
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    /// Fails exactly the next grant operation, for purchase-atomicity tests.
    pub fn fail_next_grant(&self) {
        self.fail_next_grant.store(true, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }

    fn check_grant_allowed(&self) -> Result<(), StoreError> {
        if self.fail_next_grant.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "memory store rejected the grant".to_string(),
            ));
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn starter_inventory() -> Inventory {
    Inventory {
        collectibles: vec![STARTER_CHARACTER.to_string()],
        weapons: vec![STARTER_WEAPON.to_string()],
    }
}

#[async_trait]
impl PlayerStore for MemoryStore {
    async fn load_or_create(&self, name: &str) -> Result<PlayerRecord, StoreError> {
        self.check_available()?;
        let mut inner = self.lock();
        if let Some(id) = inner.by_name.get(name) {
            let id = *id;
            return inner
                .players
                .get(&id)
                .cloned()
                .ok_or(StoreError::UnknownPlayer(id));
        }

        let record = PlayerRecord::new(name.to_string(), Utc::now().timestamp());
        inner.by_name.insert(name.to_string(), record.id);
        inner.inventories.insert(record.id, starter_inventory());
        inner.players.insert(record.id, record.clone());
        Ok(record)
    }

    async fn load(&self, id: UserId) -> Result<PlayerRecord, StoreError> {
        self.check_available()?;
        self.lock()
            .players
            .get(&id)
            .cloned()
            .ok_or(StoreError::UnknownPlayer(id))
    }

    async fn credit_coins(&self, id: UserId, amount: u64) -> Result<u64, StoreError> {
        self.check_available()?;
        let mut inner = self.lock();
        let record = inner
            .players
            .get_mut(&id)
            .ok_or(StoreError::UnknownPlayer(id))?;
        record.coins += amount;
        record.updated_at = Utc::now().timestamp();
        Ok(record.coins)
    }

    async fn try_debit_coins(
        &self,
        id: UserId,
        amount: u64,
    ) -> Result<Option<u64>, StoreError> {
        self.check_available()?;
        let mut inner = self.lock();
        let record = inner
            .players
            .get_mut(&id)
            .ok_or(StoreError::UnknownPlayer(id))?;
        if record.coins < amount {
            return Ok(None);
        }
        record.coins -= amount;
        record.updated_at = Utc::now().timestamp();
        Ok(Some(record.coins))
    }

    async fn update_progression(&self, record: &PlayerRecord) -> Result<(), StoreError> {
        self.check_available()?;
        let mut inner = self.lock();
        let stored = inner
            .players
            .get_mut(&record.id)
            .ok_or(StoreError::UnknownPlayer(record.id))?;
        stored.level = record.level;
        stored.xp = record.xp;
        stored.xp_to_next_level = record.xp_to_next_level;
        stored.stat_points = record.stat_points;
        stored.strength = record.strength;
        stored.vitality = record.vitality;
        stored.updated_at = Utc::now().timestamp();
        Ok(())
    }

    async fn inventory(&self, id: UserId) -> Result<Inventory, StoreError> {
        self.check_available()?;
        self.lock()
            .inventories
            .get(&id)
            .cloned()
            .ok_or(StoreError::UnknownPlayer(id))
    }

    async fn grant_collectible(&self, id: UserId, template: &str) -> Result<(), StoreError> {
        self.check_available()?;
        self.check_grant_allowed()?;
        let mut inner = self.lock();
        let inventory = inner
            .inventories
            .get_mut(&id)
            .ok_or(StoreError::UnknownPlayer(id))?;
        inventory.collectibles.push(template.to_string());
        Ok(())
    }

    async fn grant_weapon(&self, id: UserId, template: &str) -> Result<(), StoreError> {
        self.check_available()?;
        self.check_grant_allowed()?;
        let mut inner = self.lock();
        let inventory = inner
            .inventories
            .get_mut(&id)
            .ok_or(StoreError::UnknownPlayer(id))?;
        inventory.weapons.push(template.to_string());
        Ok(())
    }
}
