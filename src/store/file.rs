use crate::core::constants::*;
use crate::core::errors::StoreError;
use crate::core::ids::UserId;
use crate::store::{Inventory, PlayerRecord, PlayerStore};
use async_trait::async_trait;
use chrono::Utc;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    players: HashMap<UserId, PlayerRecord>,
    by_name: HashMap<String, UserId>,
    inventories: HashMap<UserId, Inventory>,
}

/// File-backed store: the whole account table lives in one checksummed
/// binary snapshot, rewritten after every mutation.
///
/// File format:
/// - Version magic (8 bytes)
/// - Data length (4 bytes)
/// - Serialized snapshot (variable length)
/// - SHA256 checksum (32 bytes)
pub struct FileStore {
    path: PathBuf,
    inner: Mutex<Snapshot>,
}

impl FileStore {
    /// Opens the snapshot at the platform data directory, creating an empty
    /// store on first run.
    pub fn open_default() -> Result<Self, StoreError> {
        let project_dirs = ProjectDirs::from("", "", "arena").ok_or_else(|| {
            StoreError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                "could not determine data directory",
            ))
        })?;
        let data_dir = project_dirs.data_dir();
        fs::create_dir_all(data_dir)?;
        Self::open(data_dir.join("store.dat"))
    }

    /// Opens (or initializes) a snapshot at an explicit path.
    pub fn open(path: PathBuf) -> Result<Self, StoreError> {
        let snapshot = if path.exists() {
            read_snapshot(&path)?
        } else {
            Snapshot::default()
        };
        Ok(Self {
            path,
            inner: Mutex::new(snapshot),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Snapshot> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn persist(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        write_snapshot(&self.path, snapshot)
    }
}

fn write_snapshot(path: &PathBuf, snapshot: &Snapshot) -> Result<(), StoreError> {
    let data = bincode::serialize(snapshot)
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;
    let data_len = data.len() as u32;

    let mut hasher = Sha256::new();
    hasher.update(SNAPSHOT_VERSION_MAGIC.to_le_bytes());
    hasher.update(data_len.to_le_bytes());
    hasher.update(&data);
    let checksum = hasher.finalize();

    let mut file = fs::File::create(path)?;
    file.write_all(&SNAPSHOT_VERSION_MAGIC.to_le_bytes())?;
    file.write_all(&data_len.to_le_bytes())?;
    file.write_all(&data)?;
    file.write_all(&checksum)?;
    Ok(())
}

fn read_snapshot(path: &PathBuf) -> Result<Snapshot, StoreError> {
    let mut file = fs::File::open(path)?;

    let mut version_bytes = [0u8; 8];
    file.read_exact(&mut version_bytes)?;
    let version = u64::from_le_bytes(version_bytes);
    if version != SNAPSHOT_VERSION_MAGIC {
        return Err(StoreError::Corrupt(format!(
            "invalid snapshot version: expected 0x{:016X}, got 0x{:016X}",
            SNAPSHOT_VERSION_MAGIC, version
        )));
    }

    let mut length_bytes = [0u8; 4];
    file.read_exact(&mut length_bytes)?;
    let data_len = u32::from_le_bytes(length_bytes);

    let mut data = vec![0u8; data_len as usize];
    file.read_exact(&mut data)?;

    let mut stored_checksum = [0u8; 32];
    file.read_exact(&mut stored_checksum)?;

    let mut hasher = Sha256::new();
    hasher.update(version_bytes);
    hasher.update(length_bytes);
    hasher.update(&data);
    if stored_checksum != hasher.finalize().as_slice() {
        return Err(StoreError::Corrupt(
            "checksum verification failed".to_string(),
        ));
    }

    bincode::deserialize(&data).map_err(|e| StoreError::Corrupt(e.to_string()))
}

#[async_trait]
impl PlayerStore for FileStore {
    async fn load_or_create(&self, name: &str) -> Result<PlayerRecord, StoreError> {
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
        inner.inventories.insert(
            record.id,
            Inventory {
                collectibles: vec![STARTER_CHARACTER.to_string()],
                weapons: vec![STARTER_WEAPON.to_string()],
            },
        );
        inner.players.insert(record.id, record.clone());
        self.persist(&inner)?;
        Ok(record)
    }

    async fn load(&self, id: UserId) -> Result<PlayerRecord, StoreError> {
        self.lock()
            .players
            .get(&id)
            .cloned()
            .ok_or(StoreError::UnknownPlayer(id))
    }

    async fn credit_coins(&self, id: UserId, amount: u64) -> Result<u64, StoreError> {
        let mut inner = self.lock();
        let coins = {
            let record = inner
                .players
                .get_mut(&id)
                .ok_or(StoreError::UnknownPlayer(id))?;
            record.coins += amount;
            record.updated_at = Utc::now().timestamp();
            record.coins
        };
        self.persist(&inner)?;
        Ok(coins)
    }

    async fn try_debit_coins(
        &self,
        id: UserId,
        amount: u64,
    ) -> Result<Option<u64>, StoreError> {
        let mut inner = self.lock();
        let coins = {
            let record = inner
                .players
                .get_mut(&id)
                .ok_or(StoreError::UnknownPlayer(id))?;
            if record.coins < amount {
                return Ok(None);
            }
            record.coins -= amount;
            record.updated_at = Utc::now().timestamp();
            record.coins
        };
        self.persist(&inner)?;
        Ok(Some(coins))
    }

    async fn update_progression(&self, record: &PlayerRecord) -> Result<(), StoreError> {
        let mut inner = self.lock();
        {
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
        }
        self.persist(&inner)
    }

    async fn inventory(&self, id: UserId) -> Result<Inventory, StoreError> {
        self.lock()
            .inventories
            .get(&id)
            .cloned()
            .ok_or(StoreError::UnknownPlayer(id))
    }

    async fn grant_collectible(&self, id: UserId, template: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner
            .inventories
            .get_mut(&id)
            .ok_or(StoreError::UnknownPlayer(id))?
            .collectibles
            .push(template.to_string());
        self.persist(&inner)
    }

    async fn grant_weapon(&self, id: UserId, template: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner
            .inventories
            .get_mut(&id)
            .ok_or(StoreError::UnknownPlayer(id))?
            .weapons
            .push(template.to_string());
        self.persist(&inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_snapshot_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.dat");

        let record = {
            let store = FileStore::open(path.clone()).unwrap();
            let record = store.load_or_create("Kael").await.unwrap();
            store.credit_coins(record.id, 75).await.unwrap();
            store.grant_weapon(record.id, "Stormbrand").await.unwrap();
            record
        };

        let reopened = FileStore::open(path).unwrap();
        let loaded = reopened.load(record.id).await.unwrap();
        assert_eq!(loaded.coins, STARTING_COINS + 75);
        let inventory = reopened.inventory(record.id).await.unwrap();
        assert!(inventory.weapons.contains(&"Stormbrand".to_string()));
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.dat");

        {
            let store = FileStore::open(path.clone()).unwrap();
            store.load_or_create("Kael").await.unwrap();
        }

        // Flip one payload byte: the checksum no longer matches.
        let mut bytes = fs::read(&path).unwrap();
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0xFF;
        fs::write(&path, bytes).unwrap();

        match FileStore::open(path) {
            Err(StoreError::Corrupt(_)) => {}
            other => panic!("expected corrupt snapshot, got {:?}", other.is_ok()),
        }
    }

    #[tokio::test]
    async fn test_wrong_magic_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.dat");
        fs::write(&path, 0u64.to_le_bytes()).unwrap();
        assert!(matches!(
            FileStore::open(path),
            Err(StoreError::Corrupt(_))
        ));
    }
}
