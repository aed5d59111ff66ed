use super::character_key;
use crate::domain::errors::StoreError;
use crate::domain::ports::Persistence;
use crate::domain::records::{CharacterRecord, InventoryRecord, MonsterRecord};
use crate::domain::MonsterId;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

// In-memory record store; contents live as long as the process.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    characters: Arc<Mutex<HashMap<String, CharacterRecord>>>,
    inventories: Arc<Mutex<HashMap<String, InventoryRecord>>>,
    monsters: Arc<Mutex<BTreeMap<MonsterId, MonsterRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Persistence for InMemoryStore {
    async fn load_character(&self, name: &str) -> Result<Option<CharacterRecord>, StoreError> {
        let characters = self.characters.lock().await;
        Ok(characters.get(&character_key(name)).cloned())
    }

    async fn save_character(&self, record: &CharacterRecord) -> Result<(), StoreError> {
        let mut characters = self.characters.lock().await;
        characters.insert(character_key(&record.name), record.clone());
        Ok(())
    }

    async fn load_monster_instances(&self) -> Result<Vec<MonsterRecord>, StoreError> {
        let monsters = self.monsters.lock().await;
        Ok(monsters.values().cloned().collect())
    }

    async fn save_monster_instance(&self, record: &MonsterRecord) -> Result<(), StoreError> {
        let mut monsters = self.monsters.lock().await;
        monsters.insert(record.id, record.clone());
        Ok(())
    }

    async fn load_inventory(&self, character: &str) -> Result<Option<InventoryRecord>, StoreError> {
        let inventories = self.inventories.lock().await;
        Ok(inventories.get(&character_key(character)).cloned())
    }

    async fn save_inventory(&self, record: &InventoryRecord) -> Result<(), StoreError> {
        let mut inventories = self.inventories.lock().await;
        inventories.insert(character_key(&record.character), record.clone());
        Ok(())
    }
}
