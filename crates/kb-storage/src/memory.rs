use crate::traits::{check_key, KeyValueStore, StorageResult};
use async_trait::async_trait;
use kb_core::TokenBackend;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory storage; contents are lost when dropped.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        check_key(key)?;
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        check_key(key)?;
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        check_key(key)?;
        self.entries.write().await.remove(key);
        Ok(())
    }

    fn backend_type(&self) -> TokenBackend {
        TokenBackend::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageError;

    #[tokio::test]
    async fn set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("kb_token").await.unwrap(), None);

        store.set("kb_token", "abc").await.unwrap();
        store.set("kb_token", "def").await.unwrap();
        assert_eq!(store.get("kb_token").await.unwrap().as_deref(), Some("def"));

        store.remove("kb_token").await.unwrap();
        store.remove("kb_token").await.unwrap();
        assert_eq!(store.get("kb_token").await.unwrap(), None);
    }

    #[tokio::test]
    async fn rejects_path_like_keys() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.set("../x", "v").await,
            Err(StorageError::InvalidKey(_))
        ));
    }
}
