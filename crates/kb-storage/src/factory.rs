use crate::{KeyValueStore, LocalStore, MemoryStore, StorageResult};
use kb_core::{ClientConfig, TokenBackend};
use std::sync::Arc;

/// Create the token storage backend selected by configuration
pub async fn create_store(config: &ClientConfig) -> StorageResult<Arc<dyn KeyValueStore>> {
    match config.token_backend {
        TokenBackend::Local => {
            let store = LocalStore::new(config.token_dir.clone()).await?;
            tracing::debug!(path = %config.token_dir.display(), "Using local token storage");
            Ok(Arc::new(store))
        }
        TokenBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}
