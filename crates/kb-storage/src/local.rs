use crate::traits::{check_key, KeyValueStore, StorageError, StorageResult};
use async_trait::async_trait;
use kb_core::TokenBackend;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage: one file per key under `base_path`.
///
/// Survives process restarts. Writes go to a temporary sibling and are renamed into
/// place so a reader never sees a half-written value.
#[derive(Clone, Debug)]
pub struct LocalStore {
    base_path: PathBuf,
}

impl LocalStore {
    /// Create a new LocalStore instance
    ///
    /// # Arguments
    /// * `base_path` - Directory holding one file per key (e.g., "~/.kb")
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStore { base_path })
    }

    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }

    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        check_key(key)?;
        Ok(self.base_path.join(key))
    }
}

#[async_trait]
impl KeyValueStore for LocalStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.key_to_path(key)?;
        match fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed(format!(
                "{}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let tmp = self.base_path.join(format!(".{}.tmp", key));

        let mut file = fs::File::create(&tmp)
            .await
            .map_err(|e| StorageError::WriteFailed(format!("{}: {}", tmp.display(), e)))?;
        file.write_all(value.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }

        fs::rename(&tmp, &path)
            .await
            .map_err(|e| StorageError::WriteFailed(format!("{}: {}", path.display(), e)))?;

        tracing::debug!(key = %key, "Stored value");
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "{}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn backend_type(&self) -> TokenBackend {
        TokenBackend::Local
    }
}
