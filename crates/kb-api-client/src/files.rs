//! Attachment endpoints.

use async_trait::async_trait;
use futures::future::try_join_all;
use kb_core::models::{FileRef, FileSaved, PendingFile, PreviewItem};
use kb_core::{KbError, KbResult};
use serde::Deserialize;

use crate::ApiClient;

/// Path of the file collection.
pub const FILES_PATH: &str = "/api/files";

/// File operations the edit session depends on.
#[async_trait]
pub trait FileApi: Send + Sync {
    /// Resolve persisted ids to display items, in the order given.
    async fn build_previews(&self, ids: &[i64]) -> KbResult<Vec<PreviewItem>>;
    async fn delete_file(&self, id: i64) -> KbResult<()>;
    async fn upload_one(&self, file: &PendingFile) -> KbResult<FileSaved>;
    /// Where a persisted file can be fetched from.
    fn file_url(&self, id: i64) -> String;
}

/// `GET /api/files/:id` body.
#[derive(Debug, Deserialize)]
struct FileMetadata {
    id: i64,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(rename = "mimeType", default)]
    mime_type: Option<String>,
    #[serde(rename = "sizeBytes", default)]
    size_bytes: Option<u64>,
}

impl ApiClient {
    async fn preview(&self, id: i64) -> KbResult<PreviewItem> {
        let meta: FileMetadata = self.get(&format!("{}/{}", FILES_PATH, id), &[]).await?;
        Ok(PreviewItem {
            id: meta.id,
            url: meta.url.unwrap_or_else(|| self.file_url(meta.id)),
            filename: meta
                .filename
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| FileRef::fallback_filename(meta.id)),
            mime_type: meta.mime_type,
            size_bytes: meta.size_bytes,
        })
    }
}

#[async_trait]
impl FileApi for ApiClient {
    async fn build_previews(&self, ids: &[i64]) -> KbResult<Vec<PreviewItem>> {
        try_join_all(ids.iter().map(|id| self.preview(*id))).await
    }

    async fn delete_file(&self, id: i64) -> KbResult<()> {
        self.delete(&format!("{}/{}", FILES_PATH, id)).await?;
        tracing::debug!(file_id = id, "File deleted");
        Ok(())
    }

    async fn upload_one(&self, file: &PendingFile) -> KbResult<FileSaved> {
        let mut part =
            reqwest::multipart::Part::bytes(file.data.clone()).file_name(file.filename.clone());
        if let Some(content_type) = &file.content_type {
            part = part.mime_str(content_type).map_err(|e| {
                KbError::Validation(format!("Invalid content type '{}': {}", content_type, e))
            })?;
        }
        let form = reqwest::multipart::Form::new().part("file", part);

        let saved: FileSaved = self.post_multipart(FILES_PATH, form).await?;
        tracing::debug!(file_id = saved.id, filename = %file.filename, "File uploaded");
        Ok(saved)
    }

    fn file_url(&self, id: i64) -> String {
        self.build_url(&format!("{}/{}/download", FILES_PATH, id))
    }
}
