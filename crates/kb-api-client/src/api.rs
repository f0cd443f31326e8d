//! Record ("atividade") endpoints.

use async_trait::async_trait;
use kb_core::models::{LinkPage, ListQuery, Record, RecordRequest};
use kb_core::KbResult;

use crate::ApiClient;

/// Path of the record collection.
pub const RECORDS_PATH: &str = "/api/atividades";

/// Persistence calls used by the save pipeline.
#[async_trait]
pub trait RecordApi: Send + Sync {
    async fn create_record(&self, request: &RecordRequest) -> KbResult<Record>;
    async fn update_record(&self, id: i64, request: &RecordRequest) -> KbResult<Record>;
    async fn delete_record(&self, id: i64) -> KbResult<()>;
}

impl ApiClient {
    /// One page of records matching the filters.
    pub async fn list_records(&self, query: &ListQuery) -> KbResult<LinkPage> {
        self.get(RECORDS_PATH, &query.to_pairs()).await
    }

    pub async fn get_record(&self, id: i64) -> KbResult<Record> {
        self.get(&format!("{}/{}", RECORDS_PATH, id), &[]).await
    }

    /// Category names for the filter dropdown.
    pub async fn categories(&self) -> KbResult<Vec<String>> {
        self.get(&format!("{}/categorias", RECORDS_PATH), &[]).await
    }

    pub async fn tags(&self) -> KbResult<Vec<String>> {
        self.get(&format!("{}/tags", RECORDS_PATH), &[]).await
    }
}

#[async_trait]
impl RecordApi for ApiClient {
    async fn create_record(&self, request: &RecordRequest) -> KbResult<Record> {
        self.post_json(RECORDS_PATH, request).await
    }

    async fn update_record(&self, id: i64, request: &RecordRequest) -> KbResult<Record> {
        self.put_json(&format!("{}/{}", RECORDS_PATH, id), request)
            .await
    }

    async fn delete_record(&self, id: i64) -> KbResult<()> {
        self.delete(&format!("{}/{}", RECORDS_PATH, id)).await
    }
}
