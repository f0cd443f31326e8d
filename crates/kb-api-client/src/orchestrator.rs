//! Edit session: attachment reconciliation and the save pipeline.
//!
//! A session snapshots the file ids a record had when editing began. On save, ids
//! whose previews were removed are deleted, queued files are uploaded, and the
//! surviving and new references are merged into the outgoing request.

use futures::future::try_join_all;
use kb_core::mapper::build_request;
use kb_core::models::{
    FileRef, FilesPayload, PendingFile, PreviewItem, Record, RecordForm, UNSAVED_FILE_ID,
};
use kb_core::{ensure_valid, KbResult};

use crate::api::RecordApi;
use crate::files::FileApi;

/// What a save would do to attachments, computed without side effects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavePlan {
    /// Persisted ids no longer present in the preview list.
    pub to_delete: Vec<i64>,
    /// Number of queued files to upload.
    pub uploads: usize,
}

impl SavePlan {
    pub fn is_noop(&self) -> bool {
        self.to_delete.is_empty() && self.uploads == 0
    }
}

/// Mutable editing state for one record. Owned by a single editor.
#[derive(Debug, Default)]
pub struct EditSession {
    record_id: Option<i64>,
    initial_ids: Vec<i64>,
    previews: Vec<PreviewItem>,
    queue: Vec<PendingFile>,
}

impl EditSession {
    /// Session for a record that does not exist server-side yet.
    pub fn new_record() -> Self {
        Self::default()
    }

    /// Start editing `record`: snapshot its file ids and resolve their previews.
    pub async fn open<F>(record: &Record, files: &F) -> KbResult<Self>
    where
        F: FileApi + ?Sized,
    {
        let known = record.file_refs();
        let initial_ids: Vec<i64> = known.iter().map(|f| f.id).collect();

        let mut previews = if initial_ids.is_empty() {
            Vec::new()
        } else {
            files.build_previews(&initial_ids).await?
        };
        // Prefer the record's filename when the file service has none.
        for preview in &mut previews {
            if preview.filename == FileRef::fallback_filename(preview.id) {
                if let Some(named) = known.iter().find(|f| f.id == preview.id) {
                    preview.filename = named.filename.clone();
                }
            }
        }

        tracing::debug!(record_id = ?record.id, files = initial_ids.len(), "Edit session opened");
        Ok(Self {
            record_id: record.id,
            initial_ids,
            previews,
            queue: Vec::new(),
        })
    }

    pub fn record_id(&self) -> Option<i64> {
        self.record_id
    }

    pub fn is_new(&self) -> bool {
        self.record_id.is_none()
    }

    pub fn initial_ids(&self) -> &[i64] {
        &self.initial_ids
    }

    pub fn previews(&self) -> &[PreviewItem] {
        &self.previews
    }

    pub fn queued(&self) -> &[PendingFile] {
        &self.queue
    }

    pub fn queue_file(&mut self, file: PendingFile) {
        self.queue.push(file);
    }

    /// Queued files as references carrying the unsaved sentinel id.
    pub fn queued_refs(&self) -> Vec<FileRef> {
        self.queue
            .iter()
            .map(|f| FileRef::new(UNSAVED_FILE_ID, f.filename.clone()))
            .collect()
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
    }

    /// Drop the preview at `index`; returns it, or `None` when out of range.
    pub fn remove_preview(&mut self, index: usize) -> Option<PreviewItem> {
        (index < self.previews.len()).then(|| self.previews.remove(index))
    }

    /// Ids still shown as previews.
    pub fn current_ids(&self) -> Vec<i64> {
        self.previews.iter().map(|p| p.id).collect()
    }

    pub fn plan(&self) -> SavePlan {
        let to_delete = if self.is_new() {
            Vec::new()
        } else {
            let current = self.current_ids();
            let mut ids: Vec<i64> = Vec::new();
            for id in &self.initial_ids {
                if !current.contains(id) && !ids.contains(id) {
                    ids.push(*id);
                }
            }
            ids
        };
        SavePlan {
            to_delete,
            uploads: self.queue.len(),
        }
    }

    /// Run the save pipeline and persist the record.
    ///
    /// Deletes run first as one joined batch, then uploads as another; any failure
    /// aborts before the record is written. Deletes already applied are not undone,
    /// but they leave the snapshot so a retried save does not repeat them.
    /// On success the queue is flushed and the saved file list becomes the new
    /// snapshot.
    pub async fn save<F, R>(&mut self, form: &RecordForm, files: &F, records: &R) -> KbResult<Record>
    where
        F: FileApi + ?Sized,
        R: RecordApi + ?Sized,
    {
        ensure_valid(form)?;
        let plan = self.plan();

        if !plan.to_delete.is_empty() {
            try_join_all(plan.to_delete.iter().map(|id| files.delete_file(*id))).await?;
            self.initial_ids.retain(|id| !plan.to_delete.contains(id));
            tracing::info!(count = plan.to_delete.len(), "Removed attachments deleted");
        }

        let saved = try_join_all(self.queue.iter().map(|f| files.upload_one(f))).await?;
        let uploaded: Vec<FileRef> = self
            .queue
            .iter()
            .zip(saved)
            .map(|(file, saved)| FileRef::new(saved.id, file.filename.clone()))
            .collect();

        let merged = self.merge(&uploaded);
        let request = build_request(
            form,
            &form.tags,
            &form.uris,
            FilesPayload {
                file_refs: merged.clone(),
            },
        )?;

        let target = form.id.or(self.record_id);
        let record = match target {
            Some(id) => records.update_record(id, &request).await?,
            None => records.create_record(&request).await?,
        };
        tracing::info!(
            record_id = ?record.id.or(target),
            files = merged.len(),
            "Record saved"
        );

        self.record_id = record.id.or(target);
        self.initial_ids = merged.iter().map(|f| f.id).collect();
        self.previews.extend(uploaded.iter().map(|f| PreviewItem {
            id: f.id,
            url: files.file_url(f.id),
            filename: f.filename.clone(),
            mime_type: None,
            size_bytes: None,
        }));
        self.queue.clear();
        Ok(record)
    }

    /// Surviving previews followed by fresh uploads, without duplicate ids.
    fn merge(&self, uploaded: &[FileRef]) -> Vec<FileRef> {
        let mut merged: Vec<FileRef> = Vec::new();
        let current = self
            .previews
            .iter()
            .map(|p| FileRef::new(p.id, p.filename.clone()));
        for file in current.chain(uploaded.iter().cloned()) {
            if !merged.iter().any(|m| m.id == file.id) {
                merged.push(file);
            }
        }
        merged
    }
}

/// Delete a record after deleting its attachments. A failed file delete leaves the
/// record in place.
pub async fn delete_record_with_files<F, R>(
    id: i64,
    file_ids: &[i64],
    files: &F,
    records: &R,
) -> KbResult<()>
where
    F: FileApi + ?Sized,
    R: RecordApi + ?Sized,
{
    try_join_all(file_ids.iter().map(|file_id| files.delete_file(*file_id))).await?;
    records.delete_record(id).await?;
    tracing::info!(record_id = id, files = file_ids.len(), "Record deleted");
    Ok(())
}
