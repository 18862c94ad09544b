//! Draft editing session for one admin form.
//!
//! An [`EditorSession`] owns the in-memory draft of a section's payload and
//! the set of files selected but not yet uploaded. [`EditorSession::save`]
//! runs the whole submit protocol: validate, upload, splice, persist, then
//! clean up superseded media. Storage and database writes are not coupled
//! transactionally; a failure mid-protocol can leave unreferenced objects
//! in storage, which is accepted and logged, while the persisted record is
//! never left half-written.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use db::models::content_record::{ContentRecord, ContentSection};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use utils::json_path;
use uuid::Uuid;

use super::{
    content::{ContentError, ContentStore, FieldError, validate_required},
    media,
    storage::{ObjectStore, SelectedFile, StorageError, UploadRejection, unique_object_name, validate_upload},
};

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("a save is already in flight")]
    SaveInProgress,
    #[error(transparent)]
    Rejected(#[from] UploadRejection),
    #[error("upload failed: {0}")]
    Upload(#[source] StorageError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Path(#[from] json_path::PathError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    /// No data loaded yet.
    Idle,
    /// Draft loaded and editable. A failed submit lands back here with
    /// the draft and pending set preserved for a manual retry.
    Editing,
    /// A submit is running. Further submits are rejected until it ends.
    Saving,
}

/// A user-selected file waiting for submit, keyed by field path in the
/// session. `previous_reference` is the draft value the upload will
/// replace, captured at selection time; bare object names among these are
/// deleted from storage after a successful save.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub file: SelectedFile,
    pub previous_reference: Option<String>,
}

/// What a successful save produced.
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub record: ContentRecord,
    /// Field path to freshly stored object name, per uploaded file.
    pub uploaded: Vec<(String, String)>,
}

struct DraftState {
    draft: Value,
    record_id: Option<Uuid>,
    pending: HashMap<String, PendingUpload>,
    state: EditorState,
}

pub struct EditorSession {
    section: ContentSection,
    content: Arc<dyn ContentStore>,
    store: Arc<dyn ObjectStore>,
    inner: Mutex<DraftState>,
    saving: AtomicBool,
    fetch_generation: AtomicU64,
}

impl EditorSession {
    pub fn new(
        section: ContentSection,
        content: Arc<dyn ContentStore>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            section,
            content,
            store,
            inner: Mutex::new(DraftState {
                draft: Value::Object(Default::default()),
                record_id: None,
                pending: HashMap::new(),
                state: EditorState::Idle,
            }),
            saving: AtomicBool::new(false),
            fetch_generation: AtomicU64::new(0),
        }
    }

    pub fn section(&self) -> ContentSection {
        self.section
    }

    fn inner(&self) -> MutexGuard<'_, DraftState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> EditorState {
        self.inner().state
    }

    pub fn draft(&self) -> Value {
        self.inner().draft.clone()
    }

    pub fn pending_count(&self) -> usize {
        self.inner().pending.len()
    }

    /// Fetch the section's current record and install it as the draft.
    /// Returns false when a newer fetch completed first and this result was
    /// dropped (last-resolved-wins, made explicit).
    pub async fn load(&self) -> Result<bool, EditorError> {
        let generation = self.begin_fetch();
        let record = self.content.fetch_current(self.section).await?;
        Ok(self.apply_fetched(generation, record))
    }

    fn begin_fetch(&self) -> u64 {
        self.fetch_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn apply_fetched(&self, generation: u64, record: Option<ContentRecord>) -> bool {
        if self.fetch_generation.load(Ordering::SeqCst) != generation {
            debug!(
                section = %self.section,
                generation,
                "dropping stale fetch result"
            );
            return false;
        }
        let mut inner = self.inner();
        match record {
            Some(record) => {
                inner.draft = record.payload.0;
                inner.record_id = Some(record.id);
            }
            None => {
                inner.draft = Value::Object(Default::default());
                inner.record_id = None;
            }
        }
        inner.state = EditorState::Editing;
        true
    }

    /// Set one field of the draft, leaving the rest of the tree untouched.
    pub fn set_field(&self, path: &str, value: Value) -> Result<(), EditorError> {
        let segments = json_path::parse_path(path)?;
        let mut inner = self.inner();
        let updated = json_path::set_value(&inner.draft, &segments, value);
        inner.draft = updated;
        inner.state = EditorState::Editing;
        Ok(())
    }

    /// Replace the whole draft, e.g. from a posted form body.
    pub fn replace_draft(&self, payload: Value) {
        let mut inner = self.inner();
        inner.draft = payload;
        inner.state = EditorState::Editing;
    }

    /// Register a selected file for upload at submit time. A later
    /// selection for the same path supersedes the earlier one; the earlier
    /// file's bytes are dropped immediately.
    pub fn stage_file(&self, path: &str, file: SelectedFile) -> Result<(), EditorError> {
        validate_upload(&file, self.section.allowed_mime_types())?;
        let segments = json_path::parse_path(path)?;

        let mut inner = self.inner();
        let previous_reference = json_path::get_value(&inner.draft, &segments)
            .and_then(Value::as_str)
            .map(String::from);
        inner.pending.insert(
            path.to_string(),
            PendingUpload {
                file,
                previous_reference,
            },
        );
        inner.state = EditorState::Editing;
        Ok(())
    }

    /// Drop a staged file without saving. The draft and the persisted
    /// record are untouched, so resolution falls back to the original.
    pub fn unstage_file(&self, path: &str) -> bool {
        self.inner().pending.remove(path).is_some()
    }

    /// Displayable reference for the media at `path`: the staged file's
    /// preview when one is pending (nothing is uploaded yet, so there is
    /// no URL to show), otherwise the draft value resolved through the
    /// store.
    pub fn resolved_media(&self, path: &str) -> Result<String, EditorError> {
        let segments = json_path::parse_path(path)?;
        let inner = self.inner();
        if let Some(upload) = inner.pending.get(path) {
            return Ok(media::pending_preview(&upload.file.file_name));
        }
        let value = json_path::get_value(&inner.draft, &segments).and_then(Value::as_str);
        let bucket = self.section.bucket();
        Ok(media::resolve_media_with(value, |name| {
            self.store.public_url(bucket, name)
        }))
    }

    /// Run the submit protocol. Exactly one save can be in flight per
    /// session; a concurrent call fails fast with [`EditorError::SaveInProgress`]
    /// and performs no remote calls.
    pub async fn save(&self) -> Result<SaveOutcome, EditorError> {
        if self
            .saving
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(EditorError::SaveInProgress);
        }

        let result = self.save_inner().await;

        {
            // success re-enters Editing through the re-fetch; failure lands
            // back there too, with draft and pending kept for a retry
            self.inner().state = EditorState::Editing;
        }
        self.saving.store(false, Ordering::SeqCst);
        result
    }

    async fn save_inner(&self) -> Result<SaveOutcome, EditorError> {
        let (payload, pending, record_id) = {
            let inner = self.inner();
            (inner.draft.clone(), inner.pending.clone(), inner.record_id)
        };

        // 1. Local validation. A violation makes no remote call at all.
        let errors = validate_required(&payload, self.section.required_fields());
        if !errors.is_empty() {
            return Err(EditorError::Validation(errors));
        }

        {
            self.inner().state = EditorState::Saving;
        }

        // 2. Upload every pending file under a fresh name. On failure the
        // whole save aborts; objects uploaded before the failure stay
        // behind unreferenced.
        let bucket = self.section.bucket();
        let mut uploaded: Vec<(String, String)> = Vec::with_capacity(pending.len());
        for (field_path, upload) in &pending {
            let name = unique_object_name(&upload.file.file_name);
            match self
                .store
                .put(bucket, &name, &upload.file.bytes, &upload.file.content_type)
                .await
            {
                Ok(()) => uploaded.push((field_path.clone(), name)),
                Err(e) => {
                    warn!(
                        section = %self.section,
                        field = field_path.as_str(),
                        already_uploaded = uploaded.len(),
                        error = %e,
                        "upload failed, aborting save; earlier uploads left unreferenced"
                    );
                    return Err(EditorError::Upload(e));
                }
            }
        }

        // 3. Splice the new object names into the payload.
        let mut payload = payload;
        for (field_path, name) in &uploaded {
            let segments = json_path::parse_path(field_path)?;
            payload = json_path::set_value(&payload, &segments, Value::String(name.clone()));
        }

        // 4. Persist once, keyed by the loaded record when there is one.
        let record = match record_id {
            Some(id) => self.content.update_payload(id, &payload).await?,
            None => self.content.upsert_payload(self.section, &payload).await?,
        };

        // 5. Superseded references are removed only now that the record is
        // durable. Failures here never surface to the user.
        let superseded: Vec<String> = pending
            .values()
            .filter_map(|u| u.previous_reference.as_deref())
            .filter(|r| media::is_bare_object_name(r))
            .map(String::from)
            .collect();
        if !superseded.is_empty() {
            if let Err(e) = self.store.remove(bucket, &superseded).await {
                warn!(
                    section = %self.section,
                    bucket,
                    count = superseded.len(),
                    error = %e,
                    "failed to delete superseded media; record is saved, objects orphaned"
                );
            }
        }

        // 6. Clear the pending set and resynchronize with ground truth.
        {
            self.inner().pending.clear();
        }
        self.load().await?;

        Ok(SaveOutcome { record, uploaded })
    }
}
