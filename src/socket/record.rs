//! The socket record: in-memory document, last persisted snapshot, and the
//! guarded status transitions.
//!
//! Terminal state is decided by marker files next to the document, not by
//! the `status` field. A writer that has not noticed another process
//! finalizing the job keeps its in-memory changes, but its ordinary saves
//! become no-ops once any marker exists.

use serde_json::Value;
use tracing::{debug, info};

use super::document;
use super::model::SocketData;
use super::status::SocketStatus;
use super::store::SocketStore;
use crate::error::SocketError;
use crate::i18n::keys;

/// Keys the generic setter never writes.
pub const PROTECTED_KEYS: &[&str] = &["id", "file"];

/// A job status record.
#[derive(Debug, Clone)]
pub struct Socket {
    store: SocketStore,
    data: SocketData,
    saved: Option<SocketData>,
}

impl Socket {
    /// New in-memory socket; the id is generated when `id` is `None`.
    pub fn new(store: &SocketStore, prefix: Option<&str>, id: Option<&str>) -> Self {
        let id = match (id.filter(|id| !id.is_empty()), prefix) {
            (Some(id), Some(prefix)) if !prefix.is_empty() => format!("{prefix}:{id}"),
            (Some(id), _) => id.to_string(),
            (None, prefix) => store.generate_id(prefix),
        };
        Self {
            data: SocketData::new(id, store.timestamp()),
            store: store.clone(),
            saved: None,
        }
    }

    pub(crate) fn from_persisted(store: &SocketStore, data: SocketData) -> Self {
        Self {
            store: store.clone(),
            saved: Some(data.clone()),
            data,
        }
    }

    pub fn id(&self) -> &str {
        &self.data.id
    }

    /// Working copy.
    pub fn data(&self) -> &SocketData {
        &self.data
    }

    /// Last written (or reloaded) snapshot, `None` before the first save.
    pub fn saved_data(&self) -> Option<&SocketData> {
        self.saved.as_ref()
    }

    /// Working copy as JSON.
    pub fn document(&self) -> Value {
        self.data.to_document()
    }

    pub fn store(&self) -> &SocketStore {
        &self.store
    }

    /// Value at a dot path of the working copy, or `default`.
    pub fn get(&self, path: &str, default: Value) -> Value {
        document::get(&self.document(), path, default)
    }

    /// Write a value at a dot path, optionally saving right away.
    ///
    /// Writes to [`PROTECTED_KEYS`] are ignored. A value that does not fit
    /// the document schema is rejected and leaves the socket unchanged.
    pub fn set(
        &mut self,
        path: &str,
        value: impl Into<Value>,
        persist: bool,
    ) -> Result<&mut Self, SocketError> {
        if PROTECTED_KEYS.contains(&path) {
            debug!(id = %self.data.id, path, "Ignoring write to protected key");
            return Ok(self);
        }

        let mut doc = self.document();
        document::set(&mut doc, path, value.into());
        self.data = SocketData::from_document(doc).map_err(|e| SocketError::InvalidValue {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        if persist {
            self.save_to_file(false, None)?;
        }
        Ok(self)
    }

    /// Current status, falling back to the persisted one when the working
    /// copy has none.
    pub fn status(&self) -> Option<SocketStatus> {
        self.data
            .status
            .or_else(|| self.saved.as_ref().and_then(|s| s.status))
    }

    /// Set the status, optionally saving right away.
    pub fn set_status(
        &mut self,
        status: SocketStatus,
        persist: bool,
    ) -> Result<&mut Self, SocketError> {
        self.data.status = Some(status);
        if persist {
            self.save_to_file(false, None)?;
        }
        Ok(self)
    }

    // ── Persistence ─────────────────────────────────────────────────────

    /// Re-read the document for `id` (this socket's own id when `None`).
    ///
    /// Returns `false` and keeps the current state when no document exists.
    pub fn load_from_id(&mut self, id: Option<&str>) -> Result<bool, SocketError> {
        let id = id.map_or_else(|| self.data.id.clone(), str::to_string);
        match self.store.read_document(&id)? {
            Some(data) => {
                self.saved = Some(data.clone());
                self.data = data;
                Ok(true)
            }
            None => {
                debug!(id = %id, "No persisted document to load");
                Ok(false)
            }
        }
    }

    /// Pick up changes other processes made to this socket's document.
    pub fn refresh(&mut self) -> Result<bool, SocketError> {
        self.load_from_id(None)
    }

    /// Write the working copy to disk.
    ///
    /// Without `force` this is a no-op once the socket is inactive. With a
    /// `suffix`, the copy goes to that terminal marker instead of the main
    /// document. Returns whether anything was written.
    pub fn save_to_file(
        &mut self,
        force: bool,
        suffix: Option<SocketStatus>,
    ) -> Result<bool, SocketError> {
        if !force && self.is_inactive() {
            debug!(id = %self.data.id, "Socket inactive, skipping save");
            return Ok(false);
        }

        let path = self
            .store
            .file_name(&self.data.id, suffix)
            .ok_or_else(|| SocketError::InvalidIdentifier(self.data.id.clone()))?;
        let bytes = self
            .data
            .to_pretty_json()
            .map_err(|source| SocketError::Json {
                path: path.clone(),
                source,
            })?;
        self.store.write_atomic(&path, &bytes)?;
        self.saved = Some(self.data.clone());

        debug!(id = %self.data.id, path = %path.display(), "Saved socket");
        Ok(true)
    }

    // ── Predicates ──────────────────────────────────────────────────────

    /// True if any terminal marker exists, whatever `status` says.
    pub fn is_inactive(&self) -> bool {
        SocketStatus::TERMINAL
            .iter()
            .any(|status| self.store.has_marker(&self.data.id, *status))
    }

    pub fn is_active(&self) -> bool {
        !self.is_inactive()
    }

    /// Whether the socket is in `status`.
    ///
    /// Terminal statuses also match on their marker file; a deleted marker
    /// hides the other three.
    pub fn status_is(&self, status: SocketStatus) -> bool {
        let current = self.status() == Some(status);
        let id = &self.data.id;
        match status {
            SocketStatus::Deleted => current || self.store.has_marker(id, SocketStatus::Deleted),
            SocketStatus::Error | SocketStatus::Canceled | SocketStatus::Successful => {
                current
                    || (!self.store.has_marker(id, SocketStatus::Deleted)
                        && self.store.has_marker(id, status))
            }
            _ => current,
        }
    }

    pub fn is_successful(&self) -> bool {
        self.status_is(SocketStatus::Successful)
    }

    pub fn has_error(&self) -> bool {
        self.status_is(SocketStatus::Error)
    }

    pub fn is_canceled(&self) -> bool {
        self.status_is(SocketStatus::Canceled)
    }

    pub fn is_deleted(&self) -> bool {
        self.status_is(SocketStatus::Deleted)
    }

    // ── Transitions ─────────────────────────────────────────────────────

    /// Mark the socket running. Not guarded.
    pub fn start(
        &mut self,
        title: Option<&str>,
        message: Option<&str>,
        persist: bool,
    ) -> Result<&mut Self, SocketError> {
        if let Some(title) = title {
            self.data.title = Some(title.to_string());
        }
        if let Some(message) = message {
            self.data.message = Some(message.to_string());
        }
        self.data.started = Some(self.store.timestamp());
        self.set_status(SocketStatus::Running, persist)
    }

    /// Finish successfully. No-op (returns `false`) when already inactive.
    pub fn successful(
        &mut self,
        message: Option<&str>,
        data: Option<Value>,
        files: Option<Vec<String>>,
    ) -> Result<bool, SocketError> {
        if self.is_inactive() {
            return Ok(false);
        }
        if let Some(files) = files {
            self.data.result.files = files;
        }
        self.finish(SocketStatus::Successful, Some(false), message, data)?;
        Ok(true)
    }

    /// Finish with an error. No-op (returns `false`) when already inactive.
    pub fn error(&mut self, message: Option<&str>, data: Option<Value>) -> Result<bool, SocketError> {
        if self.is_inactive() {
            return Ok(false);
        }
        self.finish(SocketStatus::Error, Some(true), message, data)?;
        Ok(true)
    }

    /// Cancel. No-op (returns `false`) when already inactive.
    pub fn cancel(&mut self, message: Option<&str>, data: Option<Value>) -> Result<bool, SocketError> {
        if self.is_inactive() {
            return Ok(false);
        }
        self.finish(SocketStatus::Canceled, Some(true), message, data)?;
        Ok(true)
    }

    /// Delete. Allowed from every state except deleted; returns `false`
    /// when it was already deleted.
    pub fn delete(&mut self, message: Option<&str>, data: Option<Value>) -> Result<bool, SocketError> {
        if self.is_deleted() {
            return Ok(false);
        }
        self.finish(SocketStatus::Deleted, None, message, data)?;
        Ok(true)
    }

    /// Shared tail of the terminal transitions: fill the result, stamp
    /// `finished`, then force-save the document and the marker.
    fn finish(
        &mut self,
        status: SocketStatus,
        error: Option<bool>,
        message: Option<&str>,
        data: Option<Value>,
    ) -> Result<(), SocketError> {
        if let Some(error) = error {
            self.data.result.error = error;
        }
        if let Some(message) = message {
            self.data.result.message = Some(message.to_string());
        }
        if let Some(data) = data {
            self.data.result.data = data;
        }
        self.data.finished = Some(self.store.timestamp());
        self.data.message = Some(self.store.translate(terminal_message(status)));
        self.data.status = Some(status);

        self.save_to_file(true, None)?;
        self.save_to_file(true, Some(status))?;
        info!(id = %self.data.id, %status, "Socket finished");
        Ok(())
    }

    // ── Progress & confirmation ─────────────────────────────────────────

    /// Configure the progress bar and save.
    pub fn progress(
        &mut self,
        enabled: bool,
        maximum: i64,
        position: i64,
    ) -> Result<&mut Self, SocketError> {
        self.data.progress.enabled = enabled;
        self.data.progress.maximum = maximum;
        self.data.progress.position = position;
        self.save_to_file(false, None)?;
        Ok(self)
    }

    /// Advance the progress position by `step` and save.
    pub fn progress_increase(&mut self, step: i64) -> Result<&mut Self, SocketError> {
        self.progress_position(self.data.progress.position + step)
    }

    /// Set the absolute progress position and save.
    pub fn progress_position(&mut self, position: i64) -> Result<&mut Self, SocketError> {
        self.data.progress.position = position;
        self.save_to_file(false, None)?;
        Ok(self)
    }

    /// Ask the user to confirm: enables the gate, sets the prompt, moves
    /// to waiting and saves.
    pub fn confirmation(&mut self, message: &str) -> Result<&mut Self, SocketError> {
        self.data.confirmation.enabled = true;
        self.data.confirmation.message = Some(message.to_string());
        self.set_status(SocketStatus::Waiting, true)
    }
}

fn terminal_message(status: SocketStatus) -> &'static str {
    match status {
        SocketStatus::Successful => keys::SUCCESSFUL,
        SocketStatus::Error => keys::ERROR,
        SocketStatus::Canceled => keys::CANCELED,
        _ => keys::DELETED,
    }
}
