/*!
 * Resumable translation sessions.
 *
 * A session snapshots a multi-file job: the file contents, per-file
 * progress, and every completed batch. It is saved after each completed
 * batch and file-status transition, cleared on full success, and discarded
 * by the loader when it has gone stale.
 */

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app_config::TranslateMode;
use crate::storage::SessionStore;

/// Staleness cutoff enforced by the loader, not the store.
pub const SESSION_TTL_HOURS: i64 = 24;

/// A file captured in the session (file handles don't persist).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFile {
    pub name: String,
    pub content: String,
    pub line_count: usize,
}

/// Lifecycle of a file within a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Pending,
    Translating,
    Completed,
    Error,
}

/// Per-file progress inside a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileProgress {
    pub file_index: usize,
    pub file_name: String,
    pub status: FileStatus,
    pub current: usize,
    pub total: usize,
}

/// Translation configuration snapshot stored with the session, used to
/// decide whether a stored session is compatible with a new run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub source_language: String,
    pub target_language: String,
    pub provider_id: String,
    pub mode: TranslateMode,
    pub tactic_lite: bool,
}

/// A batch that finished translating, kept for resume.
///
/// `merged_text` plus the joined translations are enough to re-seed the
/// translation cache so a resumed run skips the provider for this batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedBatch {
    pub index: usize,
    pub line_count: usize,
    pub merged_text: String,
    pub translations: Vec<String>,
}

/// Persisted job state enabling resume after interruption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationSession {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub files: Vec<StoredFile>,
    pub file_progresses: Vec<FileProgress>,
    pub current_file_index: usize,
    pub completed_batches: HashMap<usize, Vec<CompletedBatch>>,
    pub config: SessionConfig,
}

impl TranslationSession {
    /// Create a fresh session for a set of files.
    pub fn new(files: Vec<StoredFile>, config: SessionConfig) -> Self {
        let now = Utc::now();
        let file_progresses = files
            .iter()
            .enumerate()
            .map(|(i, f)| FileProgress {
                file_index: i,
                file_name: f.name.clone(),
                status: FileStatus::Pending,
                current: 0,
                total: f.line_count,
            })
            .collect();

        Self {
            id: format!("session_{}", Uuid::new_v4().simple()),
            created_at: now,
            updated_at: now,
            files,
            file_progresses,
            current_file_index: 0,
            completed_batches: HashMap::new(),
            config,
        }
    }

    /// Refresh the update timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Whether the session has outlived its TTL.
    pub fn is_expired(&self) -> bool {
        Utc::now() - self.updated_at > Duration::hours(SESSION_TTL_HOURS)
    }

    /// Whether any file still has work left.
    pub fn has_pending(&self) -> bool {
        self.file_progresses
            .iter()
            .any(|fp| matches!(fp.status, FileStatus::Pending | FileStatus::Translating))
    }

    /// Update the status of one file and mark it current.
    pub fn set_file_status(&mut self, file_index: usize, status: FileStatus) {
        if let Some(progress) = self.file_progresses.get_mut(file_index) {
            progress.status = status;
        }
        self.current_file_index = file_index;
        self.touch();
    }

    /// Update the completed-line counter of one file.
    pub fn set_file_progress(&mut self, file_index: usize, current: usize) {
        if let Some(progress) = self.file_progresses.get_mut(file_index) {
            progress.current = current;
        }
        self.touch();
    }

    /// Record a completed batch for a file.
    pub fn add_completed_batch(&mut self, file_index: usize, batch: CompletedBatch) {
        let batches = self.completed_batches.entry(file_index).or_default();
        batches.push(batch);

        let total_completed: usize = batches.iter().map(|b| b.line_count).sum();
        if let Some(progress) = self.file_progresses.get_mut(file_index) {
            progress.current = total_completed.min(progress.total);
        }
        self.touch();
    }

    /// Line totals across the whole job: (completed, total).
    pub fn line_totals(&self) -> (usize, usize) {
        let completed = self.file_progresses.iter().map(|fp| fp.current).sum();
        let total = self.file_progresses.iter().map(|fp| fp.total).sum();
        (completed, total)
    }
}

/// Load a session worth resuming: present, unexpired, and with pending work.
/// Expired sessions are cleared as a side effect.
pub async fn load_resumable(store: &dyn SessionStore) -> Option<TranslationSession> {
    let session = match store.load().await {
        Ok(Some(session)) => session,
        Ok(None) => return None,
        Err(e) => {
            warn!("Failed to load stored session: {}", e);
            return None;
        }
    };

    if session.is_expired() {
        if let Err(e) = store.clear().await {
            warn!("Failed to clear expired session: {}", e);
        }
        return None;
    }

    if !session.has_pending() {
        return None;
    }

    Some(session)
}
