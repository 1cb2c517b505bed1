use async_trait::async_trait;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use crate::playback::backend::{
    BackendKind, ItemIdentifier, PlaybackReport, ReportError, ReporterBackend, SetupError,
};
use crate::storage::{KeyValueStore, StoredValue};

const LOCAL_LOG_TARGET: &str = "jellyresume::playback::local";

/// Store keys for one local file, derived from a stable hash of its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeKey {
    hash: String,
}

impl ResumeKey {
    /// Hashes the canonical `file://` URL of `location` (UUID v5, URL namespace).
    ///
    /// Files that cannot be canonicalized (e.g. already deleted) hash their
    /// absolute path instead, so the key stays stable either way.
    pub fn for_location(location: &Path) -> Self {
        let absolute = fs::canonicalize(location).unwrap_or_else(|_| {
            if location.is_absolute() {
                location.to_path_buf()
            } else {
                env::current_dir()
                    .map(|cwd| cwd.join(location))
                    .unwrap_or_else(|_| location.to_path_buf())
            }
        });
        let canonical = Url::from_file_path(&absolute)
            .map(String::from)
            .unwrap_or_else(|_| format!("file://{}", absolute.display()));
        let hash = Uuid::new_v5(&Uuid::NAMESPACE_URL, canonical.as_bytes()).simple().to_string();
        Self { hash }
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn position_key(&self) -> String {
        format!("resume.{}.position", self.hash)
    }

    pub fn completed_key(&self) -> String {
        format!("resume.{}.completed", self.hash)
    }
}

/// What the store remembers about a local file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalResumeState {
    Unplayed,
    InProgress { position_seconds: u64 },
    Completed,
}

/// Reads the saved resume state for a file.
pub fn resume_state(store: &dyn KeyValueStore, key: &ResumeKey) -> LocalResumeState {
    if store.get(&key.completed_key()).and_then(|v| v.as_bool()) == Some(true) {
        return LocalResumeState::Completed;
    }
    match store.get(&key.position_key()).and_then(|v| v.as_integer()) {
        Some(p) if p >= 0 => LocalResumeState::InProgress { position_seconds: p as u64 },
        _ => LocalResumeState::Unplayed,
    }
}

/// Orders writes for one file: stale sequence numbers are dropped and
/// nothing is written after the close-out.
#[derive(Debug, Default)]
struct WriteCursor {
    applied: Option<u64>,
    closed: bool,
}

/// The store writes of a local session, run on the blocking pool.
struct LocalWriter {
    store: Arc<dyn KeyValueStore>,
    key: ResumeKey,
    cursor: Mutex<WriteCursor>,
}

impl LocalWriter {
    fn cursor(&self) -> MutexGuard<'_, WriteCursor> {
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Saves a position unless a newer write or the close-out already landed.
    /// The cursor stays locked for the write so check and write cannot interleave.
    fn save(&self, sequence: u64, position_seconds: u64) -> bool {
        let mut cursor = self.cursor();
        if cursor.closed || cursor.applied.is_some_and(|applied| applied > sequence) {
            debug!(target: LOCAL_LOG_TARGET, sequence, ?cursor, "Dropping stale local write");
            return false;
        }
        self.save_position(position_seconds);
        cursor.applied = Some(sequence);
        true
    }

    fn close(&self, sequence: u64, position_seconds: u64, completed: bool) {
        let mut cursor = self.cursor();
        if cursor.closed {
            return;
        }
        if completed {
            self.mark_completed();
        } else {
            self.save_position(position_seconds);
        }
        cursor.applied = Some(cursor.applied.map_or(sequence, |applied| applied.max(sequence)));
        cursor.closed = true;
    }

    /// Saving a position clears any completed flag.
    fn save_position(&self, position_seconds: u64) {
        let value = i64::try_from(position_seconds).unwrap_or(i64::MAX);
        self.store.remove(&self.key.completed_key());
        self.store.set(&self.key.position_key(), StoredValue::Integer(value));
        debug!(target: LOCAL_LOG_TARGET, position = position_seconds, "Saved local position");
    }

    /// Marking completion clears any saved position.
    fn mark_completed(&self) {
        self.store.remove(&self.key.position_key());
        self.store.set(&self.key.completed_key(), StoredValue::Bool(true));
    }
}

/// Persists playback position of a local file to the key-value store.
pub struct LocalReporter {
    writer: Arc<LocalWriter>,
    location: PathBuf,
    completion_threshold: f64,
}

impl LocalReporter {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        item: &ItemIdentifier,
        completion_threshold: f64,
    ) -> Result<Self, SetupError> {
        let location = match item {
            ItemIdentifier::Local { location } => location.clone(),
            other => return Err(SetupError::UnsupportedItem(other.to_string())),
        };
        let key = ResumeKey::for_location(&location);
        debug!(target: LOCAL_LOG_TARGET, location = %location.display(), hash = key.hash(), "Local reporter ready");
        let writer = LocalWriter { store, key, cursor: Mutex::new(WriteCursor::default()) };
        Ok(Self { writer: Arc::new(writer), location, completion_threshold })
    }

    pub fn key(&self) -> &ResumeKey {
        &self.writer.key
    }

    pub fn state(&self) -> LocalResumeState {
        resume_state(self.writer.store.as_ref(), &self.writer.key)
    }

    pub fn saved_position(&self) -> Option<u64> {
        match self.state() {
            LocalResumeState::InProgress { position_seconds } => Some(position_seconds),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state() == LocalResumeState::Completed
    }

    fn check_item(&self, report: &PlaybackReport) -> Result<(), ReportError> {
        match &report.item {
            ItemIdentifier::Local { location } if *location == self.location => Ok(()),
            other => Err(ReportError::WrongItem(other.to_string())),
        }
    }
}

#[async_trait]
impl ReporterBackend for LocalReporter {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn deliver(&self, report: &PlaybackReport) -> Result<(), ReportError> {
        self.check_item(report)?;
        let writer = self.writer.clone();
        let (sequence, position) = (report.sequence, report.position_seconds);
        task::spawn_blocking(move || writer.save(sequence, position)).await?;
        Ok(())
    }

    async fn close_out(&self, report: &PlaybackReport) -> Result<(), ReportError> {
        self.check_item(report)?;
        let completed = report
            .progress_ratio()
            .is_some_and(|ratio| ratio >= self.completion_threshold);
        let writer = self.writer.clone();
        let (sequence, position) = (report.sequence, report.position_seconds);
        task::spawn_blocking(move || writer.close(sequence, position, completed)).await?;

        if completed {
            info!(target: LOCAL_LOG_TARGET, location = %self.location.display(), "Marked local file as completed");
        } else {
            info!(target: LOCAL_LOG_TARGET, location = %self.location.display(), position, "Saved local resume point");
        }
        Ok(())
    }
}
