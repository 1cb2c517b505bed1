use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use crate::jellyfin::JellyfinError;
use crate::playback::policy::ReportTrigger;

/// Identifies what is being played.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemIdentifier {
    /// An item on the media server.
    Remote { item_id: String },
    /// A file on local storage.
    Local { location: PathBuf },
}

impl fmt::Display for ItemIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemIdentifier::Remote { item_id } => write!(f, "{}", item_id),
            ItemIdentifier::Local { location } => write!(f, "{}", location.display()),
        }
    }
}

/// The kind of playback event a report describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportEvent {
    Start,
    Pause,
    Resume,
    Progress,
    Stop,
}

impl From<ReportTrigger> for ReportEvent {
    fn from(trigger: ReportTrigger) -> Self {
        match trigger {
            ReportTrigger::Start => ReportEvent::Start,
            ReportTrigger::Pause => ReportEvent::Pause,
            ReportTrigger::Resume => ReportEvent::Resume,
            ReportTrigger::Tick => ReportEvent::Progress,
            ReportTrigger::Stop => ReportEvent::Stop,
        }
    }
}

/// A single report handed to a backend for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackReport {
    pub item: ItemIdentifier,
    pub session_token: Uuid,
    pub event: ReportEvent,
    pub position_seconds: u64,
    pub is_paused: bool,
    pub duration_seconds: Option<u64>,
    /// Per-session dispatch order; later dispatches carry larger numbers.
    pub sequence: u64,
}

impl PlaybackReport {
    /// Fraction of the known duration reached, if the duration is known and non-zero.
    pub fn progress_ratio(&self) -> Option<f64> {
        match self.duration_seconds {
            Some(total) if total > 0 => Some(self.position_seconds as f64 / total as f64),
            _ => None,
        }
    }
}

/// A report could not be delivered. The session keeps its acknowledged
/// state and retries on the next eligible event.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Delivery failed: {0}")]
    Delivery(#[from] JellyfinError),
    #[error("Report does not belong to this backend: {0}")]
    WrongItem(String),
    #[error("Local store write did not complete: {0}")]
    LocalWrite(#[from] tokio::task::JoinError),
}

/// Missing context needed to build reports at all.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SetupError {
    #[error("No API key available for reporting")]
    MissingApiKey,
    #[error("No user ID available for reporting")]
    MissingUserId,
    #[error("Item identifier {0} cannot be reported by this backend")]
    UnsupportedItem(String),
}

/// Which delivery strategy a backend implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Remote,
    Local,
}

/// Delivers decided reports. Implemented by the remote (server) and local
/// (key-value store) strategies.
#[async_trait]
pub trait ReporterBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Delivers one start/pause/resume/progress report.
    async fn deliver(&self, report: &PlaybackReport) -> Result<(), ReportError>;

    /// Terminal action after the final report on stop.
    async fn close_out(&self, report: &PlaybackReport) -> Result<(), ReportError>;
}
