use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, instrument, trace, warn};

use crate::jellyfin::{
    JellyfinApiContract, JellyfinError, PlaybackProgressReport, PlaybackReportBase, PlaybackStartReport,
    PlaybackStopReport, PlaybackStoppedInfoInner,
};
use crate::playback::backend::{
    BackendKind, ItemIdentifier, PlaybackReport, ReportError, ReportEvent, ReporterBackend, SetupError,
};
use crate::playback::ticks::seconds_to_ticks;

const REPORTER_LOG_TARGET: &str = "jellyresume::playback::remote";

/// Reports playback state of a server item to the Jellyfin server.
pub struct RemoteReporter {
    jellyfin_client: Arc<dyn JellyfinApiContract>,
    item_id: String,
    completion_threshold: f64,
}

impl RemoteReporter {
    /// Fails when the client carries no credentials or the item is not a server item.
    pub fn new(
        jellyfin_client: Arc<dyn JellyfinApiContract>,
        item: &ItemIdentifier,
        completion_threshold: f64,
    ) -> Result<Self, SetupError> {
        if jellyfin_client.api_key().is_none() {
            return Err(SetupError::MissingApiKey);
        }
        if jellyfin_client.user_id().is_none() {
            return Err(SetupError::MissingUserId);
        }
        let item_id = match item {
            ItemIdentifier::Remote { item_id } => item_id.clone(),
            other => return Err(SetupError::UnsupportedItem(other.to_string())),
        };
        Ok(Self { jellyfin_client, item_id, completion_threshold })
    }

    fn build_base(&self, report: &PlaybackReport) -> Result<PlaybackReportBase, ReportError> {
        match &report.item {
            ItemIdentifier::Remote { item_id } if *item_id == self.item_id => {}
            other => return Err(ReportError::WrongItem(other.to_string())),
        }
        let mut base = PlaybackReportBase::new(
            &self.item_id,
            &report.session_token.to_string(),
            seconds_to_ticks(report.position_seconds),
            report.is_paused,
        );
        base.run_time_ticks = report.duration_seconds.map(seconds_to_ticks);
        Ok(base)
    }

    fn log_failure(event: ReportEvent, e: &JellyfinError) {
        if e.is_timeout() {
            warn!(target: REPORTER_LOG_TARGET, "Timeout reporting {:?}: {}", event, e);
        } else {
            error!(target: REPORTER_LOG_TARGET, "Failed to report {:?}: {}", event, e);
        }
    }
}

#[async_trait]
impl ReporterBackend for RemoteReporter {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    #[instrument(skip(self, report), fields(item_id = %self.item_id, event = ?report.event, position = report.position_seconds, seq = report.sequence))]
    async fn deliver(&self, report: &PlaybackReport) -> Result<(), ReportError> {
        let base = self.build_base(report)?;

        let result = match report.event {
            ReportEvent::Start => {
                self.jellyfin_client.report_playback_start(&PlaybackStartReport { base }).await
            }
            ReportEvent::Pause | ReportEvent::Resume | ReportEvent::Progress | ReportEvent::Stop => {
                let event_name = match report.event {
                    ReportEvent::Pause => "Pause",
                    ReportEvent::Resume => "Unpause",
                    _ => "TimeUpdate",
                };
                let progress = PlaybackProgressReport { base, event_name: event_name.to_string() };
                self.jellyfin_client.report_playback_progress(&progress).await
            }
        };

        match result {
            Ok(()) => {
                if report.event == ReportEvent::Start {
                    info!(target: REPORTER_LOG_TARGET, "Reported playback start successfully.");
                } else {
                    trace!(target: REPORTER_LOG_TARGET, "Reported playback progress successfully.");
                }
                Ok(())
            }
            Err(e) => {
                Self::log_failure(report.event, &e);
                Err(e.into())
            }
        }
    }

    #[instrument(skip(self, report), fields(item_id = %self.item_id, position = report.position_seconds))]
    async fn close_out(&self, report: &PlaybackReport) -> Result<(), ReportError> {
        let base = self.build_base(report)?;
        let completed = report
            .progress_ratio()
            .map(|ratio| ratio >= self.completion_threshold)
            .unwrap_or(false);

        let stop_report = PlaybackStopReport {
            base,
            playback_stopped_info: PlaybackStoppedInfoInner { played_to_completion: completed },
        };

        match self.jellyfin_client.report_playback_stopped(&stop_report).await {
            Ok(()) => {
                info!(target: REPORTER_LOG_TARGET, "Reported playback stop successfully (completed: {}).", completed);
                Ok(())
            }
            Err(e) => {
                Self::log_failure(ReportEvent::Stop, &e);
                Err(e.into())
            }
        }
    }
}
