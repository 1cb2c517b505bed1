use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, instrument, trace, warn};
use uuid::Uuid;

use crate::config::ReportingSettings;
use crate::jellyfin::JellyfinApiContract;
use crate::playback::backend::{ItemIdentifier, PlaybackReport, ReportEvent, ReporterBackend, SetupError};
use crate::playback::clock::{PlayerSample, PositionClock, SharedClock};
use crate::playback::local::LocalReporter;
use crate::playback::policy::{Acknowledged, Decision, PolicyInput, ReportTrigger, ReportingPolicy};
use crate::playback::remote::RemoteReporter;
use crate::storage::KeyValueStore;

const SESSION_LOG_TARGET: &str = "jellyresume::playback::session";

/// Lifecycle state of a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    Started,
    Stopped,
}

/// Bookkeeping for one media item open in a player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    pub item: ItemIdentifier,
    pub session_token: Uuid,
    pub has_started: bool,
    pub has_stopped: bool,
    /// Last state the backend confirmed; only advanced by the latest dispatch.
    pub acknowledged: Acknowledged,
    /// Sequence number of the most recent dispatch, if any.
    pub latest_attempted: Option<u64>,
    /// Position and instant of the latest dispatch while it is in flight.
    pub in_flight: Option<Acknowledged>,
    next_sequence: u64,
}

impl PlaybackSession {
    pub fn new(item: ItemIdentifier) -> Self {
        PlaybackSession {
            item,
            session_token: Uuid::new_v4(),
            has_started: false,
            has_stopped: false,
            acknowledged: Acknowledged::default(),
            latest_attempted: None,
            in_flight: None,
            next_sequence: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        match (self.has_started, self.has_stopped) {
            (_, true) => SessionState::Stopped,
            (true, false) => SessionState::Started,
            (false, false) => SessionState::NotStarted,
        }
    }

    pub fn last_reported_position(&self) -> Option<u64> {
        self.acknowledged.position
    }

    pub fn last_report_timestamp(&self) -> Option<Instant> {
        self.acknowledged.at
    }

    /// State the policy measures against: the in-flight report if there is
    /// one, so a slow delivery does not make every tick fire again.
    pub fn policy_baseline(&self) -> Acknowledged {
        self.in_flight.unwrap_or(self.acknowledged)
    }

    fn next_report(&mut self, event: ReportEvent, position_seconds: u64, is_paused: bool, duration_seconds: Option<u64>) -> PlaybackReport {
        self.next_sequence += 1;
        self.latest_attempted = Some(self.next_sequence);
        self.in_flight = Some(Acknowledged {
            position: Some(position_seconds),
            at: Some(Instant::now()),
        });
        PlaybackReport {
            item: self.item.clone(),
            session_token: self.session_token,
            event,
            position_seconds,
            is_paused,
            duration_seconds,
            sequence: self.next_sequence,
        }
    }

    /// Advances the acknowledged cursor, unless a newer dispatch exists.
    /// Returns whether the update was accepted.
    fn acknowledge(&mut self, report: &PlaybackReport) -> bool {
        if self.latest_attempted != Some(report.sequence) {
            return false;
        }
        if let Some(delivered) = self.in_flight.take() {
            self.acknowledged = delivered;
        }
        true
    }

    /// Drops the in-flight marker of a failed latest dispatch so the next
    /// tick is measured against the last acknowledged state again.
    fn reject(&mut self, report: &PlaybackReport) {
        if self.latest_attempted == Some(report.sequence) {
            self.in_flight = None;
        }
    }
}

/// Drives one playback session: guards the lifecycle, consults the policy
/// and hands reports to the backend as fire-and-forget tasks.
///
/// Every operation that dispatches returns the delivery task's handle;
/// dropping it leaves the delivery running. Must be used inside a tokio runtime.
#[derive(Clone)]
pub struct SessionManager {
    session: Arc<Mutex<PlaybackSession>>,
    backend: Arc<dyn ReporterBackend>,
    policy: ReportingPolicy,
    clock: SharedClock,
}

impl SessionManager {
    pub fn new(item: ItemIdentifier, backend: Arc<dyn ReporterBackend>, policy: ReportingPolicy) -> Self {
        let session = PlaybackSession::new(item);
        debug!(target: SESSION_LOG_TARGET, item = %session.item, token = %session.session_token, "Created playback session");
        SessionManager {
            session: Arc::new(Mutex::new(session)),
            backend,
            policy,
            clock: Arc::new(Mutex::new(PositionClock::new())),
        }
    }

    /// Session for a server item, reported through the Jellyfin API.
    pub fn remote(
        jellyfin_client: Arc<dyn JellyfinApiContract>,
        item_id: &str,
        settings: &ReportingSettings,
    ) -> Result<Self, SetupError> {
        let item = ItemIdentifier::Remote { item_id: item_id.to_string() };
        let backend = RemoteReporter::new(jellyfin_client, &item, settings.completion_threshold)?;
        Ok(Self::new(item, Arc::new(backend), ReportingPolicy::throttled(settings)))
    }

    /// Session for a local file, persisted to the key-value store.
    pub fn local(
        store: Arc<dyn KeyValueStore>,
        location: impl Into<PathBuf>,
        settings: &ReportingSettings,
    ) -> Result<Self, SetupError> {
        let item = ItemIdentifier::Local { location: location.into() };
        let backend = LocalReporter::new(store, &item, settings.completion_threshold)?;
        Ok(Self::new(item, Arc::new(backend), ReportingPolicy::cadence(settings)))
    }

    fn lock(&self) -> MutexGuard<'_, PlaybackSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn duration_seconds(&self) -> Option<u64> {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner).duration_seconds()
    }

    fn clock_paused(&self) -> bool {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner).is_paused()
    }

    pub fn clock(&self) -> SharedClock {
        self.clock.clone()
    }

    pub fn session_token(&self) -> Uuid {
        self.lock().session_token
    }

    pub fn state(&self) -> SessionState {
        self.lock().state()
    }

    /// Copy of the current bookkeeping.
    pub fn snapshot(&self) -> PlaybackSession {
        self.lock().clone()
    }

    /// Sends the start report once; later calls are no-ops.
    #[instrument(skip(self))]
    pub fn start(&self, at_seconds: u64) -> Option<JoinHandle<()>> {
        let report = {
            let mut session = self.lock();
            if session.has_started {
                trace!(target: SESSION_LOG_TARGET, "Start ignored: session already started");
                return None;
            }
            session.has_started = true;
            session.next_report(ReportEvent::Start, at_seconds, false, self.duration_seconds())
        };
        Some(self.dispatch(report))
    }

    #[instrument(skip(self))]
    pub fn pause(&self, at_seconds: u64) -> Option<JoinHandle<()>> {
        self.discrete(ReportTrigger::Pause, at_seconds, true)
    }

    #[instrument(skip(self))]
    pub fn resume(&self, at_seconds: u64) -> Option<JoinHandle<()>> {
        self.discrete(ReportTrigger::Resume, at_seconds, false)
    }

    /// Periodic position update; reports only when the policy fires.
    pub fn tick(&self, at_seconds: u64, is_paused: bool) -> Option<JoinHandle<()>> {
        let report = {
            let mut session = self.lock();
            if session.has_stopped {
                return None;
            }
            let input = PolicyInput {
                started: session.has_started,
                trigger: ReportTrigger::Tick,
                position: at_seconds,
                is_paused,
            };
            match self.policy.decide(&input, &session.policy_baseline(), Instant::now()) {
                Decision::Fire(reason) => {
                    trace!(target: SESSION_LOG_TARGET, position = at_seconds, ?reason, "Tick fires a progress report");
                    session.next_report(ReportEvent::Progress, at_seconds, is_paused, self.duration_seconds())
                }
                Decision::Skip(reason) => {
                    trace!(target: SESSION_LOG_TARGET, position = at_seconds, ?reason, "Tick skipped");
                    return None;
                }
            }
        };
        Some(self.dispatch(report))
    }

    /// Records a player sample and forwards it as a tick.
    pub fn observe(&self, sample: PlayerSample) -> Option<JoinHandle<()>> {
        let (position, paused) = {
            let mut clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
            clock.observe(sample);
            (clock.position_seconds(), clock.is_paused())
        };
        self.tick(position, paused)
    }

    /// Final report plus backend close-out; runs at most once per session.
    #[instrument(skip(self))]
    pub fn stop(&self, at_seconds: u64) -> Option<JoinHandle<()>> {
        let report = {
            let mut session = self.lock();
            if !session.has_started || session.has_stopped {
                trace!(target: SESSION_LOG_TARGET, "Stop ignored in state {:?}", session.state());
                return None;
            }
            session.has_stopped = true;
            session.next_report(ReportEvent::Stop, at_seconds, self.clock_paused(), self.duration_seconds())
        };

        let backend = self.backend.clone();
        let session = self.session.clone();
        Some(tokio::spawn(async move {
            match backend.deliver(&report).await {
                Ok(()) => Self::record_success(&session, &report),
                Err(e) => {
                    Self::record_failure(&session, &report);
                    warn!(target: SESSION_LOG_TARGET, "Final playback report failed: {}", e);
                }
            }
            if let Err(e) = backend.close_out(&report).await {
                warn!(target: SESSION_LOG_TARGET, "Playback close-out failed: {}", e);
            }
        }))
    }

    fn discrete(&self, trigger: ReportTrigger, at_seconds: u64, is_paused: bool) -> Option<JoinHandle<()>> {
        let report = {
            let mut session = self.lock();
            if !session.has_started || session.has_stopped {
                trace!(target: SESSION_LOG_TARGET, ?trigger, "Ignored in state {:?}", session.state());
                return None;
            }
            session.next_report(trigger.into(), at_seconds, is_paused, self.duration_seconds())
        };
        Some(self.dispatch(report))
    }

    fn dispatch(&self, report: PlaybackReport) -> JoinHandle<()> {
        let backend = self.backend.clone();
        let session = self.session.clone();
        tokio::spawn(async move {
            match backend.deliver(&report).await {
                Ok(()) => Self::record_success(&session, &report),
                Err(e) => {
                    // The acknowledged cursor stays put; the next eligible tick retries.
                    Self::record_failure(&session, &report);
                    warn!(target: SESSION_LOG_TARGET, event = ?report.event, seq = report.sequence, "Playback report failed: {}", e);
                }
            }
        })
    }

    fn record_failure(session: &Mutex<PlaybackSession>, report: &PlaybackReport) {
        session.lock().unwrap_or_else(PoisonError::into_inner).reject(report);
    }

    fn record_success(session: &Mutex<PlaybackSession>, report: &PlaybackReport) {
        let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
        if session.acknowledge(report) {
            trace!(target: SESSION_LOG_TARGET, seq = report.sequence, position = report.position_seconds, "Report acknowledged");
        } else {
            debug!(
                target: SESSION_LOG_TARGET,
                seq = report.sequence,
                latest = ?session.latest_attempted,
                "Discarding stale acknowledgement"
            );
        }
    }
}
