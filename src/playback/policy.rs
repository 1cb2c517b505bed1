//! Decides when a playback event should turn into a report.
//!
//! The policy is pure: it never touches the network or storage and takes the
//! current instant as an argument, so it can be driven with synthetic time.

use std::time::Duration;
use tokio::time::Instant;

use crate::config::ReportingSettings;

/// What caused the session to consider a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTrigger {
    Start,
    Pause,
    Resume,
    Tick,
    Stop,
}

impl ReportTrigger {
    /// Discrete, user-driven events bypass throttling.
    pub fn is_discrete(self) -> bool {
        !matches!(self, ReportTrigger::Tick)
    }
}

/// The last state the backend confirmed as delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Acknowledged {
    pub position: Option<u64>,
    pub at: Option<Instant>,
}

/// One evaluation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyInput {
    pub started: bool,
    pub trigger: ReportTrigger,
    pub position: u64,
    pub is_paused: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireReason {
    /// Nothing has been acknowledged yet.
    FirstReport,
    /// Start, pause, resume or stop.
    Discrete,
    /// Position drifted from the expected playhead by at least the seek threshold.
    Seek,
    /// Enough wall-clock time passed since the last acknowledged report.
    Elapsed,
    /// Position advanced past the progress interval.
    Advanced,
    /// Position landed on the local save cadence.
    Cadence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotStarted,
    Paused,
    Throttled,
    OffCadence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Fire(FireReason),
    Skip(SkipReason),
}

impl Decision {
    pub fn should_fire(&self) -> bool {
        matches!(self, Decision::Fire(_))
    }
}

/// Thresholds for the network-facing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    pub seek_threshold_secs: u64,
    pub progress_interval_secs: u64,
    pub report_interval: Duration,
}

impl Default for Throttle {
    fn default() -> Self {
        Self {
            seek_threshold_secs: 3,
            progress_interval_secs: 10,
            report_interval: Duration::from_secs(10),
        }
    }
}

/// Reporting policy, selected by the backend a session is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportingPolicy {
    /// Seek detection plus a dual wall-clock/position throttle (remote server).
    Throttled(Throttle),
    /// Fire whenever the position is a multiple of `every_secs` (local files).
    Cadence { every_secs: u64 },
}

impl ReportingPolicy {
    pub fn throttled(settings: &ReportingSettings) -> Self {
        ReportingPolicy::Throttled(Throttle {
            seek_threshold_secs: settings.seek_threshold_secs,
            progress_interval_secs: settings.progress_interval_secs,
            report_interval: Duration::from_secs(settings.report_interval_secs),
        })
    }

    pub fn cadence(settings: &ReportingSettings) -> Self {
        ReportingPolicy::Cadence { every_secs: settings.local_save_interval_secs.max(1) }
    }

    /// Evaluates one event against the last acknowledged state.
    pub fn decide(&self, input: &PolicyInput, ack: &Acknowledged, now: Instant) -> Decision {
        if !input.started {
            return Decision::Skip(SkipReason::NotStarted);
        }
        if input.trigger.is_discrete() {
            return Decision::Fire(FireReason::Discrete);
        }
        if input.is_paused {
            return Decision::Skip(SkipReason::Paused);
        }

        match self {
            ReportingPolicy::Throttled(throttle) => Self::decide_throttled(throttle, input.position, ack, now),
            ReportingPolicy::Cadence { every_secs } => {
                let every = (*every_secs).max(1);
                if input.position % every != 0 {
                    Decision::Skip(SkipReason::OffCadence)
                } else if ack.position == Some(input.position) {
                    // Several ticks can land inside the same whole second.
                    Decision::Skip(SkipReason::Throttled)
                } else {
                    Decision::Fire(FireReason::Cadence)
                }
            }
        }
    }

    fn decide_throttled(throttle: &Throttle, position: u64, ack: &Acknowledged, now: Instant) -> Decision {
        let last_position = match ack.position {
            Some(p) => p,
            None => return Decision::Fire(FireReason::FirstReport),
        };

        // A seek is a jump away from where steady playback would have carried
        // the last acknowledged position, in either direction.
        let expected = match ack.at {
            Some(at) => last_position.saturating_add(now.saturating_duration_since(at).as_secs()),
            None => last_position,
        };
        if position.abs_diff(expected) >= throttle.seek_threshold_secs {
            return Decision::Fire(FireReason::Seek);
        }

        let elapsed_due = match ack.at {
            Some(at) => now.saturating_duration_since(at) >= throttle.report_interval,
            None => true,
        };
        if elapsed_due {
            return Decision::Fire(FireReason::Elapsed);
        }

        if position.saturating_sub(last_position) >= throttle.progress_interval_secs {
            return Decision::Fire(FireReason::Advanced);
        }

        Decision::Skip(SkipReason::Throttled)
    }
}
