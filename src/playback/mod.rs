//! Playback progress reporting: position clock, reporting policy, delivery
//! backends and the per-item session that ties them together.

pub mod backend;
pub mod clock;
pub mod event_loop;
pub mod local;
pub mod policy;
pub mod remote;
pub mod session;
pub mod ticks;

pub use backend::{BackendKind, ItemIdentifier, PlaybackReport, ReportError, ReportEvent, ReporterBackend, SetupError};
pub use clock::{PlayerSample, PositionClock, SharedClock};
pub use event_loop::{run_player_events, PlayerEvent};
pub use local::{resume_state, LocalReporter, LocalResumeState, ResumeKey};
pub use policy::{Acknowledged, Decision, FireReason, PolicyInput, ReportTrigger, ReportingPolicy, SkipReason, Throttle};
pub use remote::RemoteReporter;
pub use session::{PlaybackSession, SessionManager, SessionState};
pub use ticks::{seconds_to_ticks, ticks_to_seconds, TICKS_PER_SECOND};
