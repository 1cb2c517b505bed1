use std::sync::{Arc, Mutex};

/// One sample pushed by the external player.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlayerSample {
    pub position_seconds: f64,
    pub is_paused: bool,
    pub duration_seconds: Option<f64>,
}

impl PlayerSample {
    pub fn new(position_seconds: f64, is_paused: bool, duration_seconds: Option<f64>) -> Self {
        Self { position_seconds, is_paused, duration_seconds }
    }
}

/// Holds the latest position/duration reported by the player.
///
/// No reporting policy lives here; it only answers "where is playback now".
#[derive(Debug, Default, Clone)]
pub struct PositionClock {
    current_seconds: f64,
    total_seconds: Option<f64>,
    is_paused: bool,
}

// Type alias for a clock shared between the player adapter and the session
pub type SharedClock = Arc<Mutex<PositionClock>>;

impl PositionClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new sample. Non-finite or negative positions are clamped to 0,
    /// and a non-positive duration is treated as unknown.
    pub fn observe(&mut self, sample: PlayerSample) {
        self.current_seconds = if sample.position_seconds.is_finite() {
            sample.position_seconds.max(0.0)
        } else {
            0.0
        };
        if let Some(total) = sample.duration_seconds {
            self.total_seconds = (total.is_finite() && total > 0.0).then_some(total);
        }
        self.is_paused = sample.is_paused;
    }

    /// Sets the duration without touching the position, e.g. once media metadata loads.
    pub fn set_duration(&mut self, total_seconds: Option<f64>) {
        self.total_seconds = total_seconds.filter(|t| t.is_finite() && *t > 0.0);
    }

    /// Current position truncated to whole seconds.
    pub fn position_seconds(&self) -> u64 {
        self.current_seconds.floor() as u64
    }

    /// Known total duration in whole seconds, if any.
    pub fn duration_seconds(&self) -> Option<u64> {
        self.total_seconds.map(|t| t.floor() as u64)
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }
}
