//! Playback reporting payloads for the Jellyfin API

use serde::Serialize;

/// Base structure shared by start, progress and stop reports.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PlaybackReportBase {
    pub item_id: String,
    pub media_source_id: String,
    pub position_ticks: i64,
    pub is_paused: bool,
    pub is_muted: bool,
    pub can_seek: bool,
    pub play_method: String, // e.g., "DirectPlay"
    pub play_session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_time_ticks: Option<i64>,
}

impl PlaybackReportBase {
    pub fn new(item_id: &str, play_session_id: &str, position_ticks: i64, is_paused: bool) -> Self {
        Self {
            item_id: item_id.to_string(),
            media_source_id: item_id.to_string(),
            position_ticks,
            is_paused,
            is_muted: false,
            can_seek: true,
            play_method: "DirectPlay".to_string(),
            play_session_id: play_session_id.to_string(),
            run_time_ticks: None,
        }
    }
}

/// POST /Sessions/Playing
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PlaybackStartReport {
    #[serde(flatten)]
    pub base: PlaybackReportBase,
}

/// POST /Sessions/Playing/Progress
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PlaybackProgressReport {
    #[serde(flatten)]
    pub base: PlaybackReportBase,
    /// "Pause", "Unpause" or "TimeUpdate".
    pub event_name: String,
}

/// Information specific to reporting playback stopped.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PlaybackStoppedInfoInner {
    pub played_to_completion: bool,
}

/// POST /Sessions/Playing/Stopped
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PlaybackStopReport {
    #[serde(flatten)]
    pub base: PlaybackReportBase,
    pub playback_stopped_info: PlaybackStoppedInfoInner,
}
