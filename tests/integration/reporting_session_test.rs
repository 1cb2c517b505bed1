//! Integration tests for server-backed playback reporting
//!
//! A full session is driven against an in-process stand-in for the
//! Jellyfin playback endpoints.

use crate::test_utils::{RecordedCall, RecordingApi};
use jellyresume::config::ReportingSettings;
use jellyresume::playback::{run_player_events, PlayerEvent, PlayerSample, SessionManager, SessionState};
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;

#[cfg(test)]
mod reporting_session_tests {
    use super::*;

    async fn settle(handle: Option<JoinHandle<()>>) {
        if let Some(handle) = handle {
            handle.await.unwrap();
        }
    }

    fn summary(calls: &[RecordedCall]) -> Vec<(&'static str, i64, Option<String>)> {
        calls.iter().map(|c| (c.endpoint, c.position_ticks / 10_000_000, c.event_name.clone())).collect()
    }

    fn event(name: &str) -> Option<String> {
        Some(name.to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_remote_session() {
        let api = Arc::new(RecordingApi::new());
        let manager = SessionManager::remote(api.clone(), "movie-1", &ReportingSettings::default()).unwrap();
        manager.clock().lock().unwrap_or_else(PoisonError::into_inner).set_duration(Some(620.0));

        settle(manager.start(0)).await;
        for second in 1..=25 {
            time::advance(Duration::from_secs(1)).await;
            settle(manager.tick(second, false)).await;
        }
        settle(manager.pause(25)).await;
        time::advance(Duration::from_secs(30)).await;
        settle(manager.tick(25, true)).await;
        settle(manager.resume(25)).await;
        // Jump far ahead: reported at once
        settle(manager.tick(600, false)).await;
        settle(manager.stop(610)).await;

        assert_eq!(manager.state(), SessionState::Stopped);
        let calls = api.calls();
        assert_eq!(
            summary(&calls),
            vec![
                ("start", 0, None),
                ("progress", 10, event("TimeUpdate")),
                ("progress", 20, event("TimeUpdate")),
                ("progress", 25, event("Pause")),
                ("progress", 25, event("Unpause")),
                ("progress", 600, event("TimeUpdate")),
                ("progress", 610, event("TimeUpdate")),
                ("stopped", 610, None),
            ]
        );
        assert!(calls[3].is_paused);
        assert!(!calls[4].is_paused);
        assert_eq!(calls[7].played_to_completion, Some(true));

        let token = manager.session_token().to_string();
        assert!(calls.iter().all(|c| c.play_session_id == token));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_outage_retries_on_next_tick() {
        let api = Arc::new(RecordingApi::new());
        let manager = SessionManager::remote(api.clone(), "movie-2", &ReportingSettings::default()).unwrap();

        api.set_failing(true);
        settle(manager.start(0)).await;
        assert_eq!(manager.snapshot().last_reported_position(), None);

        time::advance(Duration::from_secs(1)).await;
        settle(manager.tick(1, false)).await;
        assert_eq!(manager.snapshot().last_reported_position(), None);

        api.set_failing(false);
        time::advance(Duration::from_secs(1)).await;
        settle(manager.tick(2, false)).await;
        assert_eq!(manager.snapshot().last_reported_position(), Some(2));

        // Back to normal throttling once acknowledged
        time::advance(Duration::from_secs(1)).await;
        assert!(manager.tick(3, false).is_none());
        assert_eq!(api.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_player_events_drive_remote_session() {
        let api = Arc::new(RecordingApi::new());
        let manager = SessionManager::remote(api.clone(), "movie-3", &ReportingSettings::default()).unwrap();
        let (tx, rx) = mpsc::channel(16);
        let runner = tokio::spawn(run_player_events(manager.clone(), rx));

        tx.send(PlayerEvent::Started(PlayerSample::new(120.0, false, Some(1_000.0)))).await.unwrap();
        tx.send(PlayerEvent::Paused(PlayerSample::new(121.2, true, None))).await.unwrap();
        tx.send(PlayerEvent::Stopped(PlayerSample::new(121.9, true, None))).await.unwrap();
        runner.await.unwrap();

        assert_eq!(manager.state(), SessionState::Stopped);
        let calls = api.calls();
        assert_eq!(
            summary(&calls),
            vec![
                ("start", 120, None),
                ("progress", 121, event("Pause")),
                ("progress", 121, event("TimeUpdate")),
                ("stopped", 121, None),
            ]
        );
        assert!(calls[2].is_paused, "Stopping while paused must not report playback as running");
        assert_eq!(calls[3].played_to_completion, Some(false));
    }
}
