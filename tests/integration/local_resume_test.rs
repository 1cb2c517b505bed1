//! Integration tests for local resume points
//!
//! Sessions write through to a JSON store on disk; the store is reopened
//! to check what a later launch would see.

use jellyresume::config::ReportingSettings;
use jellyresume::playback::{
    resume_state, run_player_events, LocalResumeState, PlayerEvent, PlayerSample, ResumeKey, SessionManager,
};
use jellyresume::storage::{
    ContinueWatchingEntry, ContinueWatchingSnapshot, ContinueWatchingStore, JsonFileStore, KeyValueStore,
};
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;
use tokio::sync::mpsc;

#[cfg(test)]
mod local_resume_tests {
    use super::*;

    async fn play(store_path: &Path, media: &Path, events: Vec<PlayerEvent>) -> Result<(), Box<dyn Error>> {
        let store = Arc::new(JsonFileStore::open(store_path)?);
        let manager = SessionManager::local(store, media, &ReportingSettings::default())?;
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            tx.send(event).await?;
        }
        drop(tx);
        run_player_events(manager, rx).await;
        Ok(())
    }

    fn progress(seconds: f64) -> PlayerEvent {
        PlayerEvent::Progress(PlayerSample::new(seconds, false, None))
    }

    #[tokio::test]
    async fn test_resume_point_survives_restart() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let media = dir.path().join("film.mkv");
        std::fs::write(&media, b"")?;
        let store_path = dir.path().join("resume.json");

        let mut events = vec![PlayerEvent::Started(PlayerSample::new(0.0, false, Some(300.0)))];
        events.extend((1..=47).map(|s| progress(s as f64)));
        play(&store_path, &media, events).await?;

        // Channel closed without a stop: the session stops at the last position
        let reopened = JsonFileStore::open(&store_path)?;
        let key = ResumeKey::for_location(&media);
        assert_eq!(resume_state(&reopened, &key), LocalResumeState::InProgress { position_seconds: 47 });

        // The same file reached through a different spelling maps to the same key
        let dotted = dir.path().join(".").join("film.mkv");
        assert_eq!(ResumeKey::for_location(&dotted), key);
        Ok(())
    }

    #[tokio::test]
    async fn test_watched_to_the_end_then_replayed() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let media = dir.path().join("episode.mp4");
        std::fs::write(&media, b"")?;
        let store_path = dir.path().join("resume.json");
        let key = ResumeKey::for_location(&media);

        play(
            &store_path,
            &media,
            vec![
                PlayerEvent::Started(PlayerSample::new(0.0, false, Some(1_200.0))),
                progress(600.0),
                PlayerEvent::Stopped(PlayerSample::new(1_150.0, false, None)),
            ],
        )
        .await?;
        let reopened = JsonFileStore::open(&store_path)?;
        assert_eq!(resume_state(&reopened, &key), LocalResumeState::Completed);
        assert!(reopened.get(&key.position_key()).is_none());

        play(
            &store_path,
            &media,
            vec![
                PlayerEvent::Started(PlayerSample::new(0.0, false, Some(1_200.0))),
                progress(30.0),
                PlayerEvent::Paused(PlayerSample::new(33.0, true, None)),
            ],
        )
        .await?;
        let reopened = JsonFileStore::open(&store_path)?;
        assert_eq!(resume_state(&reopened, &key), LocalResumeState::InProgress { position_seconds: 33 });
        assert!(reopened.get(&key.completed_key()).is_none());
        Ok(())
    }

    #[test]
    fn test_continue_watching_snapshot_on_disk() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let store = ContinueWatchingStore::new(dir.path().join("shared").join("continue_watching.json"));
        assert!(store.load()?.items.is_empty());

        let entry = ContinueWatchingEntry {
            id: "abc".to_string(),
            title: "Pilot".to_string(),
            image_url: "http://nas:8096/Items/abc/Images/Primary".to_string(),
            summary: Some("It begins.".to_string()),
            genre: None,
            rating: Some(8.1),
            duration_seconds: Some(2_700),
            position_seconds: 1_234,
        };
        store.save(&ContinueWatchingSnapshot::new(vec![entry.clone()]))?;

        let loaded = store.load()?;
        assert_eq!(loaded.items, vec![entry]);
        assert!(loaded.updated_at > 0);
        Ok(())
    }
}
