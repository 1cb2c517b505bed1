//! Integration tests for Jellyfin client functionality
//!
//! These tests verify that the Jellyfin client components work together correctly.

use jellyresume::config::Settings;
use jellyresume::jellyfin::{JellyfinApiContract, JellyfinClient, MediaItem, UserItemData};
use jellyresume::storage::{ContinueWatchingEntry, DeepLink};
use std::error::Error;

#[cfg(test)]
mod jellyfin_integration_tests {
    use super::*;

    #[test]
    fn test_client_init_with_settings() {
        let settings = Settings {
            server_url: "https://test-server.com/".to_string(),
            api_key: Some("test-api-key".to_string()),
            username: Some("test-user".to_string()),
            user_id: Some("test-user-id".to_string()),
            ..Settings::default()
        };

        let client = JellyfinClient::new(&settings.server_url)
            .with_api_key(&settings.api_key.unwrap())
            .with_user_id(&settings.user_id.unwrap());

        assert_eq!(client.get_server_url(), "https://test-server.com");
        assert_eq!(client.get_api_key().unwrap(), "test-api-key");
        assert_eq!(client.get_user_id().unwrap(), "test-user-id");

        // The reporting seam sees the same credentials
        let contract: &dyn JellyfinApiContract = &client;
        assert_eq!(contract.api_key(), Some("test-api-key"));
        assert_eq!(contract.user_id(), Some("test-user-id"));
    }

    #[test]
    fn test_stream_url_generation() {
        let client = JellyfinClient::new("https://test-server.com")
            .with_api_key("test-api-key")
            .with_user_id("test-user-id");

        let item = MediaItem {
            id: "item123".to_string(),
            media_type: "Video".to_string(),
            ..MediaItem::default()
        };
        let url = client.get_stream_url(&item).unwrap();
        assert_eq!(url, "https://test-server.com/Videos/item123/stream?static=true&api_key=test-api-key");
    }

    #[test]
    fn test_resume_item_to_continue_watching_entry() {
        let client = JellyfinClient::new("https://test-server.com");
        let item = MediaItem {
            id: "ep7".to_string(),
            name: "Episode 7".to_string(),
            media_type: "Video".to_string(),
            run_time_ticks: Some(1_800 * 10_000_000),
            genres: vec!["Drama".to_string(), "Mystery".to_string()],
            user_data: Some(UserItemData { playback_position_ticks: 600 * 10_000_000, played: false }),
            ..MediaItem::default()
        };

        let entry = ContinueWatchingEntry::from_media_item(&item, client.image_url(&item.id));
        assert_eq!(entry.image_url, "https://test-server.com/Items/ep7/Images/Primary");
        assert_eq!(entry.duration_seconds, Some(1_800));
        assert_eq!(entry.position_seconds, 600);
        assert_eq!(entry.genre.as_deref(), Some("Drama"));

        let link = DeepLink::Play(entry.id.clone()).to_url("jellyresume");
        assert_eq!(link, "jellyresume://play/ep7");
        assert_eq!(DeepLink::parse(&link, "jellyresume").unwrap(), DeepLink::Play("ep7".to_string()));
    }

    #[tokio::test]
    #[ignore]
    async fn test_get_resume_items() -> Result<(), Box<dyn Error>> {
        let client = JellyfinClient::new("https://your-server.com")
            .with_api_key("your-api-key")
            .with_user_id("your-user-id");

        let items = client.get_resume_items(12).await?;
        assert!(items.len() <= 12, "Server should honour the limit");
        Ok(())
    }
}
