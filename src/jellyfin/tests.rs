//! Unit tests for Jellyfin API client

#[cfg(test)]
mod tests {
    use crate::jellyfin::{
        authorization_header_value, JellyfinApiContract, JellyfinClient, MediaItem, PlaybackProgressReport,
        PlaybackReportBase, PlaybackStopReport, PlaybackStoppedInfoInner,
    };

    fn video(id: &str) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            name: "Test Movie".to_string(),
            media_type: "Movie".to_string(),
            ..MediaItem::default()
        }
    }

    #[test]
    fn test_client_creation() {
        let client = JellyfinClient::new("http://localhost:8096/");
        assert_eq!(client.get_server_url(), "http://localhost:8096");
        assert!(client.get_api_key().is_none());
        assert!(client.get_user_id().is_none());
    }

    #[test]
    fn test_client_with_user_id() {
        let client = JellyfinClient::new("http://localhost:8096")
            .with_api_key("test_api_key")
            .with_user_id("test_user_id");
        assert_eq!(JellyfinApiContract::api_key(&client), Some("test_api_key"));
        assert_eq!(JellyfinApiContract::user_id(&client), Some("test_user_id"));
    }

    #[test]
    fn test_get_stream_url() {
        let client = JellyfinClient::new("http://localhost:8096")
            .with_api_key("test_api_key")
            .with_user_id("u1");
        let url = client.get_stream_url(&video("item123")).unwrap();
        assert_eq!(url, "http://localhost:8096/Videos/item123/stream?static=true&api_key=test_api_key");

        let mut track = video("track9");
        track.media_type = "Audio".to_string();
        let url = client.get_stream_url(&track).unwrap();
        assert!(url.starts_with("http://localhost:8096/Audio/track9/stream"));
    }

    #[test]
    fn test_stream_url_requires_credentials() {
        let client = JellyfinClient::new("http://localhost:8096");
        assert!(client.get_stream_url(&video("item123")).is_err());
    }

    #[test]
    fn test_image_url() {
        let client = JellyfinClient::new("http://localhost:8096");
        assert_eq!(client.image_url("abc"), "http://localhost:8096/Items/abc/Images/Primary");
    }

    #[test]
    fn test_authorization_header_includes_token() {
        let value = authorization_header_value("Living Room", "dev-1", Some("tok"));
        assert!(value.starts_with("MediaBrowser Client=\"jellyresume\""));
        assert!(value.contains("DeviceId=\"dev-1\""));
        assert!(value.ends_with("Token=\"tok\""));
    }

    #[test]
    fn test_progress_report_serializes_pascal_case() {
        let report = PlaybackProgressReport {
            base: PlaybackReportBase::new("item1", "session-a", 70_000_000, true),
            event_name: "Pause".to_string(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["ItemId"], "item1");
        assert_eq!(json["PositionTicks"], 70_000_000i64);
        assert_eq!(json["IsPaused"], true);
        assert_eq!(json["PlaySessionId"], "session-a");
        assert_eq!(json["EventName"], "Pause");
        assert!(json.get("RunTimeTicks").is_none());
    }

    #[test]
    fn test_stop_report_flattens_base() {
        let report = PlaybackStopReport {
            base: PlaybackReportBase::new("item1", "session-a", 10, false),
            playback_stopped_info: PlaybackStoppedInfoInner { played_to_completion: true },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["ItemId"], "item1");
        assert_eq!(json["PlaybackStoppedInfo"]["PlayedToCompletion"], true);
    }

    #[test]
    fn test_media_item_deserializes_user_data() {
        let json = r#"{"Id":"x","Name":"Film","Type":"Movie","RunTimeTicks":72000000000,
            "Genres":["Drama"],"CommunityRating":7.5,"UserData":{"PlaybackPositionTicks":600000000,"Played":false}}"#;
        let item: MediaItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.run_time_ticks, Some(72_000_000_000));
        assert_eq!(item.genres, vec!["Drama".to_string()]);
        assert_eq!(item.user_data.unwrap().playback_position_ticks, 600_000_000);
    }
}
