//! Data models for Jellyfin API responses

use serde::{Deserialize, Serialize};

/// Represents a media item in a Jellyfin library
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct MediaItem {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Type")]
    pub media_type: String,
    #[serde(rename = "Overview", default)]
    pub overview: Option<String>,
    #[serde(rename = "Path", default)]
    pub path: Option<String>,
    #[serde(rename = "IsFolder", default)]
    pub is_folder: bool,
    #[serde(rename = "RunTimeTicks", default)]
    pub run_time_ticks: Option<i64>, // Duration in 100-nanosecond units
    #[serde(rename = "Genres", default)]
    pub genres: Vec<String>,
    #[serde(rename = "CommunityRating", default)]
    pub community_rating: Option<f32>,
    #[serde(rename = "OfficialRating", default)]
    pub official_rating: Option<String>,
    #[serde(rename = "UserData", default)]
    pub user_data: Option<UserItemData>,
}

/// Per-user state the server keeps for an item (resume point, played flag).
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct UserItemData {
    #[serde(rename = "PlaybackPositionTicks", default)]
    pub playback_position_ticks: i64,
    #[serde(rename = "Played", default)]
    pub played: bool,
}

/// Represents a collection of media items with additional metadata
#[derive(Deserialize, Serialize, Debug)]
pub struct ItemsResponse {
    #[serde(rename = "Items")]
    pub items: Vec<MediaItem>,
    #[serde(rename = "TotalRecordCount", default)]
    pub total_record_count: i32,
}

/// Represents authentication request for Jellyfin
#[derive(Deserialize, Serialize, Debug)]
pub struct AuthRequest {
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "Pw")]
    pub pw: String,
}

/// Represents authentication response from Jellyfin
#[derive(Deserialize, Serialize, Debug)]
pub struct AuthResponse {
    #[serde(rename = "User")]
    pub user: User,
    #[serde(rename = "AccessToken")]
    pub access_token: String,
    #[serde(rename = "ServerId")]
    pub server_id: String,
}

/// Represents a user in Jellyfin
#[derive(Deserialize, Serialize, Debug)]
pub struct User {
    #[serde(rename = "Id", alias = "id")]
    pub id: String,
    #[serde(rename = "Name", alias = "name")]
    pub name: String,
    #[serde(default, rename = "ServerName", alias = "serverName")]
    pub server_name: Option<String>,
}
