//! Jellyfin API client implementation

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

use crate::jellyfin::auth::{self, authorization_header_value};
use crate::jellyfin::models::{AuthResponse, ItemsResponse, MediaItem};
use crate::jellyfin::models_playback::{PlaybackProgressReport, PlaybackStartReport, PlaybackStopReport};

const API_LOG_TARGET: &str = "jellyresume::jellyfin::api";

/// Error types for Jellyfin API operations
#[derive(Debug, Error)]
pub enum JellyfinError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Authentication error: {0}")]
    Authentication(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Error: {0}")]
    Other(String),
}

impl JellyfinError {
    /// True for transport timeouts, which are expected on flaky links.
    pub fn is_timeout(&self) -> bool {
        matches!(self, JellyfinError::Network(e) if e.is_timeout())
    }
}

/// The subset of the server API the playback reporter depends on.
#[async_trait]
pub trait JellyfinApiContract: Send + Sync {
    fn api_key(&self) -> Option<&str>;
    fn user_id(&self) -> Option<&str>;
    async fn report_playback_start(&self, report: &PlaybackStartReport) -> Result<(), JellyfinError>;
    async fn report_playback_progress(&self, report: &PlaybackProgressReport) -> Result<(), JellyfinError>;
    async fn report_playback_stopped(&self, report: &PlaybackStopReport) -> Result<(), JellyfinError>;
}

/// Client for interacting with Jellyfin API
#[derive(Clone, Debug)]
pub struct JellyfinClient {
    client: Client,
    server_url: String,
    api_key: Option<String>,
    user_id: Option<String>,
    device_id: String,
    device_name: String,
}

impl JellyfinClient {
    /// Create a new Jellyfin client with the server URL
    pub fn new(server_url: &str) -> Self {
        debug!(target: API_LOG_TARGET, "Creating new JellyfinClient with server_url: {}", server_url);

        let client = match Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                warn!(target: API_LOG_TARGET, "Error creating HTTP client with timeout: {:?}. Falling back to default.", e);
                Client::new()
            }
        };

        JellyfinClient {
            client,
            server_url: server_url.trim_end_matches('/').to_string(),
            api_key: None,
            user_id: None,
            device_id: "jellyresume".to_string(),
            device_name: "jellyresume".to_string(),
        }
    }

    /// Set API key for authentication
    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    /// Set user ID for requests
    pub fn with_user_id(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    /// Set the device identity announced to the server
    pub fn with_device(mut self, device_id: &str, device_name: &str) -> Self {
        self.device_id = device_id.to_string();
        self.device_name = device_name.to_string();
        self
    }

    // --- Private Helper Methods ---

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url, path)
    }

    /// Checks if the client has authentication credentials.
    fn ensure_authenticated(&self) -> Result<(&str, &str), JellyfinError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| JellyfinError::Authentication("API key not set".to_string()))?;
        let user_id = self.user_id.as_deref().ok_or_else(|| JellyfinError::Authentication("User ID not set".to_string()))?;
        Ok((api_key, user_id))
    }

    fn authorization(&self, api_key: &str) -> String {
        authorization_header_value(&self.device_name, &self.device_id, Some(api_key))
    }

    /// Sends a GET request and deserializes the JSON response.
    async fn get_json<T: DeserializeOwned>(&self, path: &str, query_params: &[(&str, &str)]) -> Result<T, JellyfinError> {
        let (api_key, _) = self.ensure_authenticated()?;
        let url = self.build_url(path);
        debug!(target: API_LOG_TARGET, "Sending GET request to: {}", url);

        let response = self.client
            .get(&url)
            .header("X-Emby-Token", api_key)
            .header("X-Emby-Authorization", self.authorization(api_key))
            .query(query_params)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Sends a POST request with a JSON body and expects a 2xx without body on success.
    async fn post_json_no_content<T: Serialize>(&self, path: &str, body: &T) -> Result<(), JellyfinError> {
        let (api_key, _) = self.ensure_authenticated()?;
        let url = self.build_url(path);
        trace!(target: API_LOG_TARGET, "Sending POST request with JSON body to: {}", url);

        let response = self.client
            .post(&url)
            .header("X-Emby-Token", api_key)
            .header("X-Emby-Authorization", self.authorization(api_key))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            trace!(target: API_LOG_TARGET, "POST request successful with status: {}", status);
            Ok(())
        } else {
            let error_text = response.text().await.unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(target: API_LOG_TARGET, "POST request failed. Status: {}, Body: {}", status, error_text);
            Err(Self::status_error(status, error_text))
        }
    }

    fn status_error(status: StatusCode, error_text: String) -> JellyfinError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                JellyfinError::Authentication(format!("Authentication failed ({}): {}", status, error_text))
            }
            StatusCode::NOT_FOUND => JellyfinError::NotFound(format!("Resource not found ({}): {}", status, error_text)),
            _ => JellyfinError::InvalidResponse(format!("Request failed with status {}: {}", status, error_text)),
        }
    }

    /// Handles response status checking and JSON deserialization.
    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, JellyfinError> {
        let status = response.status();
        trace!(target: API_LOG_TARGET, "Response status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(target: API_LOG_TARGET, "Request failed. Status: {}, Body: {}", status, error_text);
            return Err(Self::status_error(status, error_text));
        }

        let response_text = response.text().await?;
        if response_text.is_empty() {
            return Err(JellyfinError::InvalidResponse("Empty response body received".to_string()));
        }
        serde_json::from_str::<T>(&response_text).map_err(|e| {
            error!(target: API_LOG_TARGET, "JSON parsing error: {}", e);
            JellyfinError::InvalidResponse(format!("Failed to parse JSON response: {}", e))
        })
    }

    // --- Public API Methods ---

    /// Authenticate with Jellyfin using username and password
    pub async fn authenticate(&mut self, username: &str, password: &str) -> Result<AuthResponse, JellyfinError> {
        info!(target: API_LOG_TARGET, "Authenticating user: {}", username);
        let auth_response = auth::authenticate(
            &self.client,
            &self.server_url,
            &self.device_name,
            &self.device_id,
            username,
            password,
        )
        .await?;
        info!(target: API_LOG_TARGET, "Authentication successful for user ID: {}", auth_response.user.id);
        self.api_key = Some(auth_response.access_token.clone());
        self.user_id = Some(auth_response.user.id.clone());
        Ok(auth_response)
    }

    /// Get root items from the user's library (Views)
    pub async fn get_items(&self) -> Result<Vec<MediaItem>, JellyfinError> {
        let (_, user_id) = self.ensure_authenticated()?;
        let path = format!("/Users/{}/Views", user_id);
        let response: ItemsResponse = self.get_json(&path, &[]).await?;
        debug!(target: API_LOG_TARGET, "Successfully fetched {} root items", response.items.len());
        Ok(response.items)
    }

    /// Get child items of a folder/collection
    pub async fn get_items_by_parent_id(&self, parent_id: &str) -> Result<Vec<MediaItem>, JellyfinError> {
        let (_, user_id) = self.ensure_authenticated()?;
        let path = format!("/Users/{}/Items", user_id);
        let response: ItemsResponse = self.get_json(&path, &[("ParentId", parent_id)]).await?;
        debug!(target: API_LOG_TARGET, "Successfully fetched {} items for parent {}", response.items.len(), parent_id);
        Ok(response.items)
    }

    /// Get a single item with the fields needed for playback.
    pub async fn get_item(&self, item_id: &str) -> Result<MediaItem, JellyfinError> {
        let (_, user_id) = self.ensure_authenticated()?;
        let path = format!("/Users/{}/Items/{}", user_id, item_id);
        self.get_json(&path, &[]).await
    }

    /// Get the user's partially played items, most recent first.
    pub async fn get_resume_items(&self, limit: usize) -> Result<Vec<MediaItem>, JellyfinError> {
        let (_, user_id) = self.ensure_authenticated()?;
        let path = format!("/Users/{}/Items/Resume", user_id);
        let limit = limit.to_string();
        let params = [
            ("Limit", limit.as_str()),
            ("MediaTypes", "Video"),
            ("Fields", "Overview,Genres,CommunityRating,OfficialRating"),
            ("EnableUserData", "true"),
        ];
        let response: ItemsResponse = self.get_json(&path, &params).await?;
        debug!(target: API_LOG_TARGET, "Fetched {} resume items", response.items.len());
        Ok(response.items)
    }

    /// Get streaming URL for an item
    pub fn get_stream_url(&self, item: &MediaItem) -> Result<String, JellyfinError> {
        let (api_key, _) = self.ensure_authenticated()?;
        let kind = if item.media_type == "Audio" { "Audio" } else { "Videos" };
        Ok(format!(
            "{}/{}/{}/stream?static=true&api_key={}",
            self.server_url,
            kind,
            urlencoding::encode(&item.id),
            urlencoding::encode(api_key)
        ))
    }

    /// Primary image URL for an item.
    pub fn image_url(&self, item_id: &str) -> String {
        format!("{}/Items/{}/Images/Primary", self.server_url, urlencoding::encode(item_id))
    }

    // --- Getter methods (primarily for testing/debugging) ---
    pub fn get_server_url(&self) -> &str { &self.server_url }
    pub fn get_api_key(&self) -> Option<&str> { self.api_key.as_deref() }
    pub fn get_user_id(&self) -> Option<&str> { self.user_id.as_deref() }
}

#[async_trait]
impl JellyfinApiContract for JellyfinClient {
    fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Report playback started to Jellyfin server via HTTP POST.
    async fn report_playback_start(&self, report: &PlaybackStartReport) -> Result<(), JellyfinError> {
        info!(target: API_LOG_TARGET, "Reporting playback start for item_id: {}", report.base.item_id);
        self.post_json_no_content("/Sessions/Playing", report).await
    }

    /// Report playback progress to Jellyfin server via HTTP POST.
    async fn report_playback_progress(&self, report: &PlaybackProgressReport) -> Result<(), JellyfinError> {
        trace!(target: API_LOG_TARGET, "Reporting playback progress for item_id: {}, PositionTicks: {}", report.base.item_id, report.base.position_ticks);
        self.post_json_no_content("/Sessions/Playing/Progress", report).await
    }

    /// Report playback stopped to Jellyfin server via HTTP POST.
    async fn report_playback_stopped(&self, report: &PlaybackStopReport) -> Result<(), JellyfinError> {
        info!(target: API_LOG_TARGET, "Reporting playback stopped for item_id: {}", report.base.item_id);
        self.post_json_no_content("/Sessions/Playing/Stopped", report).await
    }
}
