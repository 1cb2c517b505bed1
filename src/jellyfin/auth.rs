//! Jellyfin authentication implementation

use reqwest::{header, Client, StatusCode};
use tracing::{debug, instrument};

use crate::jellyfin::api::JellyfinError;
use crate::jellyfin::models::{AuthRequest, AuthResponse};

const CLIENT_NAME: &str = "jellyresume";
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Builds the `X-Emby-Authorization` value identifying this client and device.
pub fn authorization_header_value(device_name: &str, device_id: &str, token: Option<&str>) -> String {
    let mut value = format!(
        "MediaBrowser Client=\"{}\", Device=\"{}\", DeviceId=\"{}\", Version=\"{}\"",
        CLIENT_NAME, device_name, device_id, CLIENT_VERSION
    );
    if let Some(token) = token {
        value.push_str(&format!(", Token=\"{}\"", token));
    }
    value
}

/// Handles authentication with a Jellyfin server
#[instrument(skip(client, password))]
pub async fn authenticate(
    client: &Client,
    server_url: &str,
    device_name: &str,
    device_id: &str,
    username: &str,
    password: &str,
) -> Result<AuthResponse, JellyfinError> {
    let server_url = server_url.trim_end_matches('/');
    let auth_url = format!("{}/Users/AuthenticateByName", server_url);

    let auth_request = AuthRequest {
        username: username.to_string(),
        pw: password.to_string(),
    };

    let auth_value = header::HeaderValue::from_str(&authorization_header_value(device_name, device_id, None))
        .map_err(|e| JellyfinError::Other(format!("Invalid authorization header: {}", e)))?;

    let mut headers = header::HeaderMap::new();
    headers.insert("X-Emby-Authorization", auth_value);

    let response = client
        .post(&auth_url)
        .headers(headers)
        .json(&auth_request)
        .send()
        .await?;

    let status = response.status();
    debug!("Authentication response status: {}", status);
    match status {
        StatusCode::OK => {
            let response_text = response.text().await?;
            serde_json::from_str::<AuthResponse>(&response_text)
                .map_err(|e| JellyfinError::InvalidResponse(format!("Failed to parse auth response: {}", e)))
        }
        StatusCode::UNAUTHORIZED | StatusCode::BAD_REQUEST => {
            let error_text = response.text().await.unwrap_or_default();
            Err(JellyfinError::Authentication(format!("Login failed ({}): {}", status, error_text)))
        }
        _ => {
            let error_text = response.text().await.unwrap_or_default();
            Err(JellyfinError::InvalidResponse(format!("Login failed ({}): {}", status, error_text)))
        }
    }
}
