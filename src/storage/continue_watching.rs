//! Continue-watching snapshot shared with the home-screen extension.
//!
//! The extension runs out of process: it reads the snapshot file, renders a
//! carousel, and opens items through `scheme://{play|open}/{itemID}` links.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::jellyfin::MediaItem;
use crate::playback::ticks::ticks_to_seconds;
use crate::storage::kv::{write_atomically, StoreError};

/// One in-progress item shown in the carousel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinueWatchingEntry {
    pub id: String,
    pub title: String,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
    #[serde(default)]
    pub position_seconds: u64,
}

impl ContinueWatchingEntry {
    /// Builds an entry from a server resume item.
    pub fn from_media_item(item: &MediaItem, image_url: String) -> Self {
        ContinueWatchingEntry {
            id: item.id.clone(),
            title: item.name.clone(),
            image_url,
            summary: item.overview.clone(),
            genre: item.genres.first().cloned(),
            rating: item.community_rating,
            duration_seconds: item.run_time_ticks.map(ticks_to_seconds),
            position_seconds: item
                .user_data
                .as_ref()
                .map(|d| ticks_to_seconds(d.playback_position_ticks))
                .unwrap_or(0),
        }
    }
}

/// Ordered list of entries plus the time it was produced.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContinueWatchingSnapshot {
    pub updated_at: u64,
    pub items: Vec<ContinueWatchingEntry>,
}

impl ContinueWatchingSnapshot {
    pub fn new(items: Vec<ContinueWatchingEntry>) -> Self {
        let updated_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        ContinueWatchingSnapshot { updated_at, items }
    }
}

/// Reads and writes the snapshot at a shared location.
#[derive(Debug, Clone)]
pub struct ContinueWatchingStore {
    path: PathBuf,
}

impl ContinueWatchingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, snapshot: &ContinueWatchingSnapshot) -> Result<(), StoreError> {
        write_atomically(&self.path, snapshot)?;
        info!(path = %self.path.display(), items = snapshot.items.len(), "Wrote continue-watching snapshot");
        Ok(())
    }

    /// Returns an empty snapshot when nothing has been written yet.
    pub fn load(&self) -> Result<ContinueWatchingSnapshot, StoreError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No continue-watching snapshot yet");
            return Ok(ContinueWatchingSnapshot::default());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeepLinkError {
    #[error("Malformed deep link: {0}")]
    Malformed(String),
    #[error("Unexpected scheme '{0}'")]
    WrongScheme(String),
    #[error("Unknown deep link action '{0}'")]
    UnknownAction(String),
    #[error("Deep link has no item ID")]
    MissingItem,
}

/// A link issued by the home-screen extension back into the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeepLink {
    Play(String),
    Open(String),
}

impl DeepLink {
    pub fn item_id(&self) -> &str {
        match self {
            DeepLink::Play(id) | DeepLink::Open(id) => id,
        }
    }

    fn action(&self) -> &'static str {
        match self {
            DeepLink::Play(_) => "play",
            DeepLink::Open(_) => "open",
        }
    }

    pub fn to_url(&self, scheme: &str) -> String {
        format!("{}://{}/{}", scheme, self.action(), urlencoding::encode(self.item_id()))
    }

    pub fn parse(link: &str, scheme: &str) -> Result<Self, DeepLinkError> {
        let url = Url::parse(link).map_err(|e| DeepLinkError::Malformed(e.to_string()))?;
        if url.scheme() != scheme {
            return Err(DeepLinkError::WrongScheme(url.scheme().to_string()));
        }
        let action = url.host_str().unwrap_or_default().to_string();
        let raw_id = url.path().trim_start_matches('/');
        if raw_id.is_empty() {
            return Err(DeepLinkError::MissingItem);
        }
        let id = urlencoding::decode(raw_id)
            .map_err(|e| DeepLinkError::Malformed(e.to_string()))?
            .into_owned();
        match action.as_str() {
            "play" => Ok(DeepLink::Play(id)),
            "open" => Ok(DeepLink::Open(id)),
            _ => Err(DeepLinkError::UnknownAction(action)),
        }
    }
}

impl fmt::Display for DeepLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.action(), self.item_id())
    }
}
