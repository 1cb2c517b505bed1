//! Command-line interface implementation

use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;

use crate::playback::{PlayerEvent, PlayerSample};
use crate::storage::ContinueWatchingEntry;

/// Command-line arguments for jellyresume
#[derive(Parser, Debug)]
#[command(author, version, about = "Jellyfin playback progress reporter", long_about = None)]
pub struct Args {
    /// Jellyfin server URL
    #[arg(short, long, env = "JELLYFIN_URL")]
    pub server_url: Option<String>,

    /// Jellyfin API key
    #[arg(short, long, env = "JELLYFIN_API_KEY")]
    pub api_key: Option<String>,

    /// Username for Jellyfin login
    #[arg(short, long, env = "JELLYFIN_USERNAME")]
    pub username: Option<String>,

    /// Password for Jellyfin login
    #[arg(short, long, env = "JELLYFIN_PASSWORD")]
    pub password: Option<String>,

    /// Config file path
    #[arg(short, long, env = "JELLYRESUME_CONFIG")]
    pub config: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, env = "JELLYRESUME_LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Report playback of a server item; player events are read from stdin
    Play {
        /// Jellyfin item ID
        item_id: String,
    },
    /// Track playback of a local file; player events are read from stdin
    PlayLocal {
        /// Path of the media file
        path: PathBuf,
        /// Total duration in seconds, if known up front
        #[arg(long)]
        duration: Option<f64>,
    },
    /// Show the saved resume point of a local file
    ResumePoint {
        path: PathBuf,
    },
    /// Write the continue-watching snapshot for the home-screen extension
    ExportContinueWatching {
        /// Maximum number of items
        #[arg(long, default_value_t = 12)]
        limit: usize,
    },
    /// Handle a deep link issued by the home-screen extension
    OpenLink {
        url: String,
    },
}

/// Turns stdin lines into player events.
///
/// Lines look like `<start|pause|resume|tick|stop> <seconds> [duration]`.
/// Blank lines and lines starting with `#` are skipped. The pause state of
/// `tick` and `stop` lines follows the last pause/resume seen.
#[derive(Debug, Default)]
pub struct EventLineParser {
    paused: bool,
}

impl EventLineParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(&mut self, line: &str) -> Result<Option<PlayerEvent>, String> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let mut parts = line.split_whitespace();
        let verb = parts.next().unwrap_or_default().to_lowercase();
        let position = match parts.next() {
            Some(p) => p.parse::<f64>().map_err(|e| format!("Invalid position '{}': {}", p, e))?,
            None => return Err(format!("Missing position in '{}'", line)),
        };
        let duration = parts
            .next()
            .map(|d| d.parse::<f64>().map_err(|e| format!("Invalid duration '{}': {}", d, e)))
            .transpose()?;

        let event = match verb.as_str() {
            "start" => {
                self.paused = false;
                PlayerEvent::Started(PlayerSample::new(position, false, duration))
            }
            "pause" => {
                self.paused = true;
                PlayerEvent::Paused(PlayerSample::new(position, true, duration))
            }
            "resume" => {
                self.paused = false;
                PlayerEvent::Resumed(PlayerSample::new(position, false, duration))
            }
            "tick" => PlayerEvent::Progress(PlayerSample::new(position, self.paused, duration)),
            "stop" => PlayerEvent::Stopped(PlayerSample::new(position, self.paused, duration)),
            other => return Err(format!("Unknown event '{}'", other)),
        };
        Ok(Some(event))
    }
}

/// CLI user interface for interacting with the application
pub struct Cli {
    pub args: Args,
}

impl Cli {
    /// Create a new CLI instance
    pub fn new() -> Self {
        Cli {
            args: Args::parse(),
        }
    }

    /// Display the continue-watching entries that were exported
    pub fn display_entries(&self, entries: &[ContinueWatchingEntry]) {
        println!("\nContinue Watching:");
        println!("{:<5} {:<30} {:>10} {}", "#", "Title", "Progress", "ID");
        println!("{}", "-".repeat(80));

        for (index, entry) in entries.iter().enumerate() {
            let title = if entry.title.chars().count() > 28 {
                format!("{:.25}...", entry.title)
            } else {
                entry.title.clone()
            };
            let progress = match entry.duration_seconds {
                Some(total) if total > 0 => format!("{}%", entry.position_seconds * 100 / total),
                _ => "-".to_string(),
            };
            println!("{:<5} {:<30} {:>10} {}", index + 1, title, progress, entry.id);
        }
        println!();
    }

    /// Display error messages
    pub fn display_error(&self, error: &dyn Error) {
        eprintln!("Error: {}", error);
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self::new()
    }
}
