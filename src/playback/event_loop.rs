use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

use crate::playback::clock::PlayerSample;
use crate::playback::session::SessionManager;

const LOOP_LOG_TARGET: &str = "jellyresume::playback::event_loop";

/// Lifecycle callbacks emitted by the external player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerEvent {
    Started(PlayerSample),
    Paused(PlayerSample),
    Resumed(PlayerSample),
    Progress(PlayerSample),
    Stopped(PlayerSample),
}

impl PlayerEvent {
    pub fn sample(&self) -> PlayerSample {
        match self {
            PlayerEvent::Started(s)
            | PlayerEvent::Paused(s)
            | PlayerEvent::Resumed(s)
            | PlayerEvent::Progress(s)
            | PlayerEvent::Stopped(s) => *s,
        }
    }
}

/// Feeds player events into a session until the player stops or the channel closes.
///
/// A closed channel counts as the player view being dismissed: a best-effort
/// stop is issued at the last known position. Outstanding deliveries are
/// awaited before returning.
#[instrument(skip_all, fields(token = %manager.session_token()))]
pub async fn run_player_events(manager: SessionManager, mut events: mpsc::Receiver<PlayerEvent>) {
    info!(target: LOOP_LOG_TARGET, "Player event loop started.");
    let mut pending: Vec<JoinHandle<()>> = Vec::new();
    let mut stopped = false;

    while let Some(event) = events.recv().await {
        trace!(target: LOOP_LOG_TARGET, "Received player event: {:?}", event);
        let handle = match event {
            PlayerEvent::Progress(sample) => manager.observe(sample),
            other => {
                let position = {
                    let clock = manager.clock();
                    let mut clock = clock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                    clock.observe(other.sample());
                    clock.position_seconds()
                };
                match other {
                    PlayerEvent::Started(_) => manager.start(position),
                    PlayerEvent::Paused(_) => manager.pause(position),
                    PlayerEvent::Resumed(_) => manager.resume(position),
                    PlayerEvent::Stopped(_) => {
                        stopped = true;
                        manager.stop(position)
                    }
                    PlayerEvent::Progress(_) => None,
                }
            }
        };
        if let Some(handle) = handle {
            pending.push(handle);
        }
        pending.retain(|h| !h.is_finished());
        if stopped {
            break;
        }
    }

    if !stopped {
        let position = manager.clock().lock().unwrap_or_else(std::sync::PoisonError::into_inner).position_seconds();
        debug!(target: LOOP_LOG_TARGET, position, "Event channel closed; stopping session.");
        if let Some(handle) = manager.stop(position) {
            pending.push(handle);
        }
    }

    for result in join_all(pending).await {
        if let Err(e) = result {
            warn!(target: LOOP_LOG_TARGET, "Report task panicked: {:?}", e);
        }
    }
    info!(target: LOOP_LOG_TARGET, "Player event loop finished.");
}
