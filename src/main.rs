use jellyresume::config::Settings;
use jellyresume::jellyfin::{JellyfinClient, MediaItem};
use jellyresume::playback::{
    resume_state, run_player_events, ticks_to_seconds, LocalResumeState, PlayerEvent, ResumeKey, SessionManager,
};
use jellyresume::storage::{
    ContinueWatchingEntry, ContinueWatchingSnapshot, ContinueWatchingStore, DeepLink, JsonFileStore,
};
use jellyresume::ui::{Cli, Command, EventLineParser};
use jellyresume::{init_app_dirs, init_tracing};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const MAIN_LOG_TARGET: &str = "jellyresume::main";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Parse command-line arguments and initialize CLI
    let cli = Cli::new();
    let args = &cli.args;

    init_tracing(args.log_json)?;
    init_app_dirs()?;

    // Load configuration from file or create default
    let config_path = match &args.config {
        Some(path) => Path::new(path).to_path_buf(),
        None => Settings::default_path(),
    };
    let mut settings = Settings::load(&config_path)?;

    // Command-line arguments and environment override the config file
    if let Some(server_url) = &args.server_url {
        settings.server_url = server_url.clone();
    }
    settings.api_key = args.api_key.clone().or(settings.api_key);
    settings.username = args.username.clone().or(settings.username);
    settings.reporting.validate()?;

    let result = match args.command.clone() {
        Command::PlayLocal { path, duration } => play_local(&settings, path, duration).await,
        Command::ResumePoint { path } => show_resume_point(&settings, &path),
        Command::Play { item_id } => {
            let client = connect(&mut settings, args.password.as_deref(), &config_path).await?;
            play_remote(&settings, client, &item_id).await
        }
        Command::ExportContinueWatching { limit } => {
            let client = connect(&mut settings, args.password.as_deref(), &config_path).await?;
            export_continue_watching(&cli, &settings, &client, limit).await
        }
        Command::OpenLink { url } => {
            let link = DeepLink::parse(&url, &settings.deep_link_scheme)?;
            let client = connect(&mut settings, args.password.as_deref(), &config_path).await?;
            match link {
                DeepLink::Play(item_id) => play_remote(&settings, client, &item_id).await,
                DeepLink::Open(item_id) => show_item(&client, &item_id).await,
            }
        }
    };

    if let Err(e) = &result {
        cli.display_error(&**e);
    }
    result
}

/// Build an authenticated client, logging in with a password when one is given.
async fn connect(
    settings: &mut Settings,
    password: Option<&str>,
    config_path: &Path,
) -> Result<JellyfinClient, Box<dyn Error>> {
    settings.validate()?;
    let device_id = settings.device_id_or_default();
    let mut jellyfin = JellyfinClient::new(&settings.server_url).with_device(&device_id, "jellyresume");

    if let Some(password) = password {
        let username = settings
            .username
            .clone()
            .ok_or("Password provided but no username specified or found.")?;
        info!(target: MAIN_LOG_TARGET, "Authenticating with username: {}", username);
        let auth_response = jellyfin.authenticate(&username, password).await?;

        // Persist the new token so later runs can skip the login
        settings.user_id = Some(auth_response.user.id);
        settings.api_key = Some(auth_response.access_token);
        settings.save(config_path)?;
        return Ok(jellyfin);
    }

    match (&settings.api_key, &settings.user_id) {
        (Some(api_key), Some(user_id)) => {
            debug!(target: MAIN_LOG_TARGET, "Using existing API key for authentication.");
            Ok(jellyfin.with_api_key(api_key).with_user_id(user_id))
        }
        (Some(_), None) => {
            Err("API key found in settings, but User ID is missing. Please re-authenticate.".into())
        }
        (None, _) => Err("Cannot authenticate: no password or API key provided or found.".into()),
    }
}

/// Forward stdin lines to the player event channel until EOF.
fn spawn_stdin_reader(tx: mpsc::Sender<PlayerEvent>) {
    tokio::spawn(async move {
        let mut parser = EventLineParser::new();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match parser.parse(&line) {
                    Ok(Some(event)) => {
                        let stop = matches!(event, PlayerEvent::Stopped(_));
                        if tx.send(event).await.is_err() || stop {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => eprintln!("{}", e),
                },
                Ok(None) => break,
                Err(e) => {
                    warn!(target: MAIN_LOG_TARGET, "Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });
}

async fn drive_session(manager: SessionManager) {
    let (tx, rx) = mpsc::channel(64);
    spawn_stdin_reader(tx);
    run_player_events(manager, rx).await;
}

async fn play_local(settings: &Settings, path: PathBuf, duration: Option<f64>) -> Result<(), Box<dyn Error>> {
    let store = Arc::new(JsonFileStore::open(settings.resume_store_path.clone())?);
    let manager = SessionManager::local(store.clone(), path.clone(), &settings.reporting)?;

    match resume_state(&*store, &ResumeKey::for_location(&path)) {
        LocalResumeState::InProgress { position_seconds } => {
            println!("Resuming {} at {}s", path.display(), position_seconds)
        }
        LocalResumeState::Completed => println!("{} was already watched; starting over", path.display()),
        LocalResumeState::Unplayed => println!("Starting {}", path.display()),
    }

    if duration.is_some() {
        manager.clock().lock().unwrap_or_else(PoisonError::into_inner).set_duration(duration);
    }

    drive_session(manager).await;
    Ok(())
}

fn show_resume_point(settings: &Settings, path: &Path) -> Result<(), Box<dyn Error>> {
    let store = JsonFileStore::open(settings.resume_store_path.clone())?;
    match resume_state(&store, &ResumeKey::for_location(path)) {
        LocalResumeState::Unplayed => println!("{}: not started", path.display()),
        LocalResumeState::InProgress { position_seconds } => {
            println!("{}: resume at {}s", path.display(), position_seconds)
        }
        LocalResumeState::Completed => println!("{}: watched", path.display()),
    }
    Ok(())
}

async fn play_remote(settings: &Settings, client: JellyfinClient, item_id: &str) -> Result<(), Box<dyn Error>> {
    let item = client.get_item(item_id).await?;
    let stream_url = client.get_stream_url(&item)?;
    println!("Playing {} ({})", item.name, stream_url);
    if let Some(resume_at) = server_resume_position(&item) {
        println!("Server resume point: {}s", resume_at);
    }

    let duration = item.run_time_ticks.map(|ticks| ticks_to_seconds(ticks) as f64);
    let manager = SessionManager::remote(Arc::new(client), item_id, &settings.reporting)?;
    manager.clock().lock().unwrap_or_else(PoisonError::into_inner).set_duration(duration);

    drive_session(manager).await;
    Ok(())
}

fn server_resume_position(item: &MediaItem) -> Option<u64> {
    item.user_data
        .as_ref()
        .filter(|data| !data.played && data.playback_position_ticks > 0)
        .map(|data| ticks_to_seconds(data.playback_position_ticks))
}

async fn show_item(client: &JellyfinClient, item_id: &str) -> Result<(), Box<dyn Error>> {
    let item = client.get_item(item_id).await?;
    println!("{} [{}]", item.name, item.media_type);
    if let Some(overview) = &item.overview {
        println!("{}", overview);
    }
    if let Some(resume_at) = server_resume_position(&item) {
        println!("Resume at {}s", resume_at);
    }
    Ok(())
}

async fn export_continue_watching(
    cli: &Cli,
    settings: &Settings,
    client: &JellyfinClient,
    limit: usize,
) -> Result<(), Box<dyn Error>> {
    let items = client.get_resume_items(limit).await?;
    let entries: Vec<ContinueWatchingEntry> = items
        .iter()
        .map(|item| ContinueWatchingEntry::from_media_item(item, client.image_url(&item.id)))
        .collect();

    let store = ContinueWatchingStore::new(settings.continue_watching_path.clone());
    store.save(&ContinueWatchingSnapshot::new(entries.clone()))?;
    info!(target: MAIN_LOG_TARGET, "Exported {} items to {}", entries.len(), store.path().display());

    cli.display_entries(&entries);
    for entry in &entries {
        println!("{}", DeepLink::Play(entry.id.clone()).to_url(&settings.deep_link_scheme));
    }
    Ok(())
}
