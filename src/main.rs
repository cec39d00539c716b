use mobify_player::api::client::ApiClient;
use mobify_player::api::models::Track;
use mobify_player::audio::clock_sink::ClockSink;
use mobify_player::commands::SessionHandle;
use mobify_player::config::AppConfig;
use mobify_player::error::{AppError, AppResult};
use mobify_player::events::PlayerEvent;
use mobify_player::media_session;
use mobify_player::store::{JsonFileStore, SessionStore};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

const HELP: &str = "\
commands:
  play <track-id> [title]   load and play a track
  queue <track-id> [title]  append a track to the queue
  pause | resume | toggle
  seek <seconds>
  vol <0..1> | mute
  next | prev | shuffle
  move <from> <to>          reorder the visible queue
  rm <entry-id>
  like | playlists | add <playlist-id>
  status | help | quit";

#[tokio::main]
async fn main() -> AppResult<()> {
    mobify_player::init_logging();

    let config = AppConfig::load_or_default();
    if !config.is_signed_in() {
        log::info!("[main] no account configured, playing as guest");
    }
    let backend = Arc::new(ApiClient::new(&config)?);
    let file_store = JsonFileStore::open(AppConfig::state_path()?);
    log::info!("[main] session state in {}", file_store.path().display());
    let store = SessionStore::new(Box::new(file_store));

    let (handle, session) = mobify_player::launch(
        &config,
        backend,
        Box::new(ClockSink::new()),
        store,
        media_session::platform_surface(),
    );

    let mut events = handle.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(skipped)) => log::debug!("skipped {} events", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match run_command(&handle, line.trim()).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => eprintln!("error: {}", e),
        }
    }

    let _ = handle.shutdown();
    if let Err(e) = session.await {
        log::error!("session task failed: {}", e);
    }
    Ok(())
}

/// Returns false when the shell should exit.
async fn run_command(handle: &SessionHandle, line: &str) -> AppResult<bool> {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Ok(true);
    };
    let args: Vec<&str> = parts.collect();

    match command {
        "play" => handle.play_track(track_from_args(&args)?, Vec::new())?,
        "queue" => handle.add_to_queue(track_from_args(&args)?)?,
        "pause" => handle.pause()?,
        "resume" => handle.play()?,
        "toggle" => handle.toggle_play()?,
        "seek" => handle.seek(parse_arg(&args, 0, "seconds")?)?,
        "vol" => handle.set_volume(parse_arg(&args, 0, "volume")?)?,
        "mute" => handle.toggle_mute()?,
        "next" => handle.next_track()?,
        "prev" => handle.previous_track()?,
        "shuffle" => handle.toggle_shuffle()?,
        "move" => handle.reorder_queue(
            parse_arg(&args, 0, "from")?,
            parse_arg(&args, 1, "to")?,
        )?,
        "rm" => handle.remove_from_queue(*args.first().ok_or_else(|| usage("rm <entry-id>"))?)?,
        "like" => handle.toggle_favorite()?,
        "playlists" => handle.get_playlists()?,
        "add" => handle.add_to_playlist(parse_arg(&args, 0, "playlist id")?)?,
        "status" => {
            let snapshot = handle.snapshot().await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        "help" => println!("{}", HELP),
        "quit" | "exit" => return Ok(false),
        other => eprintln!("unknown command '{}', try 'help'", other),
    }
    Ok(true)
}

fn track_from_args(args: &[&str]) -> AppResult<Track> {
    let (id, title) = args
        .split_first()
        .ok_or_else(|| usage("play <track-id> [title]"))?;
    let title = if title.is_empty() {
        id.to_string()
    } else {
        title.join(" ")
    };
    Ok(Track::new(*id, title, "", 0.0))
}

fn parse_arg<T: std::str::FromStr>(args: &[&str], index: usize, name: &str) -> AppResult<T> {
    args.get(index)
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| usage(&format!("missing or invalid {}", name)))
}

fn usage(message: &str) -> AppError {
    AppError::Config(format!("usage: {}", message))
}

fn print_event(event: &PlayerEvent) {
    match event {
        // Too chatty for a terminal.
        PlayerEvent::Progress(_) | PlayerEvent::QueueChanged(_) => {}
        PlayerEvent::TrackChanged(track) => {
            println!("now playing: {} - {}", track.title, track.artist)
        }
        PlayerEvent::ActiveLyric(Some(index)) => println!("lyric line {}", index),
        PlayerEvent::Error(err) => println!("error [{}]: {}", err.kind, err.message),
        other => match serde_json::to_string(other) {
            Ok(json) => println!("{}", json),
            Err(e) => log::warn!("unprintable event: {}", e),
        },
    }
}
