#![allow(dead_code)]

use async_trait::async_trait;
use mobify_player::api::models::{Playlist, StreamHandle, Track};
use mobify_player::api::Backend;
use mobify_player::audio::sink::{AudioSink, SinkEvent, SinkEventSender};
use mobify_player::error::{AppError, AppResult};
use mobify_player::events::{self, PlayerEvent};
use mobify_player::media_session::{MediaSessionBridge, NoopSurface};
use mobify_player::session::controller::CompletionReceiver;
use mobify_player::session::{SessionController, SessionSettings};
use mobify_player::store::SessionStore;
use mobify_player::audio::queue::PlaybackQueue;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

pub fn track(id: &str, duration: f64) -> Track {
    Track::new(id, format!("Song {}", id), "Band", duration)
}

pub fn stream_url(id: &str) -> String {
    format!("http://test/audio/{}", id)
}

#[derive(Debug, Default)]
pub struct SinkState {
    pub source: Option<String>,
    pub playing: bool,
    pub position: f64,
    pub duration: Option<f64>,
    pub volume: f32,
    pub unseekable: bool,
    pub loads: Vec<String>,
    pub seeks: Vec<f64>,
    pub disposed: bool,
}

/// Records every call; tests move the playhead by hand.
#[derive(Clone, Default)]
pub struct MockSink {
    pub state: Arc<Mutex<SinkState>>,
    events: Arc<Mutex<Option<SinkEventSender>>>,
}

impl MockSink {
    pub fn emit(&self, event: SinkEvent) {
        if let Some(tx) = self.events.lock().unwrap().as_ref() {
            let _ = tx.send(event);
        }
    }

    pub fn set_position(&self, position: f64) {
        self.state.lock().unwrap().position = position;
    }

    pub fn set_unseekable(&self) {
        self.state.lock().unwrap().unseekable = true;
    }

    pub fn source(&self) -> Option<String> {
        self.state.lock().unwrap().source.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }

    pub fn position_now(&self) -> f64 {
        self.state.lock().unwrap().position
    }

    pub fn volume(&self) -> f32 {
        self.state.lock().unwrap().volume
    }
}

impl AudioSink for MockSink {
    fn attach(&mut self, events: SinkEventSender) {
        *self.events.lock().unwrap() = Some(events);
    }

    fn load(&mut self, url: &str) -> AppResult<()> {
        let duration = {
            let mut state = self.state.lock().unwrap();
            state.source = Some(url.to_string());
            state.position = 0.0;
            state.loads.push(url.to_string());
            state.duration
        };
        self.emit(SinkEvent::Ready {
            duration: duration.unwrap_or(f64::NAN),
        });
        Ok(())
    }

    fn play(&mut self) -> AppResult<()> {
        let started = {
            let mut state = self.state.lock().unwrap();
            if state.source.is_none() {
                return Err(AppError::Sink("no source".into()));
            }
            !std::mem::replace(&mut state.playing, true)
        };
        if started {
            self.emit(SinkEvent::Playing);
        }
        Ok(())
    }

    fn pause(&mut self) {
        let stopped = std::mem::replace(&mut self.state.lock().unwrap().playing, false);
        if stopped {
            self.emit(SinkEvent::Paused);
        }
    }

    fn seek(&mut self, seconds: f64) -> AppResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.unseekable || state.source.is_none() {
            return Err(AppError::SeekUnsupported);
        }
        state.position = seconds;
        state.seeks.push(seconds);
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.lock().unwrap().volume = volume;
    }

    fn position(&self) -> f64 {
        self.state.lock().unwrap().position
    }

    fn duration(&self) -> Option<f64> {
        self.state.lock().unwrap().duration
    }

    fn dispose(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.playing = false;
        state.source = None;
        state.disposed = true;
    }
}

/// In-memory stand-in for the HTTP backend.
#[derive(Default)]
pub struct MockBackend {
    /// Track id to authoritative duration. Unknown ids fail to resolve.
    pub streams: Mutex<HashMap<String, f64>>,
    /// Lyric query to document.
    pub lyrics: Mutex<HashMap<String, String>>,
    pub favorites: Mutex<HashSet<String>>,
    pub playlists: Mutex<HashMap<i64, Vec<String>>>,
    pub resolve_calls: Mutex<Vec<String>>,
    pub lyric_queries: Mutex<Vec<String>>,
    /// Holds every stream answer back, so lyrics land first.
    pub stream_delay: Mutex<Duration>,
}

impl MockBackend {
    pub fn with_tracks(tracks: &[Track]) -> Self {
        let backend = Self::default();
        for t in tracks {
            backend
                .streams
                .lock()
                .unwrap()
                .insert(t.id.clone(), t.duration_seconds);
        }
        backend
    }

    pub fn add_lyrics(&self, query: &str, document: &str) {
        self.lyrics
            .lock()
            .unwrap()
            .insert(query.to_string(), document.to_string());
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn resolve_stream(&self, track_id: &str) -> AppResult<StreamHandle> {
        self.resolve_calls.lock().unwrap().push(track_id.to_string());
        let delay = *self.stream_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let duration = self.streams.lock().unwrap().get(track_id).copied();
        match duration {
            Some(duration) => Ok(StreamHandle {
                stream_url: stream_url(track_id),
                authoritative_duration_seconds: duration,
            }),
            None => Err(AppError::StreamUnavailable(track_id.to_string())),
        }
    }

    async fn fetch_lyrics(&self, query: &str) -> Option<String> {
        self.lyric_queries.lock().unwrap().push(query.to_string());
        self.lyrics.lock().unwrap().get(query).cloned()
    }

    async fn check_favorite(&self, track_id: &str) -> AppResult<bool> {
        Ok(self.favorites.lock().unwrap().contains(track_id))
    }

    async fn add_favorite(&self, track: &Track) -> AppResult<()> {
        self.favorites.lock().unwrap().insert(track.id.clone());
        Ok(())
    }

    async fn remove_favorite(&self, track_id: &str) -> AppResult<()> {
        self.favorites.lock().unwrap().remove(track_id);
        Ok(())
    }

    async fn list_playlists(&self) -> AppResult<Vec<Playlist>> {
        let playlists = self.playlists.lock().unwrap();
        let mut list: Vec<Playlist> = playlists
            .iter()
            .map(|(id, tracks)| Playlist {
                id: *id,
                name: format!("List {}", id),
                track_count: tracks.len() as u32,
            })
            .collect();
        list.sort_by_key(|p| p.id);
        Ok(list)
    }

    async fn add_track_to_playlist(&self, playlist_id: i64, track: &Track) -> AppResult<()> {
        let mut playlists = self.playlists.lock().unwrap();
        let tracks = playlists
            .get_mut(&playlist_id)
            .ok_or_else(|| AppError::NotFound(format!("playlist {}", playlist_id)))?;
        tracks.push(track.id.clone());
        Ok(())
    }
}

pub fn settings(user_id: Option<&str>) -> SessionSettings {
    SessionSettings {
        user_id: user_id.map(str::to_string),
        ..SessionSettings::default()
    }
}

/// A controller driven by hand: tests call its methods and `settle()` feeds
/// back whatever the sink and the spawned fetches produced.
pub struct Harness {
    pub controller: SessionController,
    pub completions: CompletionReceiver,
    pub sink_events: mpsc::UnboundedReceiver<SinkEvent>,
    pub events: broadcast::Receiver<PlayerEvent>,
    pub sink: MockSink,
    pub backend: Arc<MockBackend>,
}

impl Harness {
    pub fn new(backend: MockBackend, settings: SessionSettings, store: SessionStore) -> Self {
        let sink = MockSink::default();
        let backend = Arc::new(backend);
        let (events_tx, events) = events::channel();
        let (controller, completions) = SessionController::new(
            settings,
            backend.clone(),
            Box::new(sink.clone()),
            store,
            MediaSessionBridge::new(Box::new(NoopSurface)),
            events_tx,
        );
        let mut controller = controller.with_queue(PlaybackQueue::with_seed(17));
        let (sink_tx, sink_events) = mpsc::unbounded_channel();
        controller.sink_mut().attach(sink_tx);
        Self {
            controller,
            completions,
            sink_events,
            events,
            sink,
            backend,
        }
    }

    pub fn guest(backend: MockBackend) -> Self {
        Self::new(backend, settings(None), SessionStore::in_memory())
    }

    pub fn signed_in(backend: MockBackend, store: SessionStore) -> Self {
        Self::new(backend, settings(Some("u1")), store)
    }

    /// Delivers sink events and completions until nothing arrives for a while.
    pub async fn settle(&mut self) {
        loop {
            if let Ok(event) = self.sink_events.try_recv() {
                self.controller.handle_sink_event(event);
                continue;
            }
            match tokio::time::timeout(Duration::from_millis(50), self.completions.recv()).await {
                Ok(Some(completion)) => self.controller.handle_completion(completion),
                _ => {
                    if self.sink_events.is_empty() {
                        break;
                    }
                }
            }
        }
    }

    /// Delivers pending sink events only.
    pub fn drain_sink_events(&mut self) {
        while let Ok(event) = self.sink_events.try_recv() {
            self.controller.handle_sink_event(event);
        }
    }

    pub fn take_events(&mut self) -> Vec<PlayerEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }

    pub fn current_id(&self) -> Option<String> {
        self.controller
            .state()
            .current_track
            .as_ref()
            .map(|t| t.id.clone())
    }
}
