use super::state::{LoadTicket, SessionPhase, SessionSettings, SessionSnapshot, SessionState};
use crate::api::models::{Playlist, StreamHandle, Track};
use crate::api::Backend;
use crate::audio::end_detector::EndOfTrackDetector;
use crate::audio::position::PositionTracker;
use crate::audio::queue::PlaybackQueue;
use crate::audio::sink::{AudioSink, SinkEvent};
use crate::commands::PlayerCommand;
use crate::error::{AppError, AppResult};
use crate::events::{
    ErrorPayload, EventSender, PlaybackState, PlayerEvent, ProgressPayload, TrackChangedPayload,
};
use crate::lyrics::{self, LyricLine, LyricsSync};
use crate::media_session::{MediaCommand, MediaSessionBridge};
use crate::store::SessionStore;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Results of background work, delivered back to the session task.
#[derive(Debug)]
pub enum Completion {
    StreamResolved {
        ticket: LoadTicket,
        result: AppResult<StreamHandle>,
    },
    LyricsLoaded {
        ticket: LoadTicket,
        document: Option<String>,
    },
    FavoriteChecked {
        ticket: LoadTicket,
        result: AppResult<bool>,
    },
    FavoriteToggled {
        track_id: String,
        liked: bool,
        result: AppResult<()>,
    },
    PlaylistsListed(AppResult<Vec<Playlist>>),
    AddedToPlaylist {
        playlist_id: i64,
        track_id: String,
        result: AppResult<()>,
    },
}

pub type CompletionSender = mpsc::UnboundedSender<Completion>;
pub type CompletionReceiver = mpsc::UnboundedReceiver<Completion>;

/// A load waiting for its stream.
struct PendingLoad {
    ticket: LoadTicket,
    track: Track,
    autoplay: bool,
}

/// Owns the sink and every piece of session state. All methods run on the
/// session task, so nothing here is shared or locked.
pub struct SessionController {
    settings: SessionSettings,
    backend: Arc<dyn Backend>,
    sink: Box<dyn AudioSink>,
    store: SessionStore,
    queue: PlaybackQueue,
    state: SessionState,
    phase: SessionPhase,
    detector: EndOfTrackDetector,
    positions: PositionTracker,
    lyrics: LyricsSync,
    media: MediaSessionBridge,
    events: EventSender,
    completions: CompletionSender,
    load_seq: u64,
    ticket: Option<LoadTicket>,
    pending: Option<PendingLoad>,
    /// Lines of the bound track while another one is loading.
    stashed_lyrics: Option<Vec<LyricLine>>,
    favorite_in_flight: bool,
    volume: f32,
    muted: bool,
}

impl SessionController {
    pub fn new(
        settings: SessionSettings,
        backend: Arc<dyn Backend>,
        sink: Box<dyn AudioSink>,
        store: SessionStore,
        media: MediaSessionBridge,
        events: EventSender,
    ) -> (Self, CompletionReceiver) {
        let (completions, completion_rx) = mpsc::unbounded_channel();
        let controller = Self {
            detector: EndOfTrackDetector::new(settings.end_threshold_secs),
            positions: PositionTracker::new(settings.position_save_interval_secs),
            lyrics: LyricsSync::new(settings.lyrics_offset_secs),
            volume: settings.default_volume,
            settings,
            backend,
            sink,
            store,
            queue: PlaybackQueue::new(),
            state: SessionState::default(),
            phase: SessionPhase::Idle,
            media,
            events,
            completions,
            load_seq: 0,
            ticket: None,
            pending: None,
            stashed_lyrics: None,
            favorite_in_flight: false,
            muted: false,
        };
        (controller, completion_rx)
    }

    /// Replaces the queue, e.g. with a seeded one.
    pub fn with_queue(mut self, queue: PlaybackQueue) -> Self {
        self.queue = queue;
        self
    }

    pub fn sink_mut(&mut self) -> &mut dyn AudioSink {
        self.sink.as_mut()
    }

    pub fn media_mut(&mut self) -> &mut MediaSessionBridge {
        &mut self.media
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn queue(&self) -> &PlaybackQueue {
        &self.queue
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn lyrics(&self) -> &LyricsSync {
        &self.lyrics
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Ticket of the most recent load that has not failed.
    pub fn current_ticket(&self) -> Option<&LoadTicket> {
        self.ticket.as_ref()
    }

    /// The poll timer runs only while this is true.
    pub fn is_polling(&self) -> bool {
        self.detector.is_polling()
    }

    pub fn is_closed(&self) -> bool {
        self.phase == SessionPhase::Closed
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state.clone(),
            phase: self.phase,
            queue: self.queue.snapshot(),
            volume: self.volume,
            muted: self.muted,
            lyrics: self.lyrics.lines().to_vec(),
            active_lyric: self.lyrics.active(),
        }
    }

    fn emit(&self, event: PlayerEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    fn emit_error(&self, err: &AppError) {
        self.emit(PlayerEvent::Error(ErrorPayload::from(err)));
    }

    fn user_id(&self) -> Option<&str> {
        self.settings.user_id.as_deref()
    }

    // Startup and teardown

    /// Applies the stored volume and, for a signed-in user, brings back the
    /// last queue and track without starting playback.
    pub fn start(&mut self) {
        self.volume = self.store.volume().unwrap_or(self.settings.default_volume);
        self.sink.set_volume(self.volume);
        self.emit(PlayerEvent::VolumeChanged {
            volume: self.volume,
            muted: self.muted,
        });

        let Some(user_id) = self.settings.user_id.clone() else {
            log::info!("[session] started as guest");
            return;
        };

        if let Some(saved) = self.store.last_queue(&user_id) {
            log::info!("[session] restored queue of {} entries", saved.entries.len());
            self.queue.restore_from_persisted(saved);
            self.emit(PlayerEvent::QueueChanged(self.queue.snapshot()));
        }

        if let Some(track) = self.store.last_track(&user_id) {
            let restored_entry = self
                .queue
                .current_entry()
                .filter(|entry| entry.track.id == track.id)
                .map(|entry| entry.entry_id.clone());
            let entry_id = match restored_entry {
                Some(entry_id) => entry_id,
                None => self.queue.select(&track, &[]),
            };
            log::info!("[session] restoring last track {}", track.id);
            self.load(track, &entry_id, false);
        }
    }

    /// Terminal: final position save, sink released, media session cleared.
    pub fn shutdown(&mut self) {
        if self.is_closed() {
            return;
        }
        if self.state.current_track.is_some() && !self.state.is_loading {
            let position = self.sink.position();
            self.save_position(position, true);
        }
        self.detector.disarm();
        self.ticket = None;
        self.pending = None;
        self.sink.dispose();
        self.media.clear();
        self.state.is_playing = false;
        self.state.is_loading = false;
        self.phase = SessionPhase::Closed;
        self.emit(PlayerEvent::StateChanged(PlaybackState::Stopped));
        log::info!("[session] shut down");
    }

    // Dispatch

    /// Returns false once the session has shut down.
    pub fn handle_command(&mut self, command: PlayerCommand) -> bool {
        if self.is_closed() {
            if let PlayerCommand::Snapshot(reply) = command {
                let _ = reply.send(self.snapshot());
            }
            return false;
        }
        match command {
            PlayerCommand::Select { track, candidates } => self.select(track, candidates),
            PlayerCommand::Enqueue(track) => self.enqueue(track),
            PlayerCommand::Play => self.play(),
            PlayerCommand::Pause => self.pause(),
            PlayerCommand::TogglePlay => self.toggle_play(),
            PlayerCommand::Seek(seconds) => self.seek(seconds),
            PlayerCommand::SetVolume(volume) => self.set_volume(volume),
            PlayerCommand::ToggleMute => self.toggle_mute(),
            PlayerCommand::Next => self.next(),
            PlayerCommand::Previous => self.previous(),
            PlayerCommand::ToggleShuffle => self.toggle_shuffle(),
            PlayerCommand::Reorder { from, to } => self.reorder(from, to),
            PlayerCommand::Remove(entry_id) => self.remove(&entry_id),
            PlayerCommand::ToggleFavorite => self.toggle_favorite(),
            PlayerCommand::ListPlaylists => self.list_playlists(),
            PlayerCommand::AddToPlaylist(playlist_id) => self.add_to_playlist(playlist_id),
            PlayerCommand::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            PlayerCommand::Shutdown => {
                self.shutdown();
                return false;
            }
        }
        true
    }

    pub fn handle_media_command(&mut self, command: MediaCommand) {
        log::debug!("[media] {:?}", command);
        match command {
            MediaCommand::Play => self.play(),
            MediaCommand::Pause => self.pause(),
            MediaCommand::Toggle => self.toggle_play(),
            MediaCommand::Seek(seconds) => self.seek(seconds),
            MediaCommand::Next => self.next(),
            MediaCommand::Previous => self.previous(),
        }
    }

    // Queue

    pub fn select(&mut self, track: Track, candidates: Vec<Track>) {
        let entry_id = self.queue.select(&track, &candidates);
        self.queue_changed();
        self.load(track, &entry_id, true);
    }

    pub fn enqueue(&mut self, track: Track) {
        let entry_id = self.queue.append(track);
        log::info!("[queue] added {}", entry_id);
        self.queue_changed();
    }

    pub fn toggle_shuffle(&mut self) {
        self.queue.toggle_shuffle();
        self.queue_changed();
    }

    pub fn reorder(&mut self, from: usize, to: usize) {
        if self.queue.reorder(from, to) {
            self.queue_changed();
        } else {
            log::warn!("[queue] reorder {} -> {} out of range", from, to);
        }
    }

    pub fn remove(&mut self, entry_id: &str) {
        let was_loading =
            self.pending.is_some() && self.queue.pending_entry_id() == Some(entry_id);
        if !self.queue.remove(entry_id) {
            return;
        }
        log::info!("[queue] removed {}", entry_id);
        if was_loading {
            log::info!("[session] {} left the queue while loading, dropping the load", entry_id);
            self.abandon_load();
            self.emit(PlayerEvent::StateChanged(PlaybackState::Paused));
        }
        self.queue_changed();
    }

    fn queue_changed(&mut self) {
        if let Some(user_id) = self.settings.user_id.clone() {
            if let Err(e) = self
                .store
                .set_last_queue(&user_id, &self.queue.persisted_state())
            {
                log::warn!("[session] failed to persist queue: {}", e);
            }
        }
        self.emit(PlayerEvent::QueueChanged(self.queue.snapshot()));
    }

    /// Where next/previous navigate from: the slot being loaded, if any.
    fn navigation_anchor(&self) -> String {
        self.queue
            .pending_entry_id()
            .or(self.queue.current_entry_id())
            .unwrap_or_default()
            .to_string()
    }

    pub fn next(&mut self) {
        let anchor = self.navigation_anchor();
        match self.queue.next(&anchor).cloned() {
            Some(entry) => self.load(entry.track, &entry.entry_id, true),
            None => log::info!("[session] no next track"),
        }
    }

    pub fn previous(&mut self) {
        let anchor = self.navigation_anchor();
        match self.queue.previous(&anchor).cloned() {
            Some(entry) => self.load(entry.track, &entry.entry_id, true),
            None => log::info!("[session] no previous track"),
        }
    }

    /// Called exactly once per load when the end detector fires.
    fn advance(&mut self) {
        self.emit(PlayerEvent::TrackEnded);
        let anchor = self.navigation_anchor();
        match self.queue.next(&anchor).cloned() {
            Some(entry) => {
                log::info!("[session] advancing to {}", entry.entry_id);
                self.load(entry.track, &entry.entry_id, true);
            }
            None => {
                log::info!("[session] end of queue");
                self.sink.pause();
                self.detector.stop_polling();
                self.phase = SessionPhase::Ready { playing: false };
                self.emit(PlayerEvent::StateChanged(PlaybackState::Stopped));
            }
        }
    }

    // Loading

    /// Starts loading `track` into the queue slot `entry_id`. Playback
    /// starts on its own only when `autoplay` is set.
    pub fn load(&mut self, track: Track, entry_id: &str, autoplay: bool) {
        if self.is_closed() {
            return;
        }
        self.load_seq += 1;
        let ticket = LoadTicket {
            track_id: track.id.clone(),
            seq: self.load_seq,
        };
        log::info!(
            "[session] loading {} ({}) seq={} autoplay={}",
            track.id,
            track.title,
            ticket.seq,
            autoplay
        );

        self.queue.set_pending(entry_id);
        self.phase = SessionPhase::Loading;
        self.state.is_loading = true;
        self.state.position_seconds = 0.0;
        self.state.has_restored_position = false;
        self.sink.pause();
        self.detector.disarm();
        self.positions.begin_load();
        let outgoing = self.lyrics.replace(Vec::new());
        // Back-to-back loads keep the lines of the track that is still bound.
        if self.stashed_lyrics.is_none() {
            self.stashed_lyrics = Some(outgoing);
        }
        self.emit(PlayerEvent::StateChanged(PlaybackState::Buffering));
        self.emit(PlayerEvent::LyricsChanged(Vec::new()));
        self.emit(PlayerEvent::ActiveLyric(None));

        self.spawn_stream_resolution(ticket.clone());
        self.spawn_lyrics_fetch(ticket.clone(), &track);

        self.ticket = Some(ticket.clone());
        self.pending = Some(PendingLoad {
            ticket,
            track,
            autoplay,
        });
    }

    fn spawn_stream_resolution(&self, ticket: LoadTicket) {
        let backend = Arc::clone(&self.backend);
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let result = backend.resolve_stream(&ticket.track_id).await;
            let _ = completions.send(Completion::StreamResolved { ticket, result });
        });
    }

    fn spawn_lyrics_fetch(&self, ticket: LoadTicket, track: &Track) {
        let Some(query) = lyrics::search_query(track) else {
            log::debug!("[lyrics] nothing to search for {}", track.id);
            return;
        };
        let backend = Arc::clone(&self.backend);
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let document = backend.fetch_lyrics(&query).await;
            let _ = completions.send(Completion::LyricsLoaded { ticket, document });
        });
    }

    fn spawn_favorite_check(&self, ticket: LoadTicket) {
        let backend = Arc::clone(&self.backend);
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let result = backend.check_favorite(&ticket.track_id).await;
            let _ = completions.send(Completion::FavoriteChecked { ticket, result });
        });
    }

    fn is_current(&self, ticket: &LoadTicket) -> bool {
        self.ticket.as_ref() == Some(ticket)
    }

    pub fn handle_completion(&mut self, completion: Completion) {
        if self.is_closed() {
            return;
        }
        match completion {
            Completion::StreamResolved { ticket, result } => self.on_stream_resolved(ticket, result),
            Completion::LyricsLoaded { ticket, document } => self.on_lyrics_loaded(ticket, document),
            Completion::FavoriteChecked { ticket, result } => {
                self.on_favorite_checked(ticket, result)
            }
            Completion::FavoriteToggled {
                track_id,
                liked,
                result,
            } => self.on_favorite_toggled(track_id, liked, result),
            Completion::PlaylistsListed(result) => match result {
                Ok(playlists) => self.emit(PlayerEvent::Playlists(playlists)),
                Err(e) => {
                    log::warn!("[library] failed to list playlists: {}", e);
                    self.emit_error(&e);
                }
            },
            Completion::AddedToPlaylist {
                playlist_id,
                track_id,
                result,
            } => match result {
                Ok(()) => {
                    log::info!("[library] added {} to playlist {}", track_id, playlist_id);
                    self.emit(PlayerEvent::AddedToPlaylist {
                        playlist_id,
                        track_id,
                    });
                }
                Err(e) => {
                    log::warn!("[library] failed to add {} to playlist: {}", track_id, e);
                    self.emit_error(&e);
                }
            },
        }
    }

    fn on_stream_resolved(&mut self, ticket: LoadTicket, result: AppResult<StreamHandle>) {
        let pending = match self.pending.take() {
            Some(pending) if pending.ticket == ticket && self.is_current(&ticket) => pending,
            other => {
                self.pending = other;
                log::debug!(
                    "[session] discarding stale stream for {} (seq {})",
                    ticket.track_id,
                    ticket.seq
                );
                return;
            }
        };

        let handle = match result {
            Ok(handle) => handle,
            Err(e) => return self.fail_load(&pending.track, e),
        };
        if let Err(e) = self.sink.load(&handle.stream_url) {
            return self.fail_load(&pending.track, e);
        }

        let track = pending.track;
        let duration = if handle.authoritative_duration_seconds > 0.0 {
            handle.authoritative_duration_seconds
        } else {
            track.duration_seconds
        };
        self.queue.commit_pending();
        self.stashed_lyrics = None;
        self.state.current_track = Some(track.clone());
        self.state.duration_seconds = duration.max(0.0);
        self.state.position_seconds = 0.0;
        self.state.is_loading = false;
        self.state.is_favorite = false;
        self.phase = SessionPhase::Ready { playing: false };
        self.detector.arm(duration);
        log::info!("[session] bound {} ({:.1}s)", track.id, duration);

        self.restore_position(&track);
        let position = self.state.position_seconds;
        self.save_position(position, true);

        if let Some(user_id) = self.settings.user_id.clone() {
            if let Err(e) = self.store.set_last_track(&user_id, &track) {
                log::warn!("[session] failed to persist last track: {}", e);
            }
            self.spawn_favorite_check(ticket);
        }
        self.queue_changed();

        self.emit(PlayerEvent::TrackChanged(TrackChangedPayload::from(&track)));
        self.emit_progress();
        // Lyrics may have landed before the stream; place them at the restored time.
        if self.lyrics.update(self.state.position_seconds) {
            self.emit(PlayerEvent::ActiveLyric(self.lyrics.active()));
        }
        self.media.track_changed(&track, self.state.duration_seconds);
        self.media.playback_changed(false, self.state.position_seconds);

        if pending.autoplay {
            self.play();
        } else {
            self.emit(PlayerEvent::StateChanged(PlaybackState::Paused));
        }
    }

    /// The one restore attempt of this load.
    fn restore_position(&mut self, track: &Track) {
        let Some(user_id) = self.settings.user_id.clone() else {
            self.positions.skip_restore();
            self.state.has_restored_position = true;
            return;
        };
        let max_seconds = if self.state.duration_seconds > 0.0 {
            self.state.duration_seconds
        } else {
            self.sink
                .duration()
                .filter(|d| d.is_finite() && *d > 0.0)
                .unwrap_or(1000.0)
        };
        if let Some(time) = self
            .positions
            .restore(&self.store, &user_id, &track.id, max_seconds)
        {
            match self.sink.seek(time) {
                Ok(()) => self.state.position_seconds = time,
                Err(e) => log::warn!("[session] could not resume {} at {:.1}s: {}", track.id, time, e),
            }
        }
        self.state.has_restored_position = true;
    }

    fn fail_load(&mut self, track: &Track, err: AppError) {
        log::error!("[session] failed to load {}: {}", track.id, err);
        self.abandon_load();
        self.emit_error(&err);
        self.emit(PlayerEvent::StateChanged(PlaybackState::Paused));
    }

    /// Drops the load in flight. The track that was bound before, if any,
    /// stays current with its lyrics.
    fn abandon_load(&mut self) {
        self.ticket = None;
        self.pending = None;
        self.queue.discard_pending();
        self.state.is_loading = false;
        self.phase = SessionPhase::Idle;

        if let Some(current) = self.state.current_track.clone() {
            // The old source is still bound; let it end normally if resumed.
            self.detector.arm(self.state.duration_seconds);
            self.positions.skip_restore();
            self.state.has_restored_position = true;
            self.state.position_seconds = self.sink.position();
            log::info!("[session] keeping {} as current track", current.id);
        }

        let lines = self.stashed_lyrics.take().unwrap_or_default();
        self.lyrics.replace(lines);
        self.lyrics.update(self.state.position_seconds);
        self.emit(PlayerEvent::LyricsChanged(self.lyrics.lines().to_vec()));
        self.emit(PlayerEvent::ActiveLyric(self.lyrics.active()));
    }

    fn on_lyrics_loaded(&mut self, ticket: LoadTicket, document: Option<String>) {
        if !self.is_current(&ticket) {
            log::debug!("[lyrics] discarding stale lyrics for {}", ticket.track_id);
            return;
        }
        self.lyrics.load(document.as_deref());
        log::info!(
            "[lyrics] {} lines for {}",
            self.lyrics.lines().len(),
            ticket.track_id
        );
        self.emit(PlayerEvent::LyricsChanged(self.lyrics.lines().to_vec()));
        if !self.state.is_loading && self.lyrics.update(self.state.position_seconds) {
            self.emit(PlayerEvent::ActiveLyric(self.lyrics.active()));
        }
    }

    fn on_favorite_checked(&mut self, ticket: LoadTicket, result: AppResult<bool>) {
        if !self.is_current(&ticket) {
            log::debug!("[library] discarding stale favorite check for {}", ticket.track_id);
            return;
        }
        match result {
            Ok(liked) => {
                self.state.is_favorite = liked;
                self.emit(PlayerEvent::FavoriteChanged {
                    track_id: ticket.track_id,
                    liked,
                });
            }
            Err(e) => log::warn!("[library] favorite check failed: {}", e),
        }
    }

    // Transport

    pub fn play(&mut self) {
        if self.is_closed() || self.state.current_track.is_none() || self.state.is_loading {
            log::debug!("[session] play ignored, nothing bound");
            return;
        }
        // is_playing follows once the sink reports Playing.
        if let Err(e) = self.sink.play() {
            log::warn!("[session] play failed: {}", e);
            self.emit_error(&e);
        }
    }

    pub fn pause(&mut self) {
        self.sink.pause();
    }

    pub fn toggle_play(&mut self) {
        if self.state.is_playing {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn seek(&mut self, seconds: f64) {
        if self.state.current_track.is_none() || self.state.is_loading || !seconds.is_finite() {
            return;
        }
        let upper = if self.state.duration_seconds > 0.0 {
            self.state.duration_seconds
        } else {
            self.sink
                .duration()
                .filter(|d| d.is_finite() && *d > 0.0)
                .unwrap_or(f64::MAX)
        };
        let target = seconds.clamp(0.0, upper);
        match self.sink.seek(target) {
            Ok(()) => {
                self.state.position_seconds = target;
                self.emit_progress();
                if self.lyrics.update(target) {
                    self.emit(PlayerEvent::ActiveLyric(self.lyrics.active()));
                }
                self.media.position_changed(target);
                self.save_position(target, true);
            }
            Err(AppError::SeekUnsupported) => {
                log::warn!("[session] stream is not seekable, ignoring seek to {:.1}s", target);
            }
            Err(e) => log::warn!("[session] seek to {:.1}s failed: {}", target, e),
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        if !volume.is_finite() {
            return;
        }
        self.volume = volume.clamp(0.0, 1.0);
        self.muted = false;
        self.sink.set_volume(self.volume);
        if let Err(e) = self.store.set_volume(self.volume) {
            log::warn!("[session] failed to persist volume: {}", e);
        }
        self.emit(PlayerEvent::VolumeChanged {
            volume: self.volume,
            muted: false,
        });
    }

    /// Mute leaves the stored volume alone; unmuting from 0 comes back at 0.5.
    pub fn toggle_mute(&mut self) {
        if self.muted {
            self.muted = false;
            if self.volume <= 0.0 {
                self.volume = 0.5;
                if let Err(e) = self.store.set_volume(self.volume) {
                    log::warn!("[session] failed to persist volume: {}", e);
                }
            }
            self.sink.set_volume(self.volume);
        } else {
            self.muted = true;
            self.sink.set_volume(0.0);
        }
        self.emit(PlayerEvent::VolumeChanged {
            volume: self.volume,
            muted: self.muted,
        });
    }

    // Sink and timer

    pub fn handle_sink_event(&mut self, event: SinkEvent) {
        if self.is_closed() {
            return;
        }
        match event {
            SinkEvent::Ready { duration } => {
                if self.state.duration_seconds <= 0.0 && duration.is_finite() && duration > 0.0 {
                    log::info!("[session] using sink duration {:.1}s", duration);
                    self.state.duration_seconds = duration;
                    self.detector.set_duration(duration);
                }
            }
            SinkEvent::Playing => {
                self.state.is_playing = true;
                if self.phase != SessionPhase::Loading {
                    self.phase = SessionPhase::Ready { playing: true };
                }
                self.detector.start_polling();
                self.emit(PlayerEvent::StateChanged(PlaybackState::Playing));
                self.media
                    .playback_changed(true, self.state.position_seconds);
            }
            SinkEvent::Paused => {
                self.state.is_playing = false;
                if let SessionPhase::Ready { .. } = self.phase {
                    self.phase = SessionPhase::Ready { playing: false };
                }
                self.detector.stop_polling();
                if !self.state.is_loading {
                    let position = self.sink.position();
                    self.state.position_seconds = position;
                    self.save_position(position, true);
                    self.emit(PlayerEvent::StateChanged(PlaybackState::Paused));
                }
                self.media
                    .playback_changed(false, self.state.position_seconds);
            }
            SinkEvent::TimeUpdate { position } => {
                if !self.state.is_loading {
                    self.on_position(position);
                }
            }
            SinkEvent::Ended => {
                if self.detector.on_native_end() {
                    self.advance();
                }
            }
            SinkEvent::Error(message) => {
                log::error!("[session] sink error: {}", message);
                self.emit_error(&AppError::Sink(message));
            }
        }
    }

    /// Poll timer tick; a no-op unless playing.
    pub fn on_tick(&mut self) {
        if !self.detector.is_polling() {
            return;
        }
        let position = self.sink.position();
        self.on_position(position);
    }

    fn on_position(&mut self, position: f64) {
        if !position.is_finite() {
            return;
        }
        self.state.position_seconds = position;
        self.emit_progress();
        if self.lyrics.update(position) {
            self.emit(PlayerEvent::ActiveLyric(self.lyrics.active()));
        }
        self.media.position_changed(position);
        self.save_position(position, false);

        if self.detector.poll(position) {
            self.advance();
        }
    }

    fn emit_progress(&self) {
        self.emit(PlayerEvent::Progress(ProgressPayload::new(
            self.state.position_seconds,
            self.state.duration_seconds,
        )));
    }

    fn save_position(&mut self, position: f64, immediate: bool) {
        let (Some(user_id), Some(track)) = (self.user_id(), self.state.current_track.as_ref())
        else {
            return;
        };
        let (user_id, track_id) = (user_id.to_string(), track.id.clone());
        if immediate {
            self.positions
                .save_now(&mut self.store, &user_id, &track_id, position);
        } else {
            self.positions
                .save(&mut self.store, &user_id, &track_id, position);
        }
    }

    // Library

    pub fn toggle_favorite(&mut self) {
        let Some(track) = self.state.current_track.clone() else {
            return;
        };
        if self.user_id().is_none() {
            self.emit_error(&AppError::AuthRequired);
            return;
        }
        if self.favorite_in_flight {
            log::debug!("[library] favorite update already running, ignoring press");
            return;
        }
        self.favorite_in_flight = true;
        let liked = !self.state.is_favorite;
        let backend = Arc::clone(&self.backend);
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let result = if liked {
                backend.add_favorite(&track).await
            } else {
                backend.remove_favorite(&track.id).await
            };
            let _ = completions.send(Completion::FavoriteToggled {
                track_id: track.id,
                liked,
                result,
            });
        });
    }

    fn on_favorite_toggled(&mut self, track_id: String, liked: bool, result: AppResult<()>) {
        self.favorite_in_flight = false;
        if let Err(e) = result {
            log::warn!("[library] failed to update favorite {}: {}", track_id, e);
            self.emit_error(&e);
            return;
        }
        let is_current = self
            .state
            .current_track
            .as_ref()
            .is_some_and(|t| t.id == track_id);
        if is_current {
            self.state.is_favorite = liked;
        }
        self.emit(PlayerEvent::FavoriteChanged { track_id, liked });
    }

    pub fn list_playlists(&mut self) {
        let backend = Arc::clone(&self.backend);
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let result = backend.list_playlists().await;
            let _ = completions.send(Completion::PlaylistsListed(result));
        });
    }

    pub fn add_to_playlist(&mut self, playlist_id: i64) {
        let Some(track) = self.state.current_track.clone() else {
            return;
        };
        let backend = Arc::clone(&self.backend);
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let result = backend.add_track_to_playlist(playlist_id, &track).await;
            let _ = completions.send(Completion::AddedToPlaylist {
                playlist_id,
                track_id: track.id,
                result,
            });
        });
    }
}
