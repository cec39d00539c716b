use crate::api::models::{Playlist, Track};
use crate::audio::queue::QueueSnapshot;
use crate::error::AppError;
use crate::lyrics::LyricLine;
use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPayload {
    pub position: f64,
    pub duration: f64,
    pub position_fraction: f64,
}

impl ProgressPayload {
    pub fn new(position: f64, duration: f64) -> Self {
        let position_fraction = if duration > 0.0 {
            (position / duration).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            position,
            duration,
            position_fraction,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackChangedPayload {
    pub track_id: String,
    pub title: String,
    pub artist: String,
    pub duration: f64,
    pub artwork_url: Option<String>,
}

impl From<&Track> for TrackChangedPayload {
    fn from(track: &Track) -> Self {
        Self {
            track_id: track.id.clone(),
            title: track.title.clone(),
            artist: track.artist.clone(),
            duration: track.duration_seconds,
            artwork_url: (!track.artwork_url.is_empty()).then(|| track.artwork_url.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
    Stopped,
    Buffering,
}

/// Everything the session reports to its front end.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum PlayerEvent {
    TrackChanged(TrackChangedPayload),
    StateChanged(PlaybackState),
    Progress(ProgressPayload),
    TrackEnded,
    QueueChanged(QueueSnapshot),
    LyricsChanged(Vec<LyricLine>),
    ActiveLyric(Option<usize>),
    FavoriteChanged { track_id: String, liked: bool },
    Playlists(Vec<Playlist>),
    AddedToPlaylist { playlist_id: i64, track_id: String },
    VolumeChanged { volume: f32, muted: bool },
    Error(ErrorPayload),
}

/// `AppError` is not `Clone`, so events carry its serialized form.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorPayload {
    pub kind: String,
    pub message: String,
}

impl From<&AppError> for ErrorPayload {
    fn from(err: &AppError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

pub type EventSender = broadcast::Sender<PlayerEvent>;

pub const EVENT_CAPACITY: usize = 256;

pub fn channel() -> (EventSender, broadcast::Receiver<PlayerEvent>) {
    broadcast::channel(EVENT_CAPACITY)
}
