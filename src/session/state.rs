use crate::api::models::Track;
use crate::audio::queue::QueueSnapshot;
use crate::config::AppConfig;
use crate::lyrics::LyricLine;
use serde::Serialize;

/// What the front end renders. Only the controller writes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub current_track: Option<Track>,
    /// Follows the sink's own play/pause notifications.
    pub is_playing: bool,
    pub position_seconds: f64,
    /// Authoritative duration of the current track; 0 while unknown.
    pub duration_seconds: f64,
    pub is_loading: bool,
    /// The one restore attempt for this load has happened.
    pub has_restored_position: bool,
    pub is_favorite: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum SessionPhase {
    Idle,
    Loading,
    Ready { playing: bool },
    /// Reached only through shutdown.
    Closed,
}

/// Identifies one track load. Results of async work started for a load
/// carry its ticket and are dropped when it is no longer current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub track_id: String,
    pub seq: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub phase: SessionPhase,
    pub queue: QueueSnapshot,
    pub volume: f32,
    pub muted: bool,
    pub lyrics: Vec<LyricLine>,
    pub active_lyric: Option<usize>,
}

/// The parts of `AppConfig` the session consumes.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// `None` for guests: no position restore or save, no favorites.
    pub user_id: Option<String>,
    pub lyrics_offset_secs: f64,
    pub end_threshold_secs: f64,
    pub position_save_interval_secs: f64,
    pub default_volume: f32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for SessionSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_id: config.user_id.clone().filter(|id| !id.is_empty()),
            lyrics_offset_secs: config.lyrics_offset_secs,
            end_threshold_secs: config.end_threshold_secs,
            position_save_interval_secs: config.position_save_interval_secs,
            default_volume: config.default_volume.clamp(0.0, 1.0),
        }
    }
}
