//! Mirrors the session onto the host's system media controls and turns the
//! controls' transport requests back into session commands.

#[cfg(target_os = "macos")]
pub mod macos;

use crate::api::models::Track;
use crate::events::PlaybackState;
use tokio::sync::mpsc;

/// Transport requests coming from lock screen, media keys or assistants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaCommand {
    Play,
    Pause,
    Toggle,
    Seek(f64),
    Next,
    Previous,
}

pub type MediaCommandSender = mpsc::UnboundedSender<MediaCommand>;
pub type MediaCommandReceiver = mpsc::UnboundedReceiver<MediaCommand>;

#[derive(Debug, Clone, PartialEq)]
pub struct MediaMetadata {
    pub title: String,
    pub artist: String,
    pub artwork_url: Option<String>,
    pub duration_seconds: f64,
}

impl From<&Track> for MediaMetadata {
    fn from(track: &Track) -> Self {
        Self {
            title: track.title.clone(),
            artist: track.artist.clone(),
            artwork_url: (!track.artwork_url.is_empty()).then(|| track.artwork_url.clone()),
            duration_seconds: track.duration_seconds,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionState {
    pub duration: f64,
    pub playback_rate: f64,
    pub position: f64,
}

/// One OS media session. Implementations must not block.
pub trait MediaSessionSurface: Send {
    /// Installs transport handlers that forward into `commands`.
    fn register(&mut self, commands: MediaCommandSender);
    fn set_metadata(&mut self, metadata: &MediaMetadata);
    fn set_position(&mut self, position: &PositionState);
    fn set_playback_state(&mut self, state: PlaybackState);
    fn clear(&mut self);
}

/// Used where the platform has no media session to talk to.
#[derive(Debug, Default)]
pub struct NoopSurface;

impl MediaSessionSurface for NoopSurface {
    fn register(&mut self, _commands: MediaCommandSender) {}
    fn set_metadata(&mut self, _metadata: &MediaMetadata) {}
    fn set_position(&mut self, _position: &PositionState) {}
    fn set_playback_state(&mut self, _state: PlaybackState) {}
    fn clear(&mut self) {}
}

/// The surface for the current platform.
pub fn platform_surface() -> Box<dyn MediaSessionSurface> {
    #[cfg(target_os = "macos")]
    {
        Box::new(macos::NowPlayingSurface::new())
    }
    #[cfg(not(target_os = "macos"))]
    {
        Box::new(NoopSurface)
    }
}

/// Owned by the session controller; the only writer to the surface.
pub struct MediaSessionBridge {
    surface: Box<dyn MediaSessionSurface>,
    metadata: Option<MediaMetadata>,
    playing: bool,
}

impl MediaSessionBridge {
    pub fn new(surface: Box<dyn MediaSessionSurface>) -> Self {
        Self {
            surface,
            metadata: None,
            playing: false,
        }
    }

    /// Creates the channel the surface's handlers feed and registers them.
    pub fn register(&mut self) -> MediaCommandReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.surface.register(tx);
        log::info!("[media] transport handlers registered");
        rx
    }

    pub fn track_changed(&mut self, track: &Track, duration: f64) {
        let mut metadata = MediaMetadata::from(track);
        metadata.duration_seconds = duration;
        self.surface.set_metadata(&metadata);
        self.metadata = Some(metadata);
    }

    pub fn playback_changed(&mut self, playing: bool, position: f64) {
        self.playing = playing;
        self.surface.set_playback_state(if playing {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        });
        self.position_changed(position);
    }

    pub fn position_changed(&mut self, position: f64) {
        let Some(metadata) = &self.metadata else {
            return;
        };
        let duration = metadata.duration_seconds.max(0.0);
        let position = if duration > 0.0 {
            position.clamp(0.0, duration)
        } else {
            position.max(0.0)
        };
        self.surface.set_position(&PositionState {
            duration,
            playback_rate: if self.playing { 1.0 } else { 0.0 },
            position,
        });
    }

    pub fn clear(&mut self) {
        self.metadata = None;
        self.playing = false;
        self.surface.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorded {
        metadata: Vec<MediaMetadata>,
        positions: Vec<PositionState>,
        states: Vec<PlaybackState>,
        cleared: usize,
    }

    struct RecordingSurface(Arc<Mutex<Recorded>>);

    impl MediaSessionSurface for RecordingSurface {
        fn register(&mut self, commands: MediaCommandSender) {
            let _ = commands.send(MediaCommand::Toggle);
        }
        fn set_metadata(&mut self, metadata: &MediaMetadata) {
            self.0.lock().unwrap().metadata.push(metadata.clone());
        }
        fn set_position(&mut self, position: &PositionState) {
            self.0.lock().unwrap().positions.push(*position);
        }
        fn set_playback_state(&mut self, state: PlaybackState) {
            self.0.lock().unwrap().states.push(state);
        }
        fn clear(&mut self) {
            self.0.lock().unwrap().cleared += 1;
        }
    }

    #[test]
    fn mirrors_metadata_and_position() {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let mut bridge = MediaSessionBridge::new(Box::new(RecordingSurface(recorded.clone())));
        let mut commands = bridge.register();
        assert_eq!(commands.try_recv().ok(), Some(MediaCommand::Toggle));

        // No position is pushed before there is a track.
        bridge.position_changed(3.0);
        assert!(recorded.lock().unwrap().positions.is_empty());

        let mut track = Track::new("a", "Song", "Band", 0.0);
        track.artwork_url = "https://img.example/a.jpg".into();
        bridge.track_changed(&track, 200.0);
        bridge.playback_changed(true, 12.0);
        bridge.position_changed(250.0);

        let rec = recorded.lock().unwrap();
        assert_eq!(rec.metadata[0].duration_seconds, 200.0);
        assert_eq!(
            rec.metadata[0].artwork_url.as_deref(),
            Some("https://img.example/a.jpg")
        );
        assert_eq!(rec.states, vec![PlaybackState::Playing]);
        assert_eq!(
            rec.positions[0],
            PositionState {
                duration: 200.0,
                playback_rate: 1.0,
                position: 12.0
            }
        );
        assert_eq!(rec.positions[1].position, 200.0);
        drop(rec);

        bridge.clear();
        assert_eq!(recorded.lock().unwrap().cleared, 1);
    }
}
