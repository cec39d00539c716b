use super::{PlayerCommand, SessionHandle};
use crate::api::models::Track;
use crate::error::AppResult;

impl SessionHandle {
    /// Plays `track`, replacing the queue with `candidates` when given.
    pub fn play_track(&self, track: Track, candidates: Vec<Track>) -> AppResult<()> {
        self.send(PlayerCommand::Select { track, candidates })
    }

    pub fn play(&self) -> AppResult<()> {
        self.send(PlayerCommand::Play)
    }

    pub fn pause(&self) -> AppResult<()> {
        self.send(PlayerCommand::Pause)
    }

    pub fn toggle_play(&self) -> AppResult<()> {
        self.send(PlayerCommand::TogglePlay)
    }

    pub fn seek(&self, position_seconds: f64) -> AppResult<()> {
        self.send(PlayerCommand::Seek(position_seconds))
    }

    pub fn set_volume(&self, volume: f32) -> AppResult<()> {
        self.send(PlayerCommand::SetVolume(volume))
    }

    pub fn toggle_mute(&self) -> AppResult<()> {
        self.send(PlayerCommand::ToggleMute)
    }

    pub fn next_track(&self) -> AppResult<()> {
        self.send(PlayerCommand::Next)
    }

    pub fn previous_track(&self) -> AppResult<()> {
        self.send(PlayerCommand::Previous)
    }
}
