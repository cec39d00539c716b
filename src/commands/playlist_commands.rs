use super::{PlayerCommand, SessionHandle};
use crate::error::AppResult;

impl SessionHandle {
    pub fn get_playlists(&self) -> AppResult<()> {
        self.send(PlayerCommand::ListPlaylists)
    }

    pub fn add_to_playlist(&self, playlist_id: i64) -> AppResult<()> {
        self.send(PlayerCommand::AddToPlaylist(playlist_id))
    }
}
