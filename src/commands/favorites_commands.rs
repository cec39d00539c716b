use super::{PlayerCommand, SessionHandle};
use crate::error::AppResult;

impl SessionHandle {
    /// Likes or unlikes the current track; the outcome arrives as
    /// `PlayerEvent::FavoriteChanged`.
    pub fn toggle_favorite(&self) -> AppResult<()> {
        self.send(PlayerCommand::ToggleFavorite)
    }
}
