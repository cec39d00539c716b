use super::{PlayerCommand, SessionHandle};
use crate::api::models::Track;
use crate::error::AppResult;

impl SessionHandle {
    pub fn add_to_queue(&self, track: Track) -> AppResult<()> {
        self.send(PlayerCommand::Enqueue(track))
    }

    /// Indices refer to the view currently shown (ordered or shuffled).
    pub fn reorder_queue(&self, from: usize, to: usize) -> AppResult<()> {
        self.send(PlayerCommand::Reorder { from, to })
    }

    pub fn remove_from_queue(&self, entry_id: impl Into<String>) -> AppResult<()> {
        self.send(PlayerCommand::Remove(entry_id.into()))
    }

    pub fn toggle_shuffle(&self) -> AppResult<()> {
        self.send(PlayerCommand::ToggleShuffle)
    }
}
