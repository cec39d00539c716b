//! Inbound side of the session: the commands a front end can send and the
//! cloneable handle it sends them through.

pub mod favorites_commands;
pub mod playback_commands;
pub mod playlist_commands;
pub mod queue_commands;

use crate::api::models::Track;
use crate::error::{AppError, AppResult};
use crate::events::{EventSender, PlayerEvent};
use crate::session::SessionSnapshot;
use tokio::sync::{broadcast, mpsc, oneshot};

#[derive(Debug)]
pub enum PlayerCommand {
    /// A user pick. A non-empty `candidates` list becomes the queue.
    Select {
        track: Track,
        candidates: Vec<Track>,
    },
    Enqueue(Track),
    Play,
    Pause,
    TogglePlay,
    Seek(f64),
    SetVolume(f32),
    ToggleMute,
    Next,
    Previous,
    ToggleShuffle,
    Reorder {
        from: usize,
        to: usize,
    },
    Remove(String),
    ToggleFavorite,
    ListPlaylists,
    AddToPlaylist(i64),
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Shutdown,
}

pub type CommandSender = mpsc::UnboundedSender<PlayerCommand>;
pub type CommandReceiver = mpsc::UnboundedReceiver<PlayerCommand>;

/// Cheap to clone; every clone talks to the same session task.
#[derive(Clone)]
pub struct SessionHandle {
    commands: CommandSender,
    events: EventSender,
}

impl SessionHandle {
    pub fn new(commands: CommandSender, events: EventSender) -> Self {
        Self { commands, events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    pub(crate) fn send(&self, command: PlayerCommand) -> AppResult<()> {
        self.commands
            .send(command)
            .map_err(|_| AppError::SessionClosed)
    }

    /// Current state as seen by the session task.
    pub async fn snapshot(&self) -> AppResult<SessionSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(PlayerCommand::Snapshot(tx))?;
        rx.await.map_err(|_| AppError::SessionClosed)
    }

    pub fn shutdown(&self) -> AppResult<()> {
        self.send(PlayerCommand::Shutdown)
    }
}
