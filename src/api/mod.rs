pub mod client;
pub mod models;

mod tracks;
mod user;

use crate::error::AppResult;
use async_trait::async_trait;
use models::{Playlist, StreamHandle, Track};

/// External collaborators the playback session depends on.
///
/// `ApiClient` is the production implementation; tests substitute their own.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Fails with `AppError::StreamUnavailable`.
    async fn resolve_stream(&self, track_id: &str) -> AppResult<StreamHandle>;

    /// Never fails: a lookup error is reported as "no lyrics".
    async fn fetch_lyrics(&self, query: &str) -> Option<String>;

    async fn check_favorite(&self, track_id: &str) -> AppResult<bool>;

    async fn add_favorite(&self, track: &Track) -> AppResult<()>;

    async fn remove_favorite(&self, track_id: &str) -> AppResult<()>;

    async fn list_playlists(&self) -> AppResult<Vec<Playlist>>;

    async fn add_track_to_playlist(&self, playlist_id: i64, track: &Track) -> AppResult<()>;
}

#[async_trait]
impl Backend for client::ApiClient {
    async fn resolve_stream(&self, track_id: &str) -> AppResult<StreamHandle> {
        self.get_stream(track_id).await
    }

    async fn fetch_lyrics(&self, query: &str) -> Option<String> {
        self.get_lyrics(query).await
    }

    async fn check_favorite(&self, track_id: &str) -> AppResult<bool> {
        self.is_favorite(track_id).await
    }

    async fn add_favorite(&self, track: &Track) -> AppResult<()> {
        self.like_track(track).await
    }

    async fn remove_favorite(&self, track_id: &str) -> AppResult<()> {
        self.unlike_track(track_id).await
    }

    async fn list_playlists(&self) -> AppResult<Vec<Playlist>> {
        self.get_playlists().await
    }

    async fn add_track_to_playlist(&self, playlist_id: i64, track: &Track) -> AppResult<()> {
        self.add_to_playlist(playlist_id, track).await
    }
}
