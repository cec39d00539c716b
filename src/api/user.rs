use crate::api::client::ApiClient;
use crate::api::models::{FavoriteStatus, Playlist, PlaylistsResponse, Track, TrackBody};
use crate::error::AppResult;

impl ApiClient {
    pub async fn is_favorite(&self, track_id: &str) -> AppResult<bool> {
        let path = format!("/liked/{}", urlencoding::encode(track_id));
        let response = self.get(&path).await?;
        let status: FavoriteStatus = response.json().await?;
        Ok(status.liked)
    }

    pub async fn like_track(&self, track: &Track) -> AppResult<()> {
        self.post("/liked", &TrackBody::from(track)).await?;
        Ok(())
    }

    pub async fn unlike_track(&self, track_id: &str) -> AppResult<()> {
        let path = format!("/liked/{}", urlencoding::encode(track_id));
        self.delete(&path).await?;
        Ok(())
    }

    pub async fn get_playlists(&self) -> AppResult<Vec<Playlist>> {
        let response = self.get("/playlists").await?;
        let body: PlaylistsResponse = response.json().await?;
        Ok(body.playlists)
    }

    pub async fn add_to_playlist(&self, playlist_id: i64, track: &Track) -> AppResult<()> {
        let path = format!("/playlists/{}/tracks", playlist_id);
        self.post(&path, &TrackBody::from(track)).await?;
        Ok(())
    }
}
