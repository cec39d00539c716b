use crate::api::client::ApiClient;
use crate::api::models::{LyricsResponse, StreamHandle, StreamResponse};
use crate::error::{AppError, AppResult};

impl ApiClient {
    /// `GET /stream/{id}`: resolves a playable URL plus the metadata duration.
    ///
    /// Every failure collapses into `StreamUnavailable` so the session only
    /// has one outcome to handle.
    pub async fn get_stream(&self, track_id: &str) -> AppResult<StreamHandle> {
        let path = format!("/stream/{}", urlencoding::encode(track_id));

        let result = async {
            let response = self.get(&path).await?;
            let body: StreamResponse = response.json().await?;
            let url = self.absolute_url(&body.stream_url)?;
            Ok::<_, AppError>(StreamHandle {
                stream_url: url.to_string(),
                authoritative_duration_seconds: body.duration,
            })
        }
        .await;

        result.map_err(|e| {
            log::error!("[api] stream resolution failed for {}: {}", track_id, e);
            AppError::StreamUnavailable(track_id.to_string())
        })
    }

    /// `GET /lyrics?query=`. A missing document and a failed request both
    /// come back as `None`.
    pub async fn get_lyrics(&self, query: &str) -> Option<String> {
        let result = async {
            let response = self.get_with_query("/lyrics", &[("query", query)]).await?;
            let body: LyricsResponse = response.json().await?;
            Ok::<_, AppError>(body.lyrics)
        }
        .await;

        match result {
            Ok(lyrics) => lyrics.filter(|doc| !doc.trim().is_empty()),
            Err(e) => {
                log::warn!("[api] lyrics lookup failed for '{}': {}", query, e);
                None
            }
        }
    }
}
