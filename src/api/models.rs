use serde::{Deserialize, Serialize};

/// A playable track as returned by search, the library, or a playlist.
///
/// The backend speaks in `uploader`/`thumbnail`/`duration`; the engine and
/// its persisted state use `artist`/`artworkUrl`/`durationSeconds`. Both
/// spellings are accepted when reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub title: String,
    #[serde(default, alias = "uploader")]
    pub artist: String,
    #[serde(default, alias = "thumbnail")]
    pub artwork_url: String,
    #[serde(default, alias = "duration")]
    pub duration_seconds: f64,
}

impl Track {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        duration_seconds: f64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            artwork_url: String::new(),
            duration_seconds,
        }
    }
}

/// Result of stream resolution for one track.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamHandle {
    pub stream_url: String,
    /// Length from track metadata, preferred over whatever the sink reports.
    pub authoritative_duration_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub track_count: u32,
}

// Wire types

#[derive(Debug, Deserialize)]
pub(crate) struct StreamResponse {
    pub stream_url: String,
    #[serde(default)]
    pub duration: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LyricsResponse {
    #[serde(default)]
    pub lyrics: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FavoriteStatus {
    pub liked: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistsResponse {
    #[serde(default)]
    pub playlists: Vec<Playlist>,
}

/// Track body accepted by `POST /liked` and `POST /playlists/{id}/tracks`.
#[derive(Debug, Serialize)]
pub(crate) struct TrackBody<'a> {
    pub video_id: &'a str,
    pub title: &'a str,
    pub uploader: &'a str,
    pub thumbnail: &'a str,
    pub duration: i64,
}

impl<'a> From<&'a Track> for TrackBody<'a> {
    fn from(track: &'a Track) -> Self {
        Self {
            video_id: &track.id,
            title: &track.title,
            uploader: &track.artist,
            thumbnail: &track.artwork_url,
            duration: track.duration_seconds.round() as i64,
        }
    }
}
