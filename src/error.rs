use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stream unavailable for track {0}")]
    StreamUnavailable(String),

    #[error("Stream is not seekable")]
    SeekUnsupported,

    #[error("Audio sink error: {0}")]
    Sink(String),

    #[error("Authentication required")]
    AuthRequired,

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Playback session has shut down")]
    SessionClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("AppError", 2)?;
        state.serialize_field("kind", &self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Http(_) => "http",
            AppError::Json(_) => "json",
            AppError::StreamUnavailable(_) => "stream_unavailable",
            AppError::SeekUnsupported => "seek_unsupported",
            AppError::Sink(_) => "sink",
            AppError::AuthRequired => "auth_required",
            AppError::Api { .. } => "api",
            AppError::Config(_) => "config",
            AppError::NotFound(_) => "not_found",
            AppError::Storage(_) => "storage",
            AppError::SessionClosed => "session_closed",
            AppError::Io(_) => "io",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_kind_and_message() {
        let err = AppError::StreamUnavailable("abc".into());
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["kind"], "stream_unavailable");
        assert_eq!(value["message"], "Stream unavailable for track abc");
    }
}
