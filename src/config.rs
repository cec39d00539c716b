use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    /// Positive values show lyric lines later relative to the audio.
    #[serde(default = "default_lyrics_offset")]
    pub lyrics_offset_secs: f64,
    #[serde(default = "default_progress_interval")]
    pub progress_interval_ms: u64,
    #[serde(default = "default_end_threshold")]
    pub end_threshold_secs: f64,
    #[serde(default = "default_position_save_interval")]
    pub position_save_interval_secs: f64,
    #[serde(default = "default_volume")]
    pub default_volume: f32,
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_lyrics_offset() -> f64 {
    0.5
}

fn default_progress_interval() -> u64 {
    250
}

fn default_end_threshold() -> f64 {
    0.5
}

fn default_position_save_interval() -> f64 {
    1.0
}

fn default_volume() -> f32 {
    0.8
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            access_token: None,
            user_id: None,
            username: None,
            lyrics_offset_secs: default_lyrics_offset(),
            progress_interval_ms: default_progress_interval(),
            end_threshold_secs: default_end_threshold(),
            position_save_interval_secs: default_position_save_interval(),
            default_volume: default_volume(),
        }
    }
}

impl AppConfig {
    pub fn config_dir() -> AppResult<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| AppError::Config("Cannot find home directory".into()))?;
        Ok(home.join(".mobify"))
    }

    pub fn config_path() -> AppResult<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    pub fn state_path() -> AppResult<PathBuf> {
        Ok(Self::config_dir()?.join("state.json"))
    }

    pub fn load() -> AppResult<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Err(AppError::Config("Config file not found".into()));
        }
        let content = std::fs::read_to_string(&path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Loads the config file, falling back to (and writing out) defaults.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            log::warn!("Failed to load config: {}. Using defaults.", e);
            let config = Self::default();
            if let Err(save_err) = config.save() {
                log::error!("Failed to save default config: {}", save_err);
            }
            config
        })
    }

    pub fn save(&self) -> AppResult<()> {
        let dir = Self::config_dir()?;
        std::fs::create_dir_all(&dir)?;
        let path = Self::config_path()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    pub fn is_signed_in(&self) -> bool {
        self.access_token.is_some() && self.user_id.is_some()
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(10))
    }
}
