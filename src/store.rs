//! Durable key-value storage for session state.
//!
//! Values are small JSON records wrapped in a versioned envelope. Anything
//! that fails to parse, has the wrong shape, or was written by a different
//! schema version reads back as absent so the session falls back to defaults.

use crate::api::models::Track;
use crate::audio::position::PlaybackPosition;
use crate::audio::queue::PersistedQueue;
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: u32 = 1;

pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> AppResult<()>;
    fn remove(&mut self, key: &str) -> AppResult<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> AppResult<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> AppResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// All keys live in one JSON object file that is rewritten on every change.
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                log::warn!(
                    "[store] {} is not a valid state file ({}), starting empty",
                    path.display(),
                    e
                );
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                log::warn!("[store] failed to read {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> AppResult<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let content = serde_json::to_string_pretty(&self.entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> AppResult<()> {
        self.entries.insert(key.to_string(), value);
        self.persist()
    }

    fn remove(&mut self, key: &str) -> AppResult<()> {
        if self.entries.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKey<'a> {
    LastTrack(&'a str),
    LastQueue(&'a str),
    PlaybackPosition(&'a str),
    Volume,
}

impl StoreKey<'_> {
    pub fn as_key(&self) -> String {
        match self {
            StoreKey::LastTrack(user) => format!("user:{}:last_track", user),
            StoreKey::LastQueue(user) => format!("user:{}:last_queue", user),
            StoreKey::PlaybackPosition(user) => format!("user:{}:playback_position", user),
            StoreKey::Volume => "volume".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    version: u32,
    saved_at: DateTime<Utc>,
    data: T,
}

/// Typed view over a `KeyValueStore` with the session's fixed schema.
pub struct SessionStore {
    backend: Box<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    fn read<T: DeserializeOwned>(&self, key: StoreKey<'_>) -> Option<T> {
        let key = key.as_key();
        let raw = self.backend.get(&key)?;
        match serde_json::from_str::<Envelope<T>>(&raw) {
            Ok(envelope) if envelope.version == SCHEMA_VERSION => Some(envelope.data),
            Ok(envelope) => {
                log::warn!(
                    "[store] ignoring {} written by schema v{}",
                    key,
                    envelope.version
                );
                None
            }
            Err(e) => {
                log::warn!("[store] ignoring malformed {}: {}", key, e);
                None
            }
        }
    }

    fn write<T: Serialize>(&mut self, key: StoreKey<'_>, data: &T) -> AppResult<()> {
        let envelope = Envelope {
            version: SCHEMA_VERSION,
            saved_at: Utc::now(),
            data,
        };
        let raw = serde_json::to_string(&envelope)?;
        self.backend
            .set(&key.as_key(), raw)
            .map_err(|e| AppError::Storage(format!("{}: {}", key.as_key(), e)))
    }

    pub fn last_track(&self, user_id: &str) -> Option<Track> {
        self.read(StoreKey::LastTrack(user_id))
    }

    pub fn set_last_track(&mut self, user_id: &str, track: &Track) -> AppResult<()> {
        self.write(StoreKey::LastTrack(user_id), track)
    }

    pub fn last_queue(&self, user_id: &str) -> Option<PersistedQueue> {
        self.read(StoreKey::LastQueue(user_id))
    }

    pub fn set_last_queue(&mut self, user_id: &str, queue: &PersistedQueue) -> AppResult<()> {
        self.write(StoreKey::LastQueue(user_id), queue)
    }

    pub fn playback_position(&self, user_id: &str) -> Option<PlaybackPosition> {
        self.read::<PlaybackPosition>(StoreKey::PlaybackPosition(user_id))
            .filter(|p| p.user_id == user_id && p.time_seconds.is_finite())
    }

    pub fn set_playback_position(&mut self, position: &PlaybackPosition) -> AppResult<()> {
        self.write(StoreKey::PlaybackPosition(&position.user_id), position)
    }

    pub fn volume(&self) -> Option<f32> {
        self.read::<f32>(StoreKey::Volume)
            .filter(|v| v.is_finite())
            .map(|v| v.clamp(0.0, 1.0))
    }

    pub fn set_volume(&mut self, volume: f32) -> AppResult<()> {
        self.write(StoreKey::Volume, &volume)
    }

    pub fn clear(&mut self, key: StoreKey<'_>) -> AppResult<()> {
        self.backend.remove(&key.as_key())
    }
}
