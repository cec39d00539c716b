use crate::store::SessionStore;
use serde::{Deserialize, Serialize};

/// Single resume slot per user; each write replaces the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackPosition {
    pub user_id: String,
    pub track_id: String,
    pub time_seconds: f64,
}

/// The stored time is usable only for the same track and strictly inside
/// `(0, max_seconds)`.
pub fn restorable_time(
    stored: Option<&PlaybackPosition>,
    track_id: &str,
    max_seconds: f64,
) -> Option<f64> {
    let stored = stored?;
    if stored.track_id != track_id {
        return None;
    }
    let time = stored.time_seconds;
    (time > 0.0 && time < max_seconds).then_some(time)
}

/// Tracks restore and save bookkeeping for the track being loaded.
#[derive(Debug)]
pub struct PositionTracker {
    save_interval: f64,
    restore_attempted: bool,
    last_saved: Option<(String, f64)>,
}

impl PositionTracker {
    pub fn new(save_interval: f64) -> Self {
        Self {
            save_interval: save_interval.max(0.0),
            restore_attempted: false,
            last_saved: None,
        }
    }

    /// Resets per-load state. Call on every track load.
    pub fn begin_load(&mut self) {
        self.restore_attempted = false;
        self.last_saved = None;
    }

    pub fn restore_attempted(&self) -> bool {
        self.restore_attempted
    }

    /// Marks this load as past its restore step without looking anything up.
    pub fn skip_restore(&mut self) {
        self.restore_attempted = true;
    }

    /// Looks up the resume point once per load. Later calls return `None`
    /// so a user scrub is never undone by a late restore.
    pub fn restore(
        &mut self,
        store: &SessionStore,
        user_id: &str,
        track_id: &str,
        max_seconds: f64,
    ) -> Option<f64> {
        if self.restore_attempted {
            return None;
        }
        self.restore_attempted = true;

        let stored = store.playback_position(user_id);
        let time = restorable_time(stored.as_ref(), track_id, max_seconds);
        match (&stored, time) {
            (_, Some(time)) => log::info!("[position] resuming {} at {:.1}s", track_id, time),
            (Some(stored), None) => log::debug!(
                "[position] stored position for {} not applicable to {}",
                stored.track_id,
                track_id
            ),
            (None, None) => {}
        }
        time
    }

    /// Writes at most once per `save_interval` seconds of playhead movement.
    /// Nothing is written before the restore attempt for this load.
    pub fn save(
        &mut self,
        store: &mut SessionStore,
        user_id: &str,
        track_id: &str,
        time_seconds: f64,
    ) -> bool {
        if !self.restore_attempted || !time_seconds.is_finite() {
            return false;
        }
        if let Some((saved_track, saved_time)) = &self.last_saved {
            if saved_track == track_id && (time_seconds - saved_time).abs() < self.save_interval {
                log::trace!("[position] throttled save at {:.2}s", time_seconds);
                return false;
            }
        }
        self.save_now(store, user_id, track_id, time_seconds)
    }

    /// Unthrottled write, used on load, seek and shutdown.
    pub fn save_now(
        &mut self,
        store: &mut SessionStore,
        user_id: &str,
        track_id: &str,
        time_seconds: f64,
    ) -> bool {
        if !self.restore_attempted || !time_seconds.is_finite() {
            return false;
        }
        let position = PlaybackPosition {
            user_id: user_id.to_string(),
            track_id: track_id.to_string(),
            time_seconds,
        };
        match store.set_playback_position(&position) {
            Ok(()) => {
                self.last_saved = Some((track_id.to_string(), time_seconds));
                true
            }
            Err(e) => {
                log::warn!("[position] failed to persist position: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(track_id: &str, time: f64) -> PlaybackPosition {
        PlaybackPosition {
            user_id: "u1".into(),
            track_id: track_id.into(),
            time_seconds: time,
        }
    }

    #[test]
    fn restores_only_matching_track_within_bounds() {
        let saved = stored("abc", 42.0);
        assert_eq!(restorable_time(Some(&saved), "abc", 100.0), Some(42.0));
        assert_eq!(restorable_time(Some(&saved), "xyz", 100.0), None);
        assert_eq!(restorable_time(Some(&saved), "abc", 42.0), None);
        assert_eq!(restorable_time(Some(&stored("abc", 0.0)), "abc", 100.0), None);
        assert_eq!(restorable_time(None, "abc", 100.0), None);
    }

    #[test]
    fn restore_is_attempted_once_per_load() {
        let mut store = SessionStore::in_memory();
        store.set_playback_position(&stored("abc", 42.0)).unwrap();

        let mut tracker = PositionTracker::new(1.0);
        tracker.begin_load();
        assert_eq!(tracker.restore(&store, "u1", "abc", 100.0), Some(42.0));
        assert_eq!(tracker.restore(&store, "u1", "abc", 100.0), None);

        tracker.begin_load();
        assert_eq!(tracker.restore(&store, "u1", "xyz", 100.0), None);
        assert!(tracker.restore_attempted());
    }

    #[test]
    fn saves_are_throttled_by_playhead_movement() {
        let mut store = SessionStore::in_memory();
        let mut tracker = PositionTracker::new(1.0);
        tracker.begin_load();

        // Before the restore attempt nothing is written.
        assert!(!tracker.save(&mut store, "u1", "abc", 5.0));
        tracker.restore(&store, "u1", "abc", 100.0);

        assert!(tracker.save(&mut store, "u1", "abc", 5.0));
        assert!(!tracker.save(&mut store, "u1", "abc", 5.4));
        assert!(!tracker.save(&mut store, "u1", "abc", 5.99));
        assert!(tracker.save(&mut store, "u1", "abc", 6.0));
        assert_eq!(store.playback_position("u1").unwrap().time_seconds, 6.0);

        // Switching tracks writes immediately and replaces the slot.
        assert!(tracker.save(&mut store, "u1", "def", 6.2));
        let slot = store.playback_position("u1").unwrap();
        assert_eq!(slot.track_id, "def");
    }
}
