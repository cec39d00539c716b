use crate::api::models::Track;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One slot in the queue. The same track may occupy several slots, so
/// membership is tracked by `entry_id`, not by track id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub entry_id: String,
    pub track: Track,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueView {
    Order,
    Shuffled,
}

/// What the UI renders: the active view plus the current slot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    pub entries: Vec<QueueEntry>,
    pub view: QueueView,
    pub current_entry_id: Option<String>,
}

/// Queue state for disk persistence. `permutation` is the shuffled view as
/// indices into `entries`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedQueue {
    pub entries: Vec<QueueEntry>,
    #[serde(default)]
    pub shuffle_enabled: bool,
    #[serde(default)]
    pub permutation: Vec<usize>,
    #[serde(default)]
    pub current_entry_id: Option<String>,
}

/// Canonical play order plus a shuffled view kept as a permutation of it.
///
/// The shuffled view is only rebuilt when shuffle is switched on or when the
/// queue length changes while shuffle is active. Reordering touches the
/// active view alone; the other view catches up at the next reshuffle.
pub struct PlaybackQueue {
    order: Vec<QueueEntry>,
    permutation: Vec<usize>,
    shuffle: bool,
    current: Option<String>,
    pending: Option<String>,
    rng: StdRng,
}

impl Default for PlaybackQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            order: Vec::new(),
            permutation: Vec::new(),
            shuffle: false,
            current: None,
            pending: None,
            rng,
        }
    }

    /// Handles a track pick. A non-empty `candidates` list replaces the
    /// queue; otherwise `track` is appended unless already queued. The
    /// picked slot becomes pending-current and its entry id is returned.
    pub fn select(&mut self, track: &Track, candidates: &[Track]) -> String {
        let previous_len = self.order.len();

        if !candidates.is_empty() {
            self.order = build_entries(candidates);
        } else if !self.order.iter().any(|e| e.track.id == track.id) {
            let entry = self.new_entry(track.clone());
            self.order.push(entry);
        }

        let entry_id = self
            .order
            .iter()
            .find(|e| e.track.id == track.id)
            .map(|e| e.entry_id.clone())
            .unwrap_or_else(|| track.id.clone());
        self.pending = Some(entry_id.clone());

        if self.shuffle && self.order.len() != previous_len {
            self.reshuffle();
        }
        entry_id
    }

    /// Appends a slot even when the track is already queued.
    pub fn append(&mut self, track: Track) -> String {
        let entry = self.new_entry(track);
        let entry_id = entry.entry_id.clone();
        self.order.push(entry);
        if self.shuffle {
            self.reshuffle();
        }
        entry_id
    }

    /// Marks an existing slot as the next one to load.
    pub fn set_pending(&mut self, entry_id: &str) {
        self.pending = Some(entry_id.to_string());
    }

    pub fn commit_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.current = Some(pending);
        }
    }

    pub fn discard_pending(&mut self) {
        self.pending = None;
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        if self.shuffle {
            self.shuffle = false;
        } else {
            self.reshuffle();
            self.shuffle = true;
        }
        log::info!(
            "[queue] shuffle {}",
            if self.shuffle { "on" } else { "off" }
        );
        self.shuffle
    }

    /// Fisher-Yates over every slot except the focused one, which goes first.
    fn reshuffle(&mut self) {
        let focus = self.focus_index();
        let mut rest: Vec<usize> = (0..self.order.len())
            .filter(|i| Some(*i) != focus)
            .collect();
        rest.shuffle(&mut self.rng);

        self.permutation = focus.into_iter().chain(rest).collect();
        debug_assert!(self.permutation_is_valid());
    }

    fn focus_index(&self) -> Option<usize> {
        let focus = self.pending.as_ref().or(self.current.as_ref())?;
        self.order.iter().position(|e| &e.entry_id == focus)
    }

    /// Moves one slot within the active view. Returns false for an
    /// out-of-range index.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        let len = self.order.len();
        if from >= len || to >= len {
            return false;
        }
        if from == to {
            return true;
        }

        if self.shuffle {
            let slot = self.permutation.remove(from);
            self.permutation.insert(to, slot);
        } else {
            let entry = self.order.remove(from);
            self.order.insert(to, entry);

            // Keep the shuffled view pointing at the same slots.
            for index in self.permutation.iter_mut() {
                *index = moved_index(*index, from, to);
            }
        }
        true
    }

    /// Drops a slot from both views. Returns false if it was not queued.
    /// With shuffle on, the shorter queue is reshuffled like after an append.
    pub fn remove(&mut self, entry_id: &str) -> bool {
        let Some(index) = self.order.iter().position(|e| e.entry_id == entry_id) else {
            return false;
        };
        self.order.remove(index);
        self.permutation.retain(|&i| i != index);
        for slot in self.permutation.iter_mut() {
            if *slot > index {
                *slot -= 1;
            }
        }
        if self.pending.as_deref() == Some(entry_id) {
            self.pending = None;
        }
        if self.shuffle {
            self.reshuffle();
        }
        true
    }

    /// Slot after `current_entry_id` in the active view. Only the shuffled
    /// view wraps around to its first slot.
    pub fn next(&self, current_entry_id: &str) -> Option<&QueueEntry> {
        let list = self.active_entries();
        if list.is_empty() {
            return None;
        }
        match list.iter().position(|e| e.entry_id == current_entry_id) {
            Some(i) if i + 1 < list.len() => Some(list[i + 1]),
            _ if self.shuffle => Some(list[0]),
            _ => None,
        }
    }

    /// Slot before `current_entry_id` in the active view; never wraps.
    pub fn previous(&self, current_entry_id: &str) -> Option<&QueueEntry> {
        let list = self.active_entries();
        match list.iter().position(|e| e.entry_id == current_entry_id) {
            Some(i) if i > 0 => Some(list[i - 1]),
            _ => None,
        }
    }

    pub fn active_view(&self) -> QueueView {
        if self.shuffle {
            QueueView::Shuffled
        } else {
            QueueView::Order
        }
    }

    pub fn active_entries(&self) -> Vec<&QueueEntry> {
        match self.active_view() {
            QueueView::Order => self.order.iter().collect(),
            QueueView::Shuffled => self.shuffled_entries(),
        }
    }

    pub fn order(&self) -> &[QueueEntry] {
        &self.order
    }

    /// The shuffled view, which may be stale while shuffle is off.
    pub fn shuffled_entries(&self) -> Vec<&QueueEntry> {
        self.permutation
            .iter()
            .filter_map(|&i| self.order.get(i))
            .collect()
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffle
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, entry_id: &str) -> bool {
        self.order.iter().any(|e| e.entry_id == entry_id)
    }

    pub fn current_entry_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn pending_entry_id(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub fn current_entry(&self) -> Option<&QueueEntry> {
        let current = self.current.as_deref()?;
        self.order.iter().find(|e| e.entry_id == current)
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            entries: self.active_entries().into_iter().cloned().collect(),
            view: self.active_view(),
            current_entry_id: self.current.clone(),
        }
    }

    pub fn persisted_state(&self) -> PersistedQueue {
        PersistedQueue {
            entries: self.order.clone(),
            shuffle_enabled: self.shuffle,
            permutation: self.permutation.clone(),
            current_entry_id: self.current.clone(),
        }
    }

    /// Restores a saved queue. A permutation that no longer matches the
    /// entries is discarded and rebuilt if shuffle was on.
    pub fn restore_from_persisted(&mut self, state: PersistedQueue) {
        self.order = state.entries;
        self.permutation = state.permutation;
        self.shuffle = state.shuffle_enabled;
        self.current = state.current_entry_id;
        self.pending = None;

        if !self.permutation_is_valid() {
            if self.shuffle {
                log::warn!("[queue] saved shuffle order is stale, reshuffling");
                self.reshuffle();
            } else {
                self.permutation.clear();
            }
        }
    }

    fn permutation_is_valid(&self) -> bool {
        let len = self.order.len();
        if self.permutation.len() != len {
            return false;
        }
        let mut seen = vec![false; len];
        for &i in &self.permutation {
            if i >= len || seen[i] {
                return false;
            }
            seen[i] = true;
        }
        true
    }

    fn new_entry(&self, track: Track) -> QueueEntry {
        let entry_id = if self.order.iter().any(|e| e.entry_id == track.id) {
            unique_entry_id(&track.id)
        } else {
            track.id.clone()
        };
        QueueEntry { entry_id, track }
    }
}

fn build_entries(tracks: &[Track]) -> Vec<QueueEntry> {
    let mut seen = HashSet::new();
    tracks
        .iter()
        .map(|track| {
            let entry_id = if seen.insert(track.id.as_str()) {
                track.id.clone()
            } else {
                unique_entry_id(&track.id)
            };
            QueueEntry {
                entry_id,
                track: track.clone(),
            }
        })
        .collect()
}

fn unique_entry_id(track_id: &str) -> String {
    format!("{}~{}", track_id, uuid::Uuid::new_v4().simple())
}

/// Where the element at `index` ends up after moving `from` to `to`.
fn moved_index(index: usize, from: usize, to: usize) -> usize {
    if index == from {
        to
    } else if from < to && index > from && index <= to {
        index - 1
    } else if from > to && index >= to && index < from {
        index + 1
    } else {
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::collections::HashMap;

    fn tracks(n: usize) -> Vec<Track> {
        (0..n)
            .map(|i| Track::new(format!("t{}", i), format!("Song {}", i), "Band", 180.0))
            .collect()
    }

    fn ids(entries: &[&QueueEntry]) -> Vec<String> {
        entries.iter().map(|e| e.entry_id.clone()).collect()
    }

    fn multiset(ids: &[String]) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for id in ids {
            *counts.entry(id.clone()).or_insert(0) += 1;
        }
        counts
    }

    fn assert_views_agree(queue: &PlaybackQueue) {
        if queue.is_shuffled() && !queue.is_empty() {
            let order: Vec<String> = queue.order().iter().map(|e| e.entry_id.clone()).collect();
            let shuffled = ids(&queue.shuffled_entries());
            assert_eq!(multiset(&order), multiset(&shuffled));
        }
    }

    #[test]
    fn select_with_list_replaces_queue() {
        let list = tracks(5);
        let mut queue = PlaybackQueue::with_seed(1);
        let entry = queue.select(&list[2], &list);
        assert_eq!(entry, "t2");
        assert_eq!(queue.len(), 5);
        assert_eq!(queue.pending_entry_id(), Some("t2"));

        queue.commit_pending();
        assert_eq!(queue.current_entry_id(), Some("t2"));
        assert_eq!(queue.pending_entry_id(), None);
    }

    #[test]
    fn select_without_list_appends_once() {
        let list = tracks(2);
        let mut queue = PlaybackQueue::with_seed(1);
        queue.select(&list[0], &[]);
        queue.select(&list[1], &[]);
        queue.select(&list[0], &[]);
        let order: Vec<&str> = queue.order().iter().map(|e| e.entry_id.as_str()).collect();
        assert_eq!(order, vec!["t0", "t1"]);
        assert_eq!(queue.pending_entry_id(), Some("t0"));
    }

    #[test]
    fn duplicate_tracks_get_distinct_entry_ids() {
        let t = tracks(1).remove(0);
        let mut queue = PlaybackQueue::with_seed(1);
        queue.select(&t, &[t.clone(), t.clone()]);
        let second = queue.append(t.clone());

        let order: Vec<&str> = queue.order().iter().map(|e| e.entry_id.as_str()).collect();
        assert_eq!(order[0], "t0");
        assert_ne!(order[1], "t0");
        assert_ne!(order[1], second);
        assert!(second.starts_with("t0~"));
    }

    #[test]
    fn shuffle_puts_current_first_and_keeps_members() {
        let list = tracks(5);
        let mut queue = PlaybackQueue::with_seed(7);
        queue.select(&list[0], &list);
        queue.commit_pending();

        assert!(queue.toggle_shuffle());
        let shuffled = queue.shuffled_entries();
        assert_eq!(shuffled.len(), 5);
        assert_eq!(shuffled[0].track.id, "t0");
        assert_views_agree(&queue);

        assert!(!queue.toggle_shuffle());
        let order: Vec<&str> = queue.order().iter().map(|e| e.entry_id.as_str()).collect();
        assert_eq!(order, vec!["t0", "t1", "t2", "t3", "t4"]);
        assert_eq!(queue.active_view(), QueueView::Order);
        // The shuffled view survives toggling off.
        assert_eq!(queue.shuffled_entries().len(), 5);
    }

    #[test]
    fn shuffle_without_current_permutes_everything() {
        let list = tracks(4);
        let mut queue = PlaybackQueue::with_seed(3);
        queue.select(&list[0], &list);
        queue.discard_pending();
        queue.toggle_shuffle();
        assert_views_agree(&queue);
    }

    #[test]
    fn remove_drops_entry_from_both_views() {
        let list = tracks(5);
        let mut queue = PlaybackQueue::with_seed(11);
        queue.select(&list[1], &list);
        queue.commit_pending();
        queue.toggle_shuffle();

        assert!(queue.remove("t3"));
        assert!(!queue.contains("t3"));
        assert!(queue.shuffled_entries().iter().all(|e| e.entry_id != "t3"));
        assert_views_agree(&queue);

        // Also with shuffle off, the dormant view is kept in sync.
        queue.toggle_shuffle();
        assert!(queue.remove("t4"));
        assert!(queue.shuffled_entries().iter().all(|e| e.entry_id != "t4"));
        assert_eq!(queue.shuffled_entries().len(), 3);
        assert!(!queue.remove("t4"));
    }

    #[test]
    fn removing_while_shuffled_reshuffles_around_current() {
        let list = tracks(6);
        let mut queue = PlaybackQueue::with_seed(13);
        queue.select(&list[2], &list);
        queue.commit_pending();
        queue.toggle_shuffle();

        // Move the current slot away from the front, then shrink the queue.
        let len = queue.len();
        assert!(queue.reorder(0, len - 1));
        assert_ne!(queue.shuffled_entries()[0].entry_id, "t2");

        assert!(queue.remove("t5"));
        let shuffled = queue.shuffled_entries();
        assert_eq!(shuffled.len(), 5);
        assert_eq!(shuffled[0].entry_id, "t2");
        assert_views_agree(&queue);
    }

    #[test]
    fn reorder_only_touches_active_view() {
        let list = tracks(4);
        let mut queue = PlaybackQueue::with_seed(5);
        queue.select(&list[0], &list);
        queue.commit_pending();
        queue.toggle_shuffle();
        let shuffled_before = ids(&queue.shuffled_entries());

        queue.toggle_shuffle();
        assert!(queue.reorder(0, 3));
        let order: Vec<&str> = queue.order().iter().map(|e| e.entry_id.as_str()).collect();
        assert_eq!(order, vec!["t1", "t2", "t3", "t0"]);
        assert_eq!(ids(&queue.shuffled_entries()), shuffled_before);

        queue.toggle_shuffle();
        let reshuffled = ids(&queue.shuffled_entries());
        assert!(queue.reorder(1, 0));
        let moved = ids(&queue.shuffled_entries());
        assert_eq!(moved[0], reshuffled[1]);
        assert_eq!(moved[1], reshuffled[0]);
        let order_after: Vec<&str> = queue.order().iter().map(|e| e.entry_id.as_str()).collect();
        assert_eq!(order_after, vec!["t1", "t2", "t3", "t0"]);

        assert!(!queue.reorder(0, 9));
    }

    #[test]
    fn next_wraps_only_in_shuffle_mode() {
        let list = tracks(3);
        let mut queue = PlaybackQueue::with_seed(2);
        queue.select(&list[0], &list);
        queue.commit_pending();

        assert_eq!(queue.next("t0").map(|e| e.entry_id.as_str()), Some("t1"));
        assert_eq!(queue.next("t2"), None);
        assert_eq!(queue.previous("t1").map(|e| e.entry_id.as_str()), Some("t0"));
        assert_eq!(queue.previous("t0"), None);

        queue.toggle_shuffle();
        let shuffled = ids(&queue.shuffled_entries());
        let last = shuffled.last().unwrap().clone();
        assert_eq!(
            queue.next(&last).map(|e| e.entry_id.clone()),
            Some(shuffled[0].clone())
        );
        assert_eq!(queue.previous(&shuffled[0]), None);
    }

    #[test]
    fn growing_queue_in_shuffle_mode_reshuffles() {
        let list = tracks(6);
        let mut queue = PlaybackQueue::with_seed(9);
        queue.select(&list[0], &list[..3]);
        queue.commit_pending();
        queue.toggle_shuffle();

        queue.select(&list[4], &[]);
        assert_eq!(queue.len(), 4);
        assert_eq!(queue.shuffled_entries()[0].entry_id, "t4");
        assert_views_agree(&queue);

        queue.append(list[5].clone());
        assert_views_agree(&queue);
    }

    #[test]
    fn views_agree_under_random_mutations() {
        let list = tracks(8);
        let mut queue = PlaybackQueue::with_seed(42);
        let mut rng = StdRng::seed_from_u64(42);
        queue.select(&list[0], &list);
        queue.commit_pending();

        for _ in 0..500 {
            match rng.gen_range(0..6) {
                0 => {
                    queue.toggle_shuffle();
                }
                1 if !queue.is_empty() => {
                    let len = queue.len();
                    queue.reorder(rng.gen_range(0..len), rng.gen_range(0..len));
                }
                2 if !queue.is_empty() => {
                    let i = rng.gen_range(0..queue.len());
                    let id = queue.order()[i].entry_id.clone();
                    queue.remove(&id);
                }
                3 => {
                    let t = &list[rng.gen_range(0..list.len())];
                    queue.select(t, &[]);
                    queue.commit_pending();
                }
                4 => {
                    queue.append(list[rng.gen_range(0..list.len())].clone());
                }
                _ => {
                    let n = rng.gen_range(1..list.len());
                    queue.select(&list[0], &list[..n]);
                    queue.commit_pending();
                }
            }
            assert_views_agree(&queue);
        }
    }

    #[test]
    fn restore_rebuilds_stale_permutation() {
        let list = tracks(3);
        let mut queue = PlaybackQueue::with_seed(4);
        queue.select(&list[0], &list);
        queue.commit_pending();
        queue.toggle_shuffle();

        let mut saved = queue.persisted_state();
        saved.permutation = vec![0, 0, 5];

        let mut restored = PlaybackQueue::with_seed(4);
        restored.restore_from_persisted(saved);
        assert!(restored.is_shuffled());
        assert_eq!(restored.shuffled_entries()[0].entry_id, "t0");
        assert_views_agree(&restored);
    }

    #[test]
    fn moved_index_matches_vec_move() {
        for from in 0..5 {
            for to in 0..5 {
                let mut v: Vec<usize> = (0..5).collect();
                let x = v.remove(from);
                v.insert(to, x);
                for original in 0..5 {
                    assert_eq!(v[moved_index(original, from, to)], original);
                }
            }
        }
    }
}
