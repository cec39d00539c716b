//! Time-coded (LRC style) lyrics: parsing and playhead lookup.

use crate::api::models::Track;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricLine {
    pub time_seconds: f64,
    pub text: String,
}

fn timestamp_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\[(\d{1,3}):(\d{2})(?:\.(\d{1,3}))?\](.*)").unwrap())
}

fn query_noise_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?i)\(feat\..*?\)|\(official audio\)|\(official video\)|\[.*?\]").unwrap()
    })
}

/// Parses an LRC document. Lines without a timestamp tag or without text
/// after it are dropped; the rest keep document order, sorted or not.
pub fn parse(document: &str) -> Vec<LyricLine> {
    let regex = timestamp_regex();

    document
        .lines()
        .filter_map(|line| {
            let caps = regex.captures(line)?;
            let minutes: f64 = caps[1].parse().ok()?;
            let seconds: f64 = caps[2].parse().ok()?;
            let fraction = match caps.get(3) {
                Some(digits) => format!("0.{}", digits.as_str()).parse::<f64>().ok()?,
                None => 0.0,
            };
            let text = caps[4].trim();
            if text.is_empty() {
                return None;
            }
            Some(LyricLine {
                time_seconds: minutes * 60.0 + seconds + fraction,
                text: text.to_string(),
            })
        })
        .collect()
}

/// Index of the line showing at `current_time`: the greatest `i` whose
/// shifted start has passed while the next line's shifted start has not.
pub fn active_index(lines: &[LyricLine], current_time: f64, offset: f64) -> Option<usize> {
    (0..lines.len()).rev().find(|&i| {
        let starts = lines[i].time_seconds + offset;
        let next_pending = lines
            .get(i + 1)
            .map_or(true, |next| next.time_seconds + offset > current_time);
        starts <= current_time && next_pending
    })
}

/// Search text for a track's lyrics with decorations that confuse lyric
/// providers stripped out. `None` when nothing searchable remains.
pub fn search_query(track: &Track) -> Option<String> {
    let raw = format!("{} {}", track.title, track.artist);
    let cleaned = query_noise_regex().replace_all(&raw, " ");
    let query = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    (!query.is_empty()).then_some(query)
}

/// Lyrics for the loaded track plus the line currently highlighted.
#[derive(Debug, Default)]
pub struct LyricsSync {
    lines: Vec<LyricLine>,
    offset: f64,
    active: Option<usize>,
}

impl LyricsSync {
    pub fn new(offset: f64) -> Self {
        Self {
            lines: Vec::new(),
            offset,
            active: None,
        }
    }

    pub fn load(&mut self, document: Option<&str>) {
        self.lines = document.map(parse).unwrap_or_default();
        self.active = None;
    }

    /// Swaps in another set of lines and hands back the old ones. The active
    /// line is reset until the next `update`.
    pub fn replace(&mut self, lines: Vec<LyricLine>) -> Vec<LyricLine> {
        self.active = None;
        std::mem::replace(&mut self.lines, lines)
    }

    pub fn lines(&self) -> &[LyricLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    /// Recomputes the active line; true when it changed.
    pub fn update(&mut self, current_time: f64) -> bool {
        let active = active_index(&self.lines, current_time, self.offset);
        let changed = active != self.active;
        self.active = active;
        changed
    }
}
