use crate::audio::sink::{AudioSink, SinkEvent, SinkEventSender};
use crate::error::{AppError, AppResult};
use tokio::time::Instant;

/// A silent sink whose playhead follows the wall clock.
///
/// It never knows the media length, so it reports no duration and emits no
/// end-of-media event; the session's position poll ends each track.
pub struct ClockSink {
    events: Option<SinkEventSender>,
    source: Option<String>,
    base: f64,
    playing_since: Option<Instant>,
}

impl Default for ClockSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSink {
    pub fn new() -> Self {
        Self {
            events: None,
            source: None,
            base: 0.0,
            playing_since: None,
        }
    }

    fn emit(&self, event: SinkEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

impl AudioSink for ClockSink {
    fn attach(&mut self, events: SinkEventSender) {
        self.events = Some(events);
    }

    fn load(&mut self, url: &str) -> AppResult<()> {
        let was_playing = self.playing_since.take().is_some();
        self.source = Some(url.to_string());
        self.base = 0.0;
        if was_playing {
            self.emit(SinkEvent::Paused);
        }
        log::debug!("[clock-sink] source {}", url);
        self.emit(SinkEvent::Ready {
            duration: f64::NAN,
        });
        Ok(())
    }

    fn play(&mut self) -> AppResult<()> {
        if self.source.is_none() {
            return Err(AppError::Sink("No source loaded".into()));
        }
        if self.playing_since.is_none() {
            self.playing_since = Some(Instant::now());
            self.emit(SinkEvent::Playing);
        }
        Ok(())
    }

    fn pause(&mut self) {
        if self.playing_since.is_some() {
            self.base = self.position();
            self.playing_since = None;
            self.emit(SinkEvent::Paused);
        }
    }

    fn seek(&mut self, seconds: f64) -> AppResult<()> {
        if self.source.is_none() {
            return Err(AppError::SeekUnsupported);
        }
        self.base = seconds.max(0.0);
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        // Nothing is audible; the level only matters to the session.
        log::debug!("[clock-sink] volume {:.2}", volume);
    }

    fn position(&self) -> f64 {
        match self.playing_since {
            Some(since) => self.base + since.elapsed().as_secs_f64(),
            None => self.base,
        }
    }

    fn duration(&self) -> Option<f64> {
        None
    }

    fn dispose(&mut self) {
        self.pause();
        self.source = None;
        self.base = 0.0;
    }
}
