use crate::error::AppResult;
use tokio::sync::mpsc;

/// Notifications from the sink. The session derives its play state from
/// these rather than from the calls it makes.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    /// The bound source can start; `duration` is whatever the sink believes
    /// and may be NaN.
    Ready { duration: f64 },
    Playing,
    Paused,
    TimeUpdate { position: f64 },
    Ended,
    Error(String),
}

pub type SinkEventSender = mpsc::UnboundedSender<SinkEvent>;

/// The one audio output of the session. Only the session controller calls
/// into it.
pub trait AudioSink: Send {
    /// Hands the sink the channel it reports events on.
    fn attach(&mut self, events: SinkEventSender);

    /// Replaces the current source. Playback does not start.
    fn load(&mut self, url: &str) -> AppResult<()>;

    fn play(&mut self) -> AppResult<()>;

    fn pause(&mut self);

    /// Fails with `AppError::SeekUnsupported` for live or unseekable streams.
    fn seek(&mut self, seconds: f64) -> AppResult<()>;

    fn set_volume(&mut self, volume: f32);

    fn position(&self) -> f64;

    /// Sink-reported length, `None` while unknown.
    fn duration(&self) -> Option<f64>;

    /// Releases the source for good; called on teardown.
    fn dispose(&mut self);
}
