/// Which trigger noticed the end of the track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndSignal {
    NativeEnd,
    Poll,
}

/// Converges the sink's end-of-media event and a position poll against the
/// authoritative duration into a single advance per track load.
#[derive(Debug)]
pub struct EndOfTrackDetector {
    threshold: f64,
    duration: f64,
    armed: bool,
    fired: bool,
    polling: bool,
}

impl EndOfTrackDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            duration: 0.0,
            armed: false,
            fired: false,
            polling: false,
        }
    }

    /// Called once the new track is bound to the sink.
    pub fn arm(&mut self, duration: f64) {
        self.duration = if duration.is_finite() { duration } else { 0.0 };
        self.armed = true;
        self.fired = false;
        self.polling = false;
    }

    /// Called when a load starts; nothing fires until the next `arm`.
    pub fn disarm(&mut self) {
        self.armed = false;
        self.fired = false;
        self.polling = false;
    }

    pub fn set_duration(&mut self, duration: f64) {
        if duration.is_finite() && duration > 0.0 {
            self.duration = duration;
        }
    }

    pub fn start_polling(&mut self) {
        if self.armed && !self.fired {
            self.polling = true;
        }
    }

    pub fn stop_polling(&mut self) {
        self.polling = false;
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Returns true when the caller should advance.
    pub fn on_native_end(&mut self) -> bool {
        self.fire(EndSignal::NativeEnd)
    }

    /// Returns true when the caller should advance.
    pub fn poll(&mut self, position: f64) -> bool {
        if !self.polling || !position.is_finite() {
            return false;
        }
        if self.duration > 0.0 && position >= self.duration - self.threshold {
            return self.fire(EndSignal::Poll);
        }
        false
    }

    fn fire(&mut self, signal: EndSignal) -> bool {
        if !self.armed || self.fired {
            log::debug!("[end] ignoring {:?}, already handled", signal);
            return false;
        }
        self.fired = true;
        self.polling = false;
        log::info!("[end] track ended ({:?}, duration {:.1}s)", signal, self.duration);
        true
    }
}
