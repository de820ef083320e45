//! Elapsed-time display for the current take.

use std::time::{Duration, Instant};

/// How often the running clock emits a new reading.
pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Snapshot of the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockState {
    pub running: bool,
    pub elapsed_ms: u64,
}

/// Tracks elapsed recording time against a reference instant.
///
/// The clock does not own a timer; the session drives [`SessionClock::tick`]
/// every [`TICK_INTERVAL`]. Drift is bounded only by that timer's granularity.
#[derive(Debug)]
pub struct SessionClock {
    reference: Option<Instant>,
    state: ClockState,
    display: String,
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            reference: None,
            state: ClockState::default(),
            display: format_elapsed(0),
        }
    }

    /// Resets to zero and starts counting from `now`.
    pub fn start(&mut self, now: Instant) {
        self.reference = Some(now);
        self.state = ClockState {
            running: true,
            elapsed_ms: 0,
        };
        self.display = format_elapsed(0);
    }

    /// Computes the elapsed time and returns the formatted reading.
    ///
    /// Returns `None` when the clock is not running, so a tick delivered after
    /// `stop` changes nothing.
    pub fn tick(&mut self, now: Instant) -> Option<&str> {
        if !self.state.running {
            return None;
        }
        let reference = self.reference?;

        let elapsed = now.saturating_duration_since(reference).as_millis() as u64;
        self.state.elapsed_ms = self.state.elapsed_ms.max(elapsed);
        self.display = format_elapsed(self.state.elapsed_ms);
        Some(&self.display)
    }

    /// Stops emission. The last reading stays as it was.
    pub fn stop(&mut self) {
        self.state.running = false;
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    /// The most recent reading.
    pub fn display(&self) -> &str {
        &self.display
    }
}

/// Formats milliseconds as `mm:ss:cc`. Minutes are not capped at 59.
pub fn format_elapsed(elapsed_ms: u64) -> String {
    let total_seconds = elapsed_ms / 1000;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    let centis = (elapsed_ms % 1000) / 10;
    format!("{minutes:02}:{seconds:02}:{centis:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "00:00:00");
        assert_eq!(format_elapsed(61_230), "01:01:23");
        assert_eq!(format_elapsed(999), "00:00:99");
        assert_eq!(format_elapsed(100 * 60_000 + 5_010), "100:05:01");
    }

    #[test]
    fn test_elapsed_is_monotonic_while_running() {
        let start = Instant::now();
        let mut clock = SessionClock::new();
        clock.start(start);

        let mut last = 0;
        for step in [50u64, 100, 150, 400, 1_000] {
            clock.tick(start + Duration::from_millis(step));
            let elapsed = clock.state().elapsed_ms;
            assert!(elapsed >= last);
            last = elapsed;
        }
        assert_eq!(last, 1_000);
        assert_eq!(clock.display(), "00:01:00");
    }

    #[test]
    fn test_out_of_order_tick_does_not_go_backwards() {
        let start = Instant::now();
        let mut clock = SessionClock::new();
        clock.start(start);

        clock.tick(start + Duration::from_millis(500));
        clock.tick(start + Duration::from_millis(300));
        assert_eq!(clock.state().elapsed_ms, 500);
    }

    #[test]
    fn test_stop_freezes_and_ignores_stray_ticks() {
        let start = Instant::now();
        let mut clock = SessionClock::new();
        clock.start(start);
        clock.tick(start + Duration::from_millis(1_250));
        clock.stop();

        assert_eq!(clock.tick(start + Duration::from_millis(5_000)), None);
        assert_eq!(
            clock.state(),
            ClockState {
                running: false,
                elapsed_ms: 1_250
            }
        );
        assert_eq!(clock.display(), "00:01:25");
    }

    #[test]
    fn test_start_resets() {
        let start = Instant::now();
        let mut clock = SessionClock::new();
        clock.start(start);
        clock.tick(start + Duration::from_secs(3));
        clock.stop();

        let restart = start + Duration::from_secs(10);
        clock.start(restart);
        assert_eq!(clock.state().elapsed_ms, 0);
        assert_eq!(clock.display(), "00:00:00");
        assert_eq!(clock.tick(restart + Duration::from_millis(20)), Some("00:00:02"));
    }
}
