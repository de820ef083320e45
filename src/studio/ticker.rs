//! Cancellable repeating timers for the studio event loop.

use std::time::{Duration, Instant};
use tokio::time::{Interval, MissedTickBehavior};

/// A repeating timer that can sit in a `select!` arm whether or not it runs.
///
/// Late ticks are skipped rather than bunched up, so a slow frame never causes
/// a burst of catch-up renders.
pub struct Ticker {
    period: Duration,
    interval: Option<Interval>,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    /// Builds a ticker firing `rate` times per second.
    pub fn per_second(rate: u32) -> Self {
        Self::new(Duration::from_secs(1) / rate.max(1))
    }

    /// (Re)starts the timer. The first tick fires one period from now.
    pub fn start(&mut self) {
        let first = tokio::time::Instant::now() + self.period;
        let mut interval = tokio::time::interval_at(first, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.interval = Some(interval);
    }

    pub fn cancel(&mut self) {
        self.interval = None;
    }

    #[cfg(test)]
    pub fn is_live(&self) -> bool {
        self.interval.is_some()
    }

    /// Waits for the next tick. Never resolves while cancelled.
    pub async fn tick(&mut self) -> Instant {
        match self.interval.as_mut() {
            Some(interval) => interval.tick().await.into_std(),
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_second_period() {
        assert_eq!(Ticker::per_second(20).period, Duration::from_millis(50));
        assert_eq!(Ticker::per_second(0).period, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_at_period() {
        let mut ticker = Ticker::new(Duration::from_millis(50));
        ticker.start();
        let started = tokio::time::Instant::now();

        ticker.tick().await;
        ticker.tick().await;

        assert_eq!(started.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_ticker_never_fires() {
        let mut ticker = Ticker::new(Duration::from_millis(10));
        ticker.start();
        ticker.cancel();
        assert!(!ticker.is_live());

        let fired = tokio::time::timeout(Duration::from_secs(1), ticker.tick()).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_cancel() {
        let mut ticker = Ticker::new(Duration::from_millis(10));
        ticker.start();
        ticker.cancel();
        ticker.start();

        assert!(ticker.is_live());
        let fired = tokio::time::timeout(Duration::from_millis(20), ticker.tick()).await;
        assert!(fired.is_ok());
    }
}
