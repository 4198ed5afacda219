//! Periodic progress reporting.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::logf;
use crate::logger::Logger;
use crate::shutdown::{ShutdownTrigger, TerminalEvent};
use crate::transfer::TransferHandle;

/// Default polling period.
pub const STATS_UPDATE_INTERVAL: Duration = Duration::from_secs(5);

/// Percentage of `total` covered by `completed`. An empty transfer is 100%.
pub fn percent_complete(completed: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    completed as f64 / total as f64 * 100.0
}

/// Average KiB/s for `bytes` received over `interval`.
pub fn throughput_kib(bytes: u64, interval: Duration) -> u64 {
    let secs = interval.as_secs_f64();
    if secs <= 0.0 {
        return 0;
    }
    (bytes as f64 / 1024.0 / secs) as u64
}

/// One progress reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSample {
    pub percent: f64,
    pub speed_kib: u64,
    pub peers: usize,
}

impl ProgressSample {
    /// `useful_delta` is the growth of the useful-bytes counter over
    /// `elapsed`, the time since the previous sample.
    pub fn new(
        completed: u64,
        total: u64,
        peers: usize,
        useful_delta: u64,
        elapsed: Duration,
    ) -> Self {
        Self {
            percent: percent_complete(completed, total),
            speed_kib: throughput_kib(useful_delta, elapsed),
            peers,
        }
    }
}

impl fmt::Display for ProgressSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Progress: {:.2}%, Speed: {} KB/s, Peers: {}",
            self.percent, self.speed_kib, self.peers
        )
    }
}

/// Samples a transfer on a fixed period until it completes or is stopped.
pub struct ProgressMonitor {
    logger: Logger,
    interval: Duration,
}

impl ProgressMonitor {
    pub fn new(logger: Logger, interval: Duration) -> Self {
        Self { logger, interval }
    }

    /// Runs the monitor as a background task.
    ///
    /// The task fires [`TerminalEvent::Completed`] on `trigger` once the
    /// transfer is complete. Cancelling `stop` ends it without firing.
    pub fn spawn<H: TransferHandle>(
        self,
        handle: Arc<H>,
        trigger: ShutdownTrigger,
        stop: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(handle.as_ref(), &trigger, &stop).await })
    }

    async fn run<H: TransferHandle>(
        &self,
        handle: &H,
        trigger: &ShutdownTrigger,
        stop: &CancellationToken,
    ) {
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_useful = handle.stats().useful_bytes_read;
        let mut last_at = Instant::now();

        loop {
            tokio::select! {
                biased;
                _ = stop.cancelled() => return,
                _ = ticker.tick() => {}
            }
            // A delayed tick covers more than one interval.
            let now = Instant::now();

            let stats = handle.stats();
            let total = handle.total_length();
            let completed = handle.bytes_completed();
            let sample = ProgressSample::new(
                completed,
                total,
                stats.active_peers,
                stats.useful_bytes_read.saturating_sub(last_useful),
                now.duration_since(last_at),
            );
            last_useful = stats.useful_bytes_read;
            last_at = now;
            logf!(self.logger, "{sample}");

            if completed == total {
                logf!(self.logger, "Download complete!");
                trigger.fire(TerminalEvent::Completed);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::test_support;
    use crate::shutdown::shutdown_channel;
    use crate::testing::FakeHandle;

    #[test]
    fn test_percent_complete() {
        assert_eq!(percent_complete(50, 200), 25.0);
        assert_eq!(percent_complete(200, 200), 100.0);
    }

    #[test]
    fn test_percent_complete_empty_transfer() {
        assert_eq!(percent_complete(0, 0), 100.0);
    }

    #[test]
    fn test_throughput_uses_delta_over_interval() {
        assert_eq!(throughput_kib(10 * 1024, Duration::from_secs(5)), 2);
        assert_eq!(throughput_kib(1023, Duration::from_secs(1)), 0);
        assert_eq!(throughput_kib(4096, Duration::ZERO), 0);
    }

    #[test]
    fn test_sample_display() {
        let sample = ProgressSample::new(1, 3, 7, 5 * 2048, Duration::from_secs(5));
        assert_eq!(sample.to_string(), "Progress: 33.33%, Speed: 2 KB/s, Peers: 7");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_completion_once_finished() {
        let (logger, log, _) = test_support::logger();
        let handle = Arc::new(FakeHandle::new(1000));
        handle.set_peers(3);
        let (trigger, signal) = shutdown_channel();

        let task = ProgressMonitor::new(logger, Duration::from_secs(5)).spawn(
            Arc::clone(&handle),
            trigger.clone(),
            CancellationToken::new(),
        );

        time::sleep(Duration::from_secs(6)).await;
        handle.advance(1000, 10 * 1024);
        time::sleep(Duration::from_secs(5)).await;

        assert_eq!(signal.wait().await, TerminalEvent::Completed);
        task.await.unwrap();
        // Slot is spent; a late interrupt is a no-op.
        assert!(!trigger.fire(TerminalEvent::Interrupted));

        let lines = log.lines();
        assert_eq!(lines.len(), 3, "{lines:?}");
        assert!(lines[0].ends_with("Progress: 0.00%, Speed: 0 KB/s, Peers: 3"));
        assert!(lines[1].ends_with("Progress: 100.00%, Speed: 2 KB/s, Peers: 3"));
        assert!(lines[2].ends_with("Download complete!"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_transfer_completes_on_first_tick() {
        let (logger, log, _) = test_support::logger();
        let handle = Arc::new(FakeHandle::new(0));
        let (trigger, signal) = shutdown_channel();

        ProgressMonitor::new(logger, STATS_UPDATE_INTERVAL)
            .spawn(handle, trigger, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(signal.wait().await, TerminalEvent::Completed);
        assert!(log.lines()[0].ends_with("Progress: 100.00%, Speed: 0 KB/s, Peers: 0"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_does_not_signal_completion() {
        let (logger, _, _) = test_support::logger();
        let handle = Arc::new(FakeHandle::new(1000));
        let (trigger, _signal) = shutdown_channel();
        let stop = CancellationToken::new();

        let task = ProgressMonitor::new(logger, STATS_UPDATE_INTERVAL).spawn(
            Arc::clone(&handle),
            trigger.clone(),
            stop.clone(),
        );
        time::sleep(Duration::from_secs(12)).await;
        stop.cancel();
        task.await.unwrap();

        // Completing after the stop must not be observed by the monitor.
        handle.advance(1000, 0);
        time::sleep(Duration::from_secs(12)).await;
        assert!(trigger.fire(TerminalEvent::Interrupted));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_tick_spreads_bytes_over_elapsed_time() {
        let (logger, log, _) = test_support::logger();
        let handle = Arc::new(FakeHandle::new(1000));
        let (trigger, signal) = shutdown_channel();

        let task = ProgressMonitor::new(logger, Duration::from_secs(5)).spawn(
            Arc::clone(&handle),
            trigger,
            CancellationToken::new(),
        );
        tokio::task::yield_now().await;

        // The first tick is due at 5s but only runs at 10s.
        handle.advance(1000, 100 * 1024);
        time::advance(Duration::from_secs(10)).await;

        assert_eq!(signal.wait().await, TerminalEvent::Completed);
        task.await.unwrap();
        assert!(log.lines()[0].ends_with("Progress: 100.00%, Speed: 10 KB/s, Peers: 0"));
    }
}
