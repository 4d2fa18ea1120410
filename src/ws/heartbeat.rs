//! Periodic liveness probe while a session is connected.

use std::future;
use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at, sleep_until};

/// What the monitor woke up for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Beat {
    /// Time to send the next probe
    Probe,
    /// A probe went unanswered for the whole timeout
    Expired,
}

/// Fires once per heartbeat interval while running, and once more if a probe
/// is not followed by inbound traffic within the timeout.
///
/// The first probe is due one full interval after [`HeartbeatMonitor::start`];
/// the probe itself is sent by the connection manager.
#[derive(Debug)]
pub(crate) struct HeartbeatMonitor {
    period: Duration,
    timeout: Duration,
    ticker: Option<Interval>,
    /// Set by the first unanswered probe, cleared by any inbound traffic
    deadline: Option<Instant>,
}

impl HeartbeatMonitor {
    pub(crate) fn new(period: Duration, timeout: Duration) -> Self {
        Self {
            period,
            timeout,
            ticker: None,
            deadline: None,
        }
    }

    /// Start ticking, restarting the period if already running.
    pub(crate) fn start(&mut self) {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.ticker = Some(ticker);
        self.deadline = None;
    }

    pub(crate) fn stop(&mut self) {
        self.ticker = None;
        self.deadline = None;
    }

    #[cfg(test)]
    pub(crate) fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// A probe went out. The deadline runs from the oldest unanswered probe.
    pub(crate) fn probe_sent(&mut self) {
        if self.ticker.is_some() && self.deadline.is_none() {
            self.deadline = Some(Instant::now() + self.timeout);
        }
    }

    /// The peer showed signs of life.
    pub(crate) fn answered(&mut self) {
        self.deadline = None;
    }

    /// Resolves on the next probe or expiry; never resolves while stopped.
    pub(crate) async fn next(&mut self) -> Beat {
        let deadline = self.deadline;
        let Some(ticker) = self.ticker.as_mut() else {
            return future::pending().await;
        };

        let expired = async move {
            match deadline {
                Some(at) => sleep_until(at).await,
                None => future::pending().await,
            }
        };

        tokio::select! {
            biased;
            () = expired => Beat::Expired,
            _ = ticker.tick() => Beat::Probe,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period_after_start() {
        let mut heartbeat = HeartbeatMonitor::new(Duration::from_secs(30), Duration::from_secs(10));
        heartbeat.start();
        assert!(heartbeat.is_running());

        let started = Instant::now();
        assert_eq!(heartbeat.next().await, Beat::Probe);
        assert_eq!(started.elapsed(), Duration::from_secs(30));
        assert_eq!(heartbeat.next().await, Beat::Probe);
        assert_eq!(started.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_monitor_never_ticks() {
        let mut heartbeat = HeartbeatMonitor::new(Duration::from_millis(10), Duration::from_millis(5));
        heartbeat.start();
        heartbeat.probe_sent();
        heartbeat.stop();

        let ticked = tokio::time::timeout(Duration::from_secs(1), heartbeat.next()).await;
        assert!(ticked.is_err(), "a stopped heartbeat must not tick");
        assert!(!heartbeat.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_probe_expires_after_timeout() {
        let mut heartbeat = HeartbeatMonitor::new(Duration::from_secs(30), Duration::from_secs(10));
        heartbeat.start();

        assert_eq!(heartbeat.next().await, Beat::Probe);
        let probed = Instant::now();
        heartbeat.probe_sent();

        assert_eq!(heartbeat.next().await, Beat::Expired);
        assert_eq!(probed.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_runs_from_oldest_unanswered_probe() {
        let mut heartbeat = HeartbeatMonitor::new(Duration::from_secs(10), Duration::from_secs(25));
        heartbeat.start();
        let started = Instant::now();

        assert_eq!(heartbeat.next().await, Beat::Probe);
        heartbeat.probe_sent();
        assert_eq!(heartbeat.next().await, Beat::Probe);
        heartbeat.probe_sent();
        assert_eq!(heartbeat.next().await, Beat::Probe);
        heartbeat.probe_sent();

        assert_eq!(heartbeat.next().await, Beat::Expired);
        assert_eq!(started.elapsed(), Duration::from_secs(35));
    }

    #[tokio::test(start_paused = true)]
    async fn answered_probe_never_expires() {
        let mut heartbeat = HeartbeatMonitor::new(Duration::from_secs(30), Duration::from_secs(10));
        heartbeat.start();

        assert_eq!(heartbeat.next().await, Beat::Probe);
        heartbeat.probe_sent();
        heartbeat.answered();

        let started = Instant::now();
        assert_eq!(heartbeat.next().await, Beat::Probe);
        assert_eq!(started.elapsed(), Duration::from_secs(30));
    }
}
