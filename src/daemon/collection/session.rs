use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    accounting::engine::SessionSignal, daemon::processing::EngineCommand,
    session::SessionMonitor, utils::clock::Clock,
};

/// Polls a [SessionMonitor] and reports lock changes. Only edges are sent, the session is
/// assumed unlocked when the daemon starts.
pub struct SessionWatcher {
    next: mpsc::Sender<EngineCommand>,
    monitor: Box<dyn SessionMonitor>,
    shutdown: CancellationToken,
    frequency: Duration,
    clock: Box<dyn Clock>,
    locked: bool,
}

impl SessionWatcher {
    pub fn new(
        next: mpsc::Sender<EngineCommand>,
        monitor: Box<dyn SessionMonitor>,
        shutdown: CancellationToken,
        frequency: Duration,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            next,
            monitor,
            shutdown,
            frequency,
            clock,
            locked: false,
        }
    }

    fn poll(&mut self) -> Option<SessionSignal> {
        let locked = match self.monitor.is_locked() {
            Ok(locked) => locked,
            Err(e) => {
                error!("Failed to query session state {e:?}");
                return None;
            }
        };
        if locked == self.locked {
            return None;
        }
        self.locked = locked;
        info!("Session {}", if locked { "locked" } else { "unlocked" });
        Some(if locked {
            SessionSignal::Locked
        } else {
            SessionSignal::Unlocked
        })
    }

    pub async fn run(mut self) -> Result<()> {
        let mut poll_point = self.clock.instant();
        loop {
            poll_point += self.frequency;

            if let Some(signal) = self.poll() {
                self.next
                    .send(EngineCommand::Session(signal))
                    .await
                    .inspect_err(|e| error!("Engine is gone, stopping session polling {e:?}"))?;
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                _ = self.clock.sleep_until(poll_point) => ()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use crate::{
        accounting::engine::SessionSignal,
        daemon::processing::EngineCommand,
        session::MockSessionMonitor,
        utils::clock::DefaultClock,
    };

    use super::SessionWatcher;

    #[test]
    fn only_edges_are_reported() {
        let mut states = [false, true, true, false, false].into_iter();
        let mut monitor = MockSessionMonitor::new();
        monitor
            .expect_is_locked()
            .times(5)
            .returning(move || Ok(states.next().unwrap()));

        let (sender, _receiver) = mpsc::channel::<EngineCommand>(1);
        let mut watcher = SessionWatcher::new(
            sender,
            Box::new(monitor),
            CancellationToken::new(),
            Duration::from_secs(1),
            Box::new(DefaultClock),
        );

        let signals = (0..5).map(|_| watcher.poll()).collect::<Vec<_>>();
        assert_eq!(
            signals,
            vec![
                None,
                Some(SessionSignal::Locked),
                None,
                Some(SessionSignal::Unlocked),
                None
            ]
        );
    }

    #[test]
    fn monitor_errors_are_not_edges() {
        let mut monitor = MockSessionMonitor::new();
        monitor
            .expect_is_locked()
            .returning(|| Err(anyhow::anyhow!("no display")));

        let (sender, _receiver) = mpsc::channel::<EngineCommand>(1);
        let mut watcher = SessionWatcher::new(
            sender,
            Box::new(monitor),
            CancellationToken::new(),
            Duration::from_secs(1),
            Box::new(DefaultClock),
        );

        assert_eq!(watcher.poll(), None);
    }
}
