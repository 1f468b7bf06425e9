use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, trace};

use crate::{daemon::processing::EngineCommand, utils::clock::Clock};

/// Emits [EngineCommand::Tick] at a fixed rate. Sleeping is done against absolute instants so a
/// slow engine does not make the ticks drift.
pub struct TickSource {
    next: mpsc::Sender<EngineCommand>,
    shutdown: CancellationToken,
    frequency: Duration,
    clock: Box<dyn Clock>,
}

impl TickSource {
    pub fn new(
        next: mpsc::Sender<EngineCommand>,
        shutdown: CancellationToken,
        frequency: Duration,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            next,
            shutdown,
            frequency,
            clock,
        }
    }

    pub async fn run(self) -> Result<()> {
        let mut tick_point = self.clock.instant();
        loop {
            tick_point += self.frequency;

            tokio::select! {
                // Returning drops the sender, which lets the engine actor finish once the other
                // producers are gone too.
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                _ = self.clock.sleep_until(tick_point) => ()
            }

            trace!("Tick");
            self.next
                .send(EngineCommand::Tick)
                .await
                .inspect_err(|e| error!("Engine is gone, stopping ticks {e:?}"))?;
        }
    }
}
