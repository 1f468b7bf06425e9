use std::path::PathBuf;

use anyhow::Result;
use sink::NotificationSink;
use tokio::sync::{mpsc::Receiver, oneshot};
use tracing::{debug, error, info, info_span, Instrument};

use crate::{
    accounting::{
        engine::{AccrualEngine, SessionSignal},
        pause::PauseSource,
    },
    config::BudgetConfig,
    daemon::{
        control::protocol::{ControlRequest, ControlResponse},
        storage::state_store::StateStore,
    },
};

pub mod sink;

/// Everything that can change the accounting state. All of it goes through one queue so the
/// engine sees ticks, session signals and requests in a single order.
#[derive(Debug)]
pub enum EngineCommand {
    Tick,
    Session(SessionSignal),
    Request {
        request: ControlRequest,
        reply: oneshot::Sender<ControlResponse>,
    },
}

/// The single writer of the accounting state. Drains the command queue until every sender is
/// gone and flushes the state one last time.
pub struct EngineActor<S: StateStore> {
    receiver: Receiver<EngineCommand>,
    engine: AccrualEngine<S>,
    sinks: Vec<Box<dyn NotificationSink>>,
    config_dir: PathBuf,
}

impl<S: StateStore> EngineActor<S> {
    pub fn new(
        receiver: Receiver<EngineCommand>,
        engine: AccrualEngine<S>,
        sinks: Vec<Box<dyn NotificationSink>>,
        config_dir: PathBuf,
    ) -> Self {
        Self {
            receiver,
            engine,
            sinks,
            config_dir,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        while let Some(command) = self.receiver.recv().await {
            match command {
                EngineCommand::Tick => {
                    for event in self.engine.on_tick().await {
                        for sink in self.sinks.iter_mut() {
                            if let Err(e) = sink.notify(&event) {
                                error!("Failed to deliver notification {e:?}");
                            }
                        }
                    }
                }
                EngineCommand::Session(signal) => {
                    debug!("Session signal {signal:?}");
                    self.engine.session_signal(signal).await;
                }
                EngineCommand::Request { request, reply } => {
                    let span = info_span!("Control request", ?request);
                    let response = self.handle_request(request).instrument(span).await;
                    if reply.send(response).is_err() {
                        debug!("Client left before the reply");
                    }
                }
            }
        }

        self.engine.flush().await;
        self.receiver.close();
        info!("Engine stopped, final state flushed");
        Ok(())
    }

    async fn handle_request(&mut self, request: ControlRequest) -> ControlResponse {
        match request {
            ControlRequest::Status => ControlResponse::Status {
                state: self.engine.display_state(),
            },
            ControlRequest::Pause => {
                self.engine.pause(PauseSource::Manual).await;
                ControlResponse::Ok
            }
            ControlRequest::Resume => {
                self.engine.resume(PauseSource::Manual).await;
                ControlResponse::Ok
            }
            ControlRequest::Enable => {
                self.engine.set_enabled(true).await;
                ControlResponse::Ok
            }
            ControlRequest::Disable => {
                self.engine.set_enabled(false).await;
                ControlResponse::Ok
            }
            ControlRequest::Reconfigure => match BudgetConfig::load(&self.config_dir).await {
                Ok(config) => {
                    self.engine.reconfigure(config).await;
                    ControlResponse::Ok
                }
                Err(e) => {
                    error!("Failed to reload configuration {e:?}");
                    ControlResponse::Error {
                        message: format!("{e:#}"),
                    }
                }
            },
            ControlRequest::GrantOvertime { minutes } => {
                match self.engine.grant_overtime(minutes).await {
                    Ok(()) => ControlResponse::Ok,
                    Err(e) => ControlResponse::Error {
                        message: e.to_string(),
                    },
                }
            }
            ControlRequest::Adjust { seconds } => {
                self.engine.adjust_elapsed(seconds).await;
                ControlResponse::Ok
            }
            ControlRequest::Watch => ControlResponse::Error {
                message: "Watching is handled by the connection".into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::NaiveDate;
    use tempfile::tempdir;
    use tokio::sync::{mpsc, oneshot};

    use crate::{
        accounting::{budget::DailyBudget, engine::AccrualEngine, pause::TimerState},
        config::BudgetConfig,
        daemon::{
            control::protocol::{ControlRequest, ControlResponse},
            storage::state_store::memory::MemoryStateStore,
        },
        utils::{clock::test_clock::TestClock, logging::TEST_LOGGING},
    };

    use super::{EngineActor, EngineCommand};

    fn config(hours: f64) -> BudgetConfig {
        BudgetConfig {
            budget: DailyBudget::uniform(hours),
            ..BudgetConfig::default()
        }
    }

    async fn request(
        sender: &mpsc::Sender<EngineCommand>,
        request: ControlRequest,
    ) -> ControlResponse {
        let (reply, response) = oneshot::channel();
        sender
            .send(EngineCommand::Request { request, reply })
            .await
            .unwrap();
        response.await.unwrap()
    }

    #[tokio::test]
    async fn test_commands_are_applied_in_order_and_flushed() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let store = MemoryStateStore::default();
        let clock = TestClock::new(NaiveDate::from_ymd_opt(2018, 7, 4).unwrap());
        let engine = AccrualEngine::load(store.clone(), Box::new(clock), config(1.))
            .await
            .with_flush_interval(1000);

        let (sender, receiver) = mpsc::channel(16);
        let actor = EngineActor::new(receiver, engine, vec![], dir.path().to_path_buf());

        let client = async move {
            for _ in 0..3 {
                sender.send(EngineCommand::Tick).await.unwrap();
            }
            let paused = request(&sender, ControlRequest::Pause).await;
            sender.send(EngineCommand::Tick).await.unwrap();
            let status = request(&sender, ControlRequest::Status).await;
            let refused = request(&sender, ControlRequest::GrantOvertime { minutes: 5. }).await;
            (paused, status, refused)
        };

        let (result, (paused, status, refused)) = tokio::join!(actor.run(), client);
        result?;

        assert_eq!(paused, ControlResponse::Ok);
        let ControlResponse::Status { state } = status else {
            panic!("Expected status, got {status:?}");
        };
        assert_eq!(state.seconds_elapsed, 3);
        assert_eq!(state.timer_state, TimerState::PausedManual);
        assert!(matches!(refused, ControlResponse::Error { .. }));

        let saved = store.snapshot().unwrap();
        assert_eq!(saved.elapsed.seconds_elapsed, 3);
        assert!(saved.paused_across_restart);
        Ok(())
    }

    #[tokio::test]
    async fn test_reconfigure_reads_config_file() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        config(2.).save(dir.path()).await?;
        let store = MemoryStateStore::default();
        let clock = TestClock::new(NaiveDate::from_ymd_opt(2018, 7, 4).unwrap());
        let engine = AccrualEngine::load(store.clone(), Box::new(clock), config(1.)).await;

        let (sender, receiver) = mpsc::channel(16);
        let actor = EngineActor::new(receiver, engine, vec![], dir.path().to_path_buf());

        let client = async move {
            request(&sender, ControlRequest::Reconfigure).await;
            request(&sender, ControlRequest::Status).await
        };
        let (result, status) = tokio::join!(actor.run(), client);
        result?;

        let ControlResponse::Status { state } = status else {
            panic!("Expected status, got {status:?}");
        };
        assert_eq!(state.maximum_seconds, 7200);
        Ok(())
    }
}
