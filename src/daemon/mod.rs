use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use collection::{session::SessionWatcher, ticker::TickSource};
use control::server::ControlServer;
use processing::{
    sink::{BroadcastSink, LogSink},
    EngineActor, EngineCommand,
};
use storage::state_store::{FileStateStore, StateStore};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::{
    accounting::{engine::AccrualEngine, notifier::NotificationEvent},
    config::BudgetConfig,
    session::{GenericSessionMonitor, NeverLocked, SessionMonitor},
    utils::clock::{Clock, DefaultClock},
};

pub mod args;
pub mod collection;
pub mod control;
pub mod processing;
pub mod shutdown;
pub mod storage;

const TICK_INTERVAL: Duration = Duration::from_secs(1);
const SESSION_POLL_INTERVAL: Duration = Duration::from_secs(1);
const COMMAND_QUEUE_SIZE: usize = 64;
const NOTIFICATION_BUFFER: usize = 32;

/// Represents the starting point for the daemon
pub async fn start_daemon(dir: PathBuf) -> Result<()> {
    let config = BudgetConfig::load(&dir).await?;
    let store = FileStateStore::new(dir.clone())?;
    let monitor: Box<dyn SessionMonitor> = match GenericSessionMonitor::new() {
        Ok(monitor) => Box::new(monitor),
        Err(e) => {
            warn!("Session monitor is unavailable, lock detection is off {e:?}");
            Box::new(NeverLocked)
        }
    };

    let shutdown_token = CancellationToken::new();
    let (sender, receiver) = mpsc::channel::<EngineCommand>(COMMAND_QUEUE_SIZE);
    let (notifications, _) = broadcast::channel(NOTIFICATION_BUFFER);

    let server = ControlServer::bind(
        dir.clone(),
        sender.clone(),
        notifications.clone(),
        shutdown_token.clone(),
    )
    .await?;
    let ticker = create_ticker(sender.clone(), &shutdown_token, DefaultClock);
    let watcher = create_session_watcher(sender, monitor, &shutdown_token, DefaultClock);
    let actor = create_actor(receiver, store, config, DefaultClock, notifications, dir).await;

    let (_, tick_result, session_result, server_result, engine_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token),
        ticker.run(),
        watcher.run(),
        server.run(),
        actor.run(),
    );

    for (name, result) in [
        ("Tick source", tick_result),
        ("Session watcher", session_result),
        ("Control server", server_result),
        ("Engine", engine_result),
    ] {
        if let Err(e) = result {
            error!("{name} got an error {e:?}");
        }
    }

    Ok(())
}

fn create_ticker(
    sender: mpsc::Sender<EngineCommand>,
    shutdown_token: &CancellationToken,
    clock: impl Clock,
) -> TickSource {
    TickSource::new(
        sender,
        shutdown_token.clone(),
        TICK_INTERVAL,
        Box::new(clock),
    )
}

fn create_session_watcher(
    sender: mpsc::Sender<EngineCommand>,
    monitor: Box<dyn SessionMonitor>,
    shutdown_token: &CancellationToken,
    clock: impl Clock,
) -> SessionWatcher {
    SessionWatcher::new(
        sender,
        monitor,
        shutdown_token.clone(),
        SESSION_POLL_INTERVAL,
        Box::new(clock),
    )
}

async fn create_actor<S: StateStore>(
    receiver: mpsc::Receiver<EngineCommand>,
    store: S,
    config: BudgetConfig,
    clock: impl Clock,
    notifications: broadcast::Sender<NotificationEvent>,
    dir: PathBuf,
) -> EngineActor<S> {
    let engine = AccrualEngine::load(store, Box::new(clock), config).await;
    EngineActor::new(
        receiver,
        engine,
        vec![Box::new(LogSink), Box::new(BroadcastSink::new(notifications))],
        dir,
    )
}
