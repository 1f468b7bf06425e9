use std::{net::SocketAddr, path::PathBuf};

use anyhow::{Context, Result};
use tokio::{
    io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    select,
    sync::{broadcast, mpsc, oneshot},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::{
    accounting::notifier::NotificationEvent,
    daemon::processing::EngineCommand,
    fs::operations::write_atomic,
};

use super::protocol::{encode_line, port_file_path, ControlRequest, ControlResponse};

/// Accepts control connections until shutdown. Each connection is served by its own task, every
/// request is forwarded to the engine actor.
pub struct ControlServer {
    listener: TcpListener,
    port_file: PathBuf,
    commands: mpsc::Sender<EngineCommand>,
    notifications: broadcast::Sender<NotificationEvent>,
    shutdown: CancellationToken,
}

impl ControlServer {
    /// Binds an ephemeral localhost port and publishes it in the application directory.
    pub async fn bind(
        dir: PathBuf,
        commands: mpsc::Sender<EngineCommand>,
        notifications: broadcast::Sender<NotificationEvent>,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let port_file = port_file_path(&dir);
        write_atomic(&port_file, port.to_string().as_bytes())
            .await
            .with_context(|| format!("Failed to publish port in {port_file:?}"))?;
        info!("Control channel listening on port {port}");

        Ok(Self {
            listener,
            port_file,
            commands,
            notifications,
            shutdown,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn run(self) -> Result<()> {
        loop {
            select! {
                _ = self.shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, address)) => {
                        debug!("Accepted control connection from {address}");
                        let client = handle_client(
                            stream,
                            self.commands.clone(),
                            self.notifications.clone(),
                            self.shutdown.clone(),
                        );
                        tokio::spawn(
                            async move {
                                if let Err(e) = client.await {
                                    warn!("Control connection failed {e:?}");
                                }
                            }
                            .instrument(info_span!("Control connection", %address)),
                        );
                    }
                    Err(e) => error!("Failed to accept control connection {e:?}"),
                }
            }
        }

        if let Err(e) = tokio::fs::remove_file(&self.port_file).await {
            warn!("Failed to remove {:?} {e:?}", self.port_file);
        }
        Ok(())
    }
}

async fn handle_client(
    stream: TcpStream,
    commands: mpsc::Sender<EngineCommand>,
    notifications: broadcast::Sender<NotificationEvent>,
    shutdown: CancellationToken,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    let mut updates = None;

    loop {
        select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let response = match serde_json::from_str::<ControlRequest>(line.trim()) {
                    Ok(ControlRequest::Watch) => {
                        updates = Some(notifications.subscribe());
                        ControlResponse::Ok
                    }
                    Ok(request) => forward(&commands, request).await,
                    Err(e) => ControlResponse::Error {
                        message: format!("Failed to parse request: {e}"),
                    },
                };
                write_message(&mut writer, &response).await?;
            }
            update = next_update(&mut updates) => match update {
                Ok(event) => {
                    write_message(&mut writer, &ControlResponse::Notification { event }).await?;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Watcher is too slow, skipped {skipped} notifications");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
    Ok(())
}

async fn forward(commands: &mpsc::Sender<EngineCommand>, request: ControlRequest) -> ControlResponse {
    let (reply, response) = oneshot::channel();
    if commands
        .send(EngineCommand::Request { request, reply })
        .await
        .is_err()
    {
        return ControlResponse::Error {
            message: "Daemon is shutting down".into(),
        };
    }
    response.await.unwrap_or_else(|_| ControlResponse::Error {
        message: "Request was dropped".into(),
    })
}

/// Pends forever until the client subscribes.
async fn next_update(
    updates: &mut Option<broadcast::Receiver<NotificationEvent>>,
) -> Result<NotificationEvent, broadcast::error::RecvError> {
    match updates {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message: &ControlResponse,
) -> Result<()> {
    writer.write_all(&encode_line(message)?).await?;
    writer.flush().await?;
    Ok(())
}
