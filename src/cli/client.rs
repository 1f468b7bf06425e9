use std::{net::Ipv4Addr, path::Path};

use anyhow::{anyhow, Context, Result};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
};

use crate::daemon::control::protocol::{encode_line, read_port, ControlRequest, ControlResponse};

/// Connection to a running daemon.
pub struct ControlClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl ControlClient {
    pub async fn connect(dir: &Path) -> Result<Self> {
        let port = read_port(dir).await?;
        let stream = TcpStream::connect((Ipv4Addr::LOCALHOST, port))
            .await
            .context("Daemon is not reachable, start it with `daybudget init`")?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            lines: BufReader::new(reader).lines(),
            writer,
        })
    }

    pub async fn send(&mut self, request: &ControlRequest) -> Result<()> {
        self.writer.write_all(&encode_line(request)?).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Waits for the next message from the daemon.
    pub async fn receive(&mut self) -> Result<ControlResponse> {
        let line = self
            .lines
            .next_line()
            .await?
            .ok_or_else(|| anyhow!("Daemon closed the connection"))?;
        Ok(serde_json::from_str(&line)?)
    }

    pub async fn request(&mut self, request: &ControlRequest) -> Result<ControlResponse> {
        self.send(request).await?;
        self.receive().await
    }
}
