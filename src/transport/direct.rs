// MIT License - Copyright (c) 2026 Peter Wright
// Direct TCP connection to the serial adaptor

use std::io;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

use crate::constants::READ_CHUNK_SIZE;
use crate::error::{HomeworksError, Result};
use crate::protocol::Command;

/// Direct TCP transport to the controller's serial adaptor.
///
/// The write half can be handed to a [`CommandSender`](super::CommandSender)
/// once the session is set up; the read half stays here and feeds the worker.
pub struct TcpTransport {
    addr: String,
    reader: OwnedReadHalf,
    writer: Option<OwnedWriteHalf>,
}

impl TcpTransport {
    /// Open a TCP connection, giving up after `connect_timeout`.
    pub async fn connect(host: &str, port: u16, connect_timeout: Duration) -> Result<Self> {
        let addr = format!("{}:{}", host, port);
        info!("Connecting to controller at {}", addr);

        let stream = match timeout(connect_timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                error!("TCP connect to {} failed: {}", addr, e);
                return Err(HomeworksError::ConnectionFailed { addr, source: e });
            }
            Err(_) => {
                error!("TCP connect to {} timed out", addr);
                return Err(HomeworksError::ConnectionFailed {
                    addr,
                    source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
                });
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            warn!("Couldn't disable Nagle on {}: {}", addr, e);
        }
        debug!("TCP socket connected");

        let (reader, writer) = stream.into_split();
        Ok(Self {
            addr,
            reader,
            writer: Some(writer),
        })
    }

    /// `host:port` this transport connected to.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Wait up to `wait` for data.
    ///
    /// Returns an empty buffer if nothing arrived in time, and
    /// [`HomeworksError::ConnectionLost`] once the peer has closed the
    /// connection or the socket failed.
    pub async fn read_available(&mut self, wait: Duration) -> Result<Vec<u8>> {
        let mut buf = [0u8; READ_CHUNK_SIZE];
        match timeout(wait, self.reader.read(&mut buf)).await {
            Err(_) => Ok(Vec::new()),
            Ok(Ok(0)) => {
                debug!("Reader: connection closed by {}", self.addr);
                Err(HomeworksError::ConnectionLost)
            }
            Ok(Ok(n)) => Ok(buf[..n].to_vec()),
            Ok(Err(e)) => {
                warn!("Reader: read error from {}: {}", self.addr, e);
                Err(HomeworksError::ConnectionLost)
            }
        }
    }

    /// Write raw bytes through the transport's own write half.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(HomeworksError::NotConnected)?;
        writer.write_all(bytes).await.map_err(|e| {
            error!("Failed to write to {}: {}", self.addr, e);
            HomeworksError::Io(e)
        })
    }

    pub async fn send(&mut self, command: &Command) -> Result<()> {
        debug!("Sending command: {}", command.to_wire_string());
        self.write(&command.to_line()).await
    }

    /// Give up the write half, leaving the transport read-only.
    pub fn take_writer(&mut self) -> Option<OwnedWriteHalf> {
        self.writer.take()
    }

    /// Shut down the write half, if still held. Safe to call repeatedly.
    pub async fn close(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.shutdown().await;
        }
    }
}
