// MIT License - Copyright (c) 2026 Peter Wright
// Serialised command writer shared across tasks

use std::io;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{watch, Mutex};
use tokio::time::{timeout, Duration};
use tracing::{debug, error};

use crate::error::{HomeworksError, Result};
use crate::protocol::Command;

/// Serialises outbound commands onto the current connection.
///
/// Holds the write half of whichever session is live. Callers on any task
/// may send; the lock guarantees each line goes out whole.
pub struct CommandSender {
    /// Write half of the live session, if any
    writer: Mutex<Option<OwnedWriteHalf>>,
    /// Set once the client is stopped; never cleared
    stopped: watch::Sender<bool>,
    /// Set when a write on the attached session fails, cleared on attach
    broken: watch::Sender<bool>,
    write_timeout: Duration,
}

impl CommandSender {
    pub fn new(write_timeout: Duration) -> Self {
        let (stopped, _) = watch::channel(false);
        let (broken, _) = watch::channel(false);
        Self {
            writer: Mutex::new(None),
            stopped,
            broken,
            write_timeout,
        }
    }

    /// Install the write half of a freshly set up session.
    pub async fn attach(&self, writer: OwnedWriteHalf) {
        let mut slot = self.writer.lock().await;
        self.broken.send_replace(false);
        if let Some(mut previous) = slot.replace(writer) {
            let _ = previous.shutdown().await;
        }
    }

    /// Drop the current write half. Safe to call repeatedly.
    pub async fn detach(&self) {
        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            debug!("Closing command writer");
            let _ = writer.shutdown().await;
        }
    }

    /// Whether a session's write half is installed.
    pub async fn is_connected(&self) -> bool {
        self.writer.lock().await.is_some()
    }

    /// Refuse all further sends and abandon any write in flight.
    pub fn mark_stopped(&self) {
        self.stopped.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.stopped.borrow()
    }

    /// Resolves once a write on the attached session has failed.
    pub async fn failed(&self) {
        let mut broken_rx = self.broken.subscribe();
        let _ = broken_rx.wait_for(|broken| *broken).await;
    }

    /// Write one command line.
    ///
    /// A failed or timed out write drops the writer and flags the session
    /// as broken, so later sends report `NotConnected` until the worker has
    /// reconnected. Stopping the client abandons a write in flight.
    pub async fn send(&self, command: &Command) -> Result<()> {
        if self.is_stopped() {
            return Err(HomeworksError::Stopped);
        }

        let mut slot = self.writer.lock().await;
        if self.is_stopped() {
            return Err(HomeworksError::Stopped);
        }
        let writer = slot.as_mut().ok_or(HomeworksError::NotConnected)?;

        debug!("Sending command: {}", command.to_wire_string());
        let line = command.to_line();
        let mut stopped_rx = self.stopped.subscribe();
        let written = tokio::select! {
            written = timeout(self.write_timeout, writer.write_all(&line)) => written,
            _ = stop_requested(&mut stopped_rx) => {
                debug!("Abandoning command write on stop");
                *slot = None;
                return Err(HomeworksError::Stopped);
            }
        };

        let err = match written {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => {
                error!("Failed to write command: {}", e);
                e
            }
            Err(_) => {
                error!("Command write timed out after {:?}", self.write_timeout);
                io::Error::new(io::ErrorKind::TimedOut, "write timed out")
            }
        };
        *slot = None;
        self.broken.send_replace(true);
        Err(HomeworksError::Io(err))
    }
}

async fn stop_requested(stopped_rx: &mut watch::Receiver<bool>) {
    let _ = stopped_rx.wait_for(|stopped| *stopped).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::{TcpListener, TcpStream};

    async fn connected_pair() -> (OwnedWriteHalf, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let stream = TcpStream::connect(addr).await.unwrap();
        let (peer, _) = listener.accept().await.unwrap();
        let (_reader, writer) = stream.into_split();
        (writer, peer)
    }

    #[tokio::test]
    async fn test_send_without_connection() {
        let sender = CommandSender::new(Duration::from_secs(1));
        assert!(!sender.is_connected().await);
        assert!(matches!(
            sender.send(&Command::PromptOff).await,
            Err(HomeworksError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_send_writes_line() {
        let (writer, mut peer) = connected_pair().await;
        let sender = CommandSender::new(Duration::from_secs(1));
        sender.attach(writer).await;
        assert!(sender.is_connected().await);

        sender
            .send(&Command::RequestDimmerLevel {
                address: "[01:01:00:02:04]".to_string(),
            })
            .await
            .unwrap();

        let expected = b"RDL, [01:01:00:02:04]\r\n";
        let mut buf = vec![0u8; expected.len()];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, expected);
    }

    #[tokio::test]
    async fn test_stopped_refuses_sends() {
        let (writer, _peer) = connected_pair().await;
        let sender = CommandSender::new(Duration::from_secs(1));
        sender.attach(writer).await;
        sender.mark_stopped();
        assert!(matches!(
            sender.send(&Command::PromptOff).await,
            Err(HomeworksError::Stopped)
        ));
    }

    #[tokio::test]
    async fn test_detach_is_idempotent() {
        let (writer, mut peer) = connected_pair().await;
        let sender = CommandSender::new(Duration::from_secs(1));
        sender.attach(writer).await;
        sender.detach().await;
        sender.detach().await;
        assert!(!sender.is_connected().await);

        // Peer sees the write side shut down
        let mut buf = [0u8; 1];
        assert_eq!(peer.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_timed_out_write_flags_failure() {
        // Peer never reads, so the socket buffers fill up
        let (writer, _peer) = connected_pair().await;
        let sender = CommandSender::new(Duration::from_millis(100));
        sender.attach(writer).await;

        let line = Command::Raw("X".repeat(1 << 20));
        let err = loop {
            if let Err(e) = sender.send(&line).await {
                break e;
            }
        };
        assert!(matches!(err, HomeworksError::Io(_)));
        assert!(!sender.is_connected().await);
        timeout(Duration::from_secs(1), sender.failed())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_attach_clears_failure() {
        let (writer, _peer) = connected_pair().await;
        let sender = CommandSender::new(Duration::from_millis(100));
        sender.broken.send_replace(true);
        sender.attach(writer).await;
        assert!(
            timeout(Duration::from_millis(50), sender.failed())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_stop_abandons_blocked_write() {
        let (writer, _peer) = connected_pair().await;
        let sender = std::sync::Arc::new(CommandSender::new(Duration::from_secs(30)));
        sender.attach(writer).await;

        let task = {
            let sender = sender.clone();
            tokio::spawn(async move {
                let line = Command::Raw("X".repeat(1 << 20));
                loop {
                    if let Err(e) = sender.send(&line).await {
                        return e;
                    }
                }
            })
        };

        // Let the sender wedge on a full socket
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!task.is_finished());

        sender.mark_stopped();
        let err = timeout(Duration::from_millis(500), task)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(err, HomeworksError::Stopped));
        assert!(!sender.is_connected().await);
    }
}
