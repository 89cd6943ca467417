// MIT License - Copyright (c) 2026 Peter Wright
// Login prompt detection and credential exchange

//! Login handshake run on every fresh connection.
//!
//! The controller may print `LOGIN: ` straight after accepting the
//! connection. If it does, the configured credentials are sent and the reply
//! (`login successful` or `login incorrect`) decides the outcome. Controllers
//! without a login just start talking, and whatever they sent is kept for
//! the frame codec.

use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::Credentials;
use crate::constants::{CR, LF, LINE_SEPARATOR, LOGIN_INCORRECT, LOGIN_PROMPT, LOGIN_SUCCESSFUL};
use crate::error::{HomeworksError, Result};
use crate::transport::TcpTransport;

/// What the controller sent first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// The controller asked for a login.
    Login,
    /// No login prompt; `backlog` holds the bytes read while looking for it.
    None { backlog: Vec<u8> },
}

/// Wait up to `login_timeout` for the login prompt.
pub async fn read_prompt(transport: &mut TcpTransport, login_timeout: Duration) -> Result<Prompt> {
    let buf = read_until_classifiable(transport, login_timeout, &[LOGIN_PROMPT]).await?;
    if skip_separators(&buf).starts_with(LOGIN_PROMPT) {
        debug!("Controller requested login");
        Ok(Prompt::Login)
    } else {
        debug!("No login prompt, {} bytes pending", buf.len());
        Ok(Prompt::None { backlog: buf })
    }
}

/// Answer a login prompt.
///
/// Returns any bytes received after the controller's reply. A reply that is
/// neither success nor failure is treated as the start of normal traffic.
pub async fn log_in(
    transport: &mut TcpTransport,
    credentials: Option<&Credentials>,
    login_timeout: Duration,
) -> Result<Vec<u8>> {
    let credentials = credentials.ok_or_else(|| {
        warn!("Controller at {} requires a login", transport.addr());
        HomeworksError::NoCredentialsProvided
    })?;

    debug!("Sending credentials");
    let line = format!("{}{}", credentials.as_str(), LINE_SEPARATOR);
    transport.write(line.as_bytes()).await?;

    let buf = read_until_classifiable(
        transport,
        login_timeout,
        &[LOGIN_SUCCESSFUL, LOGIN_INCORRECT],
    )
    .await?;
    let reply = skip_separators(&buf);

    if reply.starts_with(LOGIN_INCORRECT) {
        warn!("Controller at {} rejected the credentials", transport.addr());
        Err(HomeworksError::InvalidCredentialsProvided)
    } else if let Some(rest) = reply.strip_prefix(LOGIN_SUCCESSFUL) {
        info!("Logged in to {}", transport.addr());
        Ok(rest.to_vec())
    } else {
        debug!("Unrecognised login reply, passing it on");
        Ok(buf)
    }
}

/// Read until the data (leading separators aside) can be told apart from
/// every marker, or until `limit` elapses.
async fn read_until_classifiable(
    transport: &mut TcpTransport,
    limit: Duration,
    markers: &[&[u8]],
) -> Result<Vec<u8>> {
    let deadline = Instant::now() + limit;
    let mut buf = Vec::new();
    loop {
        if is_classifiable(skip_separators(&buf), markers) {
            return Ok(buf);
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(buf);
        }
        let chunk = transport.read_available(deadline - now).await?;
        buf.extend_from_slice(&chunk);
    }
}

/// True once `data` either covers a marker or has diverged from all of them.
fn is_classifiable(data: &[u8], markers: &[&[u8]]) -> bool {
    markers
        .iter()
        .all(|marker| data.len() >= marker.len() || !marker.starts_with(data))
}

fn skip_separators(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| *b != CR && *b != LF)
        .unwrap_or(data.len());
    &data[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    async fn connect() -> (TcpTransport, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let transport = TcpTransport::connect("127.0.0.1", port, Duration::from_secs(1))
            .await
            .unwrap();
        let (peer, _) = listener.accept().await.unwrap();
        (transport, peer)
    }

    async fn read_line(peer: &mut TcpStream) -> String {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        while !line.ends_with(b"\r\n") {
            peer.read_exact(&mut byte).await.unwrap();
            line.push(byte[0]);
        }
        String::from_utf8(line).unwrap()
    }

    #[test]
    fn test_classification() {
        assert!(!is_classifiable(b"", &[LOGIN_PROMPT]));
        assert!(!is_classifiable(b"LOG", &[LOGIN_PROMPT]));
        assert!(is_classifiable(b"LOGIN: ", &[LOGIN_PROMPT]));
        assert!(is_classifiable(b"DL, B2", &[LOGIN_PROMPT]));
        assert!(!is_classifiable(b"login ", &[LOGIN_SUCCESSFUL, LOGIN_INCORRECT]));
        assert!(!is_classifiable(b"login s", &[LOGIN_SUCCESSFUL, LOGIN_INCORRECT]));
        assert!(is_classifiable(b"login successful", &[LOGIN_SUCCESSFUL, LOGIN_INCORRECT]));
        assert_eq!(skip_separators(b"\r\n\r\nLOGIN: "), b"LOGIN: ");
        assert_eq!(skip_separators(b"\r\n"), b"");
    }

    #[tokio::test]
    async fn test_prompt_then_success() {
        let (mut transport, mut peer) = connect().await;
        let credentials = Credentials::new("lutron,integration");

        let controller = tokio::spawn(async move {
            peer.write_all(b"\r\nLOGIN: ").await.unwrap();
            let line = read_line(&mut peer).await;
            peer.write_all(b"login successful\r\nDL, B2, 45\r\n")
                .await
                .unwrap();
            (line, peer)
        });

        let prompt = read_prompt(&mut transport, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(prompt, Prompt::Login);

        let backlog = log_in(&mut transport, Some(&credentials), Duration::from_secs(1))
            .await
            .unwrap();
        let (line, _peer) = controller.await.unwrap();
        assert_eq!(line, "lutron,integration\r\n");

        // Anything after the reply may have arrived in the same read
        let mut rest = backlog;
        while !rest.ends_with(b"DL, B2, 45\r\n") {
            rest.extend(
                transport
                    .read_available(Duration::from_secs(1))
                    .await
                    .unwrap(),
            );
        }
        assert!(rest.starts_with(b"\r\n"));
    }

    #[tokio::test]
    async fn test_prompt_then_incorrect() {
        let (mut transport, mut peer) = connect().await;
        let credentials = Credentials::new("wrong");

        let controller = tokio::spawn(async move {
            peer.write_all(b"LOGIN: ").await.unwrap();
            read_line(&mut peer).await;
            peer.write_all(b"login incorrect\r\n").await.unwrap();
            peer
        });

        assert_eq!(
            read_prompt(&mut transport, Duration::from_secs(1))
                .await
                .unwrap(),
            Prompt::Login
        );
        let err = log_in(&mut transport, Some(&credentials), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, HomeworksError::InvalidCredentialsProvided));
        let _peer = controller.await.unwrap();
    }

    #[tokio::test]
    async fn test_prompt_without_credentials() {
        let (mut transport, mut peer) = connect().await;
        peer.write_all(b"LOGIN: ").await.unwrap();

        assert_eq!(
            read_prompt(&mut transport, Duration::from_secs(1))
                .await
                .unwrap(),
            Prompt::Login
        );
        let err = log_in(&mut transport, None, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, HomeworksError::NoCredentialsProvided));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_silent_controller_has_no_prompt() {
        let (mut transport, _peer) = connect().await;
        let prompt = read_prompt(&mut transport, Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(prompt, Prompt::None { backlog: Vec::new() });
    }

    #[tokio::test]
    async fn test_early_traffic_is_kept() {
        let (mut transport, mut peer) = connect().await;
        peer.write_all(b"DL, B2, 45\r\n").await.unwrap();

        let prompt = read_prompt(&mut transport, Duration::from_secs(1))
            .await
            .unwrap();
        match prompt {
            Prompt::None { backlog } => assert!(backlog.starts_with(b"D")),
            Prompt::Login => panic!("unexpected login prompt"),
        }
    }

    #[tokio::test]
    async fn test_peer_close_during_login() {
        let (mut transport, peer) = connect().await;
        drop(peer);
        let err = read_prompt(&mut transport, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, HomeworksError::ConnectionLost));
    }
}
