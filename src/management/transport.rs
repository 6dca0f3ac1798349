//! Connect-per-command client for the daemon's management socket.
//!
//! Every [`CommandChannel::execute`] call opens a fresh TCP connection, discards the
//! greeting, writes one command line and reads until the reply is complete. The
//! socket is owned by the call and dropped on every exit path, so a timed-out or
//! cancelled call never leaves a connection behind.
//!
//! Many daemon deployments serve a single management client at a time, so calls on
//! one [`ManagementTransport`] are serialized behind an async mutex.

use std::io::ErrorKind;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, trace, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use super::types::{END_SENTINEL, NOTIFICATION_PREFIX, SINGLE_LINE_REPLY_PREFIXES};
use crate::configuration::types::ManagementConfig;
use crate::error_handling::types::TransportError;

const READ_CHUNK: usize = 4096;
const PREVIEW_CHARS: usize = 64;

/// Something that can run one management command and hand back the raw reply.
///
/// The recorder and the session manager only see this trait, which keeps them
/// testable without a daemon.
#[async_trait]
pub trait CommandChannel: Send + Sync {
    async fn execute(&self, command: &str) -> Result<String, TransportError>;
}

pub struct ManagementTransport {
    host: String,
    port: u16,
    timeout: Duration,
    banner_wait: Duration,
    gate: Mutex<()>,
}

impl ManagementTransport {
    pub fn new(config: &ManagementConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            timeout: config.timeout(),
            banner_wait: config.banner_wait(),
            gate: Mutex::new(()),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    async fn exchange(&self, command: &str) -> Result<String, TransportError> {
        let mut stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(TransportError::Connect)?;
        converse(&mut stream, command, self.banner_wait).await
    }
}

#[async_trait]
impl CommandChannel for ManagementTransport {
    async fn execute(&self, command: &str) -> Result<String, TransportError> {
        let _turn = self.gate.lock().await;

        debug!("[{}] -> {:?}", self.endpoint(), command);
        let started = Instant::now();

        let reply = match tokio::time::timeout(self.timeout, self.exchange(command)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    "[{}] {:?} timed out after {:?}",
                    self.endpoint(),
                    command,
                    self.timeout
                );
                return Err(TransportError::Timeout(self.timeout));
            }
        };

        let preview: String = reply.chars().take(PREVIEW_CHARS).collect();
        trace!(
            "[{}] <- {} byte(s) in {:?}: {:?}{}",
            self.endpoint(),
            reply.len(),
            started.elapsed(),
            preview,
            if reply.len() > preview.len() { " ..." } else { "" }
        );
        Ok(reply)
    }
}

/// Runs one command over an already connected stream.
///
/// Kept generic over the stream so the framing can be driven by in-memory mocks.
pub(crate) async fn converse<S>(
    stream: &mut S,
    command: &str,
    banner_wait: Duration,
) -> Result<String, TransportError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let skipped = skip_greeting(stream, banner_wait).await?;
    trace!("discarded {} greeting byte(s)", skipped);

    let line = format!("{}\n", command);
    stream.write_all(line.as_bytes()).await.map_err(closed_or_io)?;
    stream.flush().await.map_err(closed_or_io)?;

    let mut buf: Vec<u8> = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(n) => n,
            Err(e) if is_disconnect(&e) => 0,
            Err(e) => return Err(TransportError::Io(e)),
        };
        if n == 0 {
            debug!("peer closed after {} byte(s) without a terminator", buf.len());
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if reply_complete(&buf) {
            break;
        }
    }

    Ok(strip_notifications(&String::from_utf8_lossy(&buf)))
}

/// Reads and drops the unsolicited greeting.
///
/// The greeting is over once the bytes received so far end on a line terminator, or
/// once the peer stays quiet for `wait`. Nothing about its content is assumed, and
/// a peer that sends no greeting at all only costs `wait`.
async fn skip_greeting<S>(stream: &mut S, wait: Duration) -> Result<usize, TransportError>
where
    S: AsyncRead + Unpin,
{
    let mut skipped = 0;
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match tokio::time::timeout(wait, stream.read(&mut chunk)).await {
            Err(_) => return Ok(skipped),
            Ok(Ok(0)) => return Err(TransportError::Closed),
            Ok(Ok(n)) => {
                skipped += n;
                if chunk[n - 1] == b'\n' {
                    return Ok(skipped);
                }
            }
            Ok(Err(e)) => return Err(closed_or_io(e)),
        }
    }
}

/// True once a complete `END` line or single-line status reply has been buffered.
fn reply_complete(buf: &[u8]) -> bool {
    let Some(last_newline) = buf.iter().rposition(|b| *b == b'\n') else {
        return false;
    };
    buf[..last_newline].split(|b| *b == b'\n').any(|line| {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        line == END_SENTINEL.as_bytes()
            || SINGLE_LINE_REPLY_PREFIXES
                .iter()
                .any(|prefix| line.starts_with(prefix.as_bytes()))
    })
}

/// Drops real-time notification lines, such as a greeting that arrived late or an
/// interleaved `>BYTECOUNT:` message, keeping every other line byte for byte.
fn strip_notifications(text: &str) -> String {
    text.split_inclusive('\n')
        .filter(|line| !line.starts_with(NOTIFICATION_PREFIX))
        .collect()
}

fn is_disconnect(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::UnexpectedEof
    )
}

fn closed_or_io(e: std::io::Error) -> TransportError {
    if is_disconnect(&e) {
        TransportError::Closed
    } else {
        TransportError::Io(e)
    }
}
