use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use uuid::Uuid;

use super::protocol::{
    error_message, ControlMessage, CODE_CONNECT_FAILED, CODE_CONNECT_TIMEOUT, CODE_RELAY_ERROR,
};

/// One relayed websocket message. Ping and pong never reach this level.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
    Close,
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Voice backend did not accept the connection within {0:?}")]
    ConnectTimeout(Duration),

    #[error("Voice backend connection failed: {0}")]
    Connect(String),

    #[error("Client connection error: {0}")]
    Client(String),

    #[error("Backend connection error: {0}")]
    Backend(String),
}

impl RelayError {
    fn code(&self) -> &'static str {
        match self {
            RelayError::ConnectTimeout(_) => CODE_CONNECT_TIMEOUT,
            RelayError::Connect(_) => CODE_CONNECT_FAILED,
            RelayError::Client(_) | RelayError::Backend(_) => CODE_RELAY_ERROR,
        }
    }
}

#[async_trait(?Send)]
pub trait FrameSource {
    /// Next frame, or `None` once the peer is gone.
    async fn next_frame(&mut self) -> Option<Result<Frame, RelayError>>;
}

#[async_trait(?Send)]
pub trait FrameSink {
    async fn send_frame(&mut self, frame: Frame) -> Result<(), RelayError>;

    /// Must be safe to call more than once and on an already closed peer.
    async fn close(&mut self);
}

/// Per-connection bookkeeping, owned by the task running the session.
#[derive(Debug)]
pub struct VoiceSession {
    pub id: String,
    pub start_time: Instant,
    pub messages_in: u64,
    pub messages_out: u64,
}

impl VoiceSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            start_time: Instant::now(),
            messages_in: 0,
            messages_out: 0,
        }
    }
}

impl Default for VoiceSession {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    ClientToBackend,
    BackendToClient,
}

impl Direction {
    fn label(self) -> &'static str {
        match self {
            Direction::ClientToBackend => "client -> backend",
            Direction::BackendToClient => "backend -> client",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    ClientClosed,
    BackendClosed,
    ConnectFailed(String),
    Failed(String),
}

/// Connects to the backend, then relays in both directions until one side
/// ends. Both sinks are closed exactly once on every path that opened them.
pub async fn run_session<CS, CK, BS, BK, F>(
    session: &mut VoiceSession,
    mut client_source: CS,
    mut client_sink: CK,
    connect: F,
    connect_timeout: Duration,
) -> SessionEnd
where
    CS: FrameSource,
    CK: FrameSink,
    BS: FrameSource,
    BK: FrameSink,
    F: Future<Output = Result<(BS, BK), RelayError>>,
{
    log::info!("[{}] Voice session accepted", session.id);

    let connected = match tokio::time::timeout(connect_timeout, connect).await {
        Ok(result) => result,
        Err(_) => Err(RelayError::ConnectTimeout(connect_timeout)),
    };

    let (mut backend_source, mut backend_sink) = match connected {
        Ok(backend) => backend,
        Err(e) => {
            log::warn!("[{}] {}", session.id, e);
            notify_client(&mut client_sink, &e).await;
            client_sink.close().await;
            let end = SessionEnd::ConnectFailed(e.to_string());
            log_summary(session, &end);
            return end;
        }
    };

    let outcome = {
        let session_id = session.id.as_str();
        let upstream = forward(
            &mut client_source,
            &mut backend_sink,
            &mut session.messages_in,
            session_id,
            Direction::ClientToBackend,
        );
        let downstream = forward(
            &mut backend_source,
            &mut client_sink,
            &mut session.messages_out,
            session_id,
            Direction::BackendToClient,
        );

        // The loop that loses the race is dropped here, which cancels it.
        tokio::select! {
            result = upstream => result.map(|_| SessionEnd::ClientClosed),
            result = downstream => result.map(|_| SessionEnd::BackendClosed),
        }
    };

    let end = match outcome {
        Ok(end) => end,
        Err(e) => {
            log::error!("[{}] Relay failed: {}", session.id, e);
            notify_client(&mut client_sink, &e).await;
            SessionEnd::Failed(e.to_string())
        }
    };

    backend_sink.close().await;
    client_sink.close().await;
    log_summary(session, &end);
    end
}

async fn forward<S, K>(
    source: &mut S,
    sink: &mut K,
    counter: &mut u64,
    session_id: &str,
    direction: Direction,
) -> Result<(), RelayError>
where
    S: FrameSource,
    K: FrameSink,
{
    while let Some(frame) = source.next_frame().await {
        let frame = frame?;
        match &frame {
            Frame::Close => {
                log::debug!("[{}] {} closed", session_id, direction.label());
                return Ok(());
            }
            Frame::Text(text) => {
                log::debug!(
                    "[{}] {} {:?}",
                    session_id,
                    direction.label(),
                    ControlMessage::classify(text)
                );
            }
            Frame::Binary(_) => {}
        }
        sink.send_frame(frame).await?;
        *counter += 1;
    }
    Ok(())
}

async fn notify_client<K: FrameSink>(client_sink: &mut K, error: &RelayError) {
    let message = error_message(&error.to_string(), error.code());
    if let Err(e) = client_sink.send_frame(Frame::Text(message)).await {
        log::debug!("Could not deliver error frame to client: {}", e);
    }
}

fn log_summary(session: &VoiceSession, end: &SessionEnd) {
    log::info!(
        "[{}] Voice session ended after {}ms: {} in, {} out, {:?}",
        session.id,
        session.start_time.elapsed().as_millis(),
        session.messages_in,
        session.messages_out,
        end
    );
}
