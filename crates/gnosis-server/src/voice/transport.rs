//! Websocket adapters: actix-ws on the caller side, tokio-tungstenite on the
//! backend side.

use actix_ws::{AggregatedMessage, AggregatedMessageStream, Session};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::relay::{Frame, FrameSink, FrameSource, RelayError};

type BackendStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct ClientSource {
    stream: AggregatedMessageStream,
    session: Session,
}

impl ClientSource {
    pub fn new(stream: AggregatedMessageStream, session: Session) -> Self {
        Self { stream, session }
    }
}

#[async_trait(?Send)]
impl FrameSource for ClientSource {
    async fn next_frame(&mut self) -> Option<Result<Frame, RelayError>> {
        loop {
            let message = match self.stream.recv().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(RelayError::Client(e.to_string()))),
            };
            match message {
                AggregatedMessage::Text(text) => return Some(Ok(Frame::Text(text.to_string()))),
                AggregatedMessage::Binary(data) => return Some(Ok(Frame::Binary(data))),
                AggregatedMessage::Ping(payload) => {
                    if self.session.pong(&payload).await.is_err() {
                        return None;
                    }
                }
                AggregatedMessage::Pong(_) => {}
                AggregatedMessage::Close(_) => return Some(Ok(Frame::Close)),
            }
        }
    }
}

pub struct ClientSink {
    session: Option<Session>,
}

impl ClientSink {
    pub fn new(session: Session) -> Self {
        Self {
            session: Some(session),
        }
    }
}

#[async_trait(?Send)]
impl FrameSink for ClientSink {
    async fn send_frame(&mut self, frame: Frame) -> Result<(), RelayError> {
        let Some(session) = self.session.as_mut() else {
            return Err(RelayError::Client("connection already closed".to_string()));
        };
        let sent = match frame {
            Frame::Text(text) => session.text(text).await,
            Frame::Binary(data) => session.binary(data).await,
            Frame::Close => {
                self.close().await;
                return Ok(());
            }
        };
        sent.map_err(|_| RelayError::Client("connection closed".to_string()))
    }

    async fn close(&mut self) {
        if let Some(session) = self.session.take() {
            // Closing a session the peer already dropped is not an error here.
            let _ = session.close(None).await;
        }
    }
}

pub struct BackendSource {
    stream: SplitStream<BackendStream>,
}

#[async_trait(?Send)]
impl FrameSource for BackendSource {
    async fn next_frame(&mut self) -> Option<Result<Frame, RelayError>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(RelayError::Backend(e.to_string()))),
            };
            match message {
                Message::Text(text) => return Some(Ok(Frame::Text(text))),
                Message::Binary(data) => return Some(Ok(Frame::Binary(Bytes::from(data)))),
                Message::Close(_) => return Some(Ok(Frame::Close)),
                // tungstenite answers pings on its own
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }
}

pub struct BackendSink {
    sink: SplitSink<BackendStream, Message>,
    closed: bool,
}

#[async_trait(?Send)]
impl FrameSink for BackendSink {
    async fn send_frame(&mut self, frame: Frame) -> Result<(), RelayError> {
        if self.closed {
            return Err(RelayError::Backend("connection already closed".to_string()));
        }
        let message = match frame {
            Frame::Text(text) => Message::Text(text),
            Frame::Binary(data) => Message::Binary(data.to_vec()),
            Frame::Close => {
                self.close().await;
                return Ok(());
            }
        };
        self.sink
            .send(message)
            .await
            .map_err(|e| RelayError::Backend(e.to_string()))
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.sink.close().await {
            log::debug!("Backend close: {}", e);
        }
    }
}

/// Opens the backend websocket with `Authorization: Token <api_key>`.
pub async fn connect_backend(
    url: &str,
    api_key: &str,
) -> Result<(BackendSource, BackendSink), RelayError> {
    let mut request = url
        .into_client_request()
        .map_err(|e| RelayError::Connect(e.to_string()))?;
    if !api_key.is_empty() {
        let value = HeaderValue::from_str(&format!("Token {}", api_key))
            .map_err(|e| RelayError::Connect(e.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }

    let (stream, response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| RelayError::Connect(e.to_string()))?;
    log::debug!("Voice backend accepted with HTTP {}", response.status());

    let (sink, stream) = stream.split();
    Ok((
        BackendSource { stream },
        BackendSink {
            sink,
            closed: false,
        },
    ))
}
