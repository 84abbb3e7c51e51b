use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tracing::{debug, info, warn};

use crate::errors::{KwirthError, KwirthResult};

/// Identifies one socket connection for the lifetime of the process.
pub type ConnectionId = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    Opened,
    Frame(String),
    /// Transport failure; a `Closed` event always follows.
    Error(String),
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionEvent {
    pub connection: ConnectionId,
    pub event: SocketEvent,
}

/// The outbound half of an open (or opening) connection.
pub trait Socket {
    fn id(&self) -> ConnectionId;
    fn send(&mut self, frame: String) -> KwirthResult<()>;
    fn close(&mut self);
}

/// Opens sockets. Opening is asynchronous: `connect` only validates and
/// schedules, and the outcome arrives later as a [`ConnectionEvent`].
pub trait Connector {
    fn connect(&mut self, url: &str) -> KwirthResult<Box<dyn Socket>>;
}

enum Outbound {
    Frame(String),
    Close,
}

struct WsSocket {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl Socket for WsSocket {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn send(&mut self, frame: String) -> KwirthResult<()> {
        self.tx
            .send(Outbound::Frame(frame))
            .map_err(|_| KwirthError::State("socket is closed".to_string()))
    }

    fn close(&mut self) {
        let _ = self.tx.send(Outbound::Close);
    }
}

/// WebSocket connector backed by tokio-tungstenite. Must be used from within a
/// tokio runtime.
pub struct WsConnector {
    events: mpsc::Sender<ConnectionEvent>,
    next_id: ConnectionId,
}

impl WsConnector {
    pub fn new(events: mpsc::Sender<ConnectionEvent>) -> Self {
        Self { events, next_id: 1 }
    }
}

impl Connector for WsConnector {
    fn connect(&mut self, url: &str) -> KwirthResult<Box<dyn Socket>> {
        let request = url
            .into_client_request()
            .map_err(|e| KwirthError::Network(format!("invalid socket url '{}': {}", url, e)))?;

        let id = self.next_id;
        self.next_id += 1;

        let (tx, rx) = mpsc::unbounded_channel();
        let events = self.events.clone();
        let url = url.to_string();
        tokio::spawn(async move {
            run_connection(id, url, request, rx, events).await;
        });

        Ok(Box::new(WsSocket { id, tx }))
    }
}

async fn run_connection(
    id: ConnectionId,
    url: String,
    request: tokio_tungstenite::tungstenite::handshake::client::Request,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::Sender<ConnectionEvent>,
) {
    let emit = |event: SocketEvent| {
        let events = events.clone();
        async move {
            let _ = events
                .send(ConnectionEvent {
                    connection: id,
                    event,
                })
                .await;
        }
    };

    let ws = match tokio_tungstenite::connect_async(request).await {
        Ok((ws, _response)) => ws,
        Err(e) => {
            warn!("Failed to connect to {}: {}", url, e);
            emit(SocketEvent::Error(format!("Error opening log stream: {}", e))).await;
            emit(SocketEvent::Closed).await;
            return;
        }
    };
    info!("WS connected to {}", url);
    emit(SocketEvent::Opened).await;

    let (mut sink, mut stream) = ws.split();
    loop {
        tokio::select! {
            cmd = outbound.recv() => match cmd {
                Some(Outbound::Frame(frame)) => {
                    if let Err(e) = sink.send(Message::Text(frame.into())).await {
                        emit(SocketEvent::Error(format!("Error sending frame: {}", e))).await;
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = sink.close().await;
                    break;
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    emit(SocketEvent::Frame(text.to_string())).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    emit(SocketEvent::Error(format!("Error reading log stream: {}", e))).await;
                    break;
                }
            },
        }
    }

    debug!("WS disconnected from {}", url);
    emit(SocketEvent::Closed).await;
}
