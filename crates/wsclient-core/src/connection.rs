use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use anyhow::{Result, anyhow};

/// What the reader side of a connection reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// One inbound frame, as displayable text
    Frame(String),
    /// The remote end closed the socket or the stream failed
    Closed,
}

/// An open real-time connection.
///
/// Outbound frames go through a FIFO queue drained by a writer task, so
/// frames leave in the order `send` was called. Dropping the connection
/// closes the socket.
pub struct Connection {
    outbound: UnboundedSender<String>,
    inbound: UnboundedReceiver<ConnectionEvent>,
    reader: Option<JoinHandle<()>>,
}

/// The far side of a [`Connection::loopback`]
pub struct Peer {
    /// Frames the client sent, in order
    pub sent: UnboundedReceiver<String>,
    /// Push frames (or a close) to the client
    pub incoming: UnboundedSender<ConnectionEvent>,
}

impl Peer {
    pub fn deliver(&self, text: &str) {
        let _ = self.incoming.send(ConnectionEvent::Frame(text.to_string()));
    }

    pub fn close(&self) {
        let _ = self.incoming.send(ConnectionEvent::Closed);
    }

    /// Everything sent so far, without waiting
    pub fn drain_sent(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.sent.try_recv() {
            frames.push(frame);
        }
        frames
    }
}

impl Connection {
    /// An in-memory connection with no socket behind it
    pub fn loopback() -> (Self, Peer) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();

        let connection = Self {
            outbound: out_tx,
            inbound: in_rx,
            reader: None,
        };
        let peer = Peer {
            sent: out_rx,
            incoming: in_tx,
        };
        (connection, peer)
    }

    pub fn send(&self, text: impl Into<String>) -> Result<()> {
        self.outbound
            .send(text.into())
            .map_err(|_| anyhow!("Connection is closed"))
    }

    pub async fn recv(&mut self) -> Option<ConnectionEvent> {
        self.inbound.recv().await
    }

    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // The writer task ends on its own once `outbound` is gone
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

/// Opens connections to the message relay
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self) -> Result<Connection>;
}

#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: &str) -> Self {
        Self { url: url.to_string() }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn open(&self) -> Result<Connection> {
        let (ws_stream, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| anyhow!("WebSocket connect to {} failed: {}", self.url, e))?;
        tracing::info!(url = %self.url, "websocket connected");

        let (mut write_half, mut read_half) = ws_stream.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<ConnectionEvent>();

        tokio::spawn(async move {
            while let Some(text) = out_rx.recv().await {
                if let Err(e) = write_half.send(Message::Text(text.into())).await {
                    tracing::warn!("websocket send failed: {}", e);
                    break;
                }
            }
            let _ = write_half.close().await;
            tracing::debug!("websocket writer ended");
        });

        let reader = tokio::spawn(async move {
            loop {
                match read_half.next().await {
                    Some(Ok(Message::Text(text))) => {
                        if in_tx.send(ConnectionEvent::Frame(text.as_str().to_owned())).is_err() {
                            return;
                        }
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        let text = String::from_utf8_lossy(&bytes).into_owned();
                        if in_tx.send(ConnectionEvent::Frame(text)).is_err() {
                            return;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("websocket closed by server");
                        break;
                    }
                    Some(Ok(_)) => {
                        // ping/pong
                    }
                    Some(Err(e)) => {
                        tracing::warn!("websocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
            let _ = in_tx.send(ConnectionEvent::Closed);
        });

        Ok(Connection {
            outbound: out_tx,
            inbound: in_rx,
            reader: Some(reader),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_loopback_preserves_order() {
        let (connection, mut peer) = Connection::loopback();
        connection.send("ticket").unwrap();
        connection.send("hello").unwrap();

        assert_eq!(peer.drain_sent(), vec!["ticket", "hello"]);
    }

    #[tokio::test]
    async fn test_send_after_peer_gone_fails() {
        let (connection, peer) = Connection::loopback();
        drop(peer);
        assert!(connection.send("hello").is_err());
    }

    #[tokio::test]
    async fn test_websocket_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

            let first = ws.next().await.unwrap().unwrap();
            ws.send(Message::Text("hi there".into())).await.unwrap();
            let second = ws.next().await.unwrap().unwrap();
            ws.close(None).await.unwrap();
            (first, second)
        });

        let connector = WsConnector::new(&format!("ws://{}", addr));
        let mut connection = connector.open().await.unwrap();
        connection.send("ticket-42").unwrap();

        let event = timeout(Duration::from_secs(5), connection.recv()).await.unwrap();
        assert_eq!(event, Some(ConnectionEvent::Frame("hi there".into())));

        connection.send("hello").unwrap();
        let event = timeout(Duration::from_secs(5), connection.recv()).await.unwrap();
        assert_eq!(event, Some(ConnectionEvent::Closed));

        let (first, second) = server.await.unwrap();
        assert_eq!(first, Message::Text("ticket-42".into()));
        assert_eq!(second, Message::Text("hello".into()));
    }

    #[tokio::test]
    async fn test_connect_refused_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let connector = WsConnector::new(&format!("ws://{}", addr));
        assert!(connector.open().await.is_err());
    }
}
