//! A [`Connector`] backed by a WebSocket stream of JSON text frames.
//!
//! One background task is the single reader of the socket (mirroring the
//! teacher's `spawn_message_reader_task`): it decodes every inbound text
//! frame into an [`Envelope`] and forwards it to the channel the owning
//! `Link` drains. The write half is behind a `tokio::sync::Mutex` since
//! sends can come from many call sites (handler forwarding, `Request::send`,
//! broadcast fan-out) concurrently.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use linkmesh_types::{Envelope, Seq};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::error::{TransportError, TransportResult};
use crate::trait_def::Connector;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A [`Connector`] over a connected WebSocket stream.
#[derive(Debug)]
pub struct WebSocketConnector {
    writer: Arc<Mutex<futures::stream::SplitSink<WsStream, Message>>>,
    inbound: std::sync::Mutex<Option<mpsc::UnboundedReceiver<Envelope>>>,
    next_seq: AtomicU64,
    connected: Arc<AtomicBool>,
}

impl WebSocketConnector {
    /// Connect to `url` and spawn the reader task.
    pub async fn connect(url: &str) -> TransportResult<Self> {
        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        Ok(Self::from_stream(stream))
    }

    /// Wrap an already-established WebSocket stream, e.g. one accepted by a
    /// server listener.
    pub fn from_stream(stream: WsStream) -> Self {
        let (writer, mut reader) = stream.split();
        let (tx, rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(true));

        let connected_task = connected.clone();
        tokio::spawn(async move {
            while let Some(message) = reader.next().await {
                match message {
                    Ok(Message::Text(text)) => match serde_json::from_str::<Envelope>(&text) {
                        Ok(envelope) => {
                            if tx.send(envelope).is_err() {
                                break;
                            }
                        }
                        Err(err) => warn!(error = %err, "dropping malformed envelope"),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(err) => {
                        debug!(error = %err, "websocket read failed, closing connector");
                        break;
                    }
                }
            }
            connected_task.store(false, Ordering::SeqCst);
        });

        Self {
            writer: Arc::new(Mutex::new(writer)),
            inbound: std::sync::Mutex::new(Some(rx)),
            next_seq: AtomicU64::new(0),
            connected,
        }
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn send(&self, type_: &str, data: serde_json::Value) -> TransportResult<Seq> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let envelope = Envelope::new(type_, Some(seq), data);
        let text = serde_json::to_string(&envelope)
            .map_err(|e| TransportError::Serialization(e.to_string()))?;
        self.writer
            .lock()
            .await
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        Ok(seq)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn take_receiver(&self) -> Option<mpsc::UnboundedReceiver<Envelope>> {
        self.inbound.lock().expect("connector mutex poisoned").take()
    }
}
