use futures_util::{sink::SinkExt, stream::StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message as TungsteniteMessage};
use tracing::{debug, info, warn};

use super::core::Transport;
use super::error::{Result, TransportError};
use super::types::{ConnectionId, TransportEvent};

/// Outbound frames buffered per connection before hitting the socket
const WRITER_BUFFER: usize = 64;

/// `tokio-tungstenite` transport.
///
/// Each `connect` call opens one websocket to the configured url and spawns a
/// writer task (draining an mpsc of outbound text frames into the sink) and a
/// reader task (forwarding inbound text frames as [`TransportEvent::Message`]).
/// The reader owns `Closed` reporting: whether the server closes, the stream
/// errors, or `close` drops the writer, exactly one `Closed` is emitted when
/// the stream ends.
pub struct WebSocketTransport {
	url: String,
	events: mpsc::Sender<TransportEvent>,
	writers: Arc<Mutex<HashMap<ConnectionId, mpsc::Sender<String>>>>,
}

impl WebSocketTransport {
	pub fn new(url: impl Into<String>, events: mpsc::Sender<TransportEvent>) -> Self {
		Self {
			url: url.into(),
			events,
			writers: Arc::new(Mutex::new(HashMap::new())),
		}
	}

	pub async fn open_connections(&self) -> usize {
		self.writers.lock().await.len()
	}
}

#[async_trait::async_trait]
impl Transport for WebSocketTransport {
	async fn connect(&self) -> Result<()> {
		let (ws_stream, _) = connect_async(self.url.as_str()).await.map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

		let id = ConnectionId::next();
		let (mut sink, mut stream) = ws_stream.split();
		let (writer_tx, mut writer_rx) = mpsc::channel::<String>(WRITER_BUFFER);

		self.writers.lock().await.insert(id, writer_tx);
		info!(connection = %id, url = %self.url, "websocket connection established");

		tokio::spawn(async move {
			while let Some(payload) = writer_rx.recv().await {
				if let Err(e) = sink.send(TungsteniteMessage::Text(payload.into())).await {
					warn!(connection = %id, error = %e, "websocket send failed, stopping writer");
					break;
				}
			}
			// Writer channel dropped or sink broken: close the socket so the
			// reader observes the end of stream.
			let _ = sink.close().await;
		});

		let events = self.events.clone();
		let writers = Arc::clone(&self.writers);
		tokio::spawn(async move {
			loop {
				match stream.next().await {
					Some(Ok(TungsteniteMessage::Text(text))) => {
						if events.send(TransportEvent::Message(id, text.to_string())).await.is_err() {
							break;
						}
					}
					Some(Ok(TungsteniteMessage::Close(_))) => {
						debug!(connection = %id, "websocket close frame received");
						break;
					}
					Some(Ok(_)) => {} // binary/ping/pong frames are not part of this protocol
					Some(Err(e)) => {
						warn!(connection = %id, error = %e, "websocket stream error");
						break;
					}
					None => break,
				}
			}

			writers.lock().await.remove(&id);
			let _ = events.send(TransportEvent::Closed(id)).await;
		});

		let _ = self.events.send(TransportEvent::Opened(id)).await;
		Ok(())
	}

	async fn send(&self, connection: ConnectionId, payload: String) -> Result<()> {
		let writer = {
			let writers = self.writers.lock().await;
			writers.get(&connection).cloned()
		};

		match writer {
			Some(writer) => writer.send(payload).await.map_err(|e| TransportError::SendFailed(e.to_string())),
			None => Err(TransportError::ConnectionNotFound(connection)),
		}
	}

	async fn close(&self, connection: ConnectionId) -> Result<()> {
		match self.writers.lock().await.remove(&connection) {
			// Dropping the sender ends the writer task, which closes the sink;
			// the reader then emits `Closed`.
			Some(_writer) => Ok(()),
			None => Err(TransportError::ConnectionNotFound(connection)),
		}
	}
}
