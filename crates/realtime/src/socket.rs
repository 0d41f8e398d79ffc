//! Socket seam and its WebSocket implementation.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use crate::error::{Result, SocketError};

/// One open push connection.
#[async_trait]
pub trait Socket: Send {
	/// Next text frame; `None` once the peer has closed.
	async fn recv(&mut self) -> Option<Result<String>>;

	async fn send_text(&mut self, text: String) -> Result<()>;

	/// Close the connection. Errors are logged, not returned.
	async fn close(&mut self);
}

/// Opens push connections.
#[async_trait]
pub trait Connector: Send + Sync {
	/// `url` already carries the `token` query parameter.
	async fn connect(&self, url: &Url) -> Result<Box<dyn Socket>>;
}

/// [`Connector`] backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
	async fn connect(&self, url: &Url) -> Result<Box<dyn Socket>> {
		let (stream, response) = connect_async(url.as_str())
			.await
			.map_err(|e| SocketError::Connect(e.to_string()))?;
		tracing::debug!(status = response.status().as_u16(), "notification socket handshake complete");
		Ok(Box::new(TungsteniteSocket { stream }))
	}
}

struct TungsteniteSocket {
	stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Socket for TungsteniteSocket {
	async fn recv(&mut self) -> Option<Result<String>> {
		loop {
			match self.stream.next().await? {
				Ok(Message::Text(text)) => return Some(Ok(text)),
				Ok(Message::Binary(data)) => match String::from_utf8(data) {
					Ok(text) => return Some(Ok(text)),
					Err(_) => tracing::warn!("dropping non-UTF-8 binary frame"),
				},
				Ok(Message::Close(frame)) => {
					tracing::debug!(?frame, "notification socket closed by server");
					return None;
				}
				Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
				Err(error) => return Some(Err(SocketError::Receive(error.to_string()))),
			}
		}
	}

	async fn send_text(&mut self, text: String) -> Result<()> {
		self.stream
			.send(Message::Text(text))
			.await
			.map_err(|e| SocketError::Send(e.to_string()))
	}

	async fn close(&mut self) {
		if let Err(error) = self.stream.close(None).await {
			tracing::debug!(%error, "notification socket close error");
		}
	}
}
