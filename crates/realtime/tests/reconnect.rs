//! Channel against a real local WebSocket server, with credentials flowing
//! through a [`Gateway`].

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use threadly_auth::{CredentialPair, CredentialStore};
use threadly_client::testing::{Reply, ScriptedTransport};
use threadly_client::{Gateway, LOGOUT_PATH};
use threadly_config::ClientConfig;
use threadly_realtime::{ChannelOptions, ConnectionState, NotificationChannel, NotificationHandler, ServerMessage};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use url::Url;

const WAIT: Duration = Duration::from_secs(5);

struct Forward(mpsc::UnboundedSender<String>);

impl NotificationHandler for Forward {
	fn on_notification(&self, message: &ServerMessage) {
		let _ = self.0.send(message.event_id.clone().unwrap_or_default());
	}
}

/// Accept one connection, returning it with its request query string.
async fn accept(listener: &TcpListener) -> (WebSocketStream<TcpStream>, String) {
	let (tcp, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
	let mut query = String::new();
	let ws = tokio_tungstenite::accept_hdr_async(tcp, |request: &Request, response: Response| {
		query = request.uri().query().unwrap_or_default().to_string();
		Ok(response)
	})
	.await
	.unwrap();
	(ws, query)
}

async fn reach(states: &mut watch::Receiver<ConnectionState>, target: ConnectionState) {
	timeout(WAIT, states.wait_for(|state| *state == target))
		.await
		.unwrap()
		.unwrap();
}

#[tokio::test]
async fn reconnects_with_current_credential_and_stops_on_logout() {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let port = listener.local_addr().unwrap().port();
	let endpoints = ClientConfig {
		api_base_url: "https://api.test".into(),
		notification_ws_url: Some(format!("ws://127.0.0.1:{port}/ws/notifications")),
		..ClientConfig::default()
	}
	.endpoints()
	.unwrap();

	let store = CredentialStore::in_memory();
	store.set(CredentialPair::new("a1", "r1"));
	let transport = ScriptedTransport::new(|request| {
		if request.path() == LOGOUT_PATH {
			Reply::ok(json!({"success": true}))
		} else {
			Reply::Unreachable
		}
	});
	let gateway = Gateway::with_transport(&endpoints, store.clone(), transport.clone());

	let (seen_tx, mut seen) = mpsc::unbounded_channel();
	let options = ChannelOptions {
		base_delay: Duration::from_millis(50),
		max_backoff: Duration::from_millis(200),
		..ChannelOptions::from_endpoints(&endpoints, &ClientConfig::default().realtime)
	};
	assert_eq!(options.endpoint, Url::parse(&format!("ws://127.0.0.1:{port}/ws/notifications")).unwrap());

	let handle = NotificationChannel::for_gateway(options, &gateway)
		.with_handler(Arc::new(Forward(seen_tx)))
		.spawn();
	let mut states = handle.subscribe_state();

	let (mut first, query) = accept(&listener).await;
	assert_eq!(query, "token=a1");
	reach(&mut states, ConnectionState::Connected).await;

	store.set(CredentialPair::new("a2", "r2"));
	first.close(None).await.unwrap();

	let (mut second, query) = accept(&listener).await;
	assert_eq!(query, "token=a2");
	reach(&mut states, ConnectionState::Connected).await;

	second
		.send(Message::Text(
			json!({"type": "NOTIFICATION", "eventId": "e7", "payload": {"notificationType": "FOLLOW"}}).to_string(),
		))
		.await
		.unwrap();

	let ack = match timeout(WAIT, second.next()).await.unwrap() {
		Some(Ok(Message::Text(text))) => serde_json::from_str::<Value>(&text).unwrap(),
		other => panic!("expected ACK frame, got {other:?}"),
	};
	assert_eq!(ack, json!({"type": "ACK", "lastReceivedId": "e7"}));
	assert_eq!(seen.recv().await.as_deref(), Some("e7"));

	gateway.logout().await;
	reach(&mut states, ConnectionState::Closed).await;
	assert_eq!(transport.count(LOGOUT_PATH), 1);

	let closing = timeout(WAIT, second.next()).await.unwrap();
	assert!(matches!(closing, None | Some(Ok(Message::Close(_))) | Some(Err(_))));

	handle.shutdown().await;
	assert_eq!(*states.borrow(), ConnectionState::Closed);
}
