//! The channel driver.
//!
//! One task owns the socket slot, the reconnect timer and the backoff
//! counter, so there is never more than one live socket: every connect
//! closes the previous socket before opening the next. The task reacts to
//! four inputs, in priority order:
//!
//! 1. cancellation of the handle,
//! 2. session changes of the credential store,
//! 3. frames (or closure) of the live socket,
//! 4. expiry of the reconnect timer.
//!
//! Each input becomes a [`ChannelEvent`] fed through [`transition`], and the
//! returned effects are performed in order.


use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use threadly_auth::{CredentialStore, SessionId};
use threadly_client::Gateway;
use threadly_config::{Endpoints, RealtimeConfig};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::backoff::Backoff;
use crate::error::Result;
use crate::handler::{NoOpNotificationHandler, SharedNotificationHandler};
use crate::message::{Ack, ServerMessage};
use crate::socket::{Connector, Socket, TungsteniteConnector};
use crate::state::{ChannelEvent, ConnectionState, Effect, transition};
use crate::token::TokenSource;

/// Where to connect and how patiently to retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOptions {
	/// Push endpoint without the token parameter.
	pub endpoint: Url,
	pub base_delay: Duration,
	pub max_backoff: Duration,
}

impl ChannelOptions {
	pub fn new(endpoint: Url) -> Self {
		Self::from_config(endpoint, &RealtimeConfig::default())
	}

	pub fn from_config(endpoint: Url, config: &RealtimeConfig) -> Self {
		Self {
			endpoint,
			base_delay: config.base_delay(),
			max_backoff: config.max_backoff(),
		}
	}

	pub fn from_endpoints(endpoints: &Endpoints, config: &RealtimeConfig) -> Self {
		Self::from_config(endpoints.notification_ws.clone(), config)
	}

	fn url_with_token(&self, token: &str) -> Url {
		let mut url = self.endpoint.clone();
		url.query_pairs_mut().append_pair("token", token);
		url
	}
}

/// Unstarted realtime notification channel.
pub struct NotificationChannel {
	options: ChannelOptions,
	store: CredentialStore,
	tokens: Arc<dyn TokenSource>,
	connector: Arc<dyn Connector>,
	handler: SharedNotificationHandler,
}

impl NotificationChannel {
	pub fn new(options: ChannelOptions, store: CredentialStore, tokens: Arc<dyn TokenSource>) -> Self {
		Self {
			options,
			store,
			tokens,
			connector: Arc::new(TungsteniteConnector),
			handler: Arc::new(NoOpNotificationHandler),
		}
	}

	/// Channel sharing `gateway`'s credential store and refresh.
	pub fn for_gateway(options: ChannelOptions, gateway: &Gateway) -> Self {
		Self::new(options, gateway.store().clone(), Arc::new(gateway.clone()))
	}

	pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
		self.connector = connector;
		self
	}

	pub fn with_handler(mut self, handler: SharedNotificationHandler) -> Self {
		self.handler = handler;
		self
	}

	/// Start the driver task on the current tokio runtime.
	pub fn spawn(self) -> ChannelHandle {
		let cancel = CancellationToken::new();
		let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);
		let driver = Driver {
			backoff: Backoff::new(self.options.base_delay, self.options.max_backoff),
			options: self.options,
			session: self.store.subscribe(),
			seen_session: None,
			tokens: self.tokens,
			connector: self.connector,
			handler: self.handler,
			state: state_tx,
			cancel: cancel.clone(),
			socket: None,
			retry_at: None,
		};
		let task = tokio::spawn(driver.run());
		ChannelHandle {
			state: state_rx,
			cancel,
			task: Some(task),
		}
	}
}

/// Owner handle for a running channel. Dropping it stops the channel.
#[derive(Debug)]
pub struct ChannelHandle {
	state: watch::Receiver<ConnectionState>,
	cancel: CancellationToken,
	task: Option<JoinHandle<()>>,
}

impl ChannelHandle {
	pub fn state(&self) -> ConnectionState {
		*self.state.borrow()
	}

	pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
		self.state.clone()
	}

	pub fn is_running(&self) -> bool {
		self.task.as_ref().is_some_and(|task| !task.is_finished())
	}

	/// Stop the channel and wait for the socket to close. Terminal.
	pub async fn shutdown(mut self) {
		self.cancel.cancel();
		if let Some(task) = self.task.take()
			&& let Err(error) = task.await
		{
			tracing::warn!(%error, "notification channel task failed");
		}
	}
}

impl Drop for ChannelHandle {
	fn drop(&mut self) {
		self.cancel.cancel();
	}
}

struct Driver {
	options: ChannelOptions,
	session: watch::Receiver<Option<SessionId>>,
	/// Session the channel last acted on.
	seen_session: Option<SessionId>,
	tokens: Arc<dyn TokenSource>,
	connector: Arc<dyn Connector>,
	handler: SharedNotificationHandler,
	state: watch::Sender<ConnectionState>,
	cancel: CancellationToken,
	backoff: Backoff,
	socket: Option<Box<dyn Socket>>,
	retry_at: Option<Instant>,
}

impl Driver {
	async fn run(mut self) {
		tracing::debug!(endpoint = %self.options.endpoint, "notification channel started");
		let session = *self.session.borrow_and_update();
		self.on_session(session).await;

		loop {
			tokio::select! {
				biased;
				_ = self.cancel.cancelled() => break,
				changed = self.session.changed() => {
					if changed.is_err() {
						break;
					}
					let session = *self.session.borrow_and_update();
					self.on_session(session).await;
				}
				frame = recv(&mut self.socket), if self.socket.is_some() => match frame {
					Some(Ok(text)) => self.on_text(&text).await,
					Some(Err(error)) => {
						tracing::warn!(%error, "notification socket error; closing");
						self.dispatch(ChannelEvent::SocketClosed).await;
					}
					None => {
						tracing::debug!("notification socket closed");
						self.dispatch(ChannelEvent::SocketClosed).await;
					}
				},
				_ = tokio::time::sleep_until(self.retry_at.unwrap_or_else(Instant::now)), if self.retry_at.is_some() => {
					self.retry_at = None;
					self.dispatch(ChannelEvent::BackoffElapsed).await;
				}
			}
		}

		self.dispatch(ChannelEvent::Shutdown).await;
		tracing::debug!("notification channel stopped");
	}

	/// A different session id means the user signed out and back in since
	/// the last observation, so the old socket must go before the new one.
	async fn on_session(&mut self, session: Option<SessionId>) {
		let previous = std::mem::replace(&mut self.seen_session, session);
		match (previous, session) {
			(None, Some(_)) => self.dispatch(ChannelEvent::CredentialPresent).await,
			(Some(_), None) => self.dispatch(ChannelEvent::CredentialLost).await,
			(Some(old), Some(new)) if old != new => {
				tracing::debug!(old, new, "session replaced");
				self.dispatch(ChannelEvent::CredentialLost).await;
				self.dispatch(ChannelEvent::CredentialPresent).await;
			}
			_ => {}
		}
	}

	fn signed_in(&self) -> bool {
		self.session.borrow().is_some()
	}

	fn current(&self) -> ConnectionState {
		*self.state.borrow()
	}

	async fn dispatch(&mut self, event: ChannelEvent) {
		let mut pending = VecDeque::from([event]);
		while let Some(event) = pending.pop_front() {
			let from = self.current();
			let Some(step) = transition(from, event) else {
				tracing::trace!(state = %from, ?event, "ignoring channel event");
				continue;
			};
			tracing::debug!(from = %from, to = %step.next, ?event, "channel transition");
			self.state.send_replace(step.next);

			for effect in step.effects {
				if let Some(follow_up) = self.perform(*effect).await {
					pending.push_back(follow_up);
				}
			}
		}
	}

	async fn perform(&mut self, effect: Effect) -> Option<ChannelEvent> {
		match effect {
			Effect::Connect => return Some(self.connect().await),
			Effect::ResetBackoff => self.backoff.reset(),
			Effect::NotifyConnected => self.handler.on_connect(),
			Effect::NotifyDisconnected => self.handler.on_disconnect(),
			Effect::ScheduleReconnect => {
				let delay = self.backoff.next_delay();
				tracing::debug!(
					delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
					attempt = self.backoff.attempts(),
					"scheduling reconnect"
				);
				self.retry_at = Some(Instant::now() + delay);
			}
			Effect::CancelReconnect => self.retry_at = None,
			Effect::CloseSocket => self.close_socket().await,
		}
		None
	}

	/// Resolves to the event describing how the attempt ended.
	async fn connect(&mut self) -> ChannelEvent {
		self.close_socket().await;

		let token = tokio::select! {
			biased;
			_ = self.cancel.cancelled() => return ChannelEvent::Shutdown,
			token = self.tokens.access_token() => token,
		};
		let token = match token {
			Ok(Some(token)) => token,
			Ok(None) => {
				tracing::debug!("no access credential for notification socket");
				return self.unless_signed_out(ChannelEvent::TokenUnavailable);
			}
			Err(error) => {
				tracing::warn!(%error, "could not obtain access credential for notification socket");
				return self.unless_signed_out(ChannelEvent::TokenUnavailable);
			}
		};

		let url = self.options.url_with_token(&token);
		let opened = tokio::select! {
			biased;
			_ = self.cancel.cancelled() => return ChannelEvent::Shutdown,
			opened = self.connector.connect(&url) => opened,
		};
		match opened {
			Ok(mut socket) => {
				if !self.signed_in() {
					socket.close().await;
					return ChannelEvent::CredentialLost;
				}
				tracing::info!(endpoint = %self.options.endpoint, "notification socket connected");
				self.socket = Some(socket);
				ChannelEvent::Opened
			}
			Err(error) => {
				tracing::warn!(%error, "notification socket failed to open");
				self.unless_signed_out(ChannelEvent::OpenFailed)
			}
		}
	}

	fn unless_signed_out(&self, event: ChannelEvent) -> ChannelEvent {
		if self.signed_in() { event } else { ChannelEvent::CredentialLost }
	}

	async fn close_socket(&mut self) {
		if let Some(mut socket) = self.socket.take() {
			socket.close().await;
		}
	}

	async fn on_text(&mut self, text: &str) {
		let message = match ServerMessage::parse(text) {
			Ok(message) => message,
			Err(error) => {
				tracing::warn!(%error, "dropping unparseable push frame");
				return;
			}
		};
		if !message.is_notification() {
			tracing::trace!(kind = %message.kind, "ignoring push frame");
			return;
		}

		self.handler.on_notification(&message);

		let Some(event_id) = message.event_id.as_deref().filter(|id| !id.is_empty()) else {
			return;
		};
		let ack = match Ack::new(event_id).to_json() {
			Ok(ack) => ack,
			Err(error) => {
				tracing::warn!(%error, "failed to encode ACK");
				return;
			}
		};
		if let Some(socket) = self.socket.as_mut()
			&& let Err(error) = socket.send_text(ack).await
		{
			tracing::warn!(%error, event_id, "failed to send ACK");
		}
	}
}

async fn recv(socket: &mut Option<Box<dyn Socket>>) -> Option<Result<String>> {
	match socket {
		Some(socket) => socket.recv().await,
		None => std::future::pending().await,
	}
}
