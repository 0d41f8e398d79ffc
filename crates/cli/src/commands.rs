use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, anyhow, bail};
use serde_json::json;
use threadly_auth::CredentialStore;
use threadly_client::{ApiError, Gateway, NotificationCursor, NotificationItem, NotificationPage, NotificationQuery};
use threadly_config::{ClientConfig, Endpoints, RealtimeConfig};
use threadly_realtime::{ChannelOptions, ConnectionState, NotificationChannel, NotificationHandler, ServerMessage};

use crate::{Command, NotificationCommand};

const PASSWORD_ENV: &str = "THREADLY_PASSWORD";

/// Resolved configuration plus the gateway every command runs through.
pub struct Context {
	gateway: Gateway,
	endpoints: Endpoints,
	realtime: RealtimeConfig,
	json: bool,
}

impl Context {
	pub fn load(config_path: Option<&Path>, json: bool) -> anyhow::Result<Self> {
		let config = ClientConfig::discover(config_path).context("failed to load configuration")?;
		let endpoints = config.endpoints().context("invalid endpoint configuration")?;
		let credentials = config.credentials_path()?;
		tracing::debug!(path = %credentials.display(), api = %endpoints.api, "using credentials file");

		let store = CredentialStore::persistent(credentials);
		Ok(Self {
			gateway: Gateway::new(&endpoints, store),
			endpoints,
			realtime: config.realtime,
			json,
		})
	}

	pub async fn run(self, command: Command) -> anyhow::Result<()> {
		match command {
			Command::Login { email, password } => self.login(&email, password).await,
			Command::Logout => {
				self.gateway.logout().await;
				println!("Signed out.");
				Ok(())
			}
			Command::Whoami => self.whoami(),
			Command::Notifications(command) => self.notifications(command).await,
			Command::Listen => self.listen().await,
		}
	}

	async fn login(&self, email: &str, password: Option<String>) -> anyhow::Result<()> {
		let password = match password.or_else(|| std::env::var(PASSWORD_ENV).ok()) {
			Some(password) if !password.is_empty() => password,
			_ => bail!("no password given; pass --password or set {PASSWORD_ENV}"),
		};
		self.gateway.login(email, &password).await.map_err(user_facing)?;
		println!("Signed in as {email}.");
		Ok(())
	}

	fn whoami(&self) -> anyhow::Result<()> {
		let Some(credentials) = self.gateway.store().get() else {
			bail!("not signed in");
		};
		let claims = credentials.claims().context("stored access token is unreadable")?;
		let expires_at = claims.expires_at().map(|at| at.to_rfc3339());

		if self.json {
			let out = json!({
				"userId": claims.user_id,
				"userType": claims.user_type,
				"userStatusType": claims.user_status_type,
				"expiresAt": expires_at,
			});
			println!("{}", serde_json::to_string_pretty(&out)?);
			return Ok(());
		}

		let or_unknown = |value: Option<String>| value.unwrap_or_else(|| "unknown".to_string());
		println!("user:    {}", or_unknown(claims.user_id));
		println!("type:    {}", or_unknown(claims.user_type));
		println!("status:  {}", or_unknown(claims.user_status_type));
		println!("expires: {}", or_unknown(expires_at));
		Ok(())
	}

	async fn notifications(&self, command: NotificationCommand) -> anyhow::Result<()> {
		let api = self.gateway.notifications();
		match command {
			NotificationCommand::List {
				limit,
				cursor_timestamp,
				cursor_id,
			} => {
				let query = NotificationQuery {
					limit,
					cursor: cursor_timestamp.zip(cursor_id).map(|(ts, id)| NotificationCursor::new(ts, id)),
				};
				let page = api.list(&query).await.map_err(user_facing)?;
				self.print_page(&page)
			}
			NotificationCommand::Show { event_id } => {
				let item = api.get(&event_id).await.map_err(user_facing)?;
				if self.json {
					println!("{}", serde_json::to_string_pretty(&item)?);
				} else {
					println!("{}", render_item(&item));
					if let Some(preview) = &item.preview {
						println!("  {}: {}", preview.title, preview.body);
					}
				}
				Ok(())
			}
			NotificationCommand::Read { event_id } => {
				api.mark_read(&event_id).await.map_err(user_facing)?;
				println!("Marked {event_id} read.");
				Ok(())
			}
			NotificationCommand::Delete { event_id } => {
				api.delete(&event_id).await.map_err(user_facing)?;
				println!("Deleted {event_id}.");
				Ok(())
			}
			NotificationCommand::ReadAll => {
				api.mark_all_read().await.map_err(user_facing)?;
				println!("Marked all notifications read.");
				Ok(())
			}
			NotificationCommand::Clear => {
				api.delete_all().await.map_err(user_facing)?;
				println!("Deleted all notifications.");
				Ok(())
			}
		}
	}

	fn print_page(&self, page: &NotificationPage) -> anyhow::Result<()> {
		if self.json {
			println!("{}", serde_json::to_string_pretty(page)?);
			return Ok(());
		}
		if page.items.is_empty() {
			println!("No notifications.");
		}
		for item in &page.items {
			println!("{}", render_item(item));
		}
		if let Some(cursor) = page.next_cursor.as_ref().filter(|_| page.has_next) {
			println!(
				"More: --cursor-timestamp {} --cursor-id {}",
				cursor.timestamp, cursor.id
			);
		}
		Ok(())
	}

	async fn listen(&self) -> anyhow::Result<()> {
		if !self.gateway.store().is_present() {
			bail!("not signed in; run `threadly login` first");
		}

		let options = ChannelOptions::from_endpoints(&self.endpoints, &self.realtime);
		println!("Listening on {} (Ctrl-C to stop)", options.endpoint);

		let handle = NotificationChannel::for_gateway(options, &self.gateway)
			.with_handler(Arc::new(Printer { json: self.json }))
			.spawn();
		let mut states = handle.subscribe_state();

		tokio::select! {
			signal = tokio::signal::ctrl_c() => signal.context("failed to listen for Ctrl-C")?,
			_ = states.wait_for(|state| *state == ConnectionState::Closed) => {
				eprintln!("Signed out; stopping.");
			}
		}

		handle.shutdown().await;
		Ok(())
	}
}

struct Printer {
	json: bool,
}

impl NotificationHandler for Printer {
	fn on_notification(&self, message: &ServerMessage) {
		let item = match message.to_item() {
			Ok(item) => item,
			Err(error) => {
				tracing::warn!(%error, "unreadable notification frame");
				return;
			}
		};
		if self.json {
			match serde_json::to_string(&item) {
				Ok(line) => println!("{line}"),
				Err(error) => tracing::warn!(%error, "failed to encode notification"),
			}
		} else {
			println!("{}", render_item(&item));
		}
	}

	fn on_connect(&self) {
		eprintln!("Connected.");
	}

	fn on_disconnect(&self) {
		eprintln!("Disconnected; reconnecting.");
	}
}

fn render_item(item: &NotificationItem) -> String {
	let (title, detail) = item.summary();
	let marker = if item.is_read { ' ' } else { '*' };
	format!("{marker} {}  {}  {title}: {detail}", item.event_id, item.occurred_at)
}

fn user_facing(error: ApiError) -> anyhow::Error {
	tracing::debug!(?error, "request failed");
	anyhow!(error.display_message())
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;

	#[test]
	fn renders_unread_marker_and_summary() {
		let item = NotificationItem::from_value(&json!({
			"eventId": "e1",
			"notificationType": "FOLLOW",
			"occurredAt": "2025-01-01T00:00:00Z",
			"isRead": false,
			"actorProfile": {"nickname": "mina"}
		}))
		.unwrap();

		assert_eq!(
			render_item(&item),
			"* e1  2025-01-01T00:00:00Z  mina started following you: Say hello to your new follower."
		);
	}

	#[test]
	fn read_items_have_no_marker() {
		let item = NotificationItem::from_value(&json!({
			"eventId": "e2",
			"occurredAt": "2025-01-01T00:00:00Z",
			"isRead": true
		}))
		.unwrap();

		assert!(render_item(&item).starts_with("  e2"));
	}

	#[test]
	fn api_errors_surface_their_display_message() {
		let error = user_facing(ApiError::connectivity("connection refused"));
		assert_eq!(error.to_string(), threadly_client::NETWORK_UNAVAILABLE_MESSAGE);
	}
}
