//! Configuration system for the Threadly client.
//!
//! Configuration is resolved in layers, later layers winning:
//!
//! 1. Built-in defaults (the production API host).
//! 2. A TOML file: an explicit path, or `$XDG_CONFIG_HOME/threadly/config.toml`
//!    when it exists.
//! 3. `THREADLY_*` environment variables. Empty values are ignored.
//!
//! ```toml
//! api_base_url = "https://api.threadly.kr"
//! notification_api_base_url = "https://notify.threadly.kr"
//! # notification_ws_url = "wss://notify.threadly.kr/ws/notifications"
//! credentials_path = "/home/me/.local/share/threadly/threadly-auth.json"
//!
//! [realtime]
//! base_delay_ms = 2000
//! max_backoff_ms = 30000
//! ```
//!
//! Raw values stay strings until [`ClientConfig::endpoints`] validates them,
//! so a bad override is reported with the field it came from.

pub mod error;

use std::path::{Path, PathBuf};
use std::time::Duration;

pub use error::{ConfigError, Result};
use serde::Deserialize;
use url::Url;

/// Production API host used when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "https://api.threadly.kr";

/// Storage key naming the persisted credential blob.
pub const CREDENTIALS_STORAGE_KEY: &str = "threadly-auth";

/// Environment variable overriding [`ClientConfig::api_base_url`].
pub const ENV_API_BASE_URL: &str = "THREADLY_API_BASE_URL";
/// Environment variable overriding [`ClientConfig::notification_api_base_url`].
pub const ENV_NOTIFICATION_API_BASE_URL: &str = "THREADLY_NOTIFICATION_API_BASE_URL";
/// Environment variable overriding [`ClientConfig::notification_ws_url`].
pub const ENV_NOTIFICATION_WS_URL: &str = "THREADLY_NOTIFICATION_WS_URL";
/// Environment variable overriding [`ClientConfig::credentials_path`].
pub const ENV_CREDENTIALS_PATH: &str = "THREADLY_CREDENTIALS_PATH";

const NOTIFICATION_WS_PATH: &str = "/ws/notifications";

/// Client configuration as read from defaults, file and environment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
	/// Base URL of the primary API.
	pub api_base_url: String,
	/// Base URL of the notification API. Falls back to the primary API.
	pub notification_api_base_url: Option<String>,
	/// Push endpoint. Derived from the notification API host when unset.
	pub notification_ws_url: Option<String>,
	/// Location of the persisted credential blob.
	pub credentials_path: Option<PathBuf>,
	/// Reconnect policy of the realtime channel.
	pub realtime: RealtimeConfig,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			api_base_url: DEFAULT_API_BASE_URL.to_string(),
			notification_api_base_url: None,
			notification_ws_url: None,
			credentials_path: None,
			realtime: RealtimeConfig::default(),
		}
	}
}

/// Exponential backoff parameters for realtime reconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RealtimeConfig {
	/// Delay before the first reconnect, doubled on every further attempt.
	pub base_delay_ms: u64,
	/// Ceiling applied to the doubled delay.
	pub max_backoff_ms: u64,
}

impl Default for RealtimeConfig {
	fn default() -> Self {
		Self {
			base_delay_ms: 2_000,
			max_backoff_ms: 30_000,
		}
	}
}

impl RealtimeConfig {
	pub fn base_delay(&self) -> Duration {
		Duration::from_millis(self.base_delay_ms)
	}

	pub fn max_backoff(&self) -> Duration {
		Duration::from_millis(self.max_backoff_ms)
	}

	fn validate(&self) -> Result<()> {
		if self.base_delay_ms == 0 || self.max_backoff_ms < self.base_delay_ms {
			return Err(ConfigError::InvalidBackoff {
				base_delay_ms: self.base_delay_ms,
				max_backoff_ms: self.max_backoff_ms,
			});
		}
		Ok(())
	}
}

/// Validated endpoint set handed to the gateway and realtime channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
	/// Primary API base.
	pub api: Url,
	/// Notification API base.
	pub notification_api: Url,
	/// Push endpoint, without the token query parameter.
	pub notification_ws: Url,
}

impl ClientConfig {
	/// Parse a TOML string into a [`ClientConfig`].
	pub fn parse(input: &str) -> Result<Self> {
		Ok(toml::from_str(input)?)
	}

	/// Load configuration from a file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
			path: path.to_path_buf(),
			error: e,
		})?;
		Self::parse(&content)
	}

	/// Resolve the full layered configuration for this process.
	///
	/// An explicit path must exist; the default location is only read when
	/// present.
	pub fn discover(explicit: Option<&Path>) -> Result<Self> {
		let mut config = match explicit {
			Some(path) => Self::load(path)?,
			None => match default_config_path() {
				Some(path) if path.is_file() => Self::load(path)?,
				_ => Self::default(),
			},
		};
		config.apply_env(|key| std::env::var(key).ok());
		Ok(config)
	}

	/// Overlay environment values read through `lookup`.
	pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
		let present = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

		if let Some(value) = present(ENV_API_BASE_URL) {
			self.api_base_url = value;
		}
		if let Some(value) = present(ENV_NOTIFICATION_API_BASE_URL) {
			self.notification_api_base_url = Some(value);
		}
		if let Some(value) = present(ENV_NOTIFICATION_WS_URL) {
			self.notification_ws_url = Some(value);
		}
		if let Some(value) = present(ENV_CREDENTIALS_PATH) {
			self.credentials_path = Some(PathBuf::from(value));
		}
	}

	/// Resolved primary API base with a single trailing slash removed.
	pub fn api_base(&self) -> String {
		resolve_base(Some(&self.api_base_url), DEFAULT_API_BASE_URL)
	}

	/// Resolved notification API base, falling back to the primary API.
	pub fn notification_api_base(&self) -> String {
		let api = self.api_base();
		resolve_base(self.notification_api_base_url.as_deref(), &api)
	}

	/// Resolved push endpoint.
	pub fn notification_ws(&self) -> String {
		match self.notification_ws_url.as_deref() {
			Some(url) if !url.is_empty() => url.to_string(),
			_ => derive_ws_url(&self.notification_api_base()),
		}
	}

	/// Validate every endpoint and the backoff policy.
	pub fn endpoints(&self) -> Result<Endpoints> {
		self.realtime.validate()?;
		Ok(Endpoints {
			api: parse_url("api_base_url", self.api_base())?,
			notification_api: parse_url("notification_api_base_url", self.notification_api_base())?,
			notification_ws: parse_url("notification_ws_url", self.notification_ws())?,
		})
	}

	/// Path of the persisted credential blob.
	pub fn credentials_path(&self) -> Result<PathBuf> {
		if let Some(path) = &self.credentials_path {
			return Ok(path.clone());
		}
		dirs::data_dir()
			.map(|dir| dir.join("threadly").join(format!("{CREDENTIALS_STORAGE_KEY}.json")))
			.ok_or(ConfigError::NoDataDir)
	}
}

/// Default location of the configuration file.
pub fn default_config_path() -> Option<PathBuf> {
	dirs::config_dir().map(|dir| dir.join("threadly").join("config.toml"))
}

fn resolve_base(raw: Option<&str>, fallback: &str) -> String {
	let chosen = match raw {
		Some(raw) if !raw.is_empty() => raw,
		_ => fallback,
	};
	chosen.strip_suffix('/').unwrap_or(chosen).to_string()
}

fn derive_ws_url(notification_api_base: &str) -> String {
	match Url::parse(notification_api_base) {
		Ok(base) if base.has_host() => {
			let host = base.host_str().unwrap_or_default();
			match base.port() {
				Some(port) => format!("ws://{host}:{port}{NOTIFICATION_WS_PATH}"),
				None => format!("ws://{host}{NOTIFICATION_WS_PATH}"),
			}
		}
		_ => {
			let sanitized = notification_api_base
				.strip_prefix("https://")
				.or_else(|| notification_api_base.strip_prefix("http://"))
				.unwrap_or(notification_api_base);
			format!("ws://{sanitized}{NOTIFICATION_WS_PATH}")
		}
	}
}

fn parse_url(field: &'static str, value: String) -> Result<Url> {
	Url::parse(&value).map_err(|error| ConfigError::InvalidUrl { field, value, error })
}
