//! Error types for configuration loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error parsing TOML syntax or shape.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// A configured endpoint is not a valid absolute URL.
	#[error("invalid {field} URL {value:?}: {error}")]
	InvalidUrl {
		/// Name of the offending configuration field.
		field: &'static str,
		/// The raw value after defaults and overrides were applied.
		value: String,
		/// The underlying parse error.
		error: url::ParseError,
	},

	/// A reconnect delay is zero or the ceiling is below the base delay.
	#[error("invalid realtime backoff: base {base_delay_ms}ms, max {max_backoff_ms}ms")]
	InvalidBackoff {
		/// Configured base delay.
		base_delay_ms: u64,
		/// Configured ceiling.
		max_backoff_ms: u64,
	},

	/// No credentials path was configured and no platform data directory exists.
	#[error("no data directory available for persisted credentials")]
	NoDataDir,
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
