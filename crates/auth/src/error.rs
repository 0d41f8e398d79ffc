//! Error types for credential handling.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while parsing, decoding or persisting credentials.
#[derive(Debug, Error)]
pub enum AuthError {
	/// A login or reissue response did not contain an access/refresh pair.
	#[error("invalid token response")]
	MalformedTokenPayload,

	/// A token could not be decoded.
	#[error("invalid token: {0}")]
	InvalidToken(String),

	/// Reading or writing the persisted credential blob failed.
	#[error("I/O error on {path}: {error}")]
	Io {
		/// Path of the credential blob.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// The persisted credential blob is not valid JSON of the expected shape.
	#[error("credential blob: {0}")]
	Json(#[from] serde_json::Error),
}

/// Result type for credential operations.
pub type AuthResult<T> = Result<T, AuthError>;
