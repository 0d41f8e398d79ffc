//! Unverified access-token claim decoding.
//!
//! The client never validates signatures; claims are read only to show who
//! is signed in and when the access token lapses.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{AuthError, AuthResult};

/// Claims carried by a Threadly access token.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
	/// Account identifier.
	#[serde(default)]
	pub user_id: Option<String>,

	/// Account type (e.g. `USER`).
	#[serde(default)]
	pub user_type: Option<String>,

	/// Account status (e.g. `ACTIVE`, `INCOMPLETE_PROFILE`).
	#[serde(default)]
	pub user_status_type: Option<String>,

	/// Expiry as seconds since the epoch.
	#[serde(default)]
	pub exp: Option<i64>,

	/// Any other claims.
	#[serde(flatten)]
	pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AccessClaims {
	/// Expiry instant, when the token carries a valid `exp`.
	pub fn expires_at(&self) -> Option<DateTime<Utc>> {
		self.exp.and_then(|secs| DateTime::from_timestamp(secs, 0))
	}
}

/// Decode the payload segment of a JWT access token.
pub fn decode_access_claims(jwt: &str) -> AuthResult<AccessClaims> {
	let payload = jwt
		.split('.')
		.nth(1)
		.filter(|segment| !segment.is_empty())
		.ok_or_else(|| AuthError::InvalidToken("JWT payload segment missing".into()))?;

	let bytes = URL_SAFE_NO_PAD
		.decode(payload.trim_end_matches('='))
		.map_err(|e| AuthError::InvalidToken(format!("base64 decode failed: {e}")))?;

	serde_json::from_slice(&bytes).map_err(|e| AuthError::InvalidToken(format!("JSON parse failed: {e}")))
}
