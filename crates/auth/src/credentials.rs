//! The access/refresh credential pair and tolerant token-payload parsing.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::claims::{AccessClaims, decode_access_claims};
use crate::error::{AuthError, AuthResult};

const ACCESS_KEYS: [&str; 2] = ["accessToken", "access_token"];
const REFRESH_KEYS: [&str; 2] = ["refreshToken", "refresh_token"];

/// Access and refresh credential, issued together and replaced together.
///
/// The pair is never mutated in place; a refresh produces a new value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
	access_token: String,
	refresh_token: String,
}

impl CredentialPair {
	/// Create a pair from raw token strings.
	pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
		Self {
			access_token: access_token.into(),
			refresh_token: refresh_token.into(),
		}
	}

	/// Short-lived bearer token for API calls.
	pub fn access_token(&self) -> &str {
		&self.access_token
	}

	/// Long-lived token used only against the reissue endpoint.
	pub fn refresh_token(&self) -> &str {
		&self.refresh_token
	}

	/// Decode the (unverified) claims carried by the access token.
	pub fn claims(&self) -> AuthResult<AccessClaims> {
		decode_access_claims(&self.access_token)
	}

	/// Extract a pair from a login or reissue response body.
	///
	/// Accepts camelCase or snake_case keys and descends through `data`
	/// envelopes until a complete pair is found.
	pub fn from_payload(payload: &Value) -> AuthResult<Self> {
		let mut current = payload;
		while let Some(object) = current.as_object() {
			let access = first_str(object, &ACCESS_KEYS);
			let refresh = first_str(object, &REFRESH_KEYS);
			if let (Some(access), Some(refresh)) = (access, refresh) {
				return Ok(Self::new(access, refresh));
			}
			match object.get("data") {
				Some(nested) if nested.is_object() => current = nested,
				_ => break,
			}
		}
		Err(AuthError::MalformedTokenPayload)
	}
}

impl fmt::Debug for CredentialPair {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CredentialPair")
			.field("access_token", &"[REDACTED]")
			.field("refresh_token", &"[REDACTED]")
			.finish()
	}
}

fn first_str<'a>(object: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
	keys.iter().find_map(|key| object.get(*key).and_then(Value::as_str))
}
