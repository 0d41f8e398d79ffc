//! The normalized error every gateway failure is coerced into.

use std::fmt;

use reqwest::{Method, StatusCode};
use serde_json::Value;
use thiserror::Error;
use threadly_auth::AuthError;

/// User-facing message for failures where no response reached the client.
pub const NETWORK_UNAVAILABLE_MESSAGE: &str = "No response from the server. Please try again.";

/// Message used when a `success: false` envelope carries none.
pub const DEFAULT_FAILURE_MESSAGE: &str = "The request failed.";

/// Application code signalling an expired access credential.
pub const TOKEN_EXPIRED: &str = "TOKEN_EXPIRED";

/// Application code signalling a rejected credential.
pub const UNAUTHORIZED: &str = "UNAUTHORIZED";

const NETWORK_SIGNATURES: [&str; 3] = ["ERR_CONNECTION_REFUSED", "ERR_CONNECTION_TIMED_OUT", "NETWORK ERROR"];

/// Failure category, deciding whether recovery is worth attempting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	/// No response was received. Never triggers a credential refresh.
	Connectivity,
	/// 401, or 403 with an expiry code. Eligible for one refresh-and-retry.
	Authorization,
	/// Any other non-2xx response, or a `success: false` envelope.
	Application,
	/// A response was received but lacked required fields.
	MalformedResponse,
}

/// Normalized error surfaced to collaborators.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}{}{}", code_suffix(.code), request_suffix(.method, .url))]
pub struct ApiError {
	kind: ErrorKind,
	message: String,
	code: Option<String>,
	status: Option<u16>,
	url: Option<String>,
	method: Option<String>,
	data: Option<Value>,
}

impl ApiError {
	fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
		Self {
			kind,
			message: message.into(),
			code: None,
			status: None,
			url: None,
			method: None,
			data: None,
		}
	}

	/// No response reached the client. `detail` is kept in [`ApiError::data`].
	pub fn connectivity(detail: impl fmt::Display) -> Self {
		let mut error = Self::new(ErrorKind::Connectivity, NETWORK_UNAVAILABLE_MESSAGE);
		error.data = Some(Value::String(detail.to_string()));
		error
	}

	/// A non-2xx response.
	pub fn from_response(status: StatusCode, body: Value) -> Self {
		let code = body_str(&body, "code");
		let message = body_str(&body, "message")
			.unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));

		let expired = status == StatusCode::UNAUTHORIZED
			|| (status == StatusCode::FORBIDDEN && code.as_deref() == Some(TOKEN_EXPIRED));
		let kind = if expired { ErrorKind::Authorization } else { ErrorKind::Application };

		Self {
			kind,
			message,
			code,
			status: Some(status.as_u16()),
			url: None,
			method: None,
			data: (!body.is_null()).then_some(body),
		}
	}

	/// A 2xx response whose envelope reports `success: false`.
	pub fn envelope_failure(status: StatusCode, body: Value) -> Self {
		Self {
			kind: ErrorKind::Application,
			message: body_str(&body, "message").unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
			code: body_str(&body, "code"),
			status: Some(status.as_u16()),
			url: None,
			method: None,
			data: Some(body),
		}
	}

	/// A response that parsed but lacked required fields.
	pub fn malformed(message: impl Into<String>) -> Self {
		Self::new(ErrorKind::MalformedResponse, message)
	}

	/// Attach the originating call.
	pub fn with_request(mut self, method: &Method, url: &str) -> Self {
		self.method = Some(method.as_str().to_uppercase());
		self.url = Some(url.to_string());
		self
	}

	pub fn kind(&self) -> ErrorKind {
		self.kind
	}

	pub fn message(&self) -> &str {
		&self.message
	}

	pub fn code(&self) -> Option<&str> {
		self.code.as_deref()
	}

	pub fn status(&self) -> Option<u16> {
		self.status
	}

	pub fn url(&self) -> Option<&str> {
		self.url.as_deref()
	}

	pub fn method(&self) -> Option<&str> {
		self.method.as_deref()
	}

	pub fn data(&self) -> Option<&Value> {
		self.data.as_ref()
	}

	/// True for 401, or 403 carrying [`TOKEN_EXPIRED`].
	pub fn is_credential_expiry(&self) -> bool {
		self.kind == ErrorKind::Authorization
	}

	/// True when a reissue failure means the refresh credential itself was
	/// refused, as opposed to the server or network misbehaving.
	pub fn is_auth_rejection(&self) -> bool {
		matches!(self.status, Some(401 | 403)) || matches!(self.code.as_deref(), Some(TOKEN_EXPIRED | UNAUTHORIZED))
	}

	/// True when retrying later is the only sensible reaction.
	pub fn is_network_unavailable(&self) -> bool {
		if self.kind == ErrorKind::Connectivity {
			return true;
		}
		let message = self.message.to_uppercase();
		NETWORK_SIGNATURES.iter().any(|signature| message.contains(signature))
	}

	/// Message suitable for showing to a user.
	pub fn display_message(&self) -> String {
		if self.is_network_unavailable() {
			return NETWORK_UNAVAILABLE_MESSAGE.to_string();
		}
		match &self.code {
			Some(code) => format!("{} ({code})", self.message),
			None => self.message.clone(),
		}
	}
}

impl From<AuthError> for ApiError {
	fn from(error: AuthError) -> Self {
		Self::malformed(error.to_string())
	}
}

fn code_suffix(code: &Option<String>) -> String {
	code.as_deref().map(|code| format!(" ({code})")).unwrap_or_default()
}

fn request_suffix(method: &Option<String>, url: &Option<String>) -> String {
	match (method, url) {
		(Some(method), Some(url)) => format!(" [{method} {url}]"),
		_ => String::new(),
	}
}

fn body_str(body: &Value, key: &str) -> Option<String> {
	body.get(key).and_then(Value::as_str).map(str::to_owned)
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use rstest::rstest;
	use serde_json::json;

	use super::*;

	#[rstest]
	#[case(401, json!({}), ErrorKind::Authorization)]
	#[case(401, json!({"code": "ANYTHING"}), ErrorKind::Authorization)]
	#[case(403, json!({"code": "TOKEN_EXPIRED"}), ErrorKind::Authorization)]
	#[case(403, json!({"code": "FORBIDDEN"}), ErrorKind::Application)]
	#[case(403, Value::Null, ErrorKind::Application)]
	#[case(500, json!({"message": "boom"}), ErrorKind::Application)]
	fn response_classification(#[case] status: u16, #[case] body: Value, #[case] kind: ErrorKind) {
		let status = StatusCode::from_u16(status).unwrap();
		assert_eq!(ApiError::from_response(status, body).kind(), kind);
	}

	#[test]
	fn response_message_falls_back_to_status() {
		let error = ApiError::from_response(StatusCode::BAD_GATEWAY, Value::String("<html>".into()));
		assert_eq!(error.message(), "Request failed with status code 502");
		assert_eq!(error.status(), Some(502));
		assert_eq!(error.data(), Some(&Value::String("<html>".into())));
	}

	#[test]
	fn envelope_failure_carries_server_fields() {
		let error = ApiError::envelope_failure(StatusCode::OK, json!({"success": false, "code": "POST_NOT_FOUND", "message": "gone"}))
			.with_request(&Method::GET, "https://api.test/api/posts/1");

		assert_eq!(error.kind(), ErrorKind::Application);
		assert_eq!(error.code(), Some("POST_NOT_FOUND"));
		assert_eq!(error.status(), Some(200));
		assert_eq!(error.method(), Some("GET"));
		assert_eq!(error.display_message(), "gone (POST_NOT_FOUND)");
		assert_eq!(error.to_string(), "gone (POST_NOT_FOUND) [GET https://api.test/api/posts/1]");
	}

	#[test]
	fn display_omits_absent_code_and_request() {
		assert_eq!(ApiError::malformed("missing tokens").to_string(), "missing tokens");

		let error = ApiError::from_response(StatusCode::UNAUTHORIZED, json!({"message": "expired"}))
			.with_request(&Method::POST, "https://api.test/api/auth/reissue");
		assert_eq!(error.to_string(), "expired [POST https://api.test/api/auth/reissue]");

		let source: &dyn std::error::Error = &error;
		assert!(source.source().is_none());
	}

	#[test]
	fn envelope_failure_without_message_uses_default() {
		let error = ApiError::envelope_failure(StatusCode::OK, json!({"success": false}));
		assert_eq!(error.message(), DEFAULT_FAILURE_MESSAGE);
	}

	#[test]
	fn connectivity_uses_fixed_message() {
		let error = ApiError::connectivity("connection refused");
		assert!(error.is_network_unavailable());
		assert!(!error.is_credential_expiry());
		assert_eq!(error.display_message(), NETWORK_UNAVAILABLE_MESSAGE);
		assert_eq!(error.data(), Some(&json!("connection refused")));
	}

	#[test]
	fn network_signature_in_message_counts_as_unavailable() {
		let error = ApiError::malformed("net::ERR_CONNECTION_REFUSED while loading");
		assert!(error.is_network_unavailable());
	}

	#[rstest]
	#[case(Some(401), None, true)]
	#[case(Some(403), None, true)]
	#[case(Some(200), Some("UNAUTHORIZED"), true)]
	#[case(Some(200), Some("TOKEN_EXPIRED"), true)]
	#[case(Some(500), None, false)]
	#[case(None, None, false)]
	fn auth_rejection(#[case] status: Option<u16>, #[case] code: Option<&str>, #[case] expected: bool) {
		let mut error = ApiError::malformed("x");
		error.status = status;
		error.code = code.map(str::to_owned);
		assert_eq!(error.is_auth_rejection(), expected);
	}
}
