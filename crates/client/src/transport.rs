//! HTTP transport seam.
//!
//! The gateway never talks to `reqwest` directly; it hands a fully-built
//! [`HttpRequest`] to a [`Transport`]. Any response that arrives (whatever
//! its status) is `Ok`; only a missing response is a [`TransportError`].

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use thiserror::Error;

/// A request as it goes out on the wire.
#[derive(Debug, Clone)]
pub struct HttpRequest {
	pub method: Method,
	pub url: String,
	pub headers: HeaderMap,
	pub query: Vec<(String, String)>,
	pub body: Option<Value>,
}

impl HttpRequest {
	pub fn new(method: Method, url: impl Into<String>) -> Self {
		Self {
			method,
			url: url.into(),
			headers: HeaderMap::new(),
			query: Vec::new(),
			body: None,
		}
	}

	/// Path component of the target URL, or the raw URL if it does not parse.
	pub fn path(&self) -> String {
		url::Url::parse(&self.url)
			.map(|url| url.path().to_string())
			.unwrap_or_else(|_| self.url.clone())
	}

	/// Bearer credential carried in `Authorization`, if any.
	pub fn bearer(&self) -> Option<&str> {
		self.headers
			.get(AUTHORIZATION)?
			.to_str()
			.ok()?
			.strip_prefix("Bearer ")
	}

	pub(crate) fn set_bearer(&mut self, token: &str) {
		match HeaderValue::from_str(&format!("Bearer {token}")) {
			Ok(mut value) => {
				value.set_sensitive(true);
				self.headers.insert(AUTHORIZATION, value);
			}
			Err(_) => tracing::warn!("access token contains bytes invalid in a header; sending without it"),
		}
	}
}

/// A response that reached the client.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
	pub status: StatusCode,
	pub body: Value,
}

impl HttpResponse {
	pub fn new(status: StatusCode, body: Value) -> Self {
		Self { status, body }
	}
}

/// No response was received.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

#[async_trait]
pub trait Transport: Send + Sync {
	async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Production transport backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
	client: reqwest::Client,
}

impl ReqwestTransport {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_client(client: reqwest::Client) -> Self {
		Self { client }
	}
}

#[async_trait]
impl Transport for ReqwestTransport {
	async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
		let mut builder = self
			.client
			.request(request.method, &request.url)
			.headers(request.headers);
		if !request.query.is_empty() {
			builder = builder.query(&request.query);
		}
		if let Some(body) = &request.body {
			builder = builder.json(body);
		}

		let response = builder.send().await.map_err(|e| TransportError(e.to_string()))?;
		let status = response.status();
		let bytes = response.bytes().await.map_err(|e| TransportError(e.to_string()))?;
		Ok(HttpResponse::new(status, parse_body(&bytes)))
	}
}

/// Empty bodies become `null`; non-JSON bodies are kept as a string.
fn parse_body(bytes: &[u8]) -> Value {
	if bytes.iter().all(u8::is_ascii_whitespace) {
		return Value::Null;
	}
	serde_json::from_slice(bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;

	#[test]
	fn body_parsing() {
		assert_eq!(parse_body(b""), Value::Null);
		assert_eq!(parse_body(b"  \n"), Value::Null);
		assert_eq!(parse_body(br#"{"success":true}"#), json!({"success": true}));
		assert_eq!(parse_body(b"Bad Gateway"), json!("Bad Gateway"));
	}

	#[test]
	fn bearer_round_trips_through_headers() {
		let mut request = HttpRequest::new(Method::GET, "https://api.test/api/users/me?x=1");
		assert_eq!(request.bearer(), None);
		request.set_bearer("abc");
		assert_eq!(request.bearer(), Some("abc"));
		assert_eq!(request.path(), "/api/users/me");
	}
}
