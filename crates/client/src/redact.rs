//! Redaction for request/response logging.

use reqwest::header::HeaderMap;
use serde_json::{Map, Value};

const REDACTED: &str = "[REDACTED]";
const SENSITIVE_KEYS: [&str; 3] = ["password", "token", "authorization"];

fn is_sensitive(key: &str) -> bool {
	let key = key.to_ascii_lowercase();
	SENSITIVE_KEYS.iter().any(|needle| key.contains(needle))
}

/// Copy of `value` with every sensitive object key masked, at any depth.
pub fn redact_json(value: &Value) -> Value {
	match value {
		Value::Object(object) => {
			let mut masked = Map::with_capacity(object.len());
			for (key, inner) in object {
				let inner = if is_sensitive(key) {
					Value::String(REDACTED.to_string())
				} else {
					redact_json(inner)
				};
				masked.insert(key.clone(), inner);
			}
			Value::Object(masked)
		}
		Value::Array(items) => Value::Array(items.iter().map(redact_json).collect()),
		other => other.clone(),
	}
}

/// Header list with credential-bearing headers masked.
pub fn redact_headers(headers: &HeaderMap) -> Vec<(String, String)> {
	headers
		.iter()
		.map(|(name, value)| {
			let value = if is_sensitive(name.as_str()) {
				REDACTED.to_string()
			} else {
				value.to_str().unwrap_or("<binary>").to_string()
			};
			(name.as_str().to_string(), value)
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
	use serde_json::json;

	use super::*;

	#[test]
	fn masks_nested_credentials() {
		let body = json!({
			"email": "a@b.c",
			"password": "hunter2",
			"data": {"accessToken": "x", "refresh_token": "y", "items": [{"resetToken": "z", "id": 1}]}
		});

		assert_eq!(
			redact_json(&body),
			json!({
				"email": "a@b.c",
				"password": "[REDACTED]",
				"data": {"accessToken": "[REDACTED]", "refresh_token": "[REDACTED]", "items": [{"resetToken": "[REDACTED]", "id": 1}]}
			})
		);
	}

	#[test]
	fn masks_auth_headers() {
		let mut headers = HeaderMap::new();
		headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer secret"));
		headers.insert("x-refresh-token", HeaderValue::from_static("Bearer secret"));
		headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		let mut rendered = redact_headers(&headers);
		rendered.sort();
		assert_eq!(
			rendered,
			vec![
				("authorization".to_string(), "[REDACTED]".to_string()),
				("content-type".to_string(), "application/json".to_string()),
				("x-refresh-token".to_string(), "[REDACTED]".to_string()),
			]
		);
	}
}
