//! Response envelope handling.
//!
//! Every API response may be wrapped as
//! `{ success, code?, message?, data }`. A `success: false` envelope is a
//! failure even when the transport reported 2xx.

use reqwest::StatusCode;
use serde_json::Value;

use crate::error::ApiError;

/// Turn a received response into its checked body or a normalized error.
pub fn check(status: StatusCode, body: Value) -> Result<Value, ApiError> {
	if !status.is_success() {
		return Err(ApiError::from_response(status, body));
	}
	if body.get("success").and_then(Value::as_bool) == Some(false) {
		return Err(ApiError::envelope_failure(status, body));
	}
	Ok(body)
}

/// The logical payload: `data` when the body has that field, else the body.
pub fn unwrap_payload(body: Value) -> Value {
	match body {
		Value::Object(mut object) if object.contains_key("data") => object.remove("data").unwrap_or(Value::Null),
		other => other,
	}
}
