use serde::Serialize;
use serde_json::{Value, json};
use threadly_auth::CredentialPair;

use super::Gateway;
use crate::error::ApiError;
use crate::request::ApiRequest;

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const LOGOUT_PATH: &str = "/api/auth/logout";
pub const REGISTER_PATH: &str = "/api/users";

/// Sign-up form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
	pub user_name: String,
	pub email: String,
	pub password: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub phone: Option<String>,
}

impl Gateway {
	/// Exchange email and password for a credential pair and store it.
	pub async fn login(&self, email: &str, password: &str) -> Result<CredentialPair, ApiError> {
		let request = ApiRequest::post(LOGIN_PATH)
			.json(json!({ "email": email, "password": password }))
			.skip_auth_retry();
		let body = self.execute(request).await?;

		let tokens = CredentialPair::from_payload(&body)?;
		self.store().set(tokens.clone());
		tracing::info!("logged in");
		Ok(tokens)
	}

	/// Create an account. Does not sign in.
	pub async fn register(&self, registration: &Registration) -> Result<Value, ApiError> {
		let body = serde_json::to_value(registration).map_err(|error| ApiError::malformed(error.to_string()))?;
		self.send(ApiRequest::post(REGISTER_PATH).json(body).skip_auth_retry())
			.await
	}

	/// Notify the server, then clear the store whatever the outcome.
	pub async fn logout(&self) {
		if let Err(error) = self.execute(ApiRequest::post(LOGOUT_PATH)).await {
			tracing::warn!(%error, "logout request failed; clearing local credentials anyway");
		}
		self.store().clear();
		tracing::info!("logged out");
	}
}
