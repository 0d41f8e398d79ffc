//! Authenticated request gateway.
//!
//! Every outbound call goes through [`Gateway::execute`]:
//!
//! 1. The bearer credential is attached unless the path is an auth endpoint
//!    or the request opted out.
//! 2. The response is checked (non-2xx and `success: false` both fail).
//! 3. A credential-expiry failure on a first attempt joins the single-flight
//!    refresh and, if that yields a pair, redispatches exactly once with the
//!    new access credential.
//!
//! Clones share one transport, one credential store and one refresh slot.

mod refresh;
mod session;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use threadly_auth::{CredentialPair, CredentialStore};
use threadly_config::Endpoints;

pub use refresh::{REFRESH_TOKEN_HEADER, REISSUE_PATH};
use refresh::RefreshSlot;
pub use session::{LOGIN_PATH, LOGOUT_PATH, REGISTER_PATH, Registration};

use crate::envelope;
use crate::error::ApiError;
use crate::redact::{redact_headers, redact_json};
use crate::request::{ApiRequest, Backend, Dispatch};
use crate::transport::{HttpRequest, ReqwestTransport, Transport};

/// Paths that never carry the access credential.
const UNAUTHENTICATED_PATHS: [&str; 2] = [LOGIN_PATH, REISSUE_PATH];

#[derive(Clone)]
pub struct Gateway {
	inner: Arc<GatewayInner>,
}

struct GatewayInner {
	transport: Arc<dyn Transport>,
	store: CredentialStore,
	api_base: String,
	notification_base: String,
	refresh: Arc<RefreshSlot>,
}

impl Gateway {
	/// Gateway over the production HTTP transport.
	pub fn new(endpoints: &Endpoints, store: CredentialStore) -> Self {
		Self::with_transport(endpoints, store, Arc::new(ReqwestTransport::new()))
	}

	pub fn with_transport(endpoints: &Endpoints, store: CredentialStore, transport: Arc<dyn Transport>) -> Self {
		Self {
			inner: Arc::new(GatewayInner {
				transport,
				store,
				api_base: endpoints.api.as_str().trim_end_matches('/').to_string(),
				notification_base: endpoints.notification_api.as_str().trim_end_matches('/').to_string(),
				refresh: Arc::new(RefreshSlot::default()),
			}),
		}
	}

	pub fn store(&self) -> &CredentialStore {
		&self.inner.store
	}

	/// Dispatch `request` and return the checked response body, envelope intact.
	pub async fn execute(&self, request: ApiRequest) -> Result<Value, ApiError> {
		let dispatch = Dispatch::initial(request);
		let result = self.send_once(&dispatch).await;
		match result {
			Err(error) if error.is_credential_expiry() && dispatch.may_recover() => self.recover(dispatch, error).await,
			other => other,
		}
	}

	/// Dispatch `request` and return its logical payload.
	pub async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
		self.execute(request).await.map(envelope::unwrap_payload)
	}

	/// Dispatch `request` and deserialize its logical payload.
	pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
		let payload = self.send(request).await?;
		serde_json::from_value(payload).map_err(|error| ApiError::malformed(error.to_string()))
	}

	/// Join (or start) the single-flight reissue.
	///
	/// Resolves to `None` when there is no refresh credential or the server
	/// rejected it; in the latter case the store has been cleared.
	pub async fn refresh_credentials(&self) -> Result<Option<CredentialPair>, ApiError> {
		let handle = self.inner.refresh.join(
			Arc::clone(&self.inner.transport),
			self.inner.store.clone(),
			self.url_for(Backend::Primary, REISSUE_PATH),
		);
		handle.await
	}

	/// The stored access credential, or one obtained by refreshing.
	pub async fn ensure_fresh_access_token(&self) -> Result<Option<String>, ApiError> {
		if let Some(token) = self.inner.store.access_token() {
			return Ok(Some(token));
		}
		let tokens = self.refresh_credentials().await?;
		Ok(tokens.map(|tokens| tokens.access_token().to_string()))
	}

	async fn recover(&self, dispatch: Dispatch, original: ApiError) -> Result<Value, ApiError> {
		tracing::debug!(
			method = %dispatch.request.method,
			path = %dispatch.request.path,
			status = ?original.status(),
			"credential expired; refreshing"
		);
		match self.refresh_credentials().await? {
			Some(tokens) => {
				let retry = dispatch.retry(tokens.access_token().to_string());
				self.send_once(&retry).await
			}
			None => Err(original),
		}
	}

	async fn send_once(&self, dispatch: &Dispatch) -> Result<Value, ApiError> {
		let request = self.build(dispatch);
		let method = request.method.clone();
		let url = request.url.clone();
		let body = request.body.as_ref().map(redact_json).unwrap_or_default();

		tracing::debug!(
			%method,
			%url,
			attempt = ?dispatch.attempt,
			headers = ?redact_headers(&request.headers),
			%body,
			"request"
		);

		match self.inner.transport.execute(request).await {
			Ok(response) => {
				tracing::debug!(
					%method,
					%url,
					status = response.status.as_u16(),
					body = %redact_json(&response.body),
					"response"
				);
				envelope::check(response.status, response.body).map_err(|error| error.with_request(&method, &url))
			}
			Err(error) => {
				tracing::warn!(%method, %url, %error, "no response received");
				Err(ApiError::connectivity(error).with_request(&method, &url))
			}
		}
	}

	fn build(&self, dispatch: &Dispatch) -> HttpRequest {
		let api = &dispatch.request;
		let mut request = HttpRequest::new(api.method.clone(), self.url_for(api.backend, &api.path));
		request.query = api.query.clone();
		request.body = api.body.clone();

		if attaches_credentials(api) {
			let token = dispatch.bearer.clone().or_else(|| self.inner.store.access_token());
			if let Some(token) = token {
				request.set_bearer(&token);
			}
		}
		request
	}

	fn url_for(&self, backend: Backend, path: &str) -> String {
		let base = match backend {
			Backend::Primary => &self.inner.api_base,
			Backend::Notification => &self.inner.notification_base,
		};
		if path.starts_with('/') {
			format!("{base}{path}")
		} else {
			format!("{base}/{path}")
		}
	}
}

fn attaches_credentials(request: &ApiRequest) -> bool {
	request.with_credentials && !UNAUTHENTICATED_PATHS.iter().any(|path| request.path.contains(path))
}
