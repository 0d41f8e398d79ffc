//! Logical requests, before the gateway turns them into wire requests.

use reqwest::Method;
use serde_json::Value;

/// Which base URL a path is resolved against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Backend {
	#[default]
	Primary,
	Notification,
}

/// A request description handed to [`crate::Gateway`].
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
	pub(crate) method: Method,
	pub(crate) path: String,
	pub(crate) backend: Backend,
	pub(crate) query: Vec<(String, String)>,
	pub(crate) body: Option<Value>,
	pub(crate) skip_auth_retry: bool,
	pub(crate) with_credentials: bool,
}

impl ApiRequest {
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			backend: Backend::Primary,
			query: Vec::new(),
			body: None,
			skip_auth_retry: false,
			with_credentials: true,
		}
	}

	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::PATCH, path)
	}

	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	pub fn on(mut self, backend: Backend) -> Self {
		self.backend = backend;
		self
	}

	pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
		self.query.push((key.into(), value.to_string()));
		self
	}

	pub fn json(mut self, body: Value) -> Self {
		self.body = Some(body);
		self
	}

	/// Never refresh-and-retry this request, even on 401.
	pub fn skip_auth_retry(mut self) -> Self {
		self.skip_auth_retry = true;
		self
	}

	/// Send without `Authorization`, regardless of the stored credential.
	pub fn without_credentials(mut self) -> Self {
		self.with_credentials = false;
		self
	}

	pub fn method(&self) -> &Method {
		&self.method
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	pub fn backend(&self) -> Backend {
		self.backend
	}
}

/// Whether a dispatch is the first send or the single post-refresh retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Attempt {
	Initial,
	Retried,
}

/// One send of an [`ApiRequest`].
#[derive(Debug, Clone)]
pub(crate) struct Dispatch {
	pub request: ApiRequest,
	pub attempt: Attempt,
	/// Credential to use instead of reading the store (set on retry).
	pub bearer: Option<String>,
}

impl Dispatch {
	pub fn initial(request: ApiRequest) -> Self {
		Self {
			request,
			attempt: Attempt::Initial,
			bearer: None,
		}
	}

	pub fn retry(self, access_token: String) -> Self {
		Self {
			request: self.request,
			attempt: Attempt::Retried,
			bearer: Some(access_token),
		}
	}

	/// Eligible for one refresh-and-retry.
	pub fn may_recover(&self) -> bool {
		self.attempt == Attempt::Initial && !self.request.skip_auth_retry
	}
}
