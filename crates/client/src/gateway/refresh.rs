//! Single-flight credential reissue.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use reqwest::Method;
use reqwest::header::HeaderValue;
use threadly_auth::{CredentialPair, CredentialStore};

use crate::envelope;
use crate::error::ApiError;
use crate::redact::redact_json;
use crate::transport::{HttpRequest, Transport};

/// Path of the reissue endpoint on the primary backend.
pub const REISSUE_PATH: &str = "/api/auth/reissue";

/// Header carrying the refresh credential.
pub const REFRESH_TOKEN_HEADER: &str = "x-refresh-token";

pub(crate) type RefreshOutcome = Result<Option<CredentialPair>, ApiError>;
pub(crate) type RefreshHandle = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Holds the in-flight reissue, if any.
///
/// Check-and-set happens under one lock acquisition with no await in
/// between, so concurrent joiners always converge on a single handle. The
/// handle clears itself on completion; the generation id keeps a late
/// completion from clearing a newer handle.
#[derive(Default)]
pub(crate) struct RefreshSlot {
	inflight: Mutex<Option<(u64, RefreshHandle)>>,
	next_id: AtomicU64,
}

impl RefreshSlot {
	pub fn join(self: &Arc<Self>, transport: Arc<dyn Transport>, store: CredentialStore, url: String) -> RefreshHandle {
		let mut inflight = self.inflight.lock();
		if let Some((_, handle)) = inflight.as_ref() {
			tracing::trace!("joining in-flight credential refresh");
			return handle.clone();
		}

		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let slot: Weak<Self> = Arc::downgrade(self);
		let handle = async move {
			let outcome = reissue(transport.as_ref(), &store, &url).await;
			if let Some(slot) = slot.upgrade() {
				slot.finish(id);
			}
			outcome
		}
		.boxed()
		.shared();

		*inflight = Some((id, handle.clone()));
		handle
	}

	#[cfg(test)]
	pub fn is_idle(&self) -> bool {
		self.inflight.lock().is_none()
	}

	fn finish(&self, id: u64) {
		let mut inflight = self.inflight.lock();
		if matches!(inflight.as_ref(), Some((current, _)) if *current == id) {
			*inflight = None;
		}
	}
}

async fn reissue(transport: &dyn Transport, store: &CredentialStore, url: &str) -> RefreshOutcome {
	let Some(refresh_token) = store.refresh_token() else {
		tracing::debug!("no refresh credential; skipping reissue");
		return Ok(None);
	};

	let mut request = HttpRequest::new(Method::POST, url);
	match HeaderValue::from_str(&format!("Bearer {refresh_token}")) {
		Ok(mut value) => {
			value.set_sensitive(true);
			request.headers.insert(REFRESH_TOKEN_HEADER, value);
		}
		Err(_) => {
			tracing::warn!("stored refresh credential is not a valid header value; clearing");
			store.clear();
			return Ok(None);
		}
	}

	tracing::debug!(url, "reissuing credentials");
	let result = match transport.execute(request).await {
		Ok(response) => {
			tracing::debug!(status = response.status.as_u16(), body = %redact_json(&response.body), "reissue response");
			envelope::check(response.status, response.body)
				.and_then(|body| CredentialPair::from_payload(&body).map_err(ApiError::from))
		}
		Err(error) => Err(ApiError::connectivity(error)),
	};

	match result {
		Ok(tokens) => {
			store.set(tokens.clone());
			tracing::info!("credentials reissued");
			Ok(Some(tokens))
		}
		Err(error) => {
			store.clear();
			if error.is_auth_rejection() {
				tracing::info!(status = ?error.status(), code = ?error.code(), "refresh credential rejected; signed out");
				Ok(None)
			} else {
				tracing::warn!(%error, "credential reissue failed");
				Err(error.with_request(&Method::POST, url))
			}
		}
	}
}
