//! Process-wide credential store.
//!
//! The store is the only shared mutable state between the request gateway
//! and the realtime channel. It is handed to both explicitly and read or
//! written only through [`CredentialStore::get`], [`CredentialStore::set`]
//! and [`CredentialStore::clear`], so every reader sees the latest pair.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::watch;

use crate::credentials::CredentialPair;
use crate::storage::{CredentialPersistence, FilePersistence, NoPersistence};

/// Shared handle to the current credential pair.
///
/// Cloning the handle shares the underlying store.
#[derive(Clone)]
pub struct CredentialStore {
	inner: Arc<StoreInner>,
}

struct StoreInner {
	/// In-memory pair; the source of truth once populated.
	current: RwLock<Option<CredentialPair>>,
	/// Durable copy used to hydrate `current` on cold start.
	persistence: Box<dyn CredentialPersistence>,
	/// Current session, notified only on absent/present transitions.
	session: watch::Sender<Option<SessionId>>,
	/// Source of session ids.
	sessions: AtomicU64,
}

/// Identifies one signed-in period: from the moment a pair appears in an
/// empty store until the store is cleared. Replacing a pair (refresh) keeps
/// the session.
pub type SessionId = u64;

impl std::fmt::Debug for CredentialStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CredentialStore")
			.field("present", &self.is_present())
			.finish_non_exhaustive()
	}
}

impl CredentialStore {
	/// Store without durable backing.
	pub fn in_memory() -> Self {
		Self::with_persistence(NoPersistence)
	}

	/// Store backed by a JSON file.
	pub fn persistent(path: impl Into<PathBuf>) -> Self {
		Self::with_persistence(FilePersistence::new(path))
	}

	/// Store backed by custom persistence, hydrated from it immediately.
	pub fn with_persistence(persistence: impl CredentialPersistence + 'static) -> Self {
		let hydrated = match persistence.load() {
			Ok(tokens) => tokens,
			Err(error) => {
				tracing::warn!(%error, "failed to read persisted credentials");
				None
			}
		};
		let (session, _) = watch::channel(hydrated.is_some().then_some(0));
		Self {
			inner: Arc::new(StoreInner {
				current: RwLock::new(hydrated),
				persistence: Box::new(persistence),
				session,
				sessions: AtomicU64::new(1),
			}),
		}
	}

	/// Current pair, if signed in.
	pub fn get(&self) -> Option<CredentialPair> {
		self.inner.current.read().clone()
	}

	/// Current access token.
	pub fn access_token(&self) -> Option<String> {
		self.inner.current.read().as_ref().map(|p| p.access_token().to_owned())
	}

	/// Current refresh token.
	pub fn refresh_token(&self) -> Option<String> {
		self.inner.current.read().as_ref().map(|p| p.refresh_token().to_owned())
	}

	pub fn is_present(&self) -> bool {
		self.inner.current.read().is_some()
	}

	/// Replace the pair wholesale.
	pub fn set(&self, tokens: CredentialPair) {
		self.replace(Some(tokens));
	}

	/// Drop the pair (logout).
	pub fn clear(&self) {
		self.replace(None);
	}

	/// Watch sessions. The receiver starts at the current value; it sees a
	/// new id for every sign-in, even when a logout and the next login both
	/// land before it is polled.
	pub fn subscribe(&self) -> watch::Receiver<Option<SessionId>> {
		self.inner.session.subscribe()
	}

	fn replace(&self, tokens: Option<CredentialPair>) {
		let present = tokens.is_some();
		let mut current = self.inner.current.write();
		if let Err(error) = self.inner.persistence.save(tokens.as_ref()) {
			tracing::warn!(%error, "failed to persist credentials");
		}
		*current = tokens;

		// Published under the write guard so the session always agrees with
		// the stored pair.
		self.inner.session.send_if_modified(|session| match (session.is_some(), present) {
			(false, true) => {
				*session = Some(self.inner.sessions.fetch_add(1, Ordering::Relaxed));
				true
			}
			(true, false) => {
				*session = None;
				true
			}
			_ => false,
		});
		drop(current);
		tracing::debug!(present, "credential store updated");
	}
}
